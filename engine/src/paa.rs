//! PDN address allocation strategy (§4.4). The pool itself is an external
//! collaborator reached through [`Platform`]; this module only picks which
//! pool calls to make for a given `pdn_type`.

use crate::error::EngineError;
use crate::model::{Paa, PdnType};
use crate::platform::Platform;

/// Runs the §4.4 policy table against a platform's PAA pool.
pub fn allocate<P: Platform + ?Sized>(
    platform: &P,
    pdn_type: PdnType,
    nas_address_signalling: bool,
) -> Result<Paa, EngineError> {
    match pdn_type {
        PdnType::Ipv4 => {
            let ipv4 = if nas_address_signalling {
                platform.paa_alloc_v4()
            } else {
                // DHCP-signalled v4 address assignment is not implemented at
                // this layer; leave the PAA unassigned rather than guessing.
                None
            };
            Ok(Paa { ipv4, ipv6: None })
        }
        PdnType::Ipv6 => {
            // Stubbed per Open Question 4: always unassigned until a real
            // IPv6 pool exists.
            Ok(Paa {
                ipv4: None,
                ipv6: platform.paa_alloc_v6(),
            })
        }
        PdnType::Ipv4OrIpv6 => {
            if let Some(ipv4) = platform.paa_alloc_v4() {
                Ok(Paa {
                    ipv4: Some(ipv4),
                    ipv6: None,
                })
            } else {
                match platform.paa_alloc_v6() {
                    Some(ipv6) => Ok(Paa {
                        ipv4: None,
                        ipv6: Some(ipv6),
                    }),
                    None => Err(EngineError::ResourceExhausted),
                }
            }
        }
        PdnType::Ipv4AndIpv6 => {
            let ipv4 = platform.paa_alloc_v4();
            let ipv6 = platform.paa_alloc_v6();
            if ipv4.is_none() {
                log::error!("paa: v4 allocation failed for a dual-stack PDN, continuing with v6 only");
            }
            if ipv6.is_none() {
                log::error!("paa: v6 allocation failed for a dual-stack PDN, continuing with v4 only");
            }
            if ipv4.is_none() && ipv6.is_none() {
                Err(EngineError::ResourceExhausted)
            } else {
                Ok(Paa { ipv4, ipv6 })
            }
        }
    }
}

/// Returns a previously allocated PAA to its pool(s). No-op on an empty
/// `Paa` (the `PdnType::Ipv4` / DHCP-not-implemented path never allocated).
pub fn free<P: Platform + ?Sized>(platform: &P, paa: Paa) {
    if let Some(ipv4) = paa.ipv4 {
        platform.paa_free_v4(ipv4);
    }
    if let Some(ipv6) = paa.ipv6 {
        platform.paa_free_v6(ipv6);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{S11Outbound, SgiOutbound};
    use crate::model::Pco;
    use crate::platform::KernelError;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakePlatform {
        v4: AtomicBool,
    }

    impl Platform for FakePlatform {
        fn kernel_tunnel_add(
            &self,
            _ue_v4: Option<Ipv4Addr>,
            _enb_v4: Option<Ipv4Addr>,
            _local_teid: u32,
            _remote_teid: u32,
        ) -> Result<(), KernelError> {
            Ok(())
        }

        fn kernel_tunnel_del(&self, _local_teid: u32, _remote_teid: u32) -> Result<(), KernelError> {
            Ok(())
        }

        fn paa_alloc_v4(&self) -> Option<Ipv4Addr> {
            if self.v4.load(Ordering::SeqCst) {
                Some(Ipv4Addr::new(10, 0, 0, 1))
            } else {
                None
            }
        }

        fn paa_free_v4(&self, _addr: Ipv4Addr) {}

        fn process_pco(&self, request: &Pco) -> (Pco, bool) {
            (request.clone(), true)
        }

        fn send_s11(&self, _message: S11Outbound) {}
        fn send_sgi(&self, _message: SgiOutbound) {}
    }

    #[test]
    fn ipv4_without_nas_signalling_stays_unassigned() {
        let platform = FakePlatform { v4: AtomicBool::new(true) };
        let paa = allocate(&platform, PdnType::Ipv4, false).unwrap();
        assert!(paa.is_empty());
    }

    #[test]
    fn ipv4_with_nas_signalling_allocates() {
        let platform = FakePlatform { v4: AtomicBool::new(true) };
        let paa = allocate(&platform, PdnType::Ipv4, true).unwrap();
        assert_eq!(paa.ipv4, Some(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn ipv6_is_unsupported_by_default() {
        let platform = FakePlatform { v4: AtomicBool::new(true) };
        let paa = allocate(&platform, PdnType::Ipv6, true).unwrap();
        assert_eq!(paa.ipv6, None::<Ipv6Addr>);
    }

    #[test]
    fn or_strategy_falls_back_to_v6_and_fails_if_both_absent() {
        let platform = FakePlatform { v4: AtomicBool::new(false) };
        let err = allocate(&platform, PdnType::Ipv4OrIpv6, true).unwrap_err();
        assert_eq!(err, EngineError::ResourceExhausted);
    }

    #[test]
    fn and_strategy_tolerates_partial_failure() {
        let platform = FakePlatform { v4: AtomicBool::new(true) };
        let paa = allocate(&platform, PdnType::Ipv4AndIpv6, true).unwrap();
        assert_eq!(paa.ipv4, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(paa.ipv6, None);
    }
}
