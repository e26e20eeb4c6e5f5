//! The literal end-to-end scenarios (S1-S6), driven against a fake
//! in-memory `Platform` that records every dispatched message — the same
//! shape as the teacher's hand-written test `Handler` in
//! `crates/service/tests/turn.rs`.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use sgw_engine::config::EngineConfig;
use sgw_engine::engine::Engine;
use sgw_engine::messages::{
    BearerContextToCreate, CreateSessionRequest, DeleteSessionRequest, IndicationFlags,
    ModifyBearerRequest, ReleaseAccessBearersRequest, S11Outbound, SgiOutbound,
};
use sgw_engine::model::{ApnInUse, Cause, Fteid, FteidFlags, InterfaceType, PdnType, Pco, Qos, RatType};
use sgw_engine::platform::{KernelError, Platform};

struct FakePlatform {
    s11_sent: Mutex<Vec<S11Outbound>>,
    sgi_sent: Mutex<Vec<SgiOutbound>>,
    kernel_adds: Mutex<Vec<(Option<Ipv4Addr>, Option<Ipv4Addr>, u32, u32)>>,
    kernel_dels: Mutex<Vec<(u32, u32)>>,
    next_v4_octet: AtomicU32,
}

impl FakePlatform {
    fn new() -> Self {
        Self {
            s11_sent: Mutex::new(Vec::new()),
            sgi_sent: Mutex::new(Vec::new()),
            kernel_adds: Mutex::new(Vec::new()),
            kernel_dels: Mutex::new(Vec::new()),
            next_v4_octet: AtomicU32::new(1),
        }
    }

    fn last_s11(&self) -> S11Outbound {
        self.s11_sent.lock().last().cloned().expect("no S11 message was sent")
    }
}

impl Platform for FakePlatform {
    fn kernel_tunnel_add(
        &self,
        ue_v4: Option<Ipv4Addr>,
        enb_v4: Option<Ipv4Addr>,
        local_teid: u32,
        remote_teid: u32,
    ) -> Result<(), KernelError> {
        self.kernel_adds.lock().push((ue_v4, enb_v4, local_teid, remote_teid));
        Ok(())
    }

    fn kernel_tunnel_del(&self, local_teid: u32, remote_teid: u32) -> Result<(), KernelError> {
        self.kernel_dels.lock().push((local_teid, remote_teid));
        Ok(())
    }

    fn paa_alloc_v4(&self) -> Option<Ipv4Addr> {
        let octet = self.next_v4_octet.fetch_add(1, Ordering::SeqCst);
        Some(Ipv4Addr::new(10, 0, 0, octet as u8))
    }

    fn paa_free_v4(&self, _addr: Ipv4Addr) {}

    fn process_pco(&self, request: &Pco) -> (Pco, bool) {
        (request.clone(), true)
    }

    fn send_s11(&self, message: S11Outbound) {
        self.s11_sent.lock().push(message);
    }

    fn send_sgi(&self, message: SgiOutbound) {
        self.sgi_sent.lock().push(message);
    }
}

fn sample_qos() -> Qos {
    Qos {
        qci: 9,
        pci: false,
        priority_level: 8,
        pvi: false,
        gbr_ul_bps: 0,
        gbr_dl_bps: 0,
        mbr_ul_bps: 50_000_000,
        mbr_dl_bps: 100_000_000,
    }
}

fn create_session_request(mme_teid: u32, trxn: u32) -> CreateSessionRequest {
    CreateSessionRequest {
        imsi: "001010000000001".into(),
        rat_type: RatType::Eutran,
        apn: ApnInUse::Named("internet".into()),
        pdn_type: PdnType::Ipv4,
        pco: Pco::default(),
        sender_fteid_cp: Fteid {
            teid: mme_teid,
            interface: InterfaceType::S11MmeGtpC,
            ip: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
        },
        sender_fteid_flags: FteidFlags {
            ipv4_present: true,
            ipv6_present: false,
        },
        trxn,
        bearer_context: BearerContextToCreate {
            eps_bearer_id: 5,
            qos: sample_qos(),
        },
    }
}

/// S1: Create Session installs a context at local_teid=1, a default bearer
/// at EBI=5 with sgw_s1u_teid=1, and a REQUEST_ACCEPTED response carrying
/// the spec's hard-coded AMBR.
#[test]
fn s1_create_session() {
    let platform = FakePlatform::new();
    let engine = Engine::new(platform, EngineConfig::default());

    engine.handle_create_session_request(create_session_request(0x11, 0xA)).unwrap();

    assert!(engine.context_exists(1));
    let bearer = engine.bearer(1, 5).expect("default bearer must exist");
    assert_eq!(bearer.sgw_s1u_teid, 1);

    match engine.platform().last_s11() {
        S11Outbound::CreateSessionResponse(resp) => {
            assert_eq!(resp.cause, Cause::RequestAccepted);
            assert_eq!(resp.s11_sgw_teid.teid, 1);
            let ambr = resp.ambr.expect("ambr must be set on acceptance");
            assert_eq!(ambr.dl_bps, 100_000_000);
            assert_eq!(ambr.ul_bps, 40_000_000);
        }
        other => panic!("expected CreateSessionResponse, got {:?}", other),
    }
}

/// S2: following S1, Modify Bearer installs the eNB side, programs the
/// kernel tunnel with the UE's allocated PAA and the eNB's address/TEID,
/// and triggers the dedicated-bearer Create-Bearer-Request.
#[test]
fn s2_modify_bearer_after_create() {
    let platform = FakePlatform::new();
    let engine = Engine::new(platform, EngineConfig::default());
    engine.handle_create_session_request(create_session_request(0x11, 0xA)).unwrap();

    let ue_v4 = engine.bearer(1, 5).unwrap().paa.ipv4.expect("paa must be allocated");

    engine.handle_modify_bearer_request(ModifyBearerRequest {
        teid: 1,
        eps_bearer_id: 5,
        s1_enb_fteid: Fteid {
            teid: 0xE1,
            interface: InterfaceType::S1UEnbGtpU,
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
        },
        trxn: 0xB,
    });

    assert_eq!(
        engine.platform().kernel_adds.lock().last(),
        Some(&(Some(ue_v4), Some(Ipv4Addr::new(10, 0, 0, 2)), 1, 0xE1))
    );

    let sent = engine.platform().s11_sent.lock().clone();
    let modify_resp = sent
        .iter()
        .find_map(|m| match m {
            S11Outbound::ModifyBearerResponse(r) => Some(r.clone()),
            _ => None,
        })
        .expect("a ModifyBearerResponse must have been sent");
    assert_eq!(modify_resp.cause, Cause::RequestAccepted);
    assert_eq!(modify_resp.trxn, 0xB);

    let create_bearer_req = sent
        .iter()
        .find_map(|m| match m {
            S11Outbound::CreateBearerRequest(r) => Some(r.clone()),
            _ => None,
        })
        .expect("a CreateBearerRequest must have been emitted");
    assert_eq!(create_bearer_req.linked_bearer_id, 5);
    assert_eq!(create_bearer_req.s1u_sgw_fteid.teid, 2);
}

/// S3: Modify Bearer on an unknown TEID returns CONTEXT_NOT_FOUND and
/// echoes the requested EBI.
#[test]
fn s3_modify_bearer_unknown_teid() {
    let platform = FakePlatform::new();
    let engine = Engine::new(platform, EngineConfig::default());

    engine.handle_modify_bearer_request(ModifyBearerRequest {
        teid: 999,
        eps_bearer_id: 5,
        s1_enb_fteid: Fteid {
            teid: 0xE1,
            interface: InterfaceType::S1UEnbGtpU,
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
        },
        trxn: 0xB,
    });

    match engine.platform().last_s11() {
        S11Outbound::ModifyBearerResponse(resp) => {
            assert_eq!(resp.cause, Cause::ContextNotFound);
            assert_eq!(resp.bearers_marked_for_removal, vec![5]);
        }
        other => panic!("expected ModifyBearerResponse, got {:?}", other),
    }
}

/// S4: Delete Session with a matching sender F-TEID tears the context down
/// and removes the kernel tunnel.
#[test]
fn s4_delete_session_matching_peer() {
    let platform = FakePlatform::new();
    let engine = Engine::new(platform, EngineConfig::default());
    engine.handle_create_session_request(create_session_request(0x11, 0xA)).unwrap();
    engine.handle_modify_bearer_request(ModifyBearerRequest {
        teid: 1,
        eps_bearer_id: 5,
        s1_enb_fteid: Fteid {
            teid: 0xE1,
            interface: InterfaceType::S1UEnbGtpU,
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
        },
        trxn: 0xB,
    });

    engine.handle_delete_session_request(DeleteSessionRequest {
        teid: 1,
        sender_fteid_cp: Some(Fteid {
            teid: 0x11,
            interface: InterfaceType::S11MmeGtpC,
            ip: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
        }),
        sender_fteid_flags: FteidFlags {
            ipv4_present: true,
            ipv6_present: true,
        },
        linked_bearer_id: 5,
        trxn: 0xC,
        peer_ip: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
        indication_flags: IndicationFlags::default(),
    });

    assert_eq!(engine.platform().kernel_dels.lock().last(), Some(&(1, 0xE1)));
    match engine.platform().last_s11() {
        S11Outbound::DeleteSessionResponse(resp) => {
            assert_eq!(resp.cause, Cause::RequestAccepted);
            assert_eq!(resp.teid, 0x11);
        }
        other => panic!("expected DeleteSessionResponse, got {:?}", other),
    }
    assert!(!engine.context_exists(1));
}

/// S5: Delete Session with a mismatched sender F-TEID is rejected and the
/// context survives.
#[test]
fn s5_delete_session_peer_mismatch() {
    let platform = FakePlatform::new();
    let engine = Engine::new(platform, EngineConfig::default());
    engine.handle_create_session_request(create_session_request(0x11, 0xA)).unwrap();

    engine.handle_delete_session_request(DeleteSessionRequest {
        teid: 1,
        sender_fteid_cp: Some(Fteid {
            teid: 0x99,
            interface: InterfaceType::S11MmeGtpC,
            ip: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
        }),
        sender_fteid_flags: FteidFlags {
            ipv4_present: true,
            ipv6_present: true,
        },
        linked_bearer_id: 5,
        trxn: 0xC,
        peer_ip: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
        indication_flags: IndicationFlags::default(),
    });

    match engine.platform().last_s11() {
        S11Outbound::DeleteSessionResponse(resp) => {
            assert_eq!(resp.cause, Cause::InvalidPeer);
            assert_eq!(resp.teid, 0x11);
        }
        other => panic!("expected DeleteSessionResponse, got {:?}", other),
    }
    assert!(engine.context_exists(1));
}

/// S6: Release Access Bearers after a Modify Bearer zeroes the eNB side
/// while leaving the S-GW side untouched.
#[test]
fn s6_release_access_bearers_after_modify() {
    let platform = FakePlatform::new();
    let engine = Engine::new(platform, EngineConfig::default());
    engine.handle_create_session_request(create_session_request(0x11, 0xA)).unwrap();
    engine.handle_modify_bearer_request(ModifyBearerRequest {
        teid: 1,
        eps_bearer_id: 5,
        s1_enb_fteid: Fteid {
            teid: 0xE1,
            interface: InterfaceType::S1UEnbGtpU,
            ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
        },
        trxn: 0xB,
    });
    let sgw_s1u_teid_before = engine.bearer(1, 5).unwrap().sgw_s1u_teid;

    engine.handle_release_access_bearers_request(ReleaseAccessBearersRequest { teid: 1 });

    let bearer = engine.bearer(1, 5).unwrap();
    assert_eq!(bearer.enb_s1u_teid, 0);
    assert_eq!(bearer.enb_s1u_address, None);
    assert_eq!(bearer.sgw_s1u_teid, sgw_s1u_teid_before);

    match engine.platform().last_s11() {
        S11Outbound::ReleaseAccessBearersResponse(resp) => {
            assert_eq!(resp.cause, Cause::RequestAccepted);
        }
        other => panic!("expected ReleaseAccessBearersResponse, got {:?}", other),
    }
}
