//! Hard-coded protocol values the original handlers inline directly. Kept
//! behind a configuration surface per §9 ("preserve them behind a
//! configuration surface so tests can lock current behavior but production
//! deployments can override") — defaults reproduce the spec's literal
//! demonstration values.

use std::net::{IpAddr, Ipv4Addr};

use crate::model::{Ambr, Qos, Tft};

/// Demonstration QoS/TFT for `sgw_no_pcef_create_dedicated_bearer` (§4.5.5).
#[derive(Debug, Clone, Copy)]
pub struct DedicatedBearerDefaults {
    pub qci: u8,
    pub pci: bool,
    pub priority_level: u8,
    pub pvi: bool,
    pub gbr_ul_bps: u64,
    pub gbr_dl_bps: u64,
    pub mbr_ul_bps: u64,
    pub mbr_dl_bps: u64,
    pub remote_port: u16,
}

impl DedicatedBearerDefaults {
    pub fn qos(&self) -> Qos {
        Qos {
            qci: self.qci,
            pci: self.pci,
            priority_level: self.priority_level,
            pvi: self.pvi,
            gbr_ul_bps: self.gbr_ul_bps,
            gbr_dl_bps: self.gbr_dl_bps,
            mbr_ul_bps: self.mbr_ul_bps,
            mbr_dl_bps: self.mbr_dl_bps,
        }
    }

    /// An uplink-only, single-filter TFT matching a remote UDP port. Real
    /// filter encoding is the S11 codec's concern (out of scope); this is
    /// the minimal opaque payload a test double can assert against.
    pub fn tft(&self) -> Tft {
        let [hi, lo] = self.remote_port.to_be_bytes();
        Tft(vec![0x01, hi, lo])
    }
}

impl Default for DedicatedBearerDefaults {
    fn default() -> Self {
        Self {
            qci: 5,
            pci: true,
            priority_level: 7,
            pvi: true,
            gbr_ul_bps: 32_000,
            gbr_dl_bps: 32_000,
            mbr_ul_bps: 48_000,
            mbr_dl_bps: 48_000,
            remote_port: 55_555,
        }
    }
}

/// The gateway's own addresses and default QoS figures (§6: `sgw.s11_ipv4`,
/// `sgw.s1u_ipv4`).
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub s11_address: IpAddr,
    pub s1u_address: IpAddr,
    pub default_ambr: Ambr,
    pub dedicated_bearer: DedicatedBearerDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            s11_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            s1u_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            default_ambr: Ambr {
                dl_bps: 100_000_000,
                ul_bps: 40_000_000,
            },
            dedicated_bearer: DedicatedBearerDefaults::default(),
        }
    }
}
