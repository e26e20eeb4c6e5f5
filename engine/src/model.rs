use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::table::Table;

/// S11/S1-U interface roles carried on an F-TEID, per 3GPP TS 29.274 §8.22.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceType {
    S11MmeGtpC,
    S11SgwGtpC,
    S1USgwGtpU,
    S1UEnbGtpU,
}

/// A fully-qualified TEID: the TEID value, the interface it terminates, and
/// the IP address it is reachable on.
#[derive(Debug, Clone, Copy)]
pub struct Fteid {
    pub teid: u32,
    pub interface: InterfaceType,
    pub ip: IpAddr,
}

/// Presence flags on a received F-TEID IE. The original protocol carries
/// separate "IPv4 present" / "IPv6 present" bits independent of whether the
/// IE itself was included at all; `None` here models "the IE was absent".
#[derive(Debug, Clone, Copy, Default)]
pub struct FteidFlags {
    pub ipv4_present: bool,
    pub ipv6_present: bool,
}

impl FteidFlags {
    /// Per §4.5.3: the sender presented an F-TEID IE iff either address
    /// family flag is set.
    pub fn any_present(&self) -> bool {
        self.ipv4_present || self.ipv6_present
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatType {
    Eutran,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdnType {
    Ipv4,
    Ipv6,
    Ipv4OrIpv6,
    Ipv4AndIpv6,
}

/// The S11 cause codes this engine ever emits (3GPP TS 29.274 §8.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    RequestAccepted,
    ContextNotFound,
    InvalidPeer,
    MPdnApnNotAllowed,
}

impl Cause {
    /// Numeric cause value where the spec or 3GPP assigns one. `MPdnApnNotAllowed`
    /// is a mobility-management cause from a different value space than the
    /// session-management causes and is left to the S11 codec to encode.
    pub fn value(self) -> Option<u16> {
        match self {
            Cause::RequestAccepted => Some(16),
            Cause::ContextNotFound => Some(64),
            Cause::InvalidPeer => Some(109),
            Cause::MPdnApnNotAllowed => None,
        }
    }
}

/// The APN in use on a PDN connection. Open Question 1: the original C
/// handler assigns a pointer to a string literal on the "absent" branch and a
/// heap duplicate on the "present" branch, so the two branches disagree on
/// ownership. This enum normalizes that into a single owned representation
/// with an explicit sentinel variant rather than a magic string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApnInUse {
    Named(String),
    None,
}

impl ApnInUse {
    pub fn as_str(&self) -> &str {
        match self {
            ApnInUse::Named(apn) => apn,
            ApnInUse::None => "NO APN",
        }
    }
}

impl std::fmt::Display for ApnInUse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// QoS parameters as carried on a bearer context (3GPP TS 29.274 §8.15).
#[derive(Debug, Clone, Copy)]
pub struct Qos {
    pub qci: u8,
    pub pci: bool,
    pub priority_level: u8,
    pub pvi: bool,
    pub gbr_ul_bps: u64,
    pub gbr_dl_bps: u64,
    pub mbr_ul_bps: u64,
    pub mbr_dl_bps: u64,
}

/// A per-bearer Aggregate Maximum Bit Rate, distinct from the per-PDN AMBR
/// stamped onto Create Session responses (§4.5.10).
#[derive(Debug, Clone, Copy)]
pub struct Ambr {
    pub dl_bps: u64,
    pub ul_bps: u64,
}

/// Opaque Traffic Flow Template. Filter encoding is the S11 codec's concern;
/// the engine only needs to carry it through unmodified.
#[derive(Debug, Clone)]
pub struct Tft(pub Vec<u8>);

/// Opaque Protocol Configuration Options payload. Parsing/encoding lives in
/// the external PCO-processor collaborator (§6); the engine treats it as a
/// blob it routes between the MME and that collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pco(pub Vec<u8>);

/// The PDN address assigned to the UE. Absent components are `None`; §4.4's
/// IPv4_AND_v6 strategy is the only path that can populate both.
#[derive(Debug, Clone, Copy, Default)]
pub struct Paa {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl Paa {
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }
}

/// One EPS bearer. `enb_s1u_teid == 0` means the eNB side has never been
/// (or is no longer) installed — there is no separate state enum, the spec
/// treats IDLE/ACTIVE as a predicate over this field.
#[derive(Debug, Clone)]
pub struct BearerEntry {
    pub eps_bearer_id: u8,
    pub qos: Qos,
    pub paa: Paa,
    pub sgw_s1u_teid: u32,
    pub enb_s1u_teid: u32,
    pub enb_s1u_address: Option<IpAddr>,
}

impl BearerEntry {
    pub fn new(eps_bearer_id: u8, qos: Qos) -> Self {
        Self {
            eps_bearer_id,
            qos,
            paa: Paa::default(),
            sgw_s1u_teid: 0,
            enb_s1u_teid: 0,
            enb_s1u_address: None,
        }
    }

    /// True once an eNB F-TEID has been installed by a Modify Bearer Request.
    pub fn is_active(&self) -> bool {
        self.enb_s1u_teid != 0
    }

    /// Reverts the eNB side to IDLE, keeping the S-GW side intact. Grounds
    /// both §4.5.4 (Release Access Bearers) and the original's
    /// `sgw_release_all_enb_related_information` sweep over every bearer in
    /// the PDN connection, not only the default one.
    pub fn clear_enb_side(&mut self) {
        self.enb_s1u_teid = 0;
        self.enb_s1u_address = None;
    }
}

/// A snapshot of the Create Session Request that opened a `SubscriberCtx`.
/// Immutable once populated (invariant 5) — late callbacks reference it by
/// shared borrow rather than re-copying pieces of it out.
#[derive(Debug, Clone)]
pub struct CreateSessionSnapshot {
    pub imsi: String,
    pub rat_type: RatType,
    pub apn: ApnInUse,
    pub pdn_type: PdnType,
    pub pco: Pco,
}

/// PDN connection state embedded exclusively within a `SubscriberCtx`.
#[derive(Debug, Clone)]
pub struct PdnConn {
    pub apn_in_use: ApnInUse,
    pub default_bearer_id: u8,
    pub bearers: Table<u8, BearerEntry>,
}

impl PdnConn {
    /// Pre-sized per §4.3: a PDN connection rarely carries more than a
    /// handful of dedicated bearers beyond the default one.
    const BEARER_CAPACITY: usize = 12;

    pub fn new(apn_in_use: ApnInUse, default_bearer_id: u8) -> Self {
        Self {
            apn_in_use,
            default_bearer_id,
            bearers: Table::with_capacity(Self::BEARER_CAPACITY),
        }
    }

    /// Resets every bearer's eNB side to IDLE. Used by Release Access
    /// Bearers (§4.5.4); see `BearerEntry::clear_enb_side`.
    pub fn clear_all_enb_sides(&mut self) {
        for bearer in self.bearers.values_mut() {
            bearer.clear_enb_side();
        }
    }
}

/// One active PDN session, keyed by `s11_local_teid` in the context store.
///
/// The tunnel-pair side the spec describes as a separate mapping
/// (`tunnels_by_teid`) is not stored again here: `s11_mme_teid` already
/// carries the remote half, so a `TunnelPair` is a cheap derived view
/// (see [`crate::context::TunnelPair`]) rather than a second owning
/// container — this is how invariant 4 ("both exist or neither") holds by
/// construction instead of by bookkeeping.
#[derive(Debug, Clone)]
pub struct SubscriberCtx {
    pub imsi: String,
    pub imsi_authenticated: bool,
    pub s11_mme_teid: u32,
    pub s11_local_teid: u32,
    pub mme_s11_address: IpAddr,
    pub trxn: u32,
    pub saved_create_request: CreateSessionSnapshot,
    pub pdn: PdnConn,
}
