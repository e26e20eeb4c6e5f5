//! Decoded S11/GTP-U/SGi message shapes the engine consumes and emits.
//! Wire framing and IE encoding are the S11/GTP-U codec's concern (§6); these
//! structs are the engine's side of that contract.

use std::net::IpAddr;

use crate::model::{Ambr, ApnInUse, Cause, Fteid, FteidFlags, Paa, PdnType, Pco, Qos, RatType, Tft};

/// Operation-indication flags on a Delete Session Request. Only `oi` exists
/// in this subset, and per the original handler it is logged, never branched
/// on.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicationFlags {
    pub oi: bool,
}

#[derive(Debug, Clone)]
pub struct BearerContextToCreate {
    pub eps_bearer_id: u8,
    pub qos: Qos,
}

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub imsi: String,
    pub rat_type: RatType,
    pub apn: ApnInUse,
    pub pdn_type: PdnType,
    pub pco: Pco,
    pub sender_fteid_cp: Fteid,
    pub sender_fteid_flags: FteidFlags,
    pub trxn: u32,
    pub bearer_context: BearerContextToCreate,
}

#[derive(Debug, Clone)]
pub struct BearerContextCreated {
    pub eps_bearer_id: u8,
    pub s1u_sgw_fteid: Option<Fteid>,
    pub paa: Paa,
}

#[derive(Debug, Clone)]
pub struct CreateSessionResponse {
    pub cause: Cause,
    pub s11_sgw_teid: Fteid,
    pub trxn: u32,
    pub peer: IpAddr,
    pub bearer_created: Option<BearerContextCreated>,
    pub paa: Paa,
    pub pco: Pco,
    pub ambr: Option<Ambr>,
}

#[derive(Debug, Clone)]
pub struct ModifyBearerRequest {
    pub teid: u32,
    pub eps_bearer_id: u8,
    pub s1_enb_fteid: Fteid,
    pub trxn: u32,
}

#[derive(Debug, Clone)]
pub struct ModifyBearerResponse {
    pub cause: Cause,
    pub teid: u32,
    pub trxn: u32,
    pub bearers_marked_for_removal: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DeleteSessionRequest {
    pub teid: u32,
    pub sender_fteid_cp: Option<Fteid>,
    pub sender_fteid_flags: FteidFlags,
    pub linked_bearer_id: u8,
    pub trxn: u32,
    pub peer_ip: IpAddr,
    pub indication_flags: IndicationFlags,
}

#[derive(Debug, Clone)]
pub struct DeleteSessionResponse {
    pub cause: Cause,
    pub teid: u32,
    pub trxn: u32,
    pub peer_ip: IpAddr,
}

#[derive(Debug, Clone, Copy)]
pub struct ReleaseAccessBearersRequest {
    pub teid: u32,
}

#[derive(Debug, Clone)]
pub struct ReleaseAccessBearersResponse {
    pub cause: Cause,
    pub teid: u32,
    pub trxn: u32,
}

/// The demonstration Create-Bearer Request built by §4.5.5. Carried as one
/// outbound message; the S11 codec is responsible for encoding the TFT.
#[derive(Debug, Clone)]
pub struct CreateBearerRequest {
    pub linked_bearer_id: u8,
    pub trxn: u32,
    pub tft: Tft,
    pub qos: Qos,
    pub s1u_sgw_fteid: Fteid,
}

/// Every message the engine ever hands to the S11 peer task.
#[derive(Debug, Clone)]
pub enum S11Outbound {
    CreateSessionResponse(CreateSessionResponse),
    ModifyBearerResponse(ModifyBearerResponse),
    DeleteSessionResponse(DeleteSessionResponse),
    ReleaseAccessBearersResponse(ReleaseAccessBearersResponse),
    CreateBearerRequest(CreateBearerRequest),
}

/// Synthesized locally by §4.5.1 step 6 and consumed by §4.5.6. In a
/// deployment with a real GTP-U task this would instead arrive as a message
/// off the callback queue; modeling it as a direct call lets tests drive
/// §4.5.6 without one.
#[derive(Debug, Clone, Copy)]
pub struct GtpuCreateTunnelResponse {
    pub status_ok: bool,
    pub s1u_sgw_teid: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct GtpuUpdateTunnelResponse {
    pub status_ok: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SgiCreateEndPointResponse {
    pub status_ok: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SgiUpdateEndPointResponse {
    pub status_ok: bool,
}

/// Forwarded to the IP-forwarding collaborator by §4.5.9 once both the
/// context and the target bearer are confirmed present.
#[derive(Debug, Clone)]
pub struct SgiUpdateEndPointRequest {
    pub teid: u32,
    pub eps_bearer_id: u8,
}

#[derive(Debug, Clone)]
pub struct SgiDeleteEndPointRequest {
    pub sgw_s1u_teid: u32,
    pub pdn_type: PdnType,
    pub paa: Paa,
}

/// Every message the engine ever hands to the IP-forwarding task.
#[derive(Debug, Clone)]
pub enum SgiOutbound {
    UpdateEndPointRequest(SgiUpdateEndPointRequest),
}
