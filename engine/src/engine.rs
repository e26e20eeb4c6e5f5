//! The S11 procedure handlers (C5) — the state machine described in §4.5.
//! Each public method corresponds to one named operation in that section;
//! private helpers correspond to the callback targets the request handlers
//! dispatch to directly, modeling the "emit request, await callback"
//! pattern synchronously so tests can drive every step without a real
//! GTP-U/SGi collaborator.

use std::net::IpAddr;

use crate::config::EngineConfig;
use crate::context::ContextStore;
use crate::error::EngineError;
use crate::ids::TeidAllocator;
use crate::messages::{
    BearerContextCreated, CreateBearerRequest, CreateSessionRequest, CreateSessionResponse,
    DeleteSessionRequest, DeleteSessionResponse, GtpuCreateTunnelResponse, GtpuUpdateTunnelResponse,
    ModifyBearerRequest, ModifyBearerResponse, ReleaseAccessBearersRequest,
    ReleaseAccessBearersResponse, S11Outbound, SgiCreateEndPointResponse, SgiDeleteEndPointRequest,
    SgiOutbound, SgiUpdateEndPointRequest, SgiUpdateEndPointResponse,
};
use crate::model::{
    BearerEntry, CreateSessionSnapshot, Cause, Fteid, InterfaceType, Paa, PdnConn, Pco, RatType,
    SubscriberCtx,
};
use crate::paa;
use crate::platform::Platform;

/// Owns the TEID allocator, the context store, and a handle on the platform
/// collaborators, and dispatches every S11/callback procedure against them.
pub struct Engine<P: Platform> {
    contexts: ContextStore,
    teids: TeidAllocator,
    platform: P,
    config: EngineConfig,
}

impl<P: Platform> Engine<P> {
    pub fn new(platform: P, config: EngineConfig) -> Self {
        Self {
            contexts: ContextStore::new(),
            teids: TeidAllocator::new(),
            platform,
            config,
        }
    }

    pub fn context_exists(&self, local_teid: u32) -> bool {
        self.contexts.contains(local_teid)
    }

    /// Access to the platform collaborator, mainly useful for tests that
    /// assert against a recording fake.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// A snapshotted copy of a bearer, for assertions in tests and admin
    /// tooling. Returns `None` if the context or the bearer is absent.
    pub fn bearer(&self, local_teid: u32, eps_bearer_id: u8) -> Option<BearerEntry> {
        self.contexts
            .with(local_teid, |ctx| ctx.pdn.bearers.get(&eps_bearer_id).cloned())
            .flatten()
    }

    fn s11_sgw_fteid(&self, teid: u32) -> Fteid {
        Fteid {
            teid,
            interface: InterfaceType::S11SgwGtpC,
            ip: self.config.s11_address,
        }
    }

    fn context_not_found_create_session_response(&self) -> CreateSessionResponse {
        CreateSessionResponse {
            cause: Cause::ContextNotFound,
            s11_sgw_teid: self.s11_sgw_fteid(0),
            trxn: 0,
            peer: self.config.s11_address,
            bearer_created: None,
            paa: Paa::default(),
            pco: Pco::default(),
            ambr: None,
        }
    }

    /// §4.5.1. Fails the guard before any state is installed if the sender
    /// F-TEID is both zero-valued and not tagged as the MME's control-plane
    /// interface (Open Question 2: this is a conjunction, so a zero TEID
    /// with the correct interface tag still passes).
    pub fn handle_create_session_request(&self, req: CreateSessionRequest) -> Result<(), EngineError> {
        log::debug!(
            "create session: imsi={}, ebi={}, trxn={:#x}",
            req.imsi,
            req.bearer_context.eps_bearer_id,
            req.trxn
        );

        if req.rat_type != RatType::Eutran {
            log::warn!("create session: rat_type is not EUTRAN, imsi={}", req.imsi);
        }

        if req.sender_fteid_cp.teid == 0 && req.sender_fteid_cp.interface != InterfaceType::S11MmeGtpC {
            return Err(EngineError::MalformedRequest);
        }

        let local_teid = self.teids.alloc_s11();

        let mut pdn = PdnConn::new(req.apn.clone(), req.bearer_context.eps_bearer_id);
        pdn.bearers.insert(
            req.bearer_context.eps_bearer_id,
            BearerEntry::new(req.bearer_context.eps_bearer_id, req.bearer_context.qos),
        );

        let ctx = SubscriberCtx {
            imsi: req.imsi.clone(),
            imsi_authenticated: true,
            s11_mme_teid: req.sender_fteid_cp.teid,
            s11_local_teid: local_teid,
            mme_s11_address: req.sender_fteid_cp.ip,
            trxn: req.trxn,
            saved_create_request: CreateSessionSnapshot {
                imsi: req.imsi,
                rat_type: req.rat_type,
                apn: req.apn,
                pdn_type: req.pdn_type,
                pco: req.pco,
            },
            pdn,
        };

        if !self.contexts.insert(ctx) {
            // Unreachable in practice: C1 never repeats a TEID within a
            // process lifetime (invariant 1).
            return Err(EngineError::MalformedRequest);
        }

        let gtpu_resp = GtpuCreateTunnelResponse {
            status_ok: true,
            s1u_sgw_teid: self.teids.alloc_s1u(),
        };
        self.on_gtpu_create_tunnel_response(local_teid, gtpu_resp);

        Ok(())
    }

    /// §4.5.2. On acceptance, triggers `sgw_no_pcef_create_dedicated_bearer`
    /// (§4.5.5) for the same TEID — grounded directly in the reference C
    /// handler's control flow, which calls the dedicated-bearer path only
    /// when the SGi-update step it just ran returned success.
    pub fn handle_modify_bearer_request(&self, req: ModifyBearerRequest) {
        log::debug!(
            "modify bearer: teid={:#x}, ebi={}, trxn={:#x}",
            req.teid,
            req.eps_bearer_id,
            req.trxn
        );

        let bearer_found = self.contexts.with_mut(req.teid, |ctx| {
            ctx.pdn.default_bearer_id = req.eps_bearer_id;
            ctx.trxn = req.trxn;
            if let Some(bearer) = ctx.pdn.bearers.get_mut(&req.eps_bearer_id) {
                bearer.enb_s1u_address = Some(req.s1_enb_fteid.ip);
                bearer.enb_s1u_teid = req.s1_enb_fteid.teid;
                true
            } else {
                false
            }
        });

        match bearer_found {
            None | Some(false) => {
                self.platform.send_s11(S11Outbound::ModifyBearerResponse(ModifyBearerResponse {
                    cause: Cause::ContextNotFound,
                    teid: req.teid,
                    trxn: req.trxn,
                    bearers_marked_for_removal: vec![req.eps_bearer_id],
                }));
            }
            Some(true) => {
                let accepted =
                    self.on_sgi_update_end_point_response(req.teid, SgiUpdateEndPointResponse { status_ok: true });
                if accepted {
                    self.create_dedicated_bearer(req.teid);
                }
            }
        }
    }

    /// §4.5.5. No-op if the context has since disappeared; does not insert
    /// a bearer entry for the new endpoint (deferred to the follow-up
    /// Modify, per §7's partial-failure policy exception).
    fn create_dedicated_bearer(&self, local_teid: u32) {
        let info = self.contexts.with(local_teid, |ctx| (ctx.pdn.default_bearer_id, ctx.trxn));
        let Some((default_bearer_id, trxn)) = info else {
            return;
        };

        let s1u_teid = self.teids.alloc_s1u();
        let req = CreateBearerRequest {
            linked_bearer_id: default_bearer_id,
            trxn,
            tft: self.config.dedicated_bearer.tft(),
            qos: self.config.dedicated_bearer.qos(),
            s1u_sgw_fteid: Fteid {
                teid: s1u_teid,
                interface: InterfaceType::S1USgwGtpU,
                ip: self.config.s1u_address,
            },
        };

        log::info!(
            "dedicated bearer: teid={:#x}, linked_bearer_id={}, s1u_teid={}",
            local_teid,
            default_bearer_id,
            s1u_teid
        );
        self.platform.send_s11(S11Outbound::CreateBearerRequest(req));
    }

    /// §4.5.3. The conjunction in the invalid-peer guard compares the
    /// sender's own F-TEID value (not the request's lookup TEID) against
    /// the context's recorded MME teid.
    pub fn handle_delete_session_request(&self, req: DeleteSessionRequest) {
        log::debug!(
            "delete session: teid={:#x}, lbi={}, trxn={:#x}",
            req.teid,
            req.linked_bearer_id,
            req.trxn
        );

        let mme_teid = self.contexts.with(req.teid, |ctx| ctx.s11_mme_teid);

        let Some(mme_teid) = mme_teid else {
            let teid = if req.sender_fteid_flags.any_present() {
                req.sender_fteid_cp.map(|f| f.teid).unwrap_or(0)
            } else {
                0
            };
            self.platform.send_s11(S11Outbound::DeleteSessionResponse(DeleteSessionResponse {
                cause: Cause::ContextNotFound,
                teid,
                trxn: req.trxn,
                peer_ip: req.peer_ip,
            }));
            return;
        };

        if req.sender_fteid_flags.any_present() {
            let sender_teid = req.sender_fteid_cp.map(|f| f.teid).unwrap_or(0);
            if sender_teid != mme_teid {
                self.platform.send_s11(S11Outbound::DeleteSessionResponse(DeleteSessionResponse {
                    cause: Cause::InvalidPeer,
                    teid: mme_teid,
                    trxn: req.trxn,
                    peer_ip: req.peer_ip,
                }));
                return;
            }
        }

        self.platform.send_s11(S11Outbound::DeleteSessionResponse(DeleteSessionResponse {
            cause: Cause::RequestAccepted,
            teid: mme_teid,
            trxn: req.trxn,
            peer_ip: req.peer_ip,
        }));

        let pdn_type = self.contexts.with(req.teid, |ctx| ctx.saved_create_request.pdn_type);
        let lbi_bearer = self
            .contexts
            .with(req.teid, |ctx| {
                ctx.pdn
                    .bearers
                    .get(&req.linked_bearer_id)
                    .map(|b| (b.sgw_s1u_teid, b.enb_s1u_teid, b.paa))
            })
            .flatten();

        match (pdn_type, lbi_bearer) {
            (Some(pdn_type), Some((sgw_teid, enb_teid, paa))) => {
                self.on_sgi_delete_end_point_request(
                    SgiDeleteEndPointRequest {
                        sgw_s1u_teid: sgw_teid,
                        pdn_type,
                        paa,
                    },
                    enb_teid,
                );
            }
            _ => {
                log::warn!(
                    "delete session: linked bearer {} not found, teid={:#x}",
                    req.linked_bearer_id,
                    req.teid
                );
            }
        }

        if let Some(removed) = self.contexts.remove(req.teid) {
            for bearer in removed.pdn.bearers.values() {
                paa::free(&self.platform, bearer.paa);
            }
        }
    }

    /// §4.5.4. Resets every bearer's eNB side, not only the default
    /// bearer's, per `PdnConn::clear_all_enb_sides`.
    pub fn handle_release_access_bearers_request(&self, req: ReleaseAccessBearersRequest) {
        log::debug!("release access bearers: teid={:#x}", req.teid);

        let info = self.contexts.with_mut(req.teid, |ctx| {
            ctx.pdn.clear_all_enb_sides();
            (ctx.s11_mme_teid, ctx.trxn)
        });

        match info {
            Some((mme_teid, trxn)) => {
                self.platform.send_s11(S11Outbound::ReleaseAccessBearersResponse(
                    ReleaseAccessBearersResponse {
                        cause: Cause::RequestAccepted,
                        teid: mme_teid,
                        trxn,
                    },
                ));
            }
            None => {
                self.platform.send_s11(S11Outbound::ReleaseAccessBearersResponse(
                    ReleaseAccessBearersResponse {
                        cause: Cause::ContextNotFound,
                        teid: 0,
                        trxn: 0,
                    },
                ));
            }
        }
    }

    /// §4.5.6. Populates the default bearer's S-GW TEID, runs PCO
    /// negotiation and PAA allocation, then proceeds to §4.5.10.
    fn on_gtpu_create_tunnel_response(&self, local_teid: u32, resp: GtpuCreateTunnelResponse) {
        let exists = self
            .contexts
            .with_mut(local_teid, |ctx| {
                let ebi = ctx.pdn.default_bearer_id;
                if let Some(bearer) = ctx.pdn.bearers.get_mut(&ebi) {
                    bearer.sgw_s1u_teid = resp.s1u_sgw_teid;
                }
            })
            .is_some();

        if !exists {
            self.platform
                .send_s11(S11Outbound::CreateSessionResponse(self.context_not_found_create_session_response()));
            return;
        }

        let found = self.contexts.with(local_teid, |ctx| {
            (ctx.saved_create_request.pco.clone(), ctx.saved_create_request.pdn_type)
        });

        let Some((pco_req, pdn_type)) = found else {
            // The context was removed (e.g. a racing Delete Session) between
            // the `with_mut` above and here.
            self.platform
                .send_s11(S11Outbound::CreateSessionResponse(self.context_not_found_create_session_response()));
            return;
        };

        let (resp_pco, nas_signalled) = self.platform.process_pco(&pco_req);
        let paa_result = paa::allocate(&self.platform, pdn_type, nas_signalled);

        let status_ok = match paa_result {
            Ok(assigned) => {
                self.contexts.with_mut(local_teid, |ctx| {
                    let ebi = ctx.pdn.default_bearer_id;
                    if let Some(bearer) = ctx.pdn.bearers.get_mut(&ebi) {
                        bearer.paa = assigned;
                    }
                });
                true
            }
            Err(err) => {
                log::error!("paa allocation failed: teid={:#x}, error={}", local_teid, err);
                false
            }
        };

        self.on_sgi_create_end_point_response(local_teid, SgiCreateEndPointResponse { status_ok }, resp_pco);
    }

    /// §4.5.7. Installs the kernel GTP-U tunnel on acceptance; a kernel
    /// failure is logged but never changes the S11 cause (§7).
    fn on_sgi_update_end_point_response(&self, local_teid: u32, resp: SgiUpdateEndPointResponse) -> bool {
        let found = self.contexts.with(local_teid, |ctx| {
            let ebi = ctx.pdn.default_bearer_id;
            ctx.pdn.bearers.get(&ebi).map(|b| {
                (
                    b.paa.ipv4,
                    b.enb_s1u_address,
                    b.sgw_s1u_teid,
                    b.enb_s1u_teid,
                    ctx.s11_mme_teid,
                    ctx.trxn,
                )
            })
        });

        match found {
            None => {
                self.platform.send_s11(S11Outbound::ModifyBearerResponse(ModifyBearerResponse {
                    cause: Cause::ContextNotFound,
                    teid: 0,
                    trxn: 0,
                    bearers_marked_for_removal: vec![],
                }));
                false
            }
            Some(None) => {
                let ebi = self.contexts.with(local_teid, |ctx| ctx.pdn.default_bearer_id).unwrap_or(0);
                self.platform.send_s11(S11Outbound::ModifyBearerResponse(ModifyBearerResponse {
                    cause: Cause::ContextNotFound,
                    teid: local_teid,
                    trxn: 0,
                    bearers_marked_for_removal: vec![ebi],
                }));
                false
            }
            Some(Some((ue_v4, enb_addr, sgw_teid, enb_teid, mme_teid, trxn))) => {
                if resp.status_ok {
                    let enb_v4 = match enb_addr {
                        Some(IpAddr::V4(v4)) => Some(v4),
                        _ => None,
                    };
                    if let Err(_err) = self.platform.kernel_tunnel_add(ue_v4, enb_v4, sgw_teid, enb_teid) {
                        log::warn!(
                            "kernel tunnel add failed: local_teid={}, remote_teid={}",
                            sgw_teid,
                            enb_teid
                        );
                    }
                }
                self.platform.send_s11(S11Outbound::ModifyBearerResponse(ModifyBearerResponse {
                    cause: Cause::RequestAccepted,
                    teid: mme_teid,
                    trxn,
                    bearers_marked_for_removal: vec![],
                }));
                true
            }
        }
    }

    /// §4.5.8, the mediator to C6. `enb_s1u_teid` is carried as an extra
    /// argument rather than on `SgiDeleteEndPointRequest` since the kernel
    /// interface (§6) needs both TEIDs but the forwarded message only
    /// documents `sgw_s1u_teid`/`pdn_type`/`paa`.
    fn on_sgi_delete_end_point_request(&self, req: SgiDeleteEndPointRequest, enb_s1u_teid: u32) {
        if let Err(_err) = self.platform.kernel_tunnel_del(req.sgw_s1u_teid, enb_s1u_teid) {
            log::warn!(
                "kernel tunnel del failed: local_teid={}, remote_teid={}",
                req.sgw_s1u_teid,
                enb_s1u_teid
            );
        }
    }

    /// §4.5.9. Not reached by `handle_modify_bearer_request` in this engine
    /// (which takes the synthesized shortcut straight to
    /// `on_sgi_update_end_point_response`, same as §4.5.1 step 6 bypasses a
    /// real GTP-U round trip) — kept as an independently callable,
    /// independently testable entry point for the non-shortcut flow.
    pub fn on_gtpu_update_tunnel_response(&self, local_teid: u32, _resp: GtpuUpdateTunnelResponse) {
        let found = self.contexts.with(local_teid, |ctx| {
            let ebi = ctx.pdn.default_bearer_id;
            (ebi, ctx.pdn.bearers.contains_key(&ebi))
        });

        match found {
            None => {
                self.platform.send_s11(S11Outbound::ModifyBearerResponse(ModifyBearerResponse {
                    cause: Cause::ContextNotFound,
                    teid: 0,
                    trxn: 0,
                    bearers_marked_for_removal: vec![],
                }));
            }
            Some((ebi, false)) => {
                self.platform.send_s11(S11Outbound::ModifyBearerResponse(ModifyBearerResponse {
                    cause: Cause::ContextNotFound,
                    teid: local_teid,
                    trxn: 0,
                    bearers_marked_for_removal: vec![ebi],
                }));
            }
            Some((ebi, true)) => {
                self.platform
                    .send_sgi(SgiOutbound::UpdateEndPointRequest(SgiUpdateEndPointRequest {
                        teid: local_teid,
                        eps_bearer_id: ebi,
                    }));
            }
        }
    }

    /// §4.5.10, terminal step of the create-session flow. "PCO copied into
    /// response and cleared from source": the negotiated response PCO here
    /// is always a fresh value returned by the PCO collaborator, never an
    /// alias into `saved_create_request.pco` — so the snapshot stays
    /// immutable (invariant 5) without a separate clear step.
    fn on_sgi_create_end_point_response(&self, local_teid: u32, resp: SgiCreateEndPointResponse, negotiated_pco: Pco) {
        let ctx_info = self
            .contexts
            .with(local_teid, |ctx| (ctx.s11_mme_teid, ctx.trxn, ctx.mme_s11_address, ctx.pdn.default_bearer_id));

        let Some((mme_teid, trxn, peer, ebi)) = ctx_info else {
            self.platform
                .send_s11(S11Outbound::CreateSessionResponse(self.context_not_found_create_session_response()));
            return;
        };

        if !resp.status_ok {
            self.platform.send_s11(S11Outbound::CreateSessionResponse(CreateSessionResponse {
                cause: Cause::MPdnApnNotAllowed,
                s11_sgw_teid: self.s11_sgw_fteid(local_teid),
                trxn,
                peer,
                bearer_created: None,
                paa: Paa::default(),
                pco: Pco::default(),
                ambr: None,
            }));
            return;
        }

        let (sgw_s1u_teid, paa) = self
            .contexts
            .with(local_teid, |ctx| {
                ctx.pdn
                    .bearers
                    .get(&ebi)
                    .map(|b| (b.sgw_s1u_teid, b.paa))
                    .unwrap_or((0, Paa::default()))
            })
            .unwrap_or((0, Paa::default()));

        self.platform.send_s11(S11Outbound::CreateSessionResponse(CreateSessionResponse {
            cause: Cause::RequestAccepted,
            s11_sgw_teid: self.s11_sgw_fteid(local_teid),
            trxn,
            peer,
            bearer_created: Some(BearerContextCreated {
                eps_bearer_id: ebi,
                s1u_sgw_fteid: Some(Fteid {
                    teid: sgw_s1u_teid,
                    interface: InterfaceType::S1USgwGtpU,
                    ip: self.config.s1u_address,
                }),
                paa,
            }),
            paa,
            pco: negotiated_pco,
            ambr: Some(self.config.default_ambr),
        }));
    }
}
