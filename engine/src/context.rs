//! The context store (C2): subscriber contexts keyed by locally allocated
//! S11 TEID, with the tunnel-pair side computed as a view rather than stored
//! twice (§9).

use parking_lot::RwLock;

use crate::model::SubscriberCtx;
use crate::table::Table;

/// `{ local_teid, remote_teid }`, derived on demand from a stored
/// `SubscriberCtx` rather than kept in a second owning container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnelPair {
    pub local_teid: u32,
    pub remote_teid: u32,
}

/// Thread-safe mapping `s11_local_teid → SubscriberCtx`, one writer lock
/// serializing mutation, concurrent readers otherwise. This is the only
/// top-level shared mapping in the engine — there is no second lock to
/// order against it, which is how §5's "never lock two [mappings] at once"
/// holds trivially.
#[derive(Default)]
pub struct ContextStore {
    contexts: RwLock<Table<u32, SubscriberCtx>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly built context. Returns `false` (and leaves the
    /// store untouched) if `s11_local_teid` is already present — which, per
    /// invariant 1, should be impossible given a correctly functioning
    /// [`crate::ids::TeidAllocator`].
    ///
    /// # Test
    ///
    /// ```
    /// use sgw_engine::context::ContextStore;
    /// use sgw_engine::model::{ApnInUse, CreateSessionSnapshot, PdnConn, PdnType, Pco, RatType, SubscriberCtx};
    /// use std::net::{IpAddr, Ipv4Addr};
    ///
    /// fn sample_ctx(local_teid: u32) -> SubscriberCtx {
    ///     SubscriberCtx {
    ///         imsi: "001010000000001".into(),
    ///         imsi_authenticated: true,
    ///         s11_mme_teid: 0x11,
    ///         s11_local_teid: local_teid,
    ///         mme_s11_address: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
    ///         trxn: 0xA,
    ///         saved_create_request: CreateSessionSnapshot {
    ///             imsi: "001010000000001".into(),
    ///             rat_type: RatType::Eutran,
    ///             apn: ApnInUse::Named("internet".into()),
    ///             pdn_type: PdnType::Ipv4,
    ///             pco: Pco::default(),
    ///         },
    ///         pdn: PdnConn::new(ApnInUse::Named("internet".into()), 5),
    ///     }
    /// }
    ///
    /// let store = ContextStore::new();
    /// assert!(store.insert(sample_ctx(1)));
    /// assert!(!store.insert(sample_ctx(1)));
    /// assert!(store.contains(1));
    /// ```
    pub fn insert(&self, ctx: SubscriberCtx) -> bool {
        let mut contexts = self.contexts.write();
        if contexts.contains_key(&ctx.s11_local_teid) {
            return false;
        }
        contexts.insert(ctx.s11_local_teid, ctx);
        true
    }

    /// Run a closure with read access to a context, returning `None` if
    /// absent.
    pub fn with<R>(&self, local_teid: u32, f: impl FnOnce(&SubscriberCtx) -> R) -> Option<R> {
        let contexts = self.contexts.read();
        contexts.get(&local_teid).map(f)
    }

    /// Run a closure with mutable access to a context, returning `None` if
    /// absent.
    pub fn with_mut<R>(&self, local_teid: u32, f: impl FnOnce(&mut SubscriberCtx) -> R) -> Option<R> {
        let mut contexts = self.contexts.write();
        contexts.get_mut(&local_teid).map(f)
    }

    /// The derived tunnel pair for a context, or `None` if the context is
    /// absent (in which case, per invariant 4, no tunnel pair exists either).
    pub fn tunnel_pair(&self, local_teid: u32) -> Option<TunnelPair> {
        self.with(local_teid, |ctx| TunnelPair {
            local_teid: ctx.s11_local_teid,
            remote_teid: ctx.s11_mme_teid,
        })
    }

    /// Remove a context and everything it owns (invariant 7). Returns the
    /// removed context so the caller can free its bearers' PAA leases and
    /// tear down kernel tunnels.
    ///
    /// # Test
    ///
    /// ```
    /// use sgw_engine::context::ContextStore;
    /// use sgw_engine::model::{ApnInUse, CreateSessionSnapshot, PdnConn, PdnType, Pco, RatType, SubscriberCtx};
    /// use std::net::{IpAddr, Ipv4Addr};
    ///
    /// let ctx = SubscriberCtx {
    ///     imsi: "001010000000001".into(),
    ///     imsi_authenticated: true,
    ///     s11_mme_teid: 0x11,
    ///     s11_local_teid: 1,
    ///     mme_s11_address: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
    ///     trxn: 0xA,
    ///     saved_create_request: CreateSessionSnapshot {
    ///         imsi: "001010000000001".into(),
    ///         rat_type: RatType::Eutran,
    ///         apn: ApnInUse::Named("internet".into()),
    ///         pdn_type: PdnType::Ipv4,
    ///         pco: Pco::default(),
    ///     },
    ///     pdn: PdnConn::new(ApnInUse::Named("internet".into()), 5),
    /// };
    ///
    /// let store = ContextStore::new();
    /// store.insert(ctx);
    /// assert!(store.remove(1).is_some());
    /// assert!(store.remove(1).is_none());
    /// assert!(!store.contains(1));
    /// ```
    pub fn remove(&self, local_teid: u32) -> Option<SubscriberCtx> {
        self.contexts.write().remove(&local_teid)
    }

    pub fn contains(&self, local_teid: u32) -> bool {
        self.contexts.read().contains_key(&local_teid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApnInUse, CreateSessionSnapshot, PdnConn, PdnType, Pco, RatType};
    use std::net::{IpAddr, Ipv4Addr};

    fn sample_ctx(local_teid: u32, mme_teid: u32) -> SubscriberCtx {
        SubscriberCtx {
            imsi: "001010000000001".into(),
            imsi_authenticated: true,
            s11_mme_teid: mme_teid,
            s11_local_teid: local_teid,
            mme_s11_address: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            trxn: 0xA,
            saved_create_request: CreateSessionSnapshot {
                imsi: "001010000000001".into(),
                rat_type: RatType::Eutran,
                apn: ApnInUse::Named("internet".into()),
                pdn_type: PdnType::Ipv4,
                pco: Pco::default(),
            },
            pdn: PdnConn::new(ApnInUse::Named("internet".into()), 5),
        }
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let store = ContextStore::new();
        assert!(store.insert(sample_ctx(1, 0x11)));
        assert!(store.contains(1));
        assert_eq!(
            store.tunnel_pair(1),
            Some(TunnelPair {
                local_teid: 1,
                remote_teid: 0x11
            })
        );
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = ContextStore::new();
        assert!(store.insert(sample_ctx(1, 0x11)));
        assert!(!store.insert(sample_ctx(1, 0x22)));
    }

    #[test]
    fn remove_drops_both_the_context_and_its_derived_tunnel_pair() {
        let store = ContextStore::new();
        store.insert(sample_ctx(1, 0x11));
        assert!(store.remove(1).is_some());
        assert!(!store.contains(1));
        assert_eq!(store.tunnel_pair(1), None);
    }
}
