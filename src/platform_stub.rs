//! The standalone binary's collaborator set. There is no real GTP-U kernel
//! module, PCO negotiator, or S11/SGi wire task in scope (per spec
//! Non-goals); this wires up the simplest honest implementations of each
//! [`engine::Platform`] method so the engine runs end to end, grounded the
//! same way the teacher's `service` crate logs every dispatch it can't act
//! on further.

use std::net::Ipv4Addr;
use std::ops::RangeInclusive;

use engine::messages::{S11Outbound, SgiOutbound};
use engine::model::Pco;
use engine::{KernelError, Platform};
use parking_lot::Mutex;

/// A linear IPv4 address pool over the configured range. No reuse tracking
/// beyond a free-list: addresses are handed out in order and pushed back
/// onto the list on release, mirroring the allocator simplicity the engine
/// itself assumes of its PAA collaborator (§4.4).
struct AddressPool {
    free: Mutex<Vec<Ipv4Addr>>,
}

impl AddressPool {
    fn new(range: RangeInclusive<Ipv4Addr>) -> Self {
        let (start, end): (u32, u32) = ((*range.start()).into(), (*range.end()).into());
        let mut free: Vec<Ipv4Addr> = (start..=end).rev().map(Ipv4Addr::from).collect();
        free.truncate(free.len().min(65_536));
        Self { free: Mutex::new(free) }
    }

    fn alloc(&self) -> Option<Ipv4Addr> {
        self.free.lock().pop()
    }

    fn free(&self, addr: Ipv4Addr) {
        self.free.lock().push(addr);
    }
}

/// Default deployment-ready `Platform`: a real in-memory PAA pool, a
/// passthrough PCO negotiator, and log-only sinks standing in for the
/// kernel and the peer tasks this crate doesn't implement.
pub struct DefaultPlatform {
    v4_pool: AddressPool,
}

impl DefaultPlatform {
    pub fn new(v4_pool_start: Ipv4Addr, v4_pool_end: Ipv4Addr) -> Self {
        Self {
            v4_pool: AddressPool::new(v4_pool_start..=v4_pool_end),
        }
    }
}

impl Platform for DefaultPlatform {
    fn kernel_tunnel_add(
        &self,
        ue_v4: Option<Ipv4Addr>,
        enb_v4: Option<Ipv4Addr>,
        local_teid: u32,
        remote_teid: u32,
    ) -> Result<(), KernelError> {
        log::info!(
            "kernel tunnel add: ue={ue_v4:?} enb={enb_v4:?} local_teid={local_teid:#x} remote_teid={remote_teid:#x}"
        );
        Ok(())
    }

    fn kernel_tunnel_del(&self, local_teid: u32, remote_teid: u32) -> Result<(), KernelError> {
        log::info!("kernel tunnel del: local_teid={local_teid:#x} remote_teid={remote_teid:#x}");
        Ok(())
    }

    fn paa_alloc_v4(&self) -> Option<Ipv4Addr> {
        let addr = self.v4_pool.alloc();
        if addr.is_none() {
            log::warn!("PAA v4 pool exhausted");
        }
        addr
    }

    fn paa_free_v4(&self, addr: Ipv4Addr) {
        self.v4_pool.free(addr);
    }

    fn process_pco(&self, request: &Pco) -> (Pco, bool) {
        let nas_signalled = !request.0.is_empty();
        (request.clone(), nas_signalled)
    }

    fn send_s11(&self, message: S11Outbound) {
        log::info!("-> S11 {message:?}");
    }

    fn send_sgi(&self, message: SgiOutbound) {
        log::info!("-> SGi {message:?}");
    }
}
