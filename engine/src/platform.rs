//! The contracts the engine invokes everything external through (§6): the
//! kernel-tunnel mediator, the PAA pool, the PCO processor, and the message
//! sinks toward the S11 peer task and the IP-forwarding task. One bundled
//! trait, implemented once per deployment, in the same shape as the
//! teacher's `ServiceHandler`.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::messages::{S11Outbound, SgiOutbound};
use crate::model::Pco;

/// Collaborator contracts a concrete deployment wires in. Every method here
/// corresponds to one external interface in §6; none of them are optional
/// in the sense of `ServiceHandler`'s no-op defaults, except the IPv6 PAA
/// path, which §4.4/Open-Question-4 require to stay an explicit
/// "unsupported" stub until a real pool exists.
pub trait Platform: Send + Sync {
    /// Install a GTP-U forwarding entry. `Err` is logged by the caller and
    /// never changes the S11 cause (§7, `KernelProgrammingFailure`).
    fn kernel_tunnel_add(
        &self,
        ue_v4: Option<Ipv4Addr>,
        enb_v4: Option<Ipv4Addr>,
        local_teid: u32,
        remote_teid: u32,
    ) -> Result<(), KernelError>;

    /// Remove a previously installed GTP-U forwarding entry.
    fn kernel_tunnel_del(&self, local_teid: u32, remote_teid: u32) -> Result<(), KernelError>;

    /// Allocate one IPv4 PDN address from the pool collaborator.
    fn paa_alloc_v4(&self) -> Option<Ipv4Addr>;

    /// Return a previously allocated IPv4 PDN address.
    fn paa_free_v4(&self, addr: Ipv4Addr);

    /// Allocate one IPv6 PDN address. Stubbed per Open Question 4: the
    /// default implementation always returns `None` ("unsupported"), not a
    /// synthesized address.
    fn paa_alloc_v6(&self) -> Option<Ipv6Addr> {
        None
    }

    /// Return a previously allocated IPv6 PDN address. No-op until a real
    /// pool exists.
    fn paa_free_v6(&self, _addr: Ipv6Addr) {}

    /// Run the PCO negotiation collaborator over a request PCO, returning
    /// the response PCO and whether NAS-based address signalling was
    /// requested.
    fn process_pco(&self, request: &Pco) -> (Pco, bool);

    /// Hand a message to the S11 peer task.
    fn send_s11(&self, message: S11Outbound);

    /// Hand a message to the IP-forwarding task.
    fn send_sgi(&self, message: SgiOutbound);
}

/// Negative result from the kernel-tunnel mediator (§6:
/// `gtp_kernel_tunnel_{add,del}` return negative on failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelError;

impl std::fmt::Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("kernel tunnel programming failed")
    }
}

impl std::error::Error for KernelError {}
