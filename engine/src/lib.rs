//! S-GW control-plane session and bearer engine.
//!
//! Implements the S11 procedures an LTE/EPC Serving Gateway runs against an
//! MME (3GPP TS 23.401/29.274, subset), mirrored to the user plane through
//! the [`platform::Platform`] collaborator contract. Wire codecs, the
//! GTP-U/SGi tasks, the PAA pool, and the PCO parser all live outside this
//! crate; [`Engine`] only holds the state machine, the context store, and
//! the TEID/PAA allocation policy that sit between them.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod ids;
pub mod messages;
pub mod model;
pub mod paa;
pub mod platform;
pub mod table;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use platform::{KernelError, Platform};
