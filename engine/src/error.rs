use std::fmt;

/// Error kinds raised by the engine (§7). `Fatal` from the original
/// handler's unknown-`pdn_type` branch has no constructor here: `PdnType`
/// is an exhaustive enum, so every caller of the PAA coordinator already
/// handles every variant and that branch is unreachable by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// A request guard failed before any state was touched (§4.5.1).
    MalformedRequest,
    /// A lookup in the context store or a bearer map missed.
    ContextNotFound,
    /// The sender's F-TEID did not match the context's recorded peer (§4.5.3).
    InvalidPeer,
    /// The PAA pool collaborator could not satisfy an allocation (§4.4).
    ResourceExhausted,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for EngineError {}
