//! Per-component error types. Each module owns the enum for its own
//! failure modes; this module only aggregates them for the boundary
//! where `main` needs a single `anyhow`-compatible error.

use thiserror::Error;

use crate::codec::CodecError;
use crate::dispatch::DispatchError;
use crate::registry::AdmitError;

/// Top-level error for the process bootstrap path (bind, listener setup).
/// Handler-level failures never surface here — they are handled inline
/// per spec's error taxonomy and reported over the wire, not propagated.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Admit(#[from] AdmitError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
