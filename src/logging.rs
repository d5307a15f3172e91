//! Structured logging init. Sinking (file rotation, async drains) is out
//! of scope here — this crate only emits `tracing` events; where they end
//! up is an operator concern configured externally.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}
