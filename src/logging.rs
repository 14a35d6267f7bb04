//! Structured operator logging
//!
//! Flow output is emitted as `tracing` events. The [`LogKind`] is attached as
//! the `kind` field so a subscriber can render signatures, highlighted values
//! and errors differently.

use std::fmt;

use tracing_subscriber::EnvFilter;

/// Category of an operator-facing log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Normal,
    /// A transaction signature worth copying
    Signature,
    Details,
    Highlight,
    /// Headline of a flow section
    Spotlight,
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Normal => "normal",
            LogKind::Signature => "signature",
            LogKind::Details => "details",
            LogKind::Highlight => "highlight",
            LogKind::Spotlight => "spotlight",
            LogKind::Error => "error",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emit an operator-facing message
///
/// Everything but [`LogKind::Error`] goes out at `info`, so the default
/// filter shows every line; the `kind` field tells them apart.
pub fn report(kind: LogKind, message: impl fmt::Display) {
    let kind_field = kind.as_str();
    match kind {
        LogKind::Error => tracing::error!(kind = kind_field, "{}", message),
        _ => tracing::info!(kind = kind_field, "{}", message),
    }
}

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`)
///
/// Calling it twice is harmless; the second installation is ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
