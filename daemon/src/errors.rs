//! Error types for the daemon's fatal-init path (spec §7, severity 1).
//!
//! Every other error kind in spec §7 (transport loss, malformed message,
//! resource exhaustion, identity mismatch) is handled locally at the point
//! it occurs — logged and absorbed — and never escapes as a `Result`; only
//! initialization failures propagate up to `main`, matching the teacher's
//! narrow, leaf-scoped use of `thiserror` (e.g. `auth::error::Error`,
//! `BindError`).

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("failed to bind GUI socket at {path}: {source}")]
    GuiSocketBind {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to bind extension WebSocket port {port}: {source}")]
    ExtensionPortBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

impl InitError {
    /// The process exit code callers should use for this failure (spec §6:
    /// "0 normal, non-zero on init failure").
    pub fn exit_code(&self) -> i32 {
        match self {
            InitError::Config(_) => 2,
            InitError::GuiSocketBind { .. } => 3,
            InitError::ExtensionPortBind { .. } => 4,
        }
    }
}
