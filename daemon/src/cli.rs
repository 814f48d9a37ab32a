//! Command-line surface (spec §6). Carried as ambient stack with `clap`'s
//! derive macros even though spec §1 names CLI parsing as an external
//! collaborator relative to the original hand-rolled argv scan in
//! `original_source/daemon/main.c`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Info,
    Trace,
}

impl LogLevel {
    pub fn as_tracing_filter(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "lotabd", about = "Background daemon bridging a browser extension and a GUI client")]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Path to the GUI executable; the daemon spawns it but never interprets it.
    #[arg(long)]
    pub app_path: Option<PathBuf>,

    /// External tooling path, not interpreted by the broker.
    #[arg(long)]
    pub daemon_manifest_path: Option<PathBuf>,

    /// External tooling path, not interpreted by the broker.
    #[arg(long)]
    pub gui_manifest_path: Option<PathBuf>,

    /// Restricts the daemon to a single browser identity (spec §4.7).
    #[arg(long)]
    pub allowed_browser_id: Option<String>,

    /// Overrides the default `${HOME}/.lotab/config.toml` path.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// UDS socket path for the GUI transport.
    #[arg(long, default_value = "/tmp/lotab.sock")]
    pub gui_socket_path: PathBuf,

    /// TCP port for the extension WebSocket transport.
    #[arg(long, default_value_t = 8734)]
    pub ws_port: u16,
}
