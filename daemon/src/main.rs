//! `lotabd` binary entry point: parse the CLI, load config, bring the
//! engine up, block until signalled, tear down.
//!
//! Logging init follows the teacher's own `fmt()` + `EnvFilter` pattern
//! (see `app-framework/examples/minimal-gl/src/main.rs`), driven here by
//! `--loglevel` instead of `RUST_LOG` so the documented CLI flag of spec §6
//! is authoritative, falling back to the environment only if set.

use std::sync::{Arc, Condvar, Mutex};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use lotabd::cli::Cli;
use lotabd::config::Config;
use lotabd::engine::{Engine, EngineCreationInfo};
use lotabd::errors::InitError;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!(%err, "lotabd failed to start");
            std::process::exit(err.exit_code());
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.loglevel.as_tracing_filter()));
    let _ = fmt().with_env_filter(filter).try_init();
}

fn run(cli: Cli) -> Result<(), InitError> {
    let config_path = cli.config.clone().unwrap_or_else(lotabd::config::default_config_path);
    let config = Config::load(&config_path)?;
    info!(keybind = %config.ui_toggle_keybind, "configuration loaded");

    let mut engine = Engine::init(EngineCreationInfo {
        gui_socket_path: cli.gui_socket_path.clone(),
        ws_port: cli.ws_port,
        allowed_browser_id: cli.allowed_browser_id.clone(),
        app_path: cli.app_path.clone(),
        enable_statusbar: false,
    })?;

    engine.run()?;
    wait_for_shutdown_signal();
    engine.destroy();
    Ok(())
}

/// Blocks the main thread until SIGINT/SIGTERM arrives, then lets `run`
/// proceed to `engine.destroy()`. OS signal delivery itself is the kind of
/// OS integration spec §1 carves out as an external collaborator, but a
/// daemon needs a way to know it should stop; `ctrlc` installs the handler
/// and this just parks on a condvar it signals.
fn wait_for_shutdown_signal() {
    let pair = Arc::new((Mutex::new(false), Condvar::new()));
    let signalled = Arc::clone(&pair);
    let result = ctrlc::set_handler(move || {
        let (lock, cvar) = &*signalled;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    });
    if result.is_err() {
        error!("failed to install signal handler; shutdown must be triggered by process kill");
        return;
    }
    let (lock, cvar) = &*pair;
    let mut stopped = lock.lock().unwrap();
    while !*stopped {
        stopped = cvar.wait(stopped).unwrap();
    }
}
