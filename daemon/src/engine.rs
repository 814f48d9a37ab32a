//! Engine lifecycle (spec §5): `init` brings up both transport servers and
//! the broker, `run` blocks the calling thread until asked to stop, and
//! `destroy` tears everything down in the order spec §5 prescribes.
//!
//! Grounded on the teacher's `ShiftServer` construction/shutdown sequence in
//! `server_layer::server`, generalized from a single `tokio::select!` loop
//! to explicit thread handles per spec §5's OS-thread model.

use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::broker::Broker;
use crate::errors::InitError;
use crate::ext_server::ExtServer;
use crate::gui_server::GuiServer;
use crate::status_bar::{NoStatusBar, StatusBarSink};

/// Mirrors the original source's `EngineCreationInfo { port, enable_statusbar }`.
pub struct EngineCreationInfo {
    pub gui_socket_path: PathBuf,
    pub ws_port: u16,
    pub allowed_browser_id: Option<String>,
    pub app_path: Option<PathBuf>,
    pub enable_statusbar: bool,
}

const UDS_BIND_RETRIES: u32 = 5;
const UDS_BIND_BACKOFF: Duration = Duration::from_secs(1);

pub struct Engine {
    broker: Arc<Broker>,
    gui_server: GuiServer,
    ext_server: ExtServer,
    gui_process: Option<Child>,
    gui_thread: Option<JoinHandle<()>>,
    ext_thread: Option<JoinHandle<()>>,
    status_bar: Arc<dyn StatusBarSink>,
    destroyed: AtomicBool,
}

impl Engine {
    /// Bring up the broker and both transport servers. A previous daemon
    /// instance may still be releasing the UDS path, so the bind is retried
    /// up to `UDS_BIND_RETRIES` times with `UDS_BIND_BACKOFF` between
    /// attempts (spec §5 "UDS connect retries five times with 1s back-off
    /// at startup") before the bind is treated as a fatal init failure.
    pub fn init(info: EngineCreationInfo) -> Result<Self, InitError> {
        let gui_server = bind_gui_socket_with_retry(&info.gui_socket_path)?;
        let ext_server = ExtServer::bind(info.ws_port).map_err(|source| InitError::ExtensionPortBind {
            port: info.ws_port,
            source,
        })?;
        let gui_process = spawn_gui_process(info.app_path.as_deref());

        if info.enable_statusbar {
            info!("status-bar integration requested; no OS backend is wired, notifications are a no-op");
        }

        let broker = Arc::new(Broker::new(info.allowed_browser_id));

        Ok(Self {
            broker,
            gui_server,
            ext_server,
            gui_process,
            gui_thread: None,
            ext_thread: None,
            status_bar: Arc::new(NoStatusBar),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Start both transport-server threads. The calling thread is not
    /// blocked; call [`Engine::destroy`] to wait for shutdown. Each server
    /// keeps its listener (the accept thread works off a cloned fd), so
    /// `self.gui_server`/`self.ext_server` remain valid for `stop()` calls
    /// during `destroy`.
    pub fn run(&mut self) -> Result<(), InitError> {
        let broker = Arc::clone(&self.broker);
        self.gui_thread = Some(
            self.gui_server
                .run(Arc::clone(&broker), Arc::clone(&self.status_bar))
                .map_err(|source| InitError::GuiSocketBind {
                    path: self.gui_server.path().to_path_buf(),
                    source,
                })?,
        );
        self.ext_thread = Some(self.ext_server.run(broker).map_err(|source| InitError::ExtensionPortBind {
            port: self.ext_server.port(),
            source,
        })?);

        info!("engine running");
        Ok(())
    }

    /// Tear down in the order spec §5 prescribes: GUI process, then the WS
    /// service (wake + join), then the UDS reader (wake + join), then the
    /// stores are dropped with this struct. Idempotent via `destroyed`.
    pub fn destroy(&mut self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(mut child) = self.gui_process.take() {
            if let Err(err) = child.kill() {
                warn!(%err, "failed to terminate spawned GUI process");
            }
            let _ = child.wait();
        }

        self.ext_server.stop();
        if let Some(handle) = self.ext_thread.take() {
            if handle.join().is_err() {
                error!("extension WS thread panicked during shutdown");
            }
        }

        self.gui_server.stop();
        if let Some(handle) = self.gui_thread.take() {
            if handle.join().is_err() {
                error!("GUI UDS thread panicked during shutdown");
            }
        }

        info!("engine destroyed");
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn bind_gui_socket_with_retry(path: &PathBuf) -> Result<GuiServer, InitError> {
    let mut last_err = None;
    for attempt in 0..UDS_BIND_RETRIES {
        match GuiServer::bind(path) {
            Ok(server) => return Ok(server),
            Err(err) => {
                warn!(attempt, %err, "GUI socket bind failed, retrying");
                last_err = Some(err);
                std::thread::sleep(UDS_BIND_BACKOFF);
            }
        }
    }
    Err(InitError::GuiSocketBind {
        path: path.clone(),
        source: last_err.expect("loop runs at least once"),
    })
}

fn spawn_gui_process(app_path: Option<&std::path::Path>) -> Option<Child> {
    let path = app_path?;
    match Command::new(path).spawn() {
        Ok(child) => Some(child),
        Err(err) => {
            warn!(%err, path = %path.display(), "failed to spawn GUI process");
            None
        }
    }
}
