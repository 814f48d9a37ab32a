//! The GUI-UDS server (spec §4.5): binds a Unix domain socket, accepts one
//! GUI client at a time, and runs a dedicated reader thread plus a
//! mutex-serialized writer shared with the broker and the extension-WS
//! thread's fan-out path.
//!
//! Grounded on the teacher's `ShiftServer::bind`/`handle_accept` (remove a
//! stale socket file, bind, loosen permissions) generalized from tokio's
//! `UnixListener` to `std::os::unix::net::UnixListener` per spec §5's
//! plain-OS-thread concurrency model.

use std::fs::Permissions;
use std::io::{self, ErrorKind};
use std::net::Shutdown;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use lotab_protocol::{read_frame, write_frame, FrameError};
use tracing::{error, info, warn};

use crate::broker::{Broker, FrameSink};
use crate::status_bar::StatusBarSink;

/// Write side of the single active GUI connection; serializes frames so
/// both the broker thread and the WS thread can call `send_frame` safely
/// (spec §4.5 "the implementation must serialize writes").
pub struct GuiConnection {
    stream: Mutex<UnixStream>,
}

impl FrameSink for GuiConnection {
    fn send_frame(&self, payload: &[u8]) -> io::Result<()> {
        let stream = self.stream.lock().unwrap();
        write_frame(&*stream, payload).map_err(frame_error_to_io)
    }
}

fn frame_error_to_io(err: FrameError) -> io::Error {
    match err {
        FrameError::Io(e) => e,
        other => io::Error::new(ErrorKind::Other, other.to_string()),
    }
}

pub struct GuiServer {
    path: PathBuf,
    listener: UnixListener,
    should_stop: Arc<AtomicBool>,
}

impl GuiServer {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bind the UDS socket at `path`, deleting any stale file first (spec §4.5).
    pub fn bind(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path)?;
        let _ = std::fs::set_permissions(&path, Permissions::from_mode(0o600));
        Ok(Self {
            path,
            listener,
            should_stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Spawn the accept loop on its own thread. Each accepted connection
    /// spawns its own reader thread and installs a [`GuiConnection`] as the
    /// broker's frame sink; re-accepts after a disconnect (spec §9 open
    /// question, resolved toward robustness per the spec's guidance).
    ///
    /// Borrows `&self` rather than consuming it: the listener is cloned
    /// into the accept thread so the caller keeps a handle to call
    /// [`GuiServer::stop`] on, since `stop` needs the socket path and the
    /// atomic flag that live on `self`.
    pub fn run(&self, broker: Arc<Broker>, status_bar: Arc<dyn StatusBarSink>) -> io::Result<JoinHandle<()>> {
        let listener = self.listener.try_clone()?;
        let should_stop = Arc::clone(&self.should_stop);
        Ok(std::thread::spawn(move || {
            loop {
                if should_stop.load(Ordering::Acquire) {
                    break;
                }
                match listener.accept() {
                    Ok((stream, _addr)) if should_stop.load(Ordering::Acquire) => {
                        // Our own wakeup connection from `stop()`; discard it.
                        drop(stream);
                        break;
                    }
                    Ok((stream, _addr)) => {
                        info!("GUI client connected");
                        let read_stream = match stream.try_clone() {
                            Ok(s) => s,
                            Err(err) => {
                                error!(%err, "failed to clone GUI socket for reader thread");
                                continue;
                            }
                        };
                        let connection = Arc::new(GuiConnection {
                            stream: Mutex::new(stream),
                        });
                        broker.set_gui_sink(Some(connection.clone()));
                        status_bar.set_gui_visible(true);
                        read_gui_messages(read_stream, &broker);
                        broker.set_gui_sink(None);
                        status_bar.set_gui_visible(false);
                        info!("GUI client disconnected");
                    }
                    Err(err) if should_stop.load(Ordering::Acquire) => {
                        debug_shutdown(err);
                        break;
                    }
                    Err(err) => {
                        error!(%err, "GUI accept failed");
                    }
                }
            }
        })
    }

    /// Half-close the listener so a thread blocked in `accept` wakes, per
    /// spec §4.5's `stop()` contract. Accepting sockets can't be interrupted
    /// by `shutdown`, so this also removes the socket file; any thread
    /// blocked on the *connection* socket is woken by [`stop_connection`].
    pub fn stop(&self) {
        self.should_stop.store(true, Ordering::Release);
        // `accept()` is not interrupted by unlinking the socket path, so wake
        // it with a throwaway connection before removing the file.
        if let Ok(stream) = UnixStream::connect(&self.path) {
            drop(stream);
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

fn debug_shutdown(err: io::Error) {
    warn!(%err, "GUI listener accept interrupted by shutdown");
}

/// Half-close a connected GUI socket so its blocked reader returns (spec
/// §4.5's `stop()`: "shutdown both directions, close FD").
pub fn stop_connection(stream: &UnixStream) {
    let _ = stream.shutdown(Shutdown::Both);
}

fn read_gui_messages(stream: UnixStream, broker: &Arc<Broker>) {
    loop {
        match read_frame(&stream) {
            Ok(payload) => match serde_json::from_slice::<lotab_protocol::Envelope>(&payload) {
                Ok(envelope) => broker.handle_gui_envelope(&envelope),
                Err(err) => warn!(%err, "dropping malformed GUI frame"),
            },
            Err(FrameError::Closed) => {
                info!("GUI connection closed cleanly");
                return;
            }
            Err(FrameError::Partial) => {
                warn!("GUI connection closed mid-frame");
                return;
            }
            Err(FrameError::TooLarge(len)) => {
                warn!(len, "GUI frame exceeded size ceiling, closing connection");
                return;
            }
            Err(FrameError::Io(err)) => {
                warn!(%err, "GUI read error, closing connection");
                return;
            }
        }
    }
}
