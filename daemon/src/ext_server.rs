//! The extension-WS server (spec §4.6): a WebSocket endpoint for the
//! browser extension. The host-supplied WebSocket library (`tungstenite`,
//! out of scope per spec §1 beyond "a framed-stream WebSocket provider")
//! already reassembles fragmented frames, so this module only needs to
//! implement the LWS-style callback surface described in spec §4.6 in
//! terms of `tungstenite`'s blocking API: `Established` on handshake,
//! `Receive` on `ws.read()`, `ServerWritable` on the 100ms poll tick, and
//! `Closed` on disconnect or error.

use std::io::{self, ErrorKind};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{error, info, warn};
use tungstenite::handshake::server::{Request, Response};
use tungstenite::{Message, WebSocket};

use crate::broker::{Broker, ExtensionFrameOutcome};

/// The 100ms poll quantum from spec §4.6: how often the connection thread
/// wakes from a blocked read to check for a queued outbound message.
const POLL_QUANTUM: Duration = Duration::from_millis(100);

/// Header the browser extension uses to present its identity token during
/// the WS handshake (spec §4.7: "arrives as part of the WS handshake or an
/// initial identity frame; implementation-defined").
const IDENTITY_HEADER: &str = "x-lotab-browser-id";

pub struct ExtServer {
    listener: TcpListener,
    should_stop: Arc<AtomicBool>,
}

impl ExtServer {
    pub fn port(&self) -> u16 {
        self.listener.local_addr().map(|addr| addr.port()).unwrap_or(0)
    }

    pub fn bind(port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        Ok(Self {
            listener,
            should_stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Spawn the accept loop on its own thread; see [`GuiServer::run`] for
    /// why this borrows `&self` instead of consuming it.
    pub fn run(&self, broker: Arc<Broker>) -> io::Result<JoinHandle<()>> {
        let listener = self.listener.try_clone()?;
        let should_stop = Arc::clone(&self.should_stop);
        Ok(std::thread::spawn(move || {
            loop {
                if should_stop.load(Ordering::Acquire) {
                    break;
                }
                match listener.accept() {
                    Ok((stream, _addr)) if should_stop.load(Ordering::Acquire) => {
                        drop(stream);
                        break;
                    }
                    Ok((stream, _addr)) => {
                        info!("extension connected");
                        handle_connection(stream, &broker, &should_stop);
                        info!("extension disconnected");
                    }
                    Err(err) => {
                        error!(%err, "extension listener accept failed");
                    }
                }
            }
        }))
    }

    pub fn stop(&self) {
        self.should_stop.store(true, Ordering::Release);
        if let Ok(addr) = self.listener.local_addr() {
            if let Ok(stream) = TcpStream::connect(addr) {
                drop(stream);
            }
        }
    }
}

fn handle_connection(stream: TcpStream, broker: &Arc<Broker>, should_stop: &Arc<AtomicBool>) {
    let mut identity: Option<String> = None;
    let callback = |req: &Request, response: Response| {
        identity = req
            .headers()
            .get(IDENTITY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        Ok(response)
    };

    let mut ws = match tungstenite::accept_hdr(stream, callback) {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%err, "extension WS handshake failed");
            return;
        }
    };

    if let Err(err) = ws.get_ref().set_read_timeout(Some(POLL_QUANTUM)) {
        warn!(%err, "failed to set extension socket poll timeout");
    }

    // spec §4.6 `Established`: stash the session, arm the initial
    // AllTabsInfoRequest, request writeability.
    if let Err(err) = send_envelope(&mut ws, &lotab_protocol::wire::all_tabs_info_request_envelope()) {
        warn!(%err, "failed to send initial AllTabsInfoRequest");
        return;
    }

    loop {
        if should_stop.load(Ordering::Acquire) {
            let _ = ws.close(None);
            return;
        }
        match ws.read() {
            Ok(Message::Text(text)) => match broker.handle_extension_frame(identity.as_deref(), text.as_bytes()) {
                ExtensionFrameOutcome::Continue => {}
                ExtensionFrameOutcome::CloseConnection => {
                    let _ = ws.close(None);
                    return;
                }
            },
            Ok(Message::Close(_)) => return,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
            Ok(Message::Binary(_)) => warn!("ignoring unexpected binary frame from extension"),
            Err(tungstenite::Error::Io(ref io_err))
                if io_err.kind() == ErrorKind::WouldBlock || io_err.kind() == ErrorKind::TimedOut =>
            {
                // spec §4.6 `ServerWritable`: drain at most one pending message.
                if let Some(envelope) = broker.take_pending_ws_message() {
                    if let Err(err) = send_envelope(&mut ws, &envelope) {
                        warn!(%err, "failed to send pending message to extension");
                        return;
                    }
                }
            }
            Err(err) => {
                warn!(%err, "extension WS read error, closing session");
                return;
            }
        }
    }
}

fn send_envelope(
    ws: &mut WebSocket<TcpStream>,
    envelope: &lotab_protocol::Envelope,
) -> Result<(), tungstenite::Error> {
    let json = envelope
        .to_json()
        .map_err(|e| tungstenite::Error::Utf8(e.to_string()))?;
    ws.send(Message::Text(json))
}
