//! The framed wire format shared by the GUI UDS transport and the
//! broker-to-extension handoff: a 4-byte little-endian length prefix
//! followed by that many bytes of UTF-8 JSON payload.
//!
//! The WebSocket transport does not use this codec directly (it relies on
//! the WebSocket library's own framing) but payloads carried over either
//! transport share the same `{event, data}` JSON shape.

use std::io::{self, Read, Write};

/// Frames larger than this are rejected outright; the protocol has no
/// legitimate payload anywhere near this size.
pub const MAX_FRAME_LEN: u32 = 64 * 1024;

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("peer closed the connection")]
    Closed,
    #[error("connection closed mid-frame")]
    Partial,
    #[error("frame length {0} exceeds the {MAX_FRAME_LEN} byte ceiling")]
    TooLarge(u32),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Encode `payload` as `[u32 little-endian length][payload]`.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Write a single frame atomically (one `write_all` call covering header and body).
pub fn write_frame<W: Write>(mut w: W, payload: &[u8]) -> Result<(), FrameError> {
    w.write_all(&encode(payload))?;
    Ok(())
}

/// Read exactly one frame: a 4-byte length header then that many payload bytes.
///
/// Distinguishes a clean close (zero bytes read for the header) from a
/// close mid-frame (header or body partially read), and rejects any
/// length above [`MAX_FRAME_LEN`] before attempting to allocate for it.
pub fn read_frame<R: Read>(mut r: R) -> Result<Vec<u8>, FrameError> {
    let mut len_buf = [0u8; 4];
    match read_exact_or_eof(&mut r, &mut len_buf)? {
        FillResult::Eof => return Err(FrameError::Closed),
        FillResult::Partial => return Err(FrameError::Partial),
        FillResult::Full => {}
    }
    let len = u32::from_le_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }
    let mut payload = vec![0u8; len as usize];
    match read_exact_or_eof(&mut r, &mut payload)? {
        FillResult::Eof | FillResult::Partial => return Err(FrameError::Partial),
        FillResult::Full => {}
    }
    Ok(payload)
}

enum FillResult {
    Full,
    Partial,
    Eof,
}

/// Like `Read::read_exact`, but reports whether zero bytes were ever read
/// (a clean close) versus a close after some bytes arrived (a partial frame).
fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<FillResult> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                return Ok(if filled == 0 {
                    FillResult::Eof
                } else {
                    FillResult::Partial
                });
            }
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(FillResult::Full)
}
