//! Wire protocol shared between the daemon, its extension transport and its
//! GUI transport: the framed codec, the JSON envelope shape, and the fixed
//! event-name translation tables.

pub mod codec;
pub mod translate;
pub mod wire;

pub use codec::{read_frame, write_frame, FrameError, MAX_FRAME_LEN};
pub use translate::{classify_extension_event, fans_out, InternalEventKind};
pub use wire::{event_names, Envelope};
