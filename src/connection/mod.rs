//! Handles that implement [`SqlHandle`](crate::interface::SqlHandle)
//! without a real database.

pub mod recording;

pub use recording::{CallKind, RecordedCall, RecordingHandle};
