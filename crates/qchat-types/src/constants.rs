//! Wire-level size constants shared by the codec, connection, and directory.

/// Length in bytes of a frame's header tag (e.g. `MSSG`, `QCHT`).
pub const HEADER_LENGTH: usize = 4;

/// Length in bytes of the left-NUL-padded sender field.
pub const MAX_SENDER_LENGTH: usize = 16;

/// Length in bytes of the big-endian payload length prefix.
pub const PAYLOAD_LENGTH_LENGTH: usize = 4;

/// Length in bytes of an AES-GCM message key derived via QKD.
pub const MESSAGE_KEY_LENGTH: usize = 16;
