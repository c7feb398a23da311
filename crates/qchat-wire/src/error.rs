use thiserror::Error;

/// Frame-level decode/encode errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The 4-byte header tag did not match any known message type.
    #[error("unrecognized header tag: {0:?}")]
    BadHeader([u8; 4]),

    /// The sender field was not exactly 16 bytes, or decoded to non-UTF-8.
    #[error("malformed sender field")]
    BadSender,

    /// The sender name exceeds the 16-byte field it must fit in.
    #[error("sender name longer than 16 bytes")]
    OversizeSender,

    /// Fewer payload bytes were available than the length prefix declared.
    #[error("payload shorter than declared length")]
    ShortPayload,

    /// More bytes followed the payload than the length prefix declared.
    #[error("trailing bytes after declared payload length")]
    LongPayload,

    /// The payload did not parse as a JSON object.
    #[error("payload is not a valid JSON object: {0}")]
    BadJson(String),

    /// A string field expected to carry raw bytes via ISO-8859-1 contained a
    /// codepoint outside 0x00-0xFF.
    #[error("string is not valid ISO-8859-1")]
    NotLatin1,
}
