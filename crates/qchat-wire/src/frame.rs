use crate::header::HeaderTag;
use serde_json::Value;

/// A decoded framed message: tag, sender, and JSON payload.
///
/// `payload` is always `Value::Object` once it has passed through
/// [`crate::decode`]; callers that build a `Frame` by hand for
/// [`crate::encode`] must uphold that invariant themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: HeaderTag,
    pub sender: String,
    pub payload: Value,
}

impl Frame {
    pub fn new(header: HeaderTag, sender: impl Into<String>, payload: Value) -> Self {
        Self { header, sender: sender.into(), payload }
    }

    /// The payload as a JSON object, for handlers that need to read/mutate
    /// individual fields (e.g. stripping `sig`).
    pub fn payload_object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.payload.as_object()
    }

    pub fn payload_object_mut(&mut self) -> Option<&mut serde_json::Map<String, Value>> {
        self.payload.as_object_mut()
    }
}
