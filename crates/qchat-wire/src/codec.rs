use crate::error::WireError;
use crate::frame::Frame;
use crate::header::HeaderTag;
use qchat_types::{HEADER_LENGTH, MAX_SENDER_LENGTH, PAYLOAD_LENGTH_LENGTH};
use serde_json::Value;

/// Encodes a frame into its wire representation.
///
/// Fails with [`WireError::OversizeSender`] if `frame.sender` is longer than
/// [`MAX_SENDER_LENGTH`] bytes, or [`WireError::BadJson`] if the payload is
/// not a JSON object.
pub fn encode(frame: &Frame) -> Result<Vec<u8>, WireError> {
    let sender_bytes = frame.sender.as_bytes();
    if sender_bytes.len() > MAX_SENDER_LENGTH {
        return Err(WireError::OversizeSender);
    }
    if !frame.payload.is_object() {
        return Err(WireError::BadJson("payload is not a JSON object".to_string()));
    }

    let mut padded_sender = vec![0u8; MAX_SENDER_LENGTH - sender_bytes.len()];
    padded_sender.extend_from_slice(sender_bytes);

    let payload_bytes =
        serde_json::to_vec(&frame.payload).map_err(|e| WireError::BadJson(e.to_string()))?;

    let mut out = Vec::with_capacity(
        HEADER_LENGTH + MAX_SENDER_LENGTH + PAYLOAD_LENGTH_LENGTH + payload_bytes.len(),
    );
    out.extend_from_slice(frame.header.as_bytes());
    out.extend_from_slice(&padded_sender);
    out.extend_from_slice(&(payload_bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(&payload_bytes);
    Ok(out)
}

/// Decodes a complete frame from `bytes`, rejecting any trailing bytes that
/// follow the declared payload length.
pub fn decode(bytes: &[u8]) -> Result<Frame, WireError> {
    let mut offset = 0;

    let header_bytes: [u8; 4] = bytes
        .get(offset..offset + HEADER_LENGTH)
        .and_then(|s| s.try_into().ok())
        .ok_or(WireError::ShortPayload)?;
    let header = HeaderTag::from_bytes(&header_bytes)?;
    offset += HEADER_LENGTH;

    let sender_bytes = bytes
        .get(offset..offset + MAX_SENDER_LENGTH)
        .ok_or(WireError::BadSender)?;
    let sender = decode_sender(sender_bytes)?;
    offset += MAX_SENDER_LENGTH;

    let len_bytes: [u8; 4] = bytes
        .get(offset..offset + PAYLOAD_LENGTH_LENGTH)
        .and_then(|s| s.try_into().ok())
        .ok_or(WireError::ShortPayload)?;
    let declared_len = u32::from_be_bytes(len_bytes) as usize;
    offset += PAYLOAD_LENGTH_LENGTH;

    let payload_bytes = bytes.get(offset..).ok_or(WireError::ShortPayload)?;
    if payload_bytes.len() < declared_len {
        return Err(WireError::ShortPayload);
    }
    if payload_bytes.len() > declared_len {
        return Err(WireError::LongPayload);
    }

    let payload: Value =
        serde_json::from_slice(payload_bytes).map_err(|e| WireError::BadJson(e.to_string()))?;
    if !payload.is_object() {
        return Err(WireError::BadJson("payload is not a JSON object".to_string()));
    }

    Ok(Frame { header, sender, payload })
}

fn decode_sender(padded: &[u8]) -> Result<String, WireError> {
    let trimmed = padded.iter().skip_while(|&&b| b == 0).copied().collect::<Vec<u8>>();
    if trimmed.is_empty() {
        return Err(WireError::BadSender);
    }
    String::from_utf8(trimmed).map_err(|_| WireError::BadSender)
}
