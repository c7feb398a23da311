//! # QChat Wire Codec
//!
//! Encodes and decodes the framed binary message format:
//!
//! ```text
//! HEADER[4] ‖ SENDER[16] ‖ LEN[4 big-endian] ‖ PAYLOAD[LEN]
//! ```
//!
//! `SENDER` is left-padded with NUL bytes, keeping the right-most bytes as
//! the name. `PAYLOAD` is the UTF-8 encoding of a canonical JSON object:
//! binary fields inside it (signatures, nonces, ciphertexts, public keys)
//! are carried as ISO-8859-1 strings so that every byte value 0x00-0xFF
//! round-trips through `String`/`serde_json::Value` untouched.

mod codec;
mod error;
mod frame;
mod header;
mod latin1;

pub use codec::{decode, encode};
pub use error::WireError;
pub use frame::Frame;
pub use header::HeaderTag;
pub use latin1::{from_latin1, to_latin1};
