//! # Golay ECC
//!
//! (23,12) Golay syndrome encode/decode used for information reconciliation
//! during key distillation, plus the 23-bit chunker that feeds it.

mod golay;
mod matrix;

pub use golay::{chunk, decode, encode, CODEWORD_LENGTH};
