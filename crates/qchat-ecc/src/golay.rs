//! Syndrome-based encode/decode for the (23,12) Golay code.

use crate::matrix::syndrome;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Codeword length in bits.
pub const CODEWORD_LENGTH: usize = 23;

fn unit_vector(position: usize) -> [u8; 23] {
    let mut v = [0u8; 23];
    v[23 - position] = 1;
    v
}

fn xor_into(a: &mut [u8; 23], b: &[u8; 23]) {
    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x ^= y;
    }
}

/// Maps every syndrome producible by a 0-, 1-, 2-, or 3-bit error pattern to
/// the error pattern itself. Built once and shared across callers.
static SYNDROME_TABLE: Lazy<HashMap<[u8; 11], [u8; 23]>> = Lazy::new(build_table);

fn build_table() -> HashMap<[u8; 11], [u8; 23]> {
    let mut table = HashMap::with_capacity(1 << 11);
    table.insert([0u8; 11], [0u8; 23]);

    for i in 1..=23 {
        let vi = unit_vector(i);
        table.insert(syndrome(&vi), vi);

        for j in (i + 1)..=23 {
            let vj = unit_vector(j);
            let mut v_ij = vi;
            xor_into(&mut v_ij, &vj);
            table.insert(syndrome(&v_ij), v_ij);

            for k in (j + 1)..=23 {
                let vk = unit_vector(k);
                let mut v_ijk = v_ij;
                xor_into(&mut v_ijk, &vk);
                table.insert(syndrome(&v_ijk), v_ijk);
            }
        }
    }

    table
}

/// Computes the 11-bit syndrome `s = H*v mod 2` for a 23-bit codeword.
pub fn encode(v: &[u8; 23]) -> [u8; 11] {
    syndrome(v)
}

/// Corrects up to 3 bit errors in `v` given the original codeword's syndrome
/// `s`. Behavior for more than 3 errors is undefined: the syndrome lookup
/// will not find a matching entry and this falls back to returning `v`
/// unchanged.
pub fn decode(v: &[u8; 23], s: &[u8; 11]) -> [u8; 23] {
    let s_hat = syndrome(v);
    let mut combined = [0u8; 11];
    for i in 0..11 {
        combined[i] = s[i] ^ s_hat[i];
    }

    let Some(error) = SYNDROME_TABLE.get(&combined) else {
        return *v;
    };

    let mut corrected = *v;
    xor_into(&mut corrected, error);
    corrected
}

/// Splits `bits` into 23-bit codewords, returning the full chunks and any
/// trailing short chunk for the caller to recycle into the next round.
pub fn chunk(bits: &[u8]) -> (Vec<[u8; 23]>, Vec<u8>) {
    let mut chunks = Vec::with_capacity(bits.len() / CODEWORD_LENGTH);
    let mut iter = bits.chunks_exact(CODEWORD_LENGTH);
    for c in &mut iter {
        let mut word = [0u8; 23];
        word.copy_from_slice(c);
        chunks.push(word);
    }
    (chunks, iter.remainder().to_vec())
}
