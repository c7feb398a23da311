use crate::error::WireError;

/// Encodes raw bytes as an ISO-8859-1 string: codepoint N <-> byte N for
/// every byte 0x00-0xFF, so the mapping is total and lossless.
pub fn to_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Decodes an ISO-8859-1 string back into raw bytes. Fails if any character
/// falls outside the Latin-1 range (can only happen if the string did not
/// originate from [`to_latin1`]).
pub fn from_latin1(s: &str) -> Result<Vec<u8>, WireError> {
    s.chars()
        .map(|c| u32::try_from(c).ok().filter(|&cp| cp <= 0xFF).map(|cp| cp as u8))
        .collect::<Option<Vec<u8>>>()
        .ok_or(WireError::NotLatin1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_every_byte_value() {
        let bytes: Vec<u8> = (0..=255).collect();
        let s = to_latin1(&bytes);
        assert_eq!(from_latin1(&s).unwrap(), bytes);
    }

    #[test]
    fn test_rejects_non_latin1_codepoints() {
        assert_eq!(from_latin1("\u{1F600}"), Err(WireError::NotLatin1));
    }
}
