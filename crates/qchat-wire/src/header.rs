use crate::error::WireError;

/// The eleven framed message types the protocol exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderTag {
    /// Generic/base message, also used as the catch-all in tests.
    Mssg,
    /// Registration with the root registry.
    Rgst,
    /// Reserved authentication header (unused by any handler).
    Auth,
    /// An AES-GCM encrypted chat message.
    Qcht,
    /// GET-User: request a peer's directory record.
    Getu,
    /// PUT-User: a directory record (single or bulk wildcard).
    Putu,
    /// Protocol start: instructs the peer to assume the follower role.
    Ptcl,
    /// ReQuest-QuBit: ask the registry to act as an EPR source.
    Rqqb,
    /// BB84-Purified control frame.
    Bb84,
    /// DIQKD control frame.
    Dqkd,
    /// SuperDense coding control frame.
    Spds,
}

impl HeaderTag {
    /// All known tags, used by the decoder's lookup and by tests.
    pub const ALL: [HeaderTag; 11] = [
        HeaderTag::Mssg,
        HeaderTag::Rgst,
        HeaderTag::Auth,
        HeaderTag::Qcht,
        HeaderTag::Getu,
        HeaderTag::Putu,
        HeaderTag::Ptcl,
        HeaderTag::Rqqb,
        HeaderTag::Bb84,
        HeaderTag::Dqkd,
        HeaderTag::Spds,
    ];

    pub const fn as_bytes(self) -> &'static [u8; 4] {
        match self {
            HeaderTag::Mssg => b"MSSG",
            HeaderTag::Rgst => b"RGST",
            HeaderTag::Auth => b"AUTH",
            HeaderTag::Qcht => b"QCHT",
            HeaderTag::Getu => b"GETU",
            HeaderTag::Putu => b"PUTU",
            HeaderTag::Ptcl => b"PTCL",
            HeaderTag::Rqqb => b"RQQB",
            HeaderTag::Bb84 => b"BB84",
            HeaderTag::Dqkd => b"DQKD",
            HeaderTag::Spds => b"SPDS",
        }
    }

    pub fn from_bytes(bytes: &[u8; 4]) -> Result<Self, WireError> {
        HeaderTag::ALL
            .into_iter()
            .find(|tag| tag.as_bytes() == bytes)
            .ok_or(WireError::BadHeader(*bytes))
    }

    /// Whether the router must verify a signature before dispatching this
    /// message (per-tag policy from §4.2/§6.2 of the schema table).
    pub const fn requires_verify(self) -> bool {
        matches!(
            self,
            HeaderTag::Qcht | HeaderTag::Ptcl | HeaderTag::Bb84 | HeaderTag::Dqkd | HeaderTag::Spds
        )
    }

    /// Whether the router must strip the `sig` field before dispatch even
    /// when it does not verify it.
    pub const fn requires_strip(self) -> bool {
        matches!(
            self,
            HeaderTag::Qcht
                | HeaderTag::Getu
                | HeaderTag::Putu
                | HeaderTag::Ptcl
                | HeaderTag::Bb84
                | HeaderTag::Dqkd
                | HeaderTag::Spds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_all_tags() {
        for tag in HeaderTag::ALL {
            assert_eq!(HeaderTag::from_bytes(tag.as_bytes()).unwrap(), tag);
        }
    }

    #[test]
    fn test_rejects_unknown_tag() {
        assert_eq!(
            HeaderTag::from_bytes(b"ZZZZ"),
            Err(WireError::BadHeader(*b"ZZZZ"))
        );
    }
}
