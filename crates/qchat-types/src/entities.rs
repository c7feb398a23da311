//! Domain entities: connection endpoints and the user directory's records.

use serde::{Deserialize, Serialize};

/// A TCP host/port pair, carried verbatim in several message payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

/// One entry in the user directory.
///
/// `name` is the primary key and is never mutated once created; `public_key`
/// is set once (at registration or directory-fetch) and is immutable for the
/// lifetime of the record. `message_key` is populated only after a
/// successful key-establishment protocol with this peer.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub name: String,
    pub public_key: Vec<u8>,
    pub connection: Endpoint,
    pub message_key: Option<[u8; crate::MESSAGE_KEY_LENGTH]>,
}

impl UserRecord {
    pub fn new(name: impl Into<String>, public_key: Vec<u8>, connection: Endpoint) -> Self {
        Self { name: name.into(), public_key, connection, message_key: None }
    }
}
