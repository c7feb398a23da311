/// A new or updated value for a user record. `None` leaves the field
/// untouched when merging into an existing entry.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub public_key: Option<Vec<u8>>,
    pub connection: Option<qchat_types::Endpoint>,
    pub message_key: Option<[u8; qchat_types::MESSAGE_KEY_LENGTH]>,
}

/// Fields that [`crate::Directory::delete_fields`] can remove from an
/// existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    MessageKey,
    Connection,
}
