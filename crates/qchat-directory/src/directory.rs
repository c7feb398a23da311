use crate::error::DirectoryError;
use crate::fields::{Field, UserUpdate};
use parking_lot::RwLock;
use qchat_types::{Endpoint, UserRecord, MESSAGE_KEY_LENGTH};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Thread-safe, in-memory mapping from user name to directory record.
///
/// All reads and writes cross a single lock; callers never see a torn
/// update. The lock is never held across a socket or quantum-backend call.
pub struct Directory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl Directory {
    pub fn new() -> Self {
        Self { users: RwLock::new(HashMap::new()) }
    }

    pub fn has(&self, user: &str) -> bool {
        self.users.read().contains_key(user)
    }

    /// Adds or merges fields into `user`'s record. The public key, once
    /// set, is never overwritten by a later merge.
    pub fn add(&self, user: &str, update: UserUpdate) {
        let mut users = self.users.write();
        let entry = users
            .entry(user.to_string())
            .or_insert_with(|| UserRecord::new(user, Vec::new(), Endpoint { host: String::new(), port: 0 }));

        if entry.public_key.is_empty() {
            if let Some(pk) = update.public_key {
                entry.public_key = pk;
            }
        }
        if let Some(conn) = update.connection {
            entry.connection = conn;
        }
        if let Some(mk) = update.message_key {
            entry.message_key = Some(mk);
        }
    }

    /// Same merge semantics as [`Self::add`] but fails if `user` is
    /// already registered, for RGST's unique-name requirement.
    pub fn register(&self, user: &str, update: UserUpdate) -> Result<(), DirectoryError> {
        if self.has(user) {
            return Err(DirectoryError::DuplicateRegistration(user.to_string()));
        }
        self.add(user, update);
        Ok(())
    }

    /// Alias of [`Self::add`] kept distinct for callers mirroring the
    /// source's `changeUserInfo`/`addUser` split; both merge identically.
    pub fn change(&self, user: &str, update: UserUpdate) {
        self.add(user, update);
    }

    pub fn delete(&self, user: &str) {
        self.users.write().remove(user);
    }

    pub fn delete_fields(&self, user: &str, fields: &[Field]) -> Result<(), DirectoryError> {
        let mut users = self.users.write();
        let entry = users.get_mut(user).ok_or_else(|| DirectoryError::UnknownUser(user.to_string()))?;
        for field in fields {
            match field {
                Field::MessageKey => entry.message_key = None,
                Field::Connection => entry.connection = Endpoint { host: String::new(), port: 0 },
            }
        }
        Ok(())
    }

    pub fn public_key(&self, user: &str) -> Result<Vec<u8>, DirectoryError> {
        self.users
            .read()
            .get(user)
            .map(|u| u.public_key.clone())
            .ok_or_else(|| DirectoryError::UnknownUser(user.to_string()))
    }

    pub fn connection(&self, user: &str) -> Result<Endpoint, DirectoryError> {
        self.users
            .read()
            .get(user)
            .map(|u| u.connection.clone())
            .ok_or_else(|| DirectoryError::UnknownUser(user.to_string()))
    }

    pub fn message_key(&self, user: &str) -> Result<Option<[u8; MESSAGE_KEY_LENGTH]>, DirectoryError> {
        self.users
            .read()
            .get(user)
            .map(|u| u.message_key)
            .ok_or_else(|| DirectoryError::UnknownUser(user.to_string()))
    }

    /// Builds the PUTU-shaped public info payload for `user`, or for every
    /// known user when `user == "*"`.
    pub fn public_info(&self, user: &str) -> Result<Value, DirectoryError> {
        let users = self.users.read();

        if user == "*" {
            let info: Vec<Value> = users
                .values()
                .map(|u| {
                    json!({
                        "user": u.name,
                        "pub": qchat_wire::to_latin1(&u.public_key),
                        "connection": {"host": u.connection.host, "port": u.connection.port},
                    })
                })
                .collect();
            return Ok(json!({"user": "*", "info": info}));
        }

        let u = users.get(user).ok_or_else(|| DirectoryError::UnknownUser(user.to_string()))?;
        Ok(json!({
            "user": u.name,
            "pub": qchat_wire::to_latin1(&u.public_key),
            "connection": {"host": u.connection.host, "port": u.connection.port},
        }))
    }
}
