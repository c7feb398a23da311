//! # User Directory
//!
//! A thread-safe, in-memory mapping from user name to {public key,
//! connection endpoint, optional derived message key}.

mod directory;
mod error;
mod fields;

pub use directory::Directory;
pub use error::DirectoryError;
pub use fields::{Field, UserUpdate};
