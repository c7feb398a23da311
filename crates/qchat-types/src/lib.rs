//! # QChat Types - Shared Domain Entities
//!
//! Holds the handful of types that cross every layer of the node: the
//! connection endpoint, the user record stored in the directory, and the
//! wire-level size constants that the codec, connection, and protocol
//! engine all have to agree on.

pub mod constants;
pub mod entities;

pub use constants::*;
pub use entities::{Endpoint, UserRecord};
