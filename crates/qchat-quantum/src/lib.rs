//! # Measurement Device
//!
//! The abstract `QuantumLink` capability (§6.4 of the node's external
//! interface), plus the lead/follow basis conventions a protocol session
//! applies on top of it, and an in-process simulator for tests.
//!
//! Rotation units follow a 256-units-per-turn convention:
//! `rot_y(units)` rotates the qubit's Bloch vector by
//! `units * 2*pi/256` radians. The source carried two divergent copies of
//! the follower's CHSH angles (48/16 units and 240/208 units); neither
//! reproduces the Tsirelson bound under this convention, so the angles
//! used here ([`device::FOLLOWER_BASIS_0_UNITS`] = +45 degrees,
//! [`device::FOLLOWER_BASIS_1_UNITS`] = -45 degrees) are derived directly
//! from the target `p_win = (1 + 1/sqrt(2)) / 2` and validated numerically
//! in `device`'s test module.
pub const ROT_Y_RADIANS_PER_UNIT: f64 = std::f64::consts::TAU / 256.0;

mod device;
mod error;
mod link;
mod qubit;
pub mod sim;

pub use device::{follow_measure, follow_receive_epr, lead_measure, lead_receive_epr};
pub use error::QuantumError;
pub use link::QuantumLink;
pub use qubit::Qubit;
