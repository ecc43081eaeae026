//! Deterministic game simulation.
//!
//! Everything here advances in fixed ticks and draws randomness only from
//! the session's [`crate::prng::RngPair`], so a recorded run replays
//! bit-exactly on any platform.

pub mod clock;
pub mod collision;
pub mod demo;
pub mod entity;
pub mod generator;
pub mod level_file;
pub mod params;
pub mod sprite;
pub mod state;
pub mod terrain;
pub mod tick;

pub use state::{Phase, Session, SessionConfig};
pub use tick::{TickInput, tick};
