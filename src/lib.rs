//! Ridge Runner - a side-scrolling terrain-dodging arcade game engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (terrain, entities, collisions, game state)
//! - `prng`: Reproducible dual-LCG random streams (gameplay vs. cosmetic)
//! - `render`: Drawing-surface seam and the in-memory frame buffer
//! - `profile`: Per-user score/progress store
//! - `audio`: Fire-and-forget sound service

pub mod audio;
pub mod prng;
pub mod profile;
pub mod render;
pub mod sim;

pub use prng::Lcg16;
pub use profile::{ProfileStore, UserProfile};

/// Engine configuration constants
pub mod consts {
    /// Nominal frame interval in milliseconds (50 fps)
    pub const FRAME_MS: u32 = 20;
    /// Scroll distance per nominal tick, in pixels
    pub const TICK_DX: i32 = 3;
    /// Maximum catch-up ticks per pump iteration to prevent spiral of death
    pub const MAX_CATCHUP_TICKS: u32 = 8;

    /// Viewport dimensions (authored resolution)
    pub const VIEWPORT_W: i32 = 800;
    pub const VIEWPORT_H: i32 = 600;

    /// Highest internal level; hardness formulas scale against this
    pub const MAX_LEVEL: u32 = 10;

    /// Vertical rise per rocket tick is capped at this many pixels (speed 1)
    pub const ROCKET_LIFT_CAP: f32 = 12.0;

    /// Phaser idle/charge/fire cycle length in ticks
    pub const PHASER_CYCLE_TICKS: u32 = 40;

    /// Idle time on the title screen before demo playback starts, in ticks
    pub const TITLE_DEMO_TIMEOUT_TICKS: u32 = 20 * 50;
}

/// Clamp a value to an inclusive range. This is the policy for all
/// level-file parameter overrides: out-of-range values are silently pulled
/// in bounds, never rejected.
#[inline]
pub fn clamp_param(value: f64, lo: f64, hi: f64) -> f64 {
    value.clamp(lo, hi)
}
