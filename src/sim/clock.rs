//! Simulation clock: fixed-step pumping with optional speed correction.
//!
//! The simulation advances in whole ticks of `FRAME_MS`. Two pumping
//! strategies cover the host loop:
//!
//! - catch-up (default): measured wall time accumulates and converts to
//!   whole ticks, capped at [`MAX_CATCHUP_TICKS`] per frame so a long
//!   stall drops time instead of spiraling.
//! - speed correction: exactly one tick per frame, with the scroll
//!   distance scaled by the measured frame ratio instead. Smoother on
//!   displays that cannot hit the nominal rate, at the cost of
//!   non-integral scroll steps. Demo files record which mode was active.

use std::time::{Duration, Instant};

use crate::consts::{FRAME_MS, MAX_CATCHUP_TICKS};

/// What the host should run this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub ticks: u32,
    /// Scroll-distance multiplier for each of those ticks
    pub dx_scale: f64,
}

impl Step {
    pub const IDLE: Step = Step {
        ticks: 0,
        dx_scale: 1.0,
    };
}

/// One tick per call, no wall clock. Headless runs, tests and demo
/// playback use this so results never depend on host timing.
#[derive(Debug, Default)]
pub struct FixedPump;

impl FixedPump {
    pub fn step(&mut self) -> Step {
        Step {
            ticks: 1,
            dx_scale: 1.0,
        }
    }
}

/// Wall-clock driven pump.
#[derive(Debug)]
pub struct MeasuredPump {
    frame: Duration,
    speed_correction: bool,
    acc: Duration,
    last: Option<Instant>,
}

/// Bounds on the speed-correction scale; a hitch never teleports the
/// terrain and a fast frame never runs backwards.
const SCALE_MIN: f64 = 0.25;
const SCALE_MAX: f64 = 3.0;

impl MeasuredPump {
    pub fn new(speed_correction: bool) -> Self {
        Self::with_frame(Duration::from_millis(FRAME_MS as u64), speed_correction)
    }

    pub fn with_frame(frame: Duration, speed_correction: bool) -> Self {
        Self {
            frame,
            speed_correction,
            acc: Duration::ZERO,
            last: None,
        }
    }

    pub fn speed_correction(&self) -> bool {
        self.speed_correction
    }

    /// Measure since the previous poll and convert to a step.
    pub fn poll(&mut self) -> Step {
        let now = Instant::now();
        let elapsed = match self.last {
            Some(last) => now - last,
            None => self.frame,
        };
        self.last = Some(now);
        self.advance(elapsed)
    }

    /// Timing-free core, driven by tests with synthetic durations.
    pub fn advance(&mut self, elapsed: Duration) -> Step {
        if self.speed_correction {
            let ratio = elapsed.as_secs_f64() / self.frame.as_secs_f64();
            return Step {
                ticks: 1,
                dx_scale: ratio.clamp(SCALE_MIN, SCALE_MAX),
            };
        }
        self.acc += elapsed;
        let mut ticks = 0;
        while self.acc >= self.frame && ticks < MAX_CATCHUP_TICKS {
            self.acc -= self.frame;
            ticks += 1;
        }
        if ticks == MAX_CATCHUP_TICKS {
            // Stalled badly; drop the remaining debt
            self.acc = Duration::ZERO;
        }
        Step {
            ticks,
            dx_scale: 1.0,
        }
    }
}
