//! Per-level tunable resolution.
//!
//! Every tunable resolves in priority order: a level-file `key=value`
//! override, else a formula default scaling with the level number. Numeric
//! overrides are silently clamped to their documented bounds. Paired
//! `*_min_*` / `*_max_*` keys form a range sampled at entity-start time;
//! the single-value key collapses min = max.

use std::collections::HashMap;

use crate::consts::MAX_LEVEL;
use crate::clamp_param;
use crate::prng::Lcg16;

/// An inclusive range a tunable is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    fn single(v: f64) -> Self {
        Self { min: v, max: v }
    }

    /// Uniform sample via the level generator. Collapsed ranges cost no
    /// random draw, keeping the recorded stream stable across tunings.
    pub fn sample(&self, rng: &mut Lcg16) -> f64 {
        if self.max <= self.min {
            return self.min;
        }
        self.min + (rng.next() % 1000) as f64 / 1000.0 * (self.max - self.min)
    }
}

/// Resolved tunables for one level.
#[derive(Debug, Clone)]
pub struct LevelParams {
    pub level: u32,
    /// Percent chance per tick that an in-range rocket launches
    pub rocket_start_prob: u32,
    /// Percent chance per tick that an in-range drop releases
    pub drop_start_prob: u32,
    /// Percent chance per tick that a spawned bady begins oscillating
    pub bady_start_prob: u32,
    /// Percent chance per tick that a spawned cumulus begins oscillating
    pub cumulus_start_prob: u32,
    pub rocket_start_speed: Range,
    pub drop_start_speed: Range,
    pub bady_speed: Range,
    pub cumulus_speed: Range,
    /// Horizontal distance at which a rocket becomes eligible to launch
    pub rocket_trigger_dist: Range,
    pub drop_trigger_dist: Range,
    /// Hit points a bady soaks before dying
    pub bady_hits: Range,
    /// Whether badies/cumuli wander horizontally as well
    pub bady_x_drift: bool,
    pub cumulus_x_drift: bool,
    /// Phaser idle/charge/fire cycle length in ticks
    pub phaser_cycle_ticks: u32,
    /// A failed trigger roll permanently suppresses the entity (legacy
    /// behavior); default is to re-roll every tick while in range
    pub nostart_latch: bool,
    /// Bonus pool granted on level completion before countdown
    pub time_bonus: u32,
}

fn hardness(level: u32) -> f64 {
    0.7 + 0.3 * level as f64 / MAX_LEVEL as f64
}

/// Look up a single override, clamped.
fn get(overrides: &HashMap<String, f64>, key: &str, lo: f64, hi: f64) -> Option<f64> {
    overrides.get(key).map(|&v| clamp_param(v, lo, hi))
}

/// Resolve a min/max pair: the paired keys win, else the single key
/// collapses the range, else the formula default.
fn get_range(
    overrides: &HashMap<String, f64>,
    base: &str,
    lo: f64,
    hi: f64,
    default: Range,
) -> Range {
    let min_key = format!("{}_min_{}", prefix(base), suffix(base));
    let max_key = format!("{}_max_{}", prefix(base), suffix(base));
    let min = get(overrides, &min_key, lo, hi);
    let max = get(overrides, &max_key, lo, hi);
    if min.is_some() || max.is_some() {
        let min = min.unwrap_or(default.min);
        let max = max.unwrap_or(default.max);
        return Range {
            min,
            max: max.max(min),
        };
    }
    if let Some(v) = get(overrides, base, lo, hi) {
        return Range::single(v);
    }
    default
}

// `rocket_start_speed` pairs as `rocket_min_start_speed`; split at the
// first underscore.
fn prefix(base: &str) -> &str {
    base.split_once('_').map_or(base, |(p, _)| p)
}

fn suffix(base: &str) -> &str {
    base.split_once('_').map_or("", |(_, s)| s)
}

impl LevelParams {
    pub fn resolve(level: u32, overrides: &HashMap<String, f64>) -> Self {
        let h = hardness(level);
        let l = level as f64;

        let rocket_speed_default = Range {
            min: (2.0 + l * 0.3) * h,
            max: (4.0 + l * 0.4) * h,
        };
        let drop_speed_default = Range {
            min: (1.5 + l * 0.25) * h,
            max: (3.0 + l * 0.35) * h,
        };
        let trigger_default = Range {
            min: 120.0 + l * 10.0,
            max: 240.0 + l * 12.0,
        };

        Self {
            level,
            rocket_start_prob: get(overrides, "rocket_start_prob", 0.0, 100.0)
                .unwrap_or((20.0 + l * 3.0).min(60.0)) as u32,
            drop_start_prob: get(overrides, "drop_start_prob", 0.0, 100.0)
                .unwrap_or((15.0 + l * 2.5).min(50.0)) as u32,
            bady_start_prob: get(overrides, "bady_start_prob", 0.0, 100.0)
                .unwrap_or((10.0 + l * 2.0).min(40.0)) as u32,
            cumulus_start_prob: get(overrides, "cumulus_start_prob", 0.0, 100.0)
                .unwrap_or((8.0 + l * 1.5).min(30.0)) as u32,
            rocket_start_speed: get_range(
                overrides,
                "rocket_start_speed",
                0.5,
                12.0,
                rocket_speed_default,
            ),
            drop_start_speed: get_range(
                overrides,
                "drop_start_speed",
                0.5,
                10.0,
                drop_speed_default,
            ),
            bady_speed: get_range(
                overrides,
                "bady_speed",
                0.5,
                8.0,
                Range::single((2.0 * h).min(8.0)),
            ),
            cumulus_speed: get_range(
                overrides,
                "cumulus_speed",
                0.5,
                8.0,
                Range::single((1.5 * h).min(8.0)),
            ),
            rocket_trigger_dist: get_range(
                overrides,
                "rocket_trigger_dist",
                50.0,
                400.0,
                trigger_default,
            ),
            drop_trigger_dist: get_range(
                overrides,
                "drop_trigger_dist",
                50.0,
                400.0,
                trigger_default,
            ),
            bady_hits: get_range(
                overrides,
                "bady_hits",
                1.0,
                5.0,
                Range {
                    min: (1.0 + l / 4.0).min(3.0),
                    max: (2.0 + l / 3.0).min(5.0),
                },
            ),
            bady_x_drift: get(overrides, "bady_x_drift", 0.0, 1.0)
                .map(|v| v != 0.0)
                .unwrap_or(level > 4),
            cumulus_x_drift: get(overrides, "cumulus_x_drift", 0.0, 1.0)
                .map(|v| v != 0.0)
                .unwrap_or(false),
            phaser_cycle_ticks: get(overrides, "phaser_cycle_ticks", 20.0, 80.0)
                .unwrap_or(crate::consts::PHASER_CYCLE_TICKS as f64)
                as u32,
            nostart_latch: get(overrides, "nostart_latch", 0.0, 1.0)
                .map(|v| v != 0.0)
                .unwrap_or(false),
            time_bonus: get(overrides, "time_bonus", 0.0, 10_000.0).unwrap_or(100.0 * l) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn over(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn single_key_collapses_range() {
        let p = LevelParams::resolve(3, &over(&[("rocket_start_speed", 5.0)]));
        assert_eq!(p.rocket_start_speed, Range { min: 5.0, max: 5.0 });
    }

    #[test]
    fn paired_keys_form_range() {
        let p = LevelParams::resolve(
            3,
            &over(&[
                ("rocket_min_start_speed", 2.0),
                ("rocket_max_start_speed", 6.0),
            ]),
        );
        assert_eq!(p.rocket_start_speed, Range { min: 2.0, max: 6.0 });
    }

    #[test]
    fn out_of_range_values_clamp_silently() {
        let p = LevelParams::resolve(1, &over(&[("rocket_start_prob", 250.0)]));
        assert_eq!(p.rocket_start_prob, 100);
        let p = LevelParams::resolve(1, &over(&[("rocket_start_speed", -3.0)]));
        assert_eq!(p.rocket_start_speed.min, 0.5);
    }

    #[test]
    fn defaults_scale_with_level() {
        let p1 = LevelParams::resolve(1, &HashMap::new());
        let p9 = LevelParams::resolve(9, &HashMap::new());
        assert!(p9.rocket_start_prob > p1.rocket_start_prob);
        assert!(p9.rocket_start_speed.max > p1.rocket_start_speed.max);
        assert!(p9.rocket_trigger_dist.max > p1.rocket_trigger_dist.max);
    }

    #[test]
    fn collapsed_range_samples_without_consuming_rng() {
        let mut a = Lcg16::new(1);
        let r = Range::single(4.0);
        let before = a.state();
        assert_eq!(r.sample(&mut a), 4.0);
        assert_eq!(a.state(), before);
    }

    #[test]
    fn nostart_latch_defaults_off_and_is_tunable() {
        assert!(!LevelParams::resolve(2, &HashMap::new()).nostart_latch);
        assert!(LevelParams::resolve(2, &over(&[("nostart_latch", 1.0)])).nostart_latch);
    }
}
