//! Procedural level generator.
//!
//! Synthesizes a full terrain from a per-level style table and the level
//! PRNG: macro-segment ground silhouette, recursive midpoint jitter,
//! optional sky profile, then object placement from an exactly-sized
//! shuffled pool. Deterministic for a fixed seed and level number.

use super::terrain::{Palette, Terrain, TerrainColumn, object};
use crate::consts::MAX_LEVEL;
use crate::prng::Lcg16;
use crate::render::Color;

/// Authored object counts and look for one style-table entry.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub bg: Color,
    pub ground: Color,
    pub sky: Color,
    pub outline_width: i32,
    pub rockets: u32,
    pub radars: u32,
    pub drops: u32,
    pub badies: u32,
    pub cumuli: u32,
    pub phasers: u32,
    pub has_sky: bool,
}

const STYLE_TABLE_SIZE: u32 = 5;

/// Fixed per-level style, indexed `(level - 1) % table size`.
fn style(level: u32) -> Style {
    match (level.max(1) - 1) % STYLE_TABLE_SIZE {
        0 => Style {
            bg: Color::rgb(0x20, 0x30, 0x60),
            ground: Color::rgb(0x20, 0x80, 0x20),
            sky: Color::rgb(0x60, 0x60, 0x70),
            outline_width: 1,
            rockets: 12,
            radars: 4,
            drops: 0,
            badies: 0,
            cumuli: 2,
            phasers: 0,
            has_sky: false,
        },
        1 => Style {
            bg: Color::rgb(0x10, 0x10, 0x30),
            ground: Color::rgb(0x80, 0x60, 0x20),
            sky: Color::rgb(0x50, 0x50, 0x60),
            outline_width: 1,
            rockets: 10,
            radars: 3,
            drops: 8,
            badies: 2,
            cumuli: 2,
            phasers: 0,
            has_sky: true,
        },
        2 => Style {
            bg: Color::rgb(0x30, 0x10, 0x10),
            ground: Color::rgb(0x90, 0x30, 0x10),
            sky: Color::rgb(0x40, 0x30, 0x30),
            outline_width: 2,
            rockets: 14,
            radars: 4,
            drops: 6,
            badies: 3,
            cumuli: 1,
            phasers: 2,
            has_sky: true,
        },
        3 => Style {
            bg: Color::rgb(0x00, 0x20, 0x40),
            ground: Color::rgb(0x10, 0x60, 0x60),
            sky: Color::rgb(0x30, 0x50, 0x50),
            outline_width: 2,
            rockets: 16,
            radars: 5,
            drops: 8,
            badies: 4,
            cumuli: 2,
            phasers: 2,
            has_sky: true,
        },
        _ => Style {
            bg: Color::rgb(0x08, 0x08, 0x18),
            ground: Color::rgb(0x70, 0x70, 0x80),
            sky: Color::rgb(0x40, 0x40, 0x50),
            outline_width: 3,
            rockets: 18,
            radars: 6,
            drops: 10,
            badies: 5,
            cumuli: 1,
            phasers: 3,
            has_sky: true,
        },
    }
}

/// Difficulty multiplier applied to segment heights and spacing.
fn hardness(level: u32) -> f64 {
    0.7 + 0.3 * level as f64 / MAX_LEVEL as f64
}

/// Minimum horizontal spacing between silhouette waypoints; subdivision
/// stops below this, bounding jaggedness resolution.
const MIN_WAYPOINT_DX: i32 = 16;

/// Generate the terrain for `level`. The caller seeds `rng` per level so
/// demo playback regenerates identical worlds.
pub fn generate(level: u32, rng: &mut Lcg16, viewport_w: i32, viewport_h: i32) -> Terrain {
    let style = style(level);
    let h = hardness(level);
    let target_len = 4 * viewport_w + (level as i32) * viewport_w / 2;

    let waypoints = ground_waypoints(rng, h, target_len, viewport_h);
    let waypoints = subdivide(rng, waypoints);
    let mut columns = interpolate(&waypoints, target_len);

    if style.has_sky {
        carve_sky(rng, &mut columns, level, viewport_h);
    }

    place_objects(rng, &mut columns, &style, level);

    let mut palette = Palette::flat(style.bg, style.ground, style.sky);
    palette.outline_width = style.outline_width;
    palette.outline_ground = Color::BLACK;
    palette.outline_sky = Color::BLACK;

    let mut terrain = Terrain::new(palette);
    terrain.columns = columns;
    terrain.push_scroll_zones(viewport_w);

    debug_assert!(terrain.check_invariants(viewport_w, viewport_h));
    log::debug!(
        "generated level {level}: {} columns, hardness {h:.2}",
        terrain.len()
    );
    terrain
}

/// Macro-segment silhouette: flat run, rising ramp, optional flat peak,
/// falling ramp, repeat. Returns (x, ground) endpoints.
fn ground_waypoints(rng: &mut Lcg16, h: f64, target_len: i32, viewport_h: i32) -> Vec<(i32, i32)> {
    let base = viewport_h / 12;
    let max_peak = (viewport_h as f64 * 0.55 * h) as i32;

    let mut points = vec![(0, base)];
    let mut x = 0;
    while x < target_len {
        // Flat run at base height
        x += rng.range(120, 400);
        points.push((x, base));

        // Rising ramp to a peak
        let peak = rng.range(base + 40, max_peak.max(base + 41));
        let rise = (rng.range(60, 200) as f64 * h) as i32;
        x += rise.max(MIN_WAYPOINT_DX);
        points.push((x, peak));

        // Optional flat peak
        if rng.coin() {
            x += rng.range(30, 120);
            points.push((x, peak));
        }

        // Falling ramp back to base
        let fall = (rng.range(60, 200) as f64 * h) as i32;
        x += fall.max(MIN_WAYPOINT_DX);
        points.push((x, base));
    }
    points
}

/// Recursively insert a jittered midpoint into every gap wider than the
/// minimum spacing. Adds jaggedness without ever violating the slope
/// resolution; vertical offsets are bounded by a fraction of the gap.
fn subdivide(rng: &mut Lcg16, points: Vec<(i32, i32)>) -> Vec<(i32, i32)> {
    let mut out = Vec::with_capacity(points.len() * 4);
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out.push(a);
        split_gap(rng, a, b, &mut out);
    }
    if let Some(&last) = points.last() {
        out.push(last);
    }
    out
}

fn split_gap(rng: &mut Lcg16, a: (i32, i32), b: (i32, i32), out: &mut Vec<(i32, i32)>) {
    if b.0 - a.0 <= MIN_WAYPOINT_DX {
        return;
    }
    let mx = (a.0 + b.0) / 2;
    let jitter_bound = ((b.0 - a.0) / 6).max(1);
    let my = ((a.1 + b.1) / 2 + rng.range(-jitter_bound, jitter_bound)).max(0);
    let mid = (mx, my);
    split_gap(rng, a, mid, out);
    out.push(mid);
    split_gap(rng, mid, b, out);
}

/// Fill every column's ground height by linear interpolation between
/// consecutive waypoints.
fn interpolate(points: &[(i32, i32)], target_len: i32) -> Vec<TerrainColumn> {
    let mut columns = Vec::with_capacity(target_len as usize);
    let mut seg = 0;
    for x in 0..target_len {
        while seg + 1 < points.len() && points[seg + 1].0 <= x {
            seg += 1;
        }
        let ground = if seg + 1 >= points.len() {
            points[points.len() - 1].1
        } else {
            let (x0, y0) = points[seg];
            let (x1, y1) = points[seg + 1];
            if x1 == x0 {
                y0
            } else {
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            }
        };
        columns.push(TerrainColumn::new(ground.max(0), -1));
    }
    columns
}

/// Clearance the sky must leave above the ground, in pixels. Sized for
/// the craft plus maneuvering room.
const SKY_CLEARANCE: i32 = 120;

/// Sky profile as a fraction of the ground's complementary space, denser
/// on higher levels, floored so the corridor always fits the craft.
fn carve_sky(rng: &mut Lcg16, columns: &mut [TerrainColumn], level: u32, viewport_h: i32) {
    let fraction = 0.2 + 0.4 * level as f64 / MAX_LEVEL as f64;
    let mut sky = viewport_h / 10;
    for col in columns.iter_mut() {
        // Random walk keeps the ceiling lively without a second silhouette
        sky = (sky + rng.range(-2, 2)).max(10);
        let free = viewport_h - col.ground;
        let max_sky = ((free as f64) * fraction) as i32;
        let ceiling = (viewport_h - col.ground - SKY_CLEARANCE).max(0);
        col.sky = sky.min(max_sky).min(ceiling).max(-1);
    }
}

/// Half-width of the flatness window required under grounded objects.
const FLAT_WINDOW: i32 = 12;
/// Retries (at a small forward offset) before a placement slot is skipped.
const PLACE_RETRIES: i32 = 5;

/// Build the exactly-sized shuffled object pool and walk the columns at
/// randomized spacing, assigning each pooled kind in turn. The pool
/// guarantees authored per-level counts are met exactly rather than
/// approximately.
fn place_objects(rng: &mut Lcg16, columns: &mut [TerrainColumn], style: &Style, level: u32) {
    let mut pool: Vec<u32> = Vec::new();
    for (bit, count) in [
        (object::ROCKET, style.rockets),
        (object::RADAR, style.radars),
        (object::DROP, style.drops),
        (object::BADY, style.badies),
        (object::CUMULUS, style.cumuli),
        (object::PHASER, style.phasers),
    ] {
        pool.extend(std::iter::repeat_n(bit, count as usize));
    }
    rng.shuffle(&mut pool);

    // Higher levels pack objects tighter
    let squeeze = 1.0 - 0.4 * level as f64 / MAX_LEVEL as f64;
    let min_dist = ((120.0 * squeeze) as i32).max(2 * FLAT_WINDOW);
    let max_dist = ((400.0 * squeeze) as i32).max(min_dist + 1);

    let mut x = rng.range(min_dist, max_dist);
    for bit in pool {
        if x as usize >= columns.len() {
            break;
        }
        let needs_flat = matches!(bit, object::ROCKET | object::RADAR | object::PHASER);
        let mut placed_at = None;
        let mut candidate = x;
        for _ in 0..=PLACE_RETRIES {
            if candidate as usize >= columns.len() {
                break;
            }
            if (!needs_flat || is_flat(columns, candidate))
                && columns[candidate as usize].objects == 0
            {
                placed_at = Some(candidate);
                break;
            }
            candidate += FLAT_WINDOW;
        }
        if let Some(cx) = placed_at {
            columns[cx as usize].objects = bit;
            x = cx;
        }
        x += rng.range(min_dist, max_dist);
    }
}

/// Ground around `x` must not deviate more than a couple of pixels for
/// grounded objects (rockets, radars, phasers sit on pads).
fn is_flat(columns: &[TerrainColumn], x: i32) -> bool {
    let center = columns[x as usize].ground;
    let lo = (x - FLAT_WINDOW).max(0) as usize;
    let hi = ((x + FLAT_WINDOW) as usize).min(columns.len() - 1);
    columns[lo..=hi].iter().all(|c| (c.ground - center).abs() <= 2)
}
