//! Level file loading.
//!
//! Text format, whitespace/line delimited:
//!
//! ```text
//! <version> <flags>
//! [<outline_width> <outline_ground> <outline_sky>]   (version != 0 only)
//! <bg_color>[,alt...]
//! <ground_color>[,alt...]
//! <sky_color>[,alt...]
//! <sky> <ground> <mask> [<cc_bg> <cc_ground> <cc_sky>]   (one per column)
//! <key>=<value>                                          (trailing params)
//! ```
//!
//! Colors are decimal, `0x` hex, or packed RGB888. A truncated file (fewer
//! post-scaling columns than one viewport width) is a load error; bad
//! parameter values are clamped later, never rejected here.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::terrain::{ColorChange, Palette, Terrain, TerrainColumn, object};
use crate::consts::VIEWPORT_W;
use crate::render::Color;

/// Flags word bits.
pub mod flags {
    pub const NO_SCROLLIN_ZONE: u32 = 1 << 0;
    pub const NO_SCROLLOUT_ZONE: u32 = 1 << 1;
}

/// A parsed level: terrain (scroll zones already appended) plus the
/// free-form parameter overrides from the file's tail.
#[derive(Debug)]
pub struct LoadedLevel {
    pub terrain: Terrain,
    pub overrides: HashMap<String, f64>,
}

/// Parse a numeric token, accepting decimal or `0x` hex.
fn parse_num(tok: &str) -> Result<u32> {
    let v = if let Some(hex) = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        tok.parse::<u32>()
    };
    v.with_context(|| format!("bad number '{tok}'"))
}

/// Parse a color list `value[,value...]`, normalizing each entry.
fn parse_color_list(line: &str) -> Result<Vec<Color>> {
    line.trim()
        .split(',')
        .map(|tok| parse_num(tok.trim()).map(Color::from_raw))
        .collect()
}

pub fn load_level(path: &Path, viewport_w: i32, viewport_h: i32) -> Result<LoadedLevel> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading level file {}", path.display()))?;
    parse_level(&text, viewport_w, viewport_h)
        .with_context(|| format!("parsing level file {}", path.display()))
}

pub fn parse_level(text: &str, viewport_w: i32, viewport_h: i32) -> Result<LoadedLevel> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().context("missing version/flags line")?;
    let mut toks = header.split_whitespace();
    let version = parse_num(toks.next().context("missing version")?)?;
    let file_flags = parse_num(toks.next().context("missing flags")?)?;

    let mut outline_width = 0;
    let mut outline_ground = Color::BLACK;
    let mut outline_sky = Color::BLACK;
    if version != 0 {
        let line = lines.next().context("missing outline line")?;
        let mut toks = line.split_whitespace();
        outline_width = parse_num(toks.next().context("missing outline width")?)? as i32;
        outline_ground = Color::from_raw(parse_num(
            toks.next().context("missing outline ground color")?,
        )?);
        outline_sky =
            Color::from_raw(parse_num(toks.next().context("missing outline sky color")?)?);
    }

    let bg = parse_color_list(lines.next().context("missing background color line")?)?;
    let ground = parse_color_list(lines.next().context("missing ground color line")?)?;
    let sky = parse_color_list(lines.next().context("missing sky color line")?)?;

    let mut palette = Palette {
        bg,
        ground,
        sky,
        outline_width,
        outline_ground,
        outline_sky,
    };
    if palette.bg.is_empty() || palette.ground.is_empty() || palette.sky.is_empty() {
        bail!("empty palette line");
    }
    palette.outline_width = palette.outline_width.clamp(0, 4);

    // Column lines until the first key=value / comment tail line.
    let mut columns: Vec<TerrainColumn> = Vec::new();
    let mut overrides: HashMap<String, f64> = HashMap::new();
    let mut in_tail = false;
    for line in lines {
        let trimmed = line.trim();
        let param_line = trimmed.starts_with('#') || trimmed.contains('=');
        if param_line {
            in_tail = true;
            let body = trimmed.trim_start_matches('#').trim();
            if let Some((key, value)) = body.split_once('=')
                && let Ok(v) = value.trim().parse::<f64>()
            {
                overrides.insert(key.trim().to_string(), v);
            }
            continue;
        }
        if in_tail {
            // Free-form tail text we don't understand.
            continue;
        }

        let mut toks = trimmed.split_whitespace();
        let sky_h = parse_num(toks.next().context("missing sky height")?)? as i32;
        let ground_h = parse_num(toks.next().context("missing ground height")?)? as i32;
        let mask = parse_num(toks.next().context("missing object mask")?)?;

        let mut col = TerrainColumn::new(ground_h, if sky_h == 0 { -1 } else { sky_h });
        col.objects = mask;
        if mask & object::COLOR_CHANGE != 0 {
            let cc_bg = Color::from_raw(parse_num(toks.next().context("missing cc bg")?)?);
            let cc_ground = Color::from_raw(parse_num(toks.next().context("missing cc ground")?)?);
            let cc_sky = Color::from_raw(parse_num(toks.next().context("missing cc sky")?)?);
            col.color_change = Some(ColorChange {
                bg: cc_bg,
                ground: cc_ground,
                sky: cc_sky,
            });
        }
        columns.push(col);
    }

    let scale = viewport_w as f64 / VIEWPORT_W as f64;
    let columns = scale_columns(&columns, scale);

    if (columns.len() as i32) < viewport_w {
        bail!(
            "level too short: {} columns after scaling, viewport needs {viewport_w}",
            columns.len()
        );
    }

    let mut terrain = Terrain::new(palette);
    terrain.columns = columns;
    terrain.no_scrollin_zone = file_flags & flags::NO_SCROLLIN_ZONE != 0;
    terrain.no_scrollout_zone = file_flags & flags::NO_SCROLLOUT_ZONE != 0;
    terrain.push_scroll_zones(viewport_w);

    if !terrain
        .columns
        .iter()
        .all(|c| c.ground >= 0 && c.sky < viewport_h)
    {
        bail!("terrain heights out of bounds for viewport height {viewport_h}");
    }

    log::info!(
        "loaded level: {} columns, {} overrides",
        terrain.len(),
        overrides.len()
    );
    Ok(LoadedLevel { terrain, overrides })
}

/// Replicate/interpolate authored columns to the target width, keeping
/// relative object spacing: heights are sampled per target column, object
/// and color-change bits land exactly once at the scaled position.
fn scale_columns(columns: &[TerrainColumn], scale: f64) -> Vec<TerrainColumn> {
    if (scale - 1.0).abs() < f64::EPSILON || columns.is_empty() {
        return columns.to_vec();
    }
    let new_len = ((columns.len() as f64 * scale).round() as usize).max(1);
    let mut out = Vec::with_capacity(new_len);
    for i in 0..new_len {
        let src = ((i as f64 / scale) as usize).min(columns.len() - 1);
        let mut col = columns[src];
        col.objects = 0;
        col.color_change = None;
        out.push(col);
    }
    for (j, col) in columns.iter().enumerate() {
        if col.objects != 0 {
            let dst = ((j as f64 * scale).round() as usize).min(new_len - 1);
            out[dst].objects |= col.objects;
            if out[dst].color_change.is_none() {
                out[dst].color_change = col.color_change;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const VW: i32 = 800;
    const VH: i32 = 600;

    fn level_text(columns: usize) -> String {
        let mut s = String::from("1 0\n2 0x102030 0x405060\n");
        s.push_str("0x000040,0x000060\n0x00AA00\n0x777777\n");
        for _ in 0..columns {
            s.push_str("0 50 0\n");
        }
        s
    }

    #[test]
    fn parses_minimal_level() {
        let lvl = parse_level(&level_text(800), VW, VH).unwrap();
        // 800 real columns plus both scroll zones
        assert_eq!(lvl.terrain.len(), 800 + 2 * VW);
        assert_eq!(lvl.terrain.palette.bg.len(), 2);
        assert_eq!(lvl.terrain.palette.outline_width, 2);
        assert!(lvl.overrides.is_empty());
    }

    #[test]
    fn two_column_file_fails_for_wide_viewport() {
        let err = parse_level(&level_text(2), VW, VH).unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn version_zero_has_no_outline_line() {
        let mut s = String::from("0 0\n16\n0x00AA00\n0x777777\n");
        for _ in 0..800 {
            s.push_str("0 50 0\n");
        }
        let lvl = parse_level(&s, VW, VH).unwrap();
        assert_eq!(lvl.terrain.palette.outline_width, 0);
        // Decimal color 16 has a nonzero low byte: packed RGB888
        assert_eq!(lvl.terrain.palette.bg[0], Color(16 << 8));
    }

    #[test]
    fn trailing_params_are_collected() {
        let mut s = level_text(800);
        s.push_str("rocket_start_prob=40\n# drop_start_prob=15\nnot a param line\n");
        let lvl = parse_level(&s, VW, VH).unwrap();
        assert_eq!(lvl.overrides.get("rocket_start_prob"), Some(&40.0));
        assert_eq!(lvl.overrides.get("drop_start_prob"), Some(&15.0));
        assert_eq!(lvl.overrides.len(), 2);
    }

    #[test]
    fn color_change_triple_parses_and_restore_detected() {
        let mut s = String::from("1 0\n0 0 0\n16\n32\n48\n");
        // Build column lines manually: one marker with palette, one restore
        let mut body = String::new();
        for i in 0..800 {
            if i == 100 {
                body.push_str(&format!("0 50 {} 0x10 0x20 0x30\n", object::COLOR_CHANGE));
            } else if i == 200 {
                body.push_str(&format!("0 50 {} 0 0 0\n", object::COLOR_CHANGE));
            } else {
                body.push_str("0 50 0\n");
            }
        }
        s.push_str(&body);
        let lvl = parse_level(&s, VW, VH).unwrap();
        let t = &lvl.terrain;
        // Scroll-in zone shifts real columns one viewport right
        let marker = t.column(VW + 100).unwrap();
        assert!(marker.has_object(object::COLOR_CHANGE));
        assert!(!marker.color_change.unwrap().is_restore());
        assert!(t.column(VW + 200).unwrap().color_change.unwrap().is_restore());
    }

    #[test]
    fn flags_suppress_scroll_zones() {
        let mut s = level_text(800);
        s.replace_range(0..3, "1 3");
        let lvl = parse_level(&s, VW, VH).unwrap();
        assert_eq!(lvl.terrain.len(), 800);
    }

    #[test]
    fn scaling_preserves_object_positions() {
        let mut cols = vec![TerrainColumn::new(50, -1); 100];
        cols[40].objects = object::ROCKET;
        let scaled = scale_columns(&cols, 2.0);
        assert_eq!(scaled.len(), 200);
        assert!(scaled[80].has_object(object::ROCKET));
        assert_eq!(scaled.iter().filter(|c| c.objects != 0).count(), 1);
    }

    #[test]
    fn downscaling_keeps_each_object_once() {
        let mut cols = vec![TerrainColumn::new(50, -1); 100];
        cols[20].objects = object::RADAR;
        cols[60].objects = object::DROP;
        let scaled = scale_columns(&cols, 0.5);
        assert_eq!(scaled.len(), 50);
        assert!(scaled[10].has_object(object::RADAR));
        assert!(scaled[30].has_object(object::DROP));
    }
}
