//! Terrain model: one column per horizontal pixel position.
//!
//! Built once per level by the file loader or the procedural generator,
//! then read-only during play except for object-mask bits cleared as
//! objects are instantiated into live entities.

use crate::render::Color;

/// Object-kind bits carried per column. At most one object occupies a
/// column; placement enforces minimum spacing.
pub mod object {
    pub const ROCKET: u32 = 1 << 0;
    pub const DROP: u32 = 1 << 1;
    pub const BADY: u32 = 1 << 2;
    pub const CUMULUS: u32 = 1 << 3;
    pub const RADAR: u32 = 1 << 4;
    pub const PHASER: u32 = 1 << 5;
    pub const COLOR_CHANGE: u32 = 1 << 6;

    /// Every bit that spawns a live entity (color change is a paint
    /// marker, not an object).
    pub const ANY_ENTITY: u32 = ROCKET | DROP | BADY | CUMULUS | RADAR | PHASER;
}

/// Localized palette override, active from its column onward until the
/// next marker. An all-zero triple in the file means "restore base".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChange {
    pub bg: Color,
    pub ground: Color,
    pub sky: Color,
}

impl ColorChange {
    pub fn is_restore(&self) -> bool {
        self.bg == Color(0) && self.ground == Color(0) && self.sky == Color(0)
    }
}

/// One horizontal slice of the world.
#[derive(Debug, Clone, Copy)]
pub struct TerrainColumn {
    /// Ground height in pixels up from the bottom edge; always >= 0
    pub ground: i32,
    /// Sky (ceiling) height down from the top edge; -1 = no sky
    pub sky: i32,
    /// Object-kind bits present at this column
    pub objects: u32,
    /// Palette override, meaningful only with the COLOR_CHANGE bit set
    pub color_change: Option<ColorChange>,
}

impl TerrainColumn {
    pub fn new(ground: i32, sky: i32) -> Self {
        Self {
            ground,
            sky,
            objects: 0,
            color_change: None,
        }
    }

    pub fn has_object(&self, bit: u32) -> bool {
        self.objects & bit != 0
    }

    /// Clear an object bit once its entity has been instantiated.
    pub fn take_object(&mut self, bit: u32) {
        self.objects &= !bit;
    }
}

/// Level-wide palette. Alternate colors give repeat playthroughs a fresh
/// look, selected by the profile's completion count.
#[derive(Debug, Clone)]
pub struct Palette {
    pub bg: Vec<Color>,
    pub ground: Vec<Color>,
    pub sky: Vec<Color>,
    pub outline_width: i32,
    pub outline_ground: Color,
    pub outline_sky: Color,
}

impl Palette {
    pub fn flat(bg: Color, ground: Color, sky: Color) -> Self {
        Self {
            bg: vec![bg],
            ground: vec![ground],
            sky: vec![sky],
            outline_width: 0,
            outline_ground: Color::BLACK,
            outline_sky: Color::BLACK,
        }
    }

    fn pick(list: &[Color], completed: u32) -> Color {
        if list.is_empty() {
            return Color::BLACK;
        }
        list[completed as usize % list.len()]
    }

    pub fn bg_for(&self, completed: u32) -> Color {
        Self::pick(&self.bg, completed)
    }

    pub fn ground_for(&self, completed: u32) -> Color {
        Self::pick(&self.ground, completed)
    }

    pub fn sky_for(&self, completed: u32) -> Color {
        Self::pick(&self.sky, completed)
    }
}

/// The whole level's worth of columns plus its palette and zone flags.
#[derive(Debug, Clone)]
pub struct Terrain {
    pub columns: Vec<TerrainColumn>,
    pub palette: Palette,
    /// Skip the flat scroll-in padding (level starts on real terrain)
    pub no_scrollin_zone: bool,
    /// Skip the flat scroll-out padding
    pub no_scrollout_zone: bool,
}

impl Terrain {
    pub fn new(palette: Palette) -> Self {
        Self {
            columns: Vec::new(),
            palette,
            no_scrollin_zone: false,
            no_scrollout_zone: false,
        }
    }

    pub fn len(&self) -> i32 {
        self.columns.len() as i32
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, x: i32) -> Option<&TerrainColumn> {
        if x < 0 {
            return None;
        }
        self.columns.get(x as usize)
    }

    /// Final committed scroll offset: the level is done once this much of
    /// the terrain has scrolled past.
    pub fn final_offset(&self, viewport_w: i32) -> i32 {
        (self.len() - viewport_w).max(0)
    }

    /// Append the scroll-in / scroll-out padding zones: flat, object-free
    /// copies of the first/last real column, one viewport wide each, so
    /// the craft never spawns into an obstacle and never finishes
    /// mid-obstacle. Honors the zone flags.
    pub fn push_scroll_zones(&mut self, viewport_w: i32) {
        if self.columns.is_empty() {
            return;
        }
        if !self.no_scrollin_zone {
            let mut first = self.columns[0];
            first.objects = 0;
            first.color_change = None;
            let mut padded = vec![first; viewport_w as usize];
            padded.append(&mut self.columns);
            self.columns = padded;
        }
        if !self.no_scrollout_zone
            && let Some(&tail) = self.columns.last()
        {
            let mut last = tail;
            last.objects = 0;
            last.color_change = None;
            self.columns
                .extend(std::iter::repeat_n(last, viewport_w as usize));
        }
    }

    /// Mirror the column sequence for reversed play direction, re-pairing
    /// color-change markers so the same visual transitions occur in
    /// mirrored order.
    ///
    /// In forward play a marker at column `x` paints everything from `x`
    /// rightward until the next marker. After a plain reversal the marker
    /// would sit at the *end* of its span, painting the wrong side. So
    /// each reversed marker takes the palette of the marker that preceded
    /// it in the original order (base palette for the first), and the tail
    /// span is closed with a restore marker.
    pub fn reverse(&mut self) {
        let marker_cols: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.has_object(object::COLOR_CHANGE))
            .map(|(i, _)| i)
            .collect();

        if !marker_cols.is_empty() {
            // Shift palettes one marker to the right; the first span after
            // reversal shows the last original palette already, so the
            // first original marker becomes a restore.
            let palettes: Vec<Option<ColorChange>> = marker_cols
                .iter()
                .map(|&i| self.columns[i].color_change)
                .collect();
            for (k, &i) in marker_cols.iter().enumerate() {
                self.columns[i].color_change = if k == 0 {
                    Some(ColorChange {
                        bg: Color(0),
                        ground: Color(0),
                        sky: Color(0),
                    })
                } else {
                    palettes[k - 1]
                };
            }
            // The last original span's palette must be active from the
            // reversed start: seed it at column 0 unless one sits there.
            if let Some(&last_palette) = palettes.last()
                && marker_cols.first() != Some(&0)
            {
                let tail = self.columns.len() - 1;
                let first = &mut self.columns[tail];
                // Will land at column 0 after the reversal below.
                first.objects |= object::COLOR_CHANGE;
                first.color_change = last_palette;
            }
        }

        self.columns.reverse();
    }

    /// Terrain invariants per column; generation and loading both funnel
    /// through this.
    pub fn check_invariants(&self, viewport_w: i32, viewport_h: i32) -> bool {
        self.len() >= 2 * viewport_w
            && self
                .columns
                .iter()
                .all(|c| c.ground >= 0 && c.sky < viewport_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_terrain(n: usize) -> Terrain {
        let mut t = Terrain::new(Palette::flat(
            Color::rgb(0, 0, 40),
            Color::rgb(0, 120, 0),
            Color::rgb(90, 90, 90),
        ));
        t.columns = vec![TerrainColumn::new(50, -1); n];
        t
    }

    #[test]
    fn scroll_zones_pad_both_ends() {
        let mut t = flat_terrain(100);
        t.columns[0].objects = object::ROCKET;
        t.push_scroll_zones(80);
        assert_eq!(t.len(), 100 + 2 * 80);
        // Padding is object-free even when the copied column had one
        assert_eq!(t.columns[0].objects, 0);
        assert_eq!(t.columns[79].objects, 0);
        assert_eq!(t.columns[80].objects, object::ROCKET);
    }

    #[test]
    fn zone_flags_suppress_padding() {
        let mut t = flat_terrain(100);
        t.no_scrollin_zone = true;
        t.push_scroll_zones(80);
        assert_eq!(t.len(), 180);
    }

    #[test]
    fn final_offset_accounts_for_viewport() {
        let mut t = flat_terrain(100);
        t.push_scroll_zones(80);
        assert_eq!(t.final_offset(80), 260 - 80);
    }

    #[test]
    fn reverse_mirrors_columns() {
        let mut t = flat_terrain(10);
        t.columns[3].ground = 99;
        t.reverse();
        assert_eq!(t.columns[6].ground, 99);
    }

    #[test]
    fn reverse_repairs_color_changes() {
        let mut t = flat_terrain(100);
        let red = ColorChange {
            bg: Color::rgb(255, 0, 0),
            ground: Color::rgb(255, 0, 0),
            sky: Color::rgb(255, 0, 0),
        };
        t.columns[40].objects |= object::COLOR_CHANGE;
        t.columns[40].color_change = Some(red);
        t.reverse();

        // The reversed start shows the final original palette (red),
        // seeded at column 0.
        let first_marker = t
            .columns
            .iter()
            .position(|c| c.has_object(object::COLOR_CHANGE))
            .unwrap();
        assert_eq!(first_marker, 0);
        assert_eq!(t.columns[0].color_change, Some(red));
        // The original marker, now at mirrored position, restores base.
        let mirrored = 99 - 40;
        assert!(t.columns[mirrored].has_object(object::COLOR_CHANGE));
        assert!(t.columns[mirrored].color_change.unwrap().is_restore());
    }

    #[test]
    fn invariants_hold_for_padded_flat_terrain() {
        let mut t = flat_terrain(100);
        t.push_scroll_zones(80);
        assert!(t.check_invariants(80, 600));
        assert!(!flat_terrain(10).check_invariants(80, 600));
    }
}
