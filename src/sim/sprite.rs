//! Sprite masks and the asset cache.
//!
//! Real image decoding lives outside the core; what the simulation needs
//! from a sprite is its size, frame count, and a per-pixel transparency
//! query for the collision engine. Sprites here are alpha masks, either
//! synthesized (headless/tests) or handed in by the host's loader.

use std::collections::HashMap;
use std::rc::Rc;

/// One drawable, possibly multi-frame sprite mask.
///
/// Frames are stored side by side: the mask is `width * frames` columns
/// wide and `is_transparent` addresses pixels frame-locally.
#[derive(Debug, Clone)]
pub struct Sprite {
    w: i32,
    h: i32,
    frames: u32,
    /// Delay between animation frames, in ticks
    frame_delay: u32,
    /// Row-major opacity mask covering all frames, true = opaque
    mask: Vec<bool>,
}

impl Sprite {
    /// Build from a full-width mask (all frames side by side).
    pub fn from_mask(w: i32, h: i32, frames: u32, frame_delay: u32, mask: Vec<bool>) -> Self {
        debug_assert_eq!(mask.len(), (w * frames as i32 * h) as usize);
        Self {
            w,
            h,
            frames: frames.max(1),
            frame_delay,
            mask,
        }
    }

    /// Fully opaque single-frame rectangle.
    pub fn solid(w: i32, h: i32) -> Self {
        Self::from_mask(w, h, 1, 0, vec![true; (w * h) as usize])
    }

    /// Single-frame sprite from rows of `#` (opaque) and `.` characters,
    /// the format the tests author craft in.
    pub fn from_rows(rows: &[&str]) -> Self {
        let h = rows.len() as i32;
        let w = rows.first().map_or(0, |r| r.len()) as i32;
        let mut mask = Vec::with_capacity((w * h) as usize);
        for row in rows {
            debug_assert_eq!(row.len() as i32, w);
            mask.extend(row.chars().map(|c| c == '#'));
        }
        Self::from_mask(w, h, 1, 0, mask)
    }

    pub fn width(&self) -> i32 {
        self.w
    }

    pub fn height(&self) -> i32 {
        self.h
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn frame_delay(&self) -> u32 {
        self.frame_delay
    }

    /// Transparency query against one animation frame. Out-of-bounds
    /// pixels are transparent.
    pub fn is_transparent(&self, frame: u32, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.w || y >= self.h {
            return true;
        }
        let frame = (frame % self.frames) as i32;
        let stride = self.w * self.frames as i32;
        !self.mask[(y * stride + frame * self.w + x) as usize]
    }

    /// Topmost opaque pixel in a column of frame 0, if any. The craft's
    /// nose attachment point comes from this.
    pub fn top_opaque_in_column(&self, x: i32) -> Option<i32> {
        (0..self.h).find(|&y| !self.is_transparent(0, x, y))
    }

    /// Bottommost opaque pixel in a column of frame 0 (belly attachment).
    pub fn bottom_opaque_in_column(&self, x: i32) -> Option<i32> {
        (0..self.h).rev().find(|&y| !self.is_transparent(0, x, y))
    }

    /// Rightmost column containing any opaque pixel.
    pub fn right_opaque_extent(&self) -> Option<i32> {
        (0..self.w)
            .rev()
            .find(|&x| (0..self.h).any(|y| !self.is_transparent(0, x, y)))
    }
}

/// Decode an animation hint of the form `name_<frames>x<delay>` from an
/// asset name, e.g. `radar_14x4`. Names without a hint are single-frame.
pub fn parse_animation_hint(name: &str) -> (u32, u32) {
    let Some(tail) = name.rsplit('_').next() else {
        return (1, 0);
    };
    let Some((frames, delay)) = tail.split_once('x') else {
        return (1, 0);
    };
    match (frames.parse::<u32>(), delay.parse::<u32>()) {
        (Ok(f), Ok(d)) if f > 0 => (f, d),
        _ => (1, 0),
    }
}

/// Explicit sprite cache service. Hosts register decoded masks once; the
/// sim looks them up by name and shares handles.
#[derive(Default)]
pub struct AssetCache {
    sprites: HashMap<String, Rc<Sprite>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sprite under a name, applying any animation hint the
    /// name carries. Returns the shared handle.
    pub fn insert(&mut self, name: &str, mut sprite: Sprite) -> Rc<Sprite> {
        if sprite.frames == 1 {
            let (frames, delay) = parse_animation_hint(name);
            if frames > 1 && sprite.w % frames as i32 == 0 {
                sprite.frames = frames;
                sprite.frame_delay = delay;
                sprite.w /= frames as i32;
            }
        }
        let rc = Rc::new(sprite);
        self.sprites.insert(name.to_string(), Rc::clone(&rc));
        rc
    }

    pub fn get(&self, name: &str) -> Option<Rc<Sprite>> {
        self.sprites.get(name).cloned()
    }

    /// Fetch a sprite, synthesizing a solid placeholder of the given size
    /// when the host never registered one. Headless runs take this path
    /// for every sprite.
    pub fn get_or_solid(&mut self, name: &str, w: i32, h: i32) -> Rc<Sprite> {
        if let Some(s) = self.get(name) {
            return s;
        }
        self.insert(name, Sprite::solid(w, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_hint_parsing() {
        assert_eq!(parse_animation_hint("radar_14x4"), (14, 4));
        assert_eq!(parse_animation_hint("rocket"), (1, 0));
        assert_eq!(parse_animation_hint("phaser_3x10"), (3, 10));
        assert_eq!(parse_animation_hint("bad_0x4"), (1, 0));
    }

    #[test]
    fn hint_splits_frames_on_insert() {
        let mut cache = AssetCache::new();
        let s = cache.insert("scan_4x2", Sprite::solid(40, 10));
        assert_eq!(s.width(), 10);
        assert_eq!(s.frames(), 4);
        assert_eq!(s.frame_delay(), 2);
    }

    #[test]
    fn transparency_and_extents() {
        let s = Sprite::from_rows(&[
            "..##..", //
            ".####.", //
            "######", //
        ]);
        assert!(s.is_transparent(0, 0, 0));
        assert!(!s.is_transparent(0, 2, 0));
        assert!(s.is_transparent(0, -1, 0));
        assert_eq!(s.top_opaque_in_column(2), Some(0));
        assert_eq!(s.top_opaque_in_column(0), Some(2));
        assert_eq!(s.bottom_opaque_in_column(5), Some(2));
        assert_eq!(s.right_opaque_extent(), Some(5));
    }
}
