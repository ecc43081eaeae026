//! Drawing-surface seam between the core and whatever actually renders.
//!
//! The engine never talks to a window. It draws into a [`DrawSurface`] and,
//! once per tick, reads a rectangle back for the craft-vs-terrain collision
//! test. [`FrameBuffer`] is the in-memory implementation used by the
//! headless driver and the tests.

use crate::sim::sprite::Sprite;

/// Packed color, RGB in the high three bytes (`0xRRGGBB00`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0);
    pub const WHITE: Color = Color(0xFFFF_FF00);

    /// Build from 8-bit channels.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8))
    }

    /// Normalize a raw numeric color from a level file. Values that fit in
    /// 24 bits and are not already byte-aligned (low byte zero) are treated
    /// as packed RGB888 and shifted into the high bytes.
    pub fn from_raw(raw: u32) -> Self {
        if raw <= 0x00FF_FFFF && raw & 0xFF != 0 {
            Color(raw << 8)
        } else {
            Color(raw)
        }
    }
}

/// What the core needs from a renderer. Implementations must honor the
/// two-pass contract in `sim::collision`: the region read back reflects
/// everything drawn so far, and nothing else.
pub trait DrawSurface {
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    /// Fill an axis-aligned rectangle. Coordinates may extend past the
    /// surface; implementations clip.
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color);

    /// Blit one animation frame of a sprite; transparent pixels are
    /// skipped.
    fn blit(&mut self, sprite: &Sprite, frame: u32, x: i32, y: i32, color: Color);

    /// Copy out a clipped rectangle of pixels, row-major. The returned
    /// width/height are the clipped dimensions; a fully off-surface request
    /// yields an empty buffer rather than an error.
    fn read_rect(&self, x: i32, y: i32, w: i32, h: i32) -> (Vec<Color>, i32, i32);
}

/// Plain in-memory RGB surface.
pub struct FrameBuffer {
    w: i32,
    h: i32,
    pixels: Vec<Color>,
}

impl FrameBuffer {
    pub fn new(w: i32, h: i32) -> Self {
        Self {
            w,
            h,
            pixels: vec![Color::BLACK; (w.max(0) * h.max(0)) as usize],
        }
    }

    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x >= self.w || y >= self.h {
            return None;
        }
        Some(self.pixels[(y * self.w + x) as usize])
    }

    fn set(&mut self, x: i32, y: i32, color: Color) {
        if x >= 0 && y >= 0 && x < self.w && y < self.h {
            self.pixels[(y * self.w + x) as usize] = color;
        }
    }
}

impl DrawSurface for FrameBuffer {
    fn width(&self) -> i32 {
        self.w
    }

    fn height(&self) -> i32 {
        self.h
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.w);
        let y1 = (y + h).min(self.h);
        for yy in y0..y1 {
            for xx in x0..x1 {
                self.pixels[(yy * self.w + xx) as usize] = color;
            }
        }
    }

    fn blit(&mut self, sprite: &Sprite, frame: u32, x: i32, y: i32, color: Color) {
        for sy in 0..sprite.height() {
            for sx in 0..sprite.width() {
                if !sprite.is_transparent(frame, sx, sy) {
                    self.set(x + sx, y + sy, color);
                }
            }
        }
    }

    fn read_rect(&self, x: i32, y: i32, w: i32, h: i32) -> (Vec<Color>, i32, i32) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.w);
        let y1 = (y + h).min(self.h);
        if x1 <= x0 || y1 <= y0 {
            return (Vec::new(), 0, 0);
        }
        let cw = x1 - x0;
        let ch = y1 - y0;
        let mut out = Vec::with_capacity((cw * ch) as usize);
        for yy in y0..y1 {
            let row = (yy * self.w) as usize;
            out.extend_from_slice(&self.pixels[row + x0 as usize..row + x1 as usize]);
        }
        (out, cw, ch)
    }
}
