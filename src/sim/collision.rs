//! Collision engine.
//!
//! Two mechanisms, both pixel-accurate:
//!
//! 1. Entity vs entity: a cheap AABB pre-test, then a scan of the
//!    overlapping sub-rectangle for any pixel pair where both sprites are
//!    opaque. Symmetric by construction; the pixel pass never runs when
//!    the rectangles are disjoint.
//! 2. Craft vs terrain: a readback of the just-rendered frame under the
//!    craft's bounding box, compared against the background color active
//!    at each column.
//!    Testing the composited frame means outlines, color changes and any
//!    decorative layer all count as terrain for free. Ordering contract:
//!    terrain and non-craft entities are drawn first, this test samples,
//!    the craft is drawn last.

use super::entity::Entity;
use crate::render::{Color, DrawSurface};

/// Intersection of two (x, y, w, h) rectangles.
pub fn rect_overlap(
    a: (i32, i32, i32, i32),
    b: (i32, i32, i32, i32),
) -> Option<(i32, i32, i32, i32)> {
    let x0 = a.0.max(b.0);
    let y0 = a.1.max(b.1);
    let x1 = (a.0 + a.2).min(b.0 + b.2);
    let y1 = (a.1 + a.3).min(b.1 + b.3);
    if x1 > x0 && y1 > y0 {
        Some((x0, y0, x1 - x0, y1 - y0))
    } else {
        None
    }
}

/// Outcome of an entity pair test. `pixel_tested` exposes whether the
/// authoritative scan ran, so tests can assert the AABB pre-test gates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Touch {
    pub hit: bool,
    pub pixel_tested: bool,
}

/// Authoritative touch test between two entities.
pub fn entities_touch(a: &Entity, b: &Entity) -> Touch {
    let Some((ox, oy, ow, oh)) = rect_overlap(a.rect(), b.rect()) else {
        return Touch {
            hit: false,
            pixel_tested: false,
        };
    };
    let a_tl = a.top_left();
    let b_tl = b.top_left();
    for y in oy..oy + oh {
        for x in ox..ox + ow {
            let ax = x - a_tl.x as i32;
            let ay = y - a_tl.y as i32;
            let bx = x - b_tl.x as i32;
            let by = y - b_tl.y as i32;
            if !a.is_transparent(ax, ay) && !b.is_transparent(bx, by) {
                return Touch {
                    hit: true,
                    pixel_tested: true,
                };
            }
        }
    }
    Touch {
        hit: false,
        pixel_tested: true,
    }
}

/// Convenience wrapper for call sites that only need the verdict.
pub fn collides(a: &Entity, b: &Entity) -> bool {
    entities_touch(a, b).hit
}

/// Craft-vs-terrain test against the rendered frame.
///
/// `screen_x`/`screen_y` is the craft's top-left in screen coordinates.
/// `background` holds the background color per craft column (index 0 is
/// the craft's left edge), so a color-change marker under the craft
/// compares each pixel against the color actually painted at its column.
/// Every craft-opaque pixel whose underlying frame pixel differs from its
/// column's background is a hit. The sampled region is clipped to the
/// surface; a fully off-screen craft cannot collide.
pub fn craft_hits_terrain(
    surface: &dyn DrawSurface,
    craft: &Entity,
    screen_x: i32,
    screen_y: i32,
    background: &[Color],
) -> bool {
    let (pixels, w, h) = surface.read_rect(screen_x, screen_y, craft.w(), craft.h());
    if pixels.is_empty() {
        return false;
    }
    // read_rect clips; recover the offset of the clipped region within
    // the craft's box.
    let off_x = (-screen_x).max(0);
    let off_y = (-screen_y).max(0);
    for y in 0..h {
        for x in 0..w {
            let cx = x + off_x;
            let Some(&bg) = background.get(cx as usize) else {
                continue;
            };
            if pixels[(y * w + x) as usize] != bg && !craft.is_transparent(cx, y + off_y) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FrameBuffer;
    use crate::sim::entity::EntityKind;
    use crate::sim::sprite::Sprite;
    use glam::Vec2;
    use std::rc::Rc;

    fn entity_with_rows(rows: &[&str], x: f32, y: f32) -> Entity {
        Entity::new(
            EntityKind::Rocket,
            Vec2::new(x, y),
            Rc::new(Sprite::from_rows(rows)),
        )
    }

    fn solid(w: i32, h: i32, x: f32, y: f32) -> Entity {
        Entity::new(
            EntityKind::Rocket,
            Vec2::new(x, y),
            Rc::new(Sprite::solid(w, h)),
        )
    }

    #[test]
    fn disjoint_rects_skip_pixel_test() {
        let a = solid(10, 10, 0.0, 0.0);
        let b = solid(10, 10, 100.0, 100.0);
        let t = entities_touch(&a, &b);
        assert!(!t.hit);
        assert!(!t.pixel_tested);
    }

    #[test]
    fn overlapping_solids_touch() {
        let a = solid(10, 10, 0.0, 0.0);
        let b = solid(10, 10, 5.0, 5.0);
        let t = entities_touch(&a, &b);
        assert!(t.hit && t.pixel_tested);
    }

    #[test]
    fn transparent_padding_does_not_touch() {
        // Two L-shapes whose boxes overlap but opaque pixels do not
        let a = entity_with_rows(
            &[
                "##..", //
                "##..", //
                "....", //
                "....",
            ],
            2.0,
            2.0,
        );
        let b = entity_with_rows(
            &[
                "....", //
                "....", //
                "..##", //
                "..##",
            ],
            3.0,
            3.0,
        );
        let t = entities_touch(&a, &b);
        assert!(t.pixel_tested);
        assert!(!t.hit);
    }

    #[test]
    fn touch_is_symmetric() {
        let cases = [
            (solid(10, 10, 5.0, 5.0), solid(8, 8, 9.0, 9.0)),
            (solid(10, 10, 0.0, 0.0), solid(10, 10, 100.0, 0.0)),
            (
                entity_with_rows(&["#.", ".#"], 1.0, 1.0),
                entity_with_rows(&[".#", "#."], 2.0, 1.0),
            ),
        ];
        for (a, b) in &cases {
            assert_eq!(entities_touch(a, b).hit, entities_touch(b, a).hit);
        }
    }

    #[test]
    fn craft_collides_with_non_background_pixels() {
        let bg = Color::rgb(0, 0, 40);
        let ground = Color::rgb(0, 120, 0);
        let mut fb = FrameBuffer::new(100, 100);
        fb.clear(bg);
        // Terrain strip along the bottom
        fb.fill_rect(0, 80, 100, 20, ground);

        let craft = solid(10, 6, 0.0, 0.0);
        // Craft fully over background: clean
        assert!(!craft_hits_terrain(&fb, &craft, 20, 20, &[bg; 10]));
        // Craft overlapping the strip: hit
        assert!(craft_hits_terrain(&fb, &craft, 20, 78, &[bg; 10]));
    }

    #[test]
    fn readback_honors_per_column_background() {
        // Frame painted in two background colors split at x=25
        let old_bg = Color::rgb(0, 0, 40);
        let new_bg = Color::rgb(60, 0, 0);
        let mut fb = FrameBuffer::new(50, 50);
        fb.clear(old_bg);
        fb.fill_rect(25, 0, 25, 50, new_bg);

        // Craft straddling the split, open background on both sides
        let craft = solid(10, 6, 0.0, 0.0);
        let span: Vec<Color> = (0..10)
            .map(|i| if 20 + i < 25 { old_bg } else { new_bg })
            .collect();
        assert!(!craft_hits_terrain(&fb, &craft, 20, 10, &span));
        // A single-color span misreads the other half as terrain
        assert!(craft_hits_terrain(&fb, &craft, 20, 10, &[old_bg; 10]));
    }

    #[test]
    fn craft_transparent_pixels_do_not_collide() {
        let bg = Color::rgb(10, 10, 10);
        let mut fb = FrameBuffer::new(50, 50);
        fb.clear(bg);
        fb.fill_rect(0, 0, 50, 2, Color::WHITE);

        // Opaque only in the bottom row
        let craft = entity_with_rows(
            &[
                "....", //
                "....", //
                "####",
            ],
            0.0,
            0.0,
        );
        // Box overlaps the white strip but only transparent rows do
        assert!(!craft_hits_terrain(&fb, &craft, 10, 0, &[bg; 4]));
        // Shifted up so the opaque row lands on the strip... it cannot;
        // instead paint a strip under the opaque row
        fb.fill_rect(0, 12, 50, 2, Color::WHITE);
        assert!(craft_hits_terrain(&fb, &craft, 10, 10, &[bg; 4]));
    }

    #[test]
    fn offscreen_readback_is_guarded() {
        let bg = Color::BLACK;
        let fb = FrameBuffer::new(50, 50);
        let craft = solid(10, 10, 0.0, 0.0);
        assert!(!craft_hits_terrain(&fb, &craft, -200, -200, &[bg; 10]));
        assert!(!craft_hits_terrain(&fb, &craft, 60, 60, &[bg; 10]));
    }

    #[test]
    fn clipped_readback_maps_craft_pixels() {
        let bg = Color::rgb(1, 2, 3);
        let mut fb = FrameBuffer::new(50, 50);
        fb.clear(bg);
        fb.fill_rect(0, 0, 2, 50, Color::WHITE);

        // Craft opaque only on its right half
        let craft = entity_with_rows(
            &[
                "..##", //
                "..##",
            ],
            0.0,
            0.0,
        );
        // Craft half off the left edge: its right (opaque) half sits over
        // the white column at x=0..2
        assert!(craft_hits_terrain(&fb, &craft, -2, 10, &[bg; 4]));
        // Fully on-screen past the white columns: clean
        assert!(!craft_hits_terrain(&fb, &craft, 10, 10, &[bg; 4]));
    }
}
