//! Moving game objects and their per-tick behavior.
//!
//! One `Entity` struct with an `EntityKind` tag replaces the original's
//! virtual hierarchy; kind-specific update rules live in `step_*` methods
//! dispatched from [`Entity::update`]. Explosions are a separate
//! non-interactive type since nothing collides with them.
//!
//! Screen coordinates: y grows downward, the ground line at a column is
//! `viewport_h - ground`, the sky (ceiling) line is `sky`.

use std::rc::Rc;

use glam::Vec2;

use super::params::LevelParams;
use super::sprite::Sprite;
use crate::audio::Sound;
use crate::consts::ROCKET_LIFT_CAP;
use crate::prng::Lcg16;

/// Entity kind tag. Order is cosmetic; collections are kept per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Craft,
    Rocket,
    Radar,
    Drop,
    Bady,
    Cumulus,
    Phaser,
    Missile,
    Bomb,
}

/// Everything an entity update may touch outside the entity itself.
pub struct UpdateCtx<'a> {
    pub params: &'a LevelParams,
    /// Level stream; every draw here is demo-recorded
    pub rng: &'a mut Lcg16,
    pub viewport_h: i32,
    /// Screen y of the ground line at the entity's column
    pub ground_y: f32,
    /// Screen y of the sky (ceiling) line at the entity's column, or -1.0
    pub sky_y: f32,
    /// Craft center x in world coordinates
    pub craft_x: f32,
    /// Sound requests emitted this tick, drained by the session
    pub sounds: &'a mut Vec<Sound>,
}

impl UpdateCtx<'_> {
    fn has_sky(&self) -> bool {
        self.sky_y >= 0.0
    }
}

/// One moving game object.
#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    /// Center position, world x / screen y
    pub pos: Vec2,
    pub sprite: Rc<Sprite>,
    /// Animation frame offset; radar scanning, phaser charge swaps
    pub frame: u32,
    /// Base speed scalar, sampled from level params at spawn
    pub speed: f32,
    /// Ticks since `start()`, drives acceleration curves
    pub state_ticks: u32,
    pub started: bool,
    pub exploding: bool,
    pub exploded: bool,
    /// Trigger roll failed and the latch tunable is on; never retried
    pub nostart: bool,
    /// Damage accumulator
    pub hits: i32,
    /// Kind-specific value sampled once at spawn: trigger distance for
    /// rockets and drops, hit budget for badies
    pub data1: f32,
    /// Kind-specific slot: explosion countdown, phaser cycle position
    pub data2: f32,
    /// Vertical direction for oscillating kinds, velocity for bombs
    pub vel: Vec2,
}

impl Entity {
    pub fn new(kind: EntityKind, pos: Vec2, sprite: Rc<Sprite>) -> Self {
        Self {
            kind,
            pos,
            sprite,
            frame: 0,
            speed: 1.0,
            state_ticks: 0,
            started: false,
            exploding: false,
            exploded: false,
            nostart: false,
            hits: 0,
            data1: 0.0,
            data2: 0.0,
            vel: Vec2::ZERO,
        }
    }

    pub fn w(&self) -> i32 {
        self.sprite.width()
    }

    pub fn h(&self) -> i32 {
        self.sprite.height()
    }

    /// Top-left corner in world coordinates.
    pub fn top_left(&self) -> Vec2 {
        self.pos - Vec2::new(self.w() as f32 / 2.0, self.h() as f32 / 2.0)
    }

    /// Axis-aligned bounds as (x, y, w, h).
    pub fn rect(&self) -> (i32, i32, i32, i32) {
        let tl = self.top_left();
        (tl.x as i32, tl.y as i32, self.w(), self.h())
    }

    /// Pixel transparency in entity-local coordinates, current frame.
    pub fn is_transparent(&self, x: i32, y: i32) -> bool {
        self.sprite.is_transparent(self.frame, x, y)
    }

    /// Whether this entity takes part in collision tests.
    pub fn interactive(&self) -> bool {
        !self.exploding && !self.exploded
    }

    /// Begin the started lifecycle phase. Idempotent; the launch sound
    /// plays only on the first call.
    pub fn start(&mut self, speed: f32, sounds: &mut Vec<Sound>) {
        if self.started {
            return;
        }
        self.started = true;
        self.speed = speed;
        self.state_ticks = 0;
        if let Some(sound) = self.start_sound() {
            sounds.push(sound);
        }
    }

    fn start_sound(&self) -> Option<Sound> {
        match self.kind {
            EntityKind::Rocket => Some(Sound::RocketLaunch),
            EntityKind::Drop => Some(Sound::Drop),
            EntityKind::Missile => Some(Sound::Missile),
            EntityKind::Bomb => Some(Sound::Bomb),
            _ => None,
        }
    }

    /// Switch to the exploding phase for `duration` ticks. No-op when
    /// already exploding or spent.
    pub fn explode(&mut self, duration: u32) {
        if self.exploding || self.exploded {
            return;
        }
        self.exploding = true;
        self.data2 = duration as f32;
    }

    /// Register a hit. Returns true when the hit was lethal.
    pub fn on_hit(&mut self, lethal_hits: i32) -> bool {
        self.hits += 1;
        match self.kind {
            // Radar keeps scanning until the first hit, dies at two
            EntityKind::Radar => self.hits >= 2,
            EntityKind::Bady => {
                // Sprite swap as the near-lethal cue
                if self.hits == lethal_hits - 1 {
                    self.frame = self.sprite.frames().saturating_sub(1);
                }
                self.hits >= lethal_hits
            }
            _ => true,
        }
    }

    /// One simulation tick. Exploding entities only count down.
    pub fn update(&mut self, ctx: &mut UpdateCtx) {
        if self.exploded {
            return;
        }
        if self.exploding {
            self.data2 -= 1.0;
            if self.data2 <= 0.0 {
                self.exploding = false;
                self.exploded = true;
            }
            return;
        }
        match self.kind {
            // Craft movement is input-driven in the session tick
            EntityKind::Craft => {}
            EntityKind::Rocket => self.step_rocket(ctx),
            EntityKind::Radar => self.step_radar(),
            EntityKind::Drop => self.step_drop(ctx),
            EntityKind::Bady => self.step_oscillate(ctx, true),
            EntityKind::Cumulus => self.step_oscillate(ctx, false),
            EntityKind::Phaser => self.step_phaser(ctx),
            EntityKind::Missile => self.step_missile(),
            EntityKind::Bomb => self.step_bomb(),
        }
    }

    /// Per-tick trigger check. Rockets and drops roll once the craft is
    /// within the precomputed distance; badies and cumuli roll from the
    /// moment they spawn ahead of the viewport. With the latch tunable a
    /// single failed roll suppresses the entity for good.
    pub fn maybe_start(&mut self, ctx: &mut UpdateCtx) {
        if self.started || self.nostart {
            return;
        }
        let (prob, speed_range) = match self.kind {
            EntityKind::Rocket => (ctx.params.rocket_start_prob, ctx.params.rocket_start_speed),
            EntityKind::Drop => (ctx.params.drop_start_prob, ctx.params.drop_start_speed),
            EntityKind::Bady => (ctx.params.bady_start_prob, ctx.params.bady_speed),
            EntityKind::Cumulus => (ctx.params.cumulus_start_prob, ctx.params.cumulus_speed),
            _ => return,
        };
        let in_range = match self.kind {
            EntityKind::Rocket | EntityKind::Drop => {
                (self.pos.x - ctx.craft_x).abs() <= self.data1
            }
            _ => true,
        };
        if !in_range {
            return;
        }
        if ctx.rng.percent(prob) {
            let speed = speed_range.sample(ctx.rng) as f32;
            self.start(speed, ctx.sounds);
        } else if ctx.params.nostart_latch {
            self.nostart = true;
        }
    }

    /// Rocket rise per tick: `min(cap, (1 + ticks/10) * speed)`.
    pub fn rocket_lift(&self) -> f32 {
        ((1.0 + self.state_ticks as f32 / 10.0) * self.speed).min(ROCKET_LIFT_CAP)
    }

    fn step_rocket(&mut self, ctx: &mut UpdateCtx) {
        if !self.started {
            return;
        }
        self.pos.y -= self.rocket_lift();
        self.state_ticks += 1;
        // Passing above the sky line detonates the rocket
        if ctx.has_sky() && self.pos.y - self.h() as f32 / 2.0 < ctx.sky_y {
            self.explode(30);
        } else if self.pos.y + self.h() as f32 / 2.0 < 0.0 {
            self.exploded = true;
        }
    }

    fn step_radar(&mut self) {
        // Scanning animation halts after the first hit (damaged cue)
        if self.hits == 0 {
            self.state_ticks += 1;
            let delay = self.sprite.frame_delay().max(1);
            if self.state_ticks % delay == 0 {
                self.frame = (self.frame + 1) % self.sprite.frames();
            }
        }
    }

    fn step_drop(&mut self, ctx: &mut UpdateCtx) {
        if !self.started {
            return;
        }
        let fall = ((1.0 + self.state_ticks as f32 / 10.0) * self.speed).min(10.0);
        self.pos.y += fall;
        self.state_ticks += 1;
        // Splash when no further travel is possible
        if self.pos.y + self.h() as f32 / 2.0 >= ctx.ground_y {
            self.pos.y = ctx.ground_y - self.h() as f32 / 2.0;
            self.explode(12);
            ctx.sounds.push(Sound::Splash);
        }
    }

    /// Vertical oscillation between sky and ground lines. Badies may also
    /// drift horizontally on higher levels; cumuli are decorative.
    fn step_oscillate(&mut self, ctx: &mut UpdateCtx, is_bady: bool) {
        if !self.started {
            return;
        }
        if self.vel.y == 0.0 {
            self.vel.y = self.speed.max(0.5);
        }
        self.pos.y += self.vel.y;
        let top = if ctx.has_sky() { ctx.sky_y } else { 0.0 };
        let half_h = self.h() as f32 / 2.0;
        if self.pos.y + half_h >= ctx.ground_y {
            self.pos.y = ctx.ground_y - half_h;
            self.vel.y = -self.vel.y.abs();
        } else if self.pos.y - half_h <= top {
            self.pos.y = top + half_h;
            self.vel.y = self.vel.y.abs();
        }
        let drift = if is_bady {
            ctx.params.bady_x_drift
        } else {
            ctx.params.cumulus_x_drift
        };
        if drift {
            self.pos.x -= self.speed * 0.25;
        }
        self.state_ticks += 1;
    }

    /// Phaser cycle position lives in `data2`: idle, a charging sprite
    /// swap, then a short firing window rendering a beam to the sky line.
    fn step_phaser(&mut self, ctx: &mut UpdateCtx) {
        let cycle = ctx.params.phaser_cycle_ticks as f32;
        let was_firing = self.phaser_firing(ctx.params);
        self.data2 = (self.data2 + 1.0) % cycle;
        self.frame = if self.data2 >= cycle - 12.0 { 1 } else { 0 };
        if !was_firing && self.phaser_firing(ctx.params) {
            ctx.sounds.push(Sound::Phaser);
        }
        self.state_ticks += 1;
    }

    /// Firing window: the last 4 ticks of the cycle.
    pub fn phaser_firing(&self, params: &LevelParams) -> bool {
        self.data2 >= params.phaser_cycle_ticks as f32 - 4.0
    }

    fn step_missile(&mut self) {
        self.pos.x += self.speed;
        self.state_ticks += 1;
    }

    fn step_bomb(&mut self) {
        // Accelerating fall, forward drift decaying toward straight down
        self.vel.y = (self.vel.y + 0.12).min(8.0);
        self.vel.x *= 0.985;
        self.pos += self.vel;
        self.state_ticks += 1;
    }
}

/// Per-ship-skin tunables.
#[derive(Debug, Clone, Copy)]
pub struct ShipSkin {
    /// Horizontal offset of the bomb release point from the belly
    pub bomb_offset: f32,
    pub explosion_color: u32,
    pub missile_color: u32,
}

impl ShipSkin {
    pub fn for_index(ship: u32) -> Self {
        match ship % 2 {
            0 => Self {
                bomb_offset: 0.0,
                explosion_color: 0xFF60_0000,
                missile_color: 0xFFFF_FF00,
            },
            _ => Self {
                bomb_offset: 6.0,
                explosion_color: 0x60A0_FF00,
                missile_color: 0xC0FF_0000,
            },
        }
    }
}

/// The player craft: an entity with clamped directional movement and
/// attachment points derived once from the sprite's opaque extents.
#[derive(Debug, Clone)]
pub struct PlayerCraft {
    pub entity: Entity,
    pub skin: ShipSkin,
    /// Nose (missile launch) offset from the top-left corner
    pub nose: Vec2,
    /// Belly (bomb drop) offset from the top-left corner
    pub belly: Vec2,
}

impl PlayerCraft {
    /// Craft movement per tick in screen pixels.
    pub const MOVE_STEP: f32 = 4.0;

    pub fn new(sprite: Rc<Sprite>, skin: ShipSkin, pos: Vec2) -> Self {
        let nose_x = sprite.right_opaque_extent().unwrap_or(sprite.width() - 1);
        let nose_y = sprite
            .top_opaque_in_column(nose_x)
            .unwrap_or(sprite.height() / 2);
        let belly_x = sprite.width() / 2;
        let belly_y = sprite
            .bottom_opaque_in_column(belly_x)
            .unwrap_or(sprite.height() - 1);
        Self {
            entity: Entity::new(EntityKind::Craft, pos, sprite),
            skin,
            nose: Vec2::new(nose_x as f32, nose_y as f32),
            belly: Vec2::new(belly_x as f32 + skin.bomb_offset, belly_y as f32),
        }
    }

    /// Apply directional input, clamped to the viewport.
    pub fn steer(&mut self, dx: f32, dy: f32, viewport_w: i32, viewport_h: i32, scroll_x: f32) {
        let e = &mut self.entity;
        e.pos.x += dx * Self::MOVE_STEP;
        e.pos.y += dy * Self::MOVE_STEP;
        let half_w = e.w() as f32 / 2.0;
        let half_h = e.h() as f32 / 2.0;
        e.pos.x = e
            .pos
            .x
            .clamp(scroll_x + half_w, scroll_x + viewport_w as f32 - half_w);
        e.pos.y = e.pos.y.clamp(half_h, viewport_h as f32 - half_h);
    }

    /// World position of the missile launch point.
    pub fn nose_world(&self) -> Vec2 {
        self.entity.top_left() + self.nose
    }

    /// World position of the bomb release point.
    pub fn belly_world(&self) -> Vec2 {
        self.entity.top_left() + self.belly
    }
}

/// Explosion rendering variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplosionFlags {
    /// Particles keep falling after the burst
    pub fallout: bool,
    /// Random per-particle colors instead of the owner's tint
    pub multicolor: bool,
    /// Bias particle angles upward (ground splash)
    pub splash: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Speck {
    pub pos: Vec2,
    pub vel: Vec2,
    pub traveled: f32,
    pub max_travel: f32,
    pub color: u32,
}

/// Radial particle burst. Purely cosmetic: particle randomness draws from
/// the ambient stream so it never perturbs the recorded gameplay stream.
#[derive(Debug, Clone)]
pub struct Explosion {
    pub specks: Vec<Speck>,
    pub flags: ExplosionFlags,
}

fn sample_speck(pos: Vec2, base_color: u32, flags: ExplosionFlags, ambient: &mut Lcg16) -> Speck {
    let angle = if flags.splash {
        // Upward cone for ground splashes
        -std::f32::consts::PI * (0.25 + 0.5 * (ambient.next() % 1000) as f32 / 1000.0)
    } else {
        std::f32::consts::TAU * (ambient.next() % 1000) as f32 / 1000.0
    };
    let speed = 1.0 + (ambient.next() % 300) as f32 / 100.0;
    let color = if flags.multicolor {
        ambient.next() & 0xFFFF_FF00
    } else {
        base_color
    };
    Speck {
        pos,
        vel: Vec2::new(angle.cos(), angle.sin()) * speed,
        traveled: 0.0,
        max_travel: 20.0 + (ambient.next() % 400) as f32 / 10.0,
        color,
    }
}

impl Explosion {
    pub fn new(
        center: Vec2,
        base_color: u32,
        flags: ExplosionFlags,
        ambient: &mut Lcg16,
    ) -> Self {
        let count = if flags.multicolor { 48 } else { 32 };
        let mut specks = Vec::with_capacity(count);
        for _ in 0..count {
            specks.push(sample_speck(center, base_color, flags, ambient));
        }
        Self { specks, flags }
    }

    /// Burst seeded from the sprite's opaque pixels, so a destroyed
    /// entity disintegrates in place instead of bursting from a point.
    pub fn from_sprite(
        center: Vec2,
        sprite: &Sprite,
        frame: u32,
        base_color: u32,
        flags: ExplosionFlags,
        ambient: &mut Lcg16,
    ) -> Self {
        let tl = center - Vec2::new(sprite.width() as f32 / 2.0, sprite.height() as f32 / 2.0);
        let mut specks = Vec::new();
        for y in 0..sprite.height() {
            for x in 0..sprite.width() {
                if sprite.is_transparent(frame, x, y) {
                    continue;
                }
                // Thin out dense sprites to keep the burst readable
                if ambient.next() % 3 == 0 {
                    continue;
                }
                let pos = tl + Vec2::new(x as f32, y as f32);
                specks.push(sample_speck(pos, base_color, flags, ambient));
            }
        }
        if specks.is_empty() {
            return Self::new(center, base_color, flags, ambient);
        }
        Self { specks, flags }
    }

    /// Advance all specks; returns true while any are still live.
    pub fn update(&mut self) -> bool {
        const MIN_RESIDUAL_SPEED: f32 = 0.15;
        let fallout = self.flags.fallout;
        self.specks.retain_mut(|s| {
            s.pos += s.vel;
            s.traveled += s.vel.length();
            if fallout {
                s.vel.y += 0.08;
            }
            s.vel *= 0.96;
            s.traveled < s.max_travel && s.vel.length() > MIN_RESIDUAL_SPEED
        });
        !self.specks.is_empty()
    }
}

/// Floating score/title text, drifts up and fades on a tick counter.
#[derive(Debug, Clone)]
pub struct FloatingText {
    pub text: String,
    pub pos: Vec2,
    pub ttl: u32,
}

impl FloatingText {
    pub fn new(text: impl Into<String>, pos: Vec2) -> Self {
        Self {
            text: text.into(),
            pos,
            ttl: 60,
        }
    }

    pub fn update(&mut self) -> bool {
        self.pos.y -= 0.5;
        self.ttl = self.ttl.saturating_sub(1);
        self.ttl > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::params::LevelParams;
    use std::collections::HashMap;

    fn ctx_parts() -> (LevelParams, Lcg16, Vec<Sound>) {
        (
            LevelParams::resolve(1, &HashMap::new()),
            Lcg16::new(42),
            Vec::new(),
        )
    }

    fn rocket_at(y: f32) -> Entity {
        Entity::new(
            EntityKind::Rocket,
            Vec2::new(100.0, y),
            Rc::new(Sprite::solid(10, 30)),
        )
    }

    #[test]
    fn rocket_lift_respects_cap() {
        let (params, mut rng, mut sounds) = ctx_parts();
        let mut r = rocket_at(400.0);
        r.start(4.0, &mut sounds);
        for tick in 0..10 {
            let lift = r.rocket_lift();
            assert!(lift <= ROCKET_LIFT_CAP, "tick {tick}: lift {lift}");
            assert!((lift - ((1.0 + tick as f32 / 10.0) * 4.0).min(12.0)).abs() < 1e-5);
            let mut ctx = UpdateCtx {
                params: &params,
                rng: &mut rng,
                viewport_h: 600,
                ground_y: 550.0,
                sky_y: -1.0,
                craft_x: 0.0,
                sounds: &mut sounds,
            };
            r.update(&mut ctx);
        }
    }

    #[test]
    fn rocket_explodes_above_sky_line() {
        let (params, mut rng, mut sounds) = ctx_parts();
        let mut r = rocket_at(80.0);
        r.start(6.0, &mut sounds);
        let mut ctx = UpdateCtx {
            params: &params,
            rng: &mut rng,
            viewport_h: 600,
            ground_y: 550.0,
            sky_y: 70.0,
            craft_x: 0.0,
            sounds: &mut sounds,
        };
        r.update(&mut ctx);
        assert!(r.exploding);
    }

    #[test]
    fn start_is_idempotent_and_plays_one_sound() {
        let (_, _, mut sounds) = ctx_parts();
        let mut r = rocket_at(100.0);
        r.start(2.0, &mut sounds);
        r.start(5.0, &mut sounds);
        assert_eq!(sounds.len(), 1);
        assert_eq!(r.speed, 2.0);
    }

    #[test]
    fn explode_then_exploded_after_duration() {
        let (params, mut rng, mut sounds) = ctx_parts();
        let mut r = rocket_at(100.0);
        r.explode(3);
        assert!(r.exploding);
        r.explode(99); // no-op while exploding
        for _ in 0..3 {
            assert!(!r.exploded);
            let mut ctx = UpdateCtx {
                params: &params,
                rng: &mut rng,
                viewport_h: 600,
                ground_y: 550.0,
                sky_y: -1.0,
                craft_x: 0.0,
                sounds: &mut sounds,
            };
            r.update(&mut ctx);
        }
        assert!(r.exploded && !r.exploding);
    }

    #[test]
    fn drop_splashes_on_ground() {
        let (params, mut rng, mut sounds) = ctx_parts();
        let mut d = Entity::new(
            EntityKind::Drop,
            Vec2::new(50.0, 500.0),
            Rc::new(Sprite::solid(6, 10)),
        );
        d.start(5.0, &mut sounds);
        for _ in 0..40 {
            let mut ctx = UpdateCtx {
                params: &params,
                rng: &mut rng,
                viewport_h: 600,
                ground_y: 520.0,
                sky_y: -1.0,
                craft_x: 0.0,
                sounds: &mut sounds,
            };
            d.update(&mut ctx);
            if d.exploding {
                break;
            }
        }
        assert!(d.exploding);
        assert!(sounds.contains(&Sound::Splash));
    }

    #[test]
    fn bady_oscillates_between_lines() {
        let (params, mut rng, mut sounds) = ctx_parts();
        let mut b = Entity::new(
            EntityKind::Bady,
            Vec2::new(50.0, 300.0),
            Rc::new(Sprite::solid(20, 20)),
        );
        b.start(4.0, &mut sounds);
        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        for _ in 0..500 {
            let mut ctx = UpdateCtx {
                params: &params,
                rng: &mut rng,
                viewport_h: 600,
                ground_y: 500.0,
                sky_y: 100.0,
                craft_x: 0.0,
                sounds: &mut sounds,
            };
            b.update(&mut ctx);
            min_y = min_y.min(b.pos.y - 10.0);
            max_y = max_y.max(b.pos.y + 10.0);
            assert!(b.pos.y - 10.0 >= 100.0 - 0.01);
            assert!(b.pos.y + 10.0 <= 500.0 + 0.01);
        }
        // Actually bounced off both lines
        assert!(min_y <= 101.0);
        assert!(max_y >= 499.0);
    }

    #[test]
    fn radar_stops_scanning_after_first_hit() {
        let mut r = Entity::new(
            EntityKind::Radar,
            Vec2::new(50.0, 50.0),
            Rc::new(Sprite::from_mask(40, 10, 4, 2, vec![true; 1600])),
        );
        let (params, mut rng, mut sounds) = ctx_parts();
        for _ in 0..4 {
            let mut ctx = UpdateCtx {
                params: &params,
                rng: &mut rng,
                viewport_h: 600,
                ground_y: 550.0,
                sky_y: -1.0,
                craft_x: 0.0,
                sounds: &mut sounds,
            };
            r.update(&mut ctx);
        }
        assert_ne!(r.frame, 0);
        assert!(!r.on_hit(2));
        let frame = r.frame;
        for _ in 0..8 {
            let mut ctx = UpdateCtx {
                params: &params,
                rng: &mut rng,
                viewport_h: 600,
                ground_y: 550.0,
                sky_y: -1.0,
                craft_x: 0.0,
                sounds: &mut sounds,
            };
            r.update(&mut ctx);
        }
        assert_eq!(r.frame, frame);
        assert!(r.on_hit(2));
    }

    #[test]
    fn phaser_cycles_and_fires() {
        let (params, mut rng, mut sounds) = ctx_parts();
        let mut p = Entity::new(
            EntityKind::Phaser,
            Vec2::new(50.0, 500.0),
            Rc::new(Sprite::from_mask(20, 40, 2, 0, vec![true; 1600])),
        );
        let mut fired_ticks = 0;
        for _ in 0..params.phaser_cycle_ticks {
            let mut ctx = UpdateCtx {
                params: &params,
                rng: &mut rng,
                viewport_h: 600,
                ground_y: 550.0,
                sky_y: 60.0,
                craft_x: 0.0,
                sounds: &mut sounds,
            };
            p.update(&mut ctx);
            if p.phaser_firing(&params) {
                fired_ticks += 1;
            }
        }
        assert_eq!(fired_ticks, 4);
        assert_eq!(sounds.iter().filter(|s| **s == Sound::Phaser).count(), 1);
    }

    #[test]
    fn trigger_reroll_without_latch() {
        let (mut params, mut rng, mut sounds) = ctx_parts();
        params.rocket_start_prob = 0; // every roll fails
        let mut r = rocket_at(100.0);
        r.data1 = 200.0;
        for _ in 0..10 {
            let mut ctx = UpdateCtx {
                params: &params,
                rng: &mut rng,
                viewport_h: 600,
                ground_y: 550.0,
                sky_y: -1.0,
                craft_x: 90.0,
                sounds: &mut sounds,
            };
            r.maybe_start(&mut ctx);
        }
        // Default policy: failed rolls never latch
        assert!(!r.nostart && !r.started);

        params.nostart_latch = true;
        let mut ctx = UpdateCtx {
            params: &params,
            rng: &mut rng,
            viewport_h: 600,
            ground_y: 550.0,
            sky_y: -1.0,
            craft_x: 90.0,
            sounds: &mut sounds,
        };
        r.maybe_start(&mut ctx);
        assert!(r.nostart);
    }

    #[test]
    fn craft_attachment_points_from_opaque_extents() {
        let sprite = Rc::new(Sprite::from_rows(&[
            "......", //
            "####.#", //
            "######", //
            ".##...", //
        ]));
        let craft = PlayerCraft::new(sprite, ShipSkin::for_index(0), Vec2::new(50.0, 50.0));
        // Nose: rightmost opaque column (5), topmost opaque pixel there (1)
        assert_eq!(craft.nose, Vec2::new(5.0, 1.0));
        // Belly: center column (3), bottommost opaque pixel there (2)
        assert_eq!(craft.belly, Vec2::new(3.0, 2.0));
    }

    #[test]
    fn craft_clamps_to_viewport() {
        let sprite = Rc::new(Sprite::solid(20, 10));
        let mut craft = PlayerCraft::new(sprite, ShipSkin::for_index(0), Vec2::new(50.0, 50.0));
        for _ in 0..100 {
            craft.steer(-1.0, -1.0, 800, 600, 0.0);
        }
        assert_eq!(craft.entity.pos, Vec2::new(10.0, 5.0));
        for _ in 0..500 {
            craft.steer(1.0, 1.0, 800, 600, 0.0);
        }
        assert_eq!(craft.entity.pos, Vec2::new(790.0, 595.0));
    }

    #[test]
    fn explosion_finishes() {
        let mut ambient = Lcg16::new(9);
        let mut ex = Explosion::new(
            Vec2::new(100.0, 100.0),
            0xFF00_0000,
            ExplosionFlags::default(),
            &mut ambient,
        );
        let mut ticks = 0;
        while ex.update() {
            ticks += 1;
            assert!(ticks < 10_000, "explosion never finished");
        }
        assert!(ex.specks.is_empty());
    }

    #[test]
    fn disintegration_specks_start_on_the_sprite() {
        let sprite = Sprite::solid(8, 4);
        let mut ambient = Lcg16::new(7);
        let ex = Explosion::from_sprite(
            Vec2::new(50.0, 20.0),
            &sprite,
            0,
            0xFF00_0000,
            ExplosionFlags::default(),
            &mut ambient,
        );
        assert!(!ex.specks.is_empty());
        // Every speck begins on an opaque pixel of the 8x4 box at (46, 18)
        for s in &ex.specks {
            assert!(s.pos.x >= 46.0 && s.pos.x < 54.0, "x {}", s.pos.x);
            assert!(s.pos.y >= 18.0 && s.pos.y < 22.0, "y {}", s.pos.y);
        }
    }
}
