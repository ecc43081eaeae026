//! The per-tick simulation step.
//!
//! One call to [`tick`] advances the session by exactly one simulation
//! step: input, entity updates, object spawning, collision tests, the
//! frame draw (which the craft-vs-terrain test samples mid-way), scroll
//! advance and phase bookkeeping. All gameplay randomness drawn here goes
//! through the level stream so demo recordings replay bit-exactly.

use std::rc::Rc;

use glam::Vec2;

use super::collision;
use super::demo::{DemoPlayer, DemoRecorder, DemoRecording};
use super::entity::{
    Entity, EntityKind, Explosion, ExplosionFlags, FloatingText, PlayerCraft, ShipSkin, UpdateCtx,
};
use super::sprite::Sprite;
use super::state::{AfterPause, Phase, Session, HOLD_ALL_DONE, HOLD_FAIL, HOLD_SUCCESS, MAX_ATTEMPTS};
use super::terrain::object;
use crate::consts::{MAX_LEVEL, TITLE_DEMO_TIMEOUT_TICKS};
use crate::render::{Color, DrawSurface};

/// Input sampled for one tick. During demo playback the recorded entry
/// substitutes for this.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Steering direction, each component in -1..=1
    pub dx: f32,
    pub dy: f32,
    pub missile: bool,
    pub bomb: bool,
    /// Menu confirm / start / skip
    pub action: bool,
    pub pause: bool,
}

/// Spawn columns slightly ahead of the right edge so entities are already
/// live when they scroll in.
const SPAWN_LOOKAHEAD: i32 = 48;

/// Points awarded per destroyed object kind.
const SCORE_ROCKET: u32 = 20;
const SCORE_RADAR: u32 = 40;
const SCORE_DROP: u32 = 10;
const SCORE_BADY: u32 = 100;
const SCORE_PHASER: u32 = 60;

/// Bonus points drained into the score per LevelDone tick.
const BONUS_DRAIN_PER_TICK: u32 = 10;

/// Advance the session by one tick, rendering into `surface`.
pub fn tick(s: &mut Session, input: &TickInput, surface: &mut dyn DrawSurface) {
    s.tick_count += 1;
    match s.phase {
        // Trainer sessions skip the title and launch straight in
        Phase::Start => {
            if !s.cfg.trainer || !start_game(s) {
                s.enter_phase(Phase::Title);
            }
        }
        Phase::Title => tick_title(s, input),
        Phase::Demo | Phase::Level => tick_play(s, input, surface),
        Phase::LevelDone => tick_level_done(s),
        Phase::LevelFail => tick_level_fail(s, surface),
        Phase::Paused => tick_paused(s, input),
        Phase::Score => {
            if input.action {
                s.flush_progress();
                s.enter_phase(Phase::Title);
            }
        }
    }
}

/// Begin a fresh game from the title screen.
pub fn start_game(s: &mut Session) -> bool {
    s.level = s.cfg.start_level;
    s.score = 0;
    s.prior_best = s.profiles.get(&s.cfg.user).score;
    s.done = false;
    if !s.setup_level() {
        return false;
    }
    let ship = s.profiles.get(&s.cfg.user).ship;
    let mut recorder = DemoRecorder::new(s.level_seed, ship, s.cfg.tick_dx);
    recorder.recording.completed = s.completed_runs;
    recorder.recording.classic = s.cfg.classic;
    recorder.recording.speed_correction = s.cfg.speed_correction;
    s.recorder = Some(recorder);
    s.enter_phase(Phase::Level);
    spawn_window(s);
    true
}

/// Begin demo playback of a recording. Recordings that do not cover the
/// level are refused.
pub fn start_demo(s: &mut Session, recording: DemoRecording) -> bool {
    // The header fully reconfigures the session: the recorded run must
    // replay against the world it was captured in
    s.level_seed = recording.seed;
    s.level = s.cfg.start_level;
    s.completed_runs = recording.completed;
    s.cfg.classic = recording.classic;
    s.cfg.tick_dx = recording.tick_dx;
    s.cfg.speed_correction = recording.speed_correction;
    let sprite = s
        .assets
        .get_or_solid(&format!("ship{}", recording.ship), 40, 20);
    s.craft = PlayerCraft::new(sprite, ShipSkin::for_index(recording.ship), Vec2::ZERO);
    if !s.setup_level() {
        return false;
    }
    if !recording.covers(s.terrain.final_offset(s.cfg.viewport_w)) {
        log::warn!("demo recording does not cover the level, ignoring");
        return false;
    }
    s.attract = Some(recording.clone());
    s.player = Some(DemoPlayer::new(recording));
    s.enter_phase(Phase::Demo);
    spawn_window(s);
    true
}

fn tick_title(s: &mut Session, input: &TickInput) {
    if input.action {
        start_game(s);
        return;
    }
    s.idle_ticks += 1;
    if s.idle_ticks >= TITLE_DEMO_TIMEOUT_TICKS {
        s.idle_ticks = 0;
        if let Some(recording) = s.attract.clone() {
            start_demo(s, recording);
        }
    }
}

fn tick_paused(s: &mut Session, input: &TickInput) {
    if s.paused {
        // Focus/user pause: wait for an explicit resume
        if input.action || input.pause {
            s.resume();
        }
        return;
    }
    if s.hold_ticks > 0 {
        s.hold_ticks -= 1;
        return;
    }
    match s.after_pause {
        AfterPause::NextLevel | AfterPause::RetryLevel => {
            if s.setup_level() {
                s.enter_phase(Phase::Level);
                spawn_window(s);
            } else {
                s.enter_phase(Phase::Title);
            }
        }
        AfterPause::Title => s.enter_phase(Phase::Title),
        AfterPause::Score => s.enter_phase(Phase::Score),
    }
}

fn tick_level_done(s: &mut Session) {
    // Drain the time bonus into the score, then hold briefly
    if s.bonus > 0 {
        let drain = s.bonus.min(BONUS_DRAIN_PER_TICK);
        s.bonus -= drain;
        s.add_score(drain);
        return;
    }
    if s.hold_ticks > 0 {
        s.hold_ticks -= 1;
        return;
    }
    if s.level >= MAX_LEVEL {
        // Full completion: flush while the final level number is still
        // current, then flip play direction for the next run
        s.completed_runs += 1;
        s.done = true;
        s.flush_progress();
        s.after_pause = if beats_profile(s) {
            AfterPause::Score
        } else {
            AfterPause::Title
        };
        s.level = s.cfg.start_level;
        s.hold_ticks = HOLD_ALL_DONE;
        s.enter_phase(Phase::Paused);
    } else {
        s.level += 1;
        s.after_pause = AfterPause::NextLevel;
        s.hold_ticks = 0;
        s.enter_phase(Phase::Paused);
    }
}

fn tick_level_fail(s: &mut Session, surface: &mut dyn DrawSurface) {
    // Let the craft explosion play out on screen
    draw_world(s, surface);
    draw_effects(s, surface);
    step_effects(s);
    if s.hold_ticks > 0 {
        s.hold_ticks -= 1;
        return;
    }
    if s.attempt >= MAX_ATTEMPTS {
        s.after_pause = if beats_profile(s) {
            AfterPause::Score
        } else {
            AfterPause::Title
        };
        s.hold_ticks = 0;
        s.enter_phase(Phase::Paused);
    } else {
        s.attempt += 1;
        s.after_pause = AfterPause::RetryLevel;
        s.hold_ticks = 0;
        s.enter_phase(Phase::Paused);
    }
}

// The high-score comparison uses the profile score captured at run start:
// checkpoint flushes raise the stored score to the current one mid-run.
fn beats_profile(s: &Session) -> bool {
    !s.cfg.trainer && !s.cfg.user.is_empty() && s.score > s.prior_best
}

/// The live gameplay tick, shared by Level and Demo.
fn tick_play(s: &mut Session, input: &TickInput, surface: &mut dyn DrawSurface) {
    if input.pause && s.phase == Phase::Level {
        s.after_pause = AfterPause::RetryLevel;
        s.hold_ticks = 0;
        s.enter_phase(Phase::Paused);
        s.paused = true;
        return;
    }

    // Resolve effective input: recorded entry during playback
    let (fire_missile, fire_bomb) = if s.phase == Phase::Demo {
        if input.action {
            s.enter_phase(Phase::Title);
            return;
        }
        let Some(entry) = s.player.as_mut().and_then(|p| p.next(&mut s.rng.level)) else {
            s.enter_phase(Phase::Title);
            return;
        };
        // Recorded positions are authoritative
        s.craft.entity.pos = Vec2::new(entry.ship_x as f32, entry.ship_y as f32);
        (entry.missile, entry.bomb)
    } else {
        // Steer first: the recorded position must be the post-steer one
        // every trigger roll and touch test uses this tick. Steering
        // draws nothing from the level stream, so the checkpoint still
        // replays the whole tick.
        s.craft.steer(
            input.dx,
            input.dy,
            s.cfg.viewport_w,
            s.cfg.viewport_h,
            s.scroll_x as f32,
        );
        if let Some(rec) = s.recorder.as_mut() {
            rec.observe(
                s.craft.entity.pos.x as i32,
                s.craft.entity.pos.y as i32,
                input.bomb,
                input.missile,
                &s.rng.level,
            );
        }
        (input.missile, input.bomb)
    };

    if fire_missile {
        fire_missile_from_craft(s);
    }
    if fire_bomb {
        fire_bomb_from_craft(s);
    }

    // Ordering contract: updates, then spawning, then hit tests, then
    // the scroll advance. Entities spawned this tick are hit-testable
    // but have not yet moved.
    update_entities(s);
    spawn_window(s);
    resolve_projectile_hits(s);

    // Craft-vs-enemy touches; demo craft dies like a live one, ending
    // the playback instead of the game
    let craft_dead = s.craft.entity.interactive() && craft_touches_enemy(s);

    // Two-pass draw: world first, readback, then the craft on top
    draw_world(s, surface);
    let terrain_hit = if s.craft.entity.interactive() {
        let tl = s.craft.entity.top_left();
        let screen_x = tl.x as i32 - s.scroll_x;
        let background = s.background_span(tl.x as i32, s.craft.entity.w());
        collision::craft_hits_terrain(
            surface,
            &s.craft.entity,
            screen_x,
            tl.y as i32,
            &background,
        )
    } else {
        false
    };
    draw_craft(s, surface);
    draw_effects(s, surface);
    step_effects(s);

    if craft_dead || terrain_hit {
        fail_level(s);
        return;
    }

    // Scroll advance; craft rides the scroll
    s.scroll_frac += s.cfg.tick_dx as f64 * s.speed_scale;
    let step = s.scroll_frac as i32;
    s.scroll_frac -= step as f64;
    s.scroll_x += step;
    s.craft.entity.pos.x += step as f32;

    if s.scroll_x >= s.terrain.final_offset(s.cfg.viewport_w) {
        finish_level(s);
    }
}

fn finish_level(s: &mut Session) {
    if s.phase == Phase::Demo {
        s.enter_phase(Phase::Title);
        return;
    }
    // Keep the run as the title-screen attraction demo
    if let Some(rec) = &s.recorder
        && rec
            .recording
            .covers(s.terrain.final_offset(s.cfg.viewport_w))
    {
        s.attract = Some(rec.recording.clone());
    }
    s.hold_ticks = HOLD_SUCCESS;
    s.enter_phase(Phase::LevelDone);
}

fn fail_level(s: &mut Session) {
    if s.phase == Phase::Demo {
        s.enter_phase(Phase::Title);
        return;
    }
    s.craft.entity.explode(50);
    let center = s.craft.entity.pos;
    let color = s.craft.skin.explosion_color;
    let flags = ExplosionFlags {
        fallout: true,
        multicolor: true,
        splash: false,
    };
    let ex = Explosion::from_sprite(
        center,
        &s.craft.entity.sprite,
        s.craft.entity.frame,
        color,
        flags,
        &mut s.rng.ambient,
    );
    s.explosions.push(ex);
    s.hold_ticks = HOLD_FAIL;
    s.enter_phase(Phase::LevelFail);
}

fn fire_missile_from_craft(s: &mut Session) {
    if !s.craft.entity.interactive() || s.missiles.len() >= 3 {
        return;
    }
    let nose = s.craft.nose_world();
    let sprite = s.assets.get_or_solid("missile", 12, 3);
    let mut m = Entity::new(EntityKind::Missile, nose + Vec2::new(6.0, 0.0), sprite);
    m.start(10.0, &mut s.sounds);
    s.missiles.push(m);
}

fn fire_bomb_from_craft(s: &mut Session) {
    if !s.craft.entity.interactive() || s.bombs.len() >= 2 {
        return;
    }
    let belly = s.craft.belly_world();
    let sprite = s.assets.get_or_solid("bomb", 6, 10);
    let mut b = Entity::new(EntityKind::Bomb, belly + Vec2::new(0.0, 6.0), sprite);
    b.vel = Vec2::new(2.0, 1.0);
    b.start(1.0, &mut s.sounds);
    s.bombs.push(b);
}

/// Instantiate objects for every column in or near the viewport. Object
/// bits clear as they spawn, so re-scanning the window is idempotent.
fn spawn_window(s: &mut Session) {
    let from = s.scroll_x.max(0);
    let to = (s.scroll_x + s.cfg.viewport_w + SPAWN_LOOKAHEAD).min(s.terrain.len());
    for x in from..to {
        let col = s.terrain.columns[x as usize];
        if col.objects & object::ANY_ENTITY == 0 {
            continue;
        }
        let ground_y = (s.cfg.viewport_h - col.ground) as f32;
        let sky_y = col.sky as f32;
        for bit in [
            object::ROCKET,
            object::DROP,
            object::BADY,
            object::CUMULUS,
            object::RADAR,
            object::PHASER,
        ] {
            if !col.has_object(bit) {
                continue;
            }
            s.terrain.columns[x as usize].take_object(bit);
            spawn_object(s, bit, x, ground_y, sky_y);
        }
    }
}

fn spawn_object(s: &mut Session, bit: u32, x: i32, ground_y: f32, sky_y: f32) {
    let wx = x as f32;
    match bit {
        object::ROCKET => {
            let sprite = s.assets.get_or_solid("rocket", 9, 36);
            let h = sprite.height() as f32;
            let mut e = Entity::new(EntityKind::Rocket, Vec2::new(wx, ground_y - h / 2.0), sprite);
            e.data1 = s.params.rocket_trigger_dist.sample(&mut s.rng.level) as f32;
            s.rockets.push(e);
        }
        object::RADAR => {
            let sprite = s.assets.get_or_solid("radar_14x3", 392, 22);
            let h = sprite.height() as f32;
            let e = Entity::new(EntityKind::Radar, Vec2::new(wx, ground_y - h / 2.0), sprite);
            s.radars.push(e);
        }
        object::DROP => {
            let sprite = s.assets.get_or_solid("drop", 8, 12);
            let h = sprite.height() as f32;
            let top = if sky_y >= 0.0 { sky_y } else { 0.0 };
            let mut e = Entity::new(EntityKind::Drop, Vec2::new(wx, top + h / 2.0), sprite);
            e.data1 = s.params.drop_trigger_dist.sample(&mut s.rng.level) as f32;
            s.drops.push(e);
        }
        object::BADY => {
            let sprite = s.assets.get_or_solid("bady_2x0", 40, 20);
            let top = if sky_y >= 0.0 { sky_y } else { 0.0 };
            let mid = (top + ground_y) / 2.0;
            let mut e = Entity::new(EntityKind::Bady, Vec2::new(wx, mid), sprite);
            // Oscillation speed is sampled by the start roll; data1 holds
            // the hit budget for this individual
            e.data1 = s.params.bady_hits.sample(&mut s.rng.level) as f32;
            s.badies.push(e);
        }
        object::CUMULUS => {
            let sprite = s.assets.get_or_solid("cumulus", 44, 26);
            let top = if sky_y >= 0.0 { sky_y } else { 0.0 };
            let mid = (top + ground_y) / 2.0;
            let e = Entity::new(EntityKind::Cumulus, Vec2::new(wx, mid), sprite);
            s.cumuli.push(e);
        }
        object::PHASER => {
            let sprite = s.assets.get_or_solid("phaser_2x0", 28, 36);
            let h = sprite.height() as f32;
            let mut e = Entity::new(EntityKind::Phaser, Vec2::new(wx, ground_y - h / 2.0), sprite);
            // Desynchronize phaser cycles
            e.data2 = s.rng.level.range(0, s.params.phaser_cycle_ticks as i32 - 1) as f32;
            s.phasers.push(e);
        }
        _ => {}
    }
}

fn update_entities(s: &mut Session) {
    let craft_x = s.craft.entity.pos.x;
    let viewport_h = s.cfg.viewport_h;
    let left = s.scroll_x as f32 - 100.0;

    // Borrow dance: take each vec out, update against the session, put back
    macro_rules! update_group {
        ($field:ident, $trigger:expr) => {{
            let mut group = std::mem::take(&mut s.$field);
            for e in &mut group {
                let col = s
                    .terrain
                    .column(e.pos.x as i32)
                    .copied()
                    .unwrap_or(super::terrain::TerrainColumn::new(0, -1));
                let mut ctx = UpdateCtx {
                    params: &s.params,
                    rng: &mut s.rng.level,
                    viewport_h,
                    ground_y: (viewport_h - col.ground) as f32,
                    sky_y: col.sky as f32,
                    craft_x,
                    sounds: &mut s.sounds,
                };
                if $trigger {
                    e.maybe_start(&mut ctx);
                }
                e.update(&mut ctx);
            }
            group.retain(|e| !e.exploded && e.pos.x > left);
            s.$field = group;
        }};
    }

    update_group!(rockets, true);
    update_group!(radars, false);
    update_group!(drops, true);
    update_group!(badies, true);
    update_group!(cumuli, true);
    update_group!(phasers, false);
    update_group!(bombs, false);

    // Missiles additionally expire off the right edge
    let right = (s.scroll_x + s.cfg.viewport_w) as f32;
    update_group!(missiles, false);
    s.missiles.retain(|m| m.pos.x < right);

    // Bombs explode on ground contact
    let mut splashes: Vec<Vec2> = Vec::new();
    for b in &mut s.bombs {
        let col = s.terrain.column(b.pos.x as i32).copied();
        let ground_y = viewport_h as f32 - col.map_or(0, |c| c.ground) as f32;
        if b.interactive() && b.pos.y + b.h() as f32 / 2.0 >= ground_y {
            b.explode(1);
            splashes.push(Vec2::new(b.pos.x, ground_y));
        }
    }
    for pos in splashes {
        let flags = ExplosionFlags {
            fallout: false,
            multicolor: false,
            splash: true,
        };
        let ex = Explosion::new(pos, 0x8080_8000, flags, &mut s.rng.ambient);
        s.explosions.push(ex);
    }
}

/// Projectiles vs enemies, pixel-accurate, with scoring.
fn resolve_projectile_hits(s: &mut Session) {
    // Points, position and a sprite snapshot per kill, so the
    // disintegration burst can sample the victim's opaque pixels
    let mut scored: Vec<(u32, Vec2, Rc<Sprite>, u32)> = Vec::new();

    macro_rules! hits_against {
        ($targets:ident, $points:expr, $lethal:expr) => {
            for shot_group in [&mut s.missiles, &mut s.bombs] {
                for shot in shot_group.iter_mut().filter(|p| p.interactive()) {
                    for target in s.$targets.iter_mut().filter(|t| t.interactive()) {
                        if collision::collides(shot, target) {
                            shot.explode(1);
                            if target.on_hit($lethal) {
                                target.explode(20);
                                scored.push((
                                    $points,
                                    target.pos,
                                    Rc::clone(&target.sprite),
                                    target.frame,
                                ));
                            }
                            break;
                        }
                    }
                }
            }
        };
    }

    hits_against!(rockets, SCORE_ROCKET, 1);
    hits_against!(radars, SCORE_RADAR, 2);
    hits_against!(drops, SCORE_DROP, 1);
    hits_against!(phasers, SCORE_PHASER, 1);

    // Badies soak their individually sampled hit count
    for shot_group in [&mut s.missiles, &mut s.bombs] {
        for shot in shot_group.iter_mut().filter(|p| p.interactive()) {
            for target in s.badies.iter_mut().filter(|t| t.interactive()) {
                if collision::collides(shot, target) {
                    shot.explode(1);
                    let lethal = (target.data1 as i32).max(1);
                    if target.on_hit(lethal) {
                        target.explode(20);
                        scored.push((
                            SCORE_BADY,
                            target.pos,
                            Rc::clone(&target.sprite),
                            target.frame,
                        ));
                    }
                    break;
                }
            }
        }
    }

    for (points, pos, sprite, frame) in scored {
        s.add_score(points);
        if s.phase == Phase::Level {
            s.texts
                .push(FloatingText::new(format!("{points}"), pos));
        }
        let flags = ExplosionFlags {
            fallout: true,
            multicolor: false,
            splash: false,
        };
        let ex = Explosion::from_sprite(pos, &sprite, frame, 0xFF80_0000, flags, &mut s.rng.ambient);
        s.explosions.push(ex);
    }
}

/// Any lethal enemy touching the craft. Cumuli are decorative and phaser
/// beams are terrain-colored, so both are handled elsewhere or not at all.
fn craft_touches_enemy(s: &Session) -> bool {
    let craft = &s.craft.entity;
    s.rockets
        .iter()
        .chain(&s.drops)
        .chain(&s.badies)
        .chain(&s.phasers)
        .filter(|e| e.interactive())
        .any(|e| collision::collides(craft, e))
}

/// Active palette override at a world column, honoring restore markers.
fn active_change_at(s: &Session, world_x: i32) -> Option<super::terrain::ColorChange> {
    if s.terrain.is_empty() {
        return None;
    }
    let mut active = None;
    let limit = world_x.min(s.terrain.len() - 1);
    for col in &s.terrain.columns[..=limit.max(0) as usize] {
        if let Some(cc) = col.color_change {
            active = if cc.is_restore() { None } else { Some(cc) };
        }
    }
    active
}

/// Pass one of the frame: background, sky and ground columns with their
/// outlines, then every non-craft entity. The collision readback samples
/// the surface right after this.
pub fn draw_world(s: &Session, surface: &mut dyn DrawSurface) {
    let completed = s.completed_runs;
    let base_bg = s.terrain.palette.bg_for(completed);
    let base_ground = s.terrain.palette.ground_for(completed);
    let base_sky = s.terrain.palette.sky_for(completed);

    let mut change = active_change_at(s, s.scroll_x);
    let (w, h) = (surface.width(), surface.height());
    surface.fill_rect(0, 0, w, h, change.map_or(base_bg, |c| c.bg));

    for sx in 0..w {
        let wx = s.scroll_x + sx;
        let Some(col) = s.terrain.column(wx) else {
            continue;
        };
        if let Some(cc) = col.color_change {
            change = if cc.is_restore() { None } else { Some(cc) };
            // Background right of the marker repaints in the new color
            surface.fill_rect(sx, 0, w - sx, h, change.map_or(base_bg, |c| c.bg));
        }
        let ground = change.map_or(base_ground, |c| c.ground);
        let sky = change.map_or(base_sky, |c| c.sky);
        if col.sky >= 0 {
            surface.fill_rect(sx, 0, 1, col.sky, sky);
            if s.terrain.palette.outline_width > 0 {
                surface.fill_rect(
                    sx,
                    (col.sky - s.terrain.palette.outline_width).max(0),
                    1,
                    s.terrain.palette.outline_width,
                    s.terrain.palette.outline_sky,
                );
            }
        }
        if col.ground > 0 {
            surface.fill_rect(sx, h - col.ground, 1, col.ground, ground);
            if s.terrain.palette.outline_width > 0 {
                surface.fill_rect(
                    sx,
                    h - col.ground,
                    1,
                    s.terrain.palette.outline_width.min(col.ground),
                    s.terrain.palette.outline_ground,
                );
            }
        }
    }

    // Entities, world to screen
    let groups: [(&[Entity], Color); 8] = [
        (&s.rockets, Color::rgb(200, 200, 210)),
        (&s.radars, Color::rgb(180, 180, 60)),
        (&s.drops, Color::rgb(80, 160, 255)),
        (&s.badies, Color::rgb(220, 60, 60)),
        (&s.cumuli, Color::rgb(235, 235, 235)),
        (&s.phasers, Color::rgb(120, 255, 120)),
        (&s.missiles, Color(s.craft.skin.missile_color)),
        (&s.bombs, Color::rgb(90, 90, 90)),
    ];
    // Exploding entities are not drawn; their disintegration burst in
    // the effects layer stands in for the sprite
    for (group, color) in groups {
        for e in group.iter().filter(|e| e.interactive()) {
            let tl = e.top_left();
            surface.blit(
                &e.sprite,
                e.frame,
                tl.x as i32 - s.scroll_x,
                tl.y as i32,
                color,
            );
        }
    }

    // Phaser beams up to the sky line; drawn pre-readback so the beam
    // kills via the terrain test
    for p in s.phasers.iter().filter(|p| p.interactive()) {
        if !p.phaser_firing(&s.params) {
            continue;
        }
        let col = s.terrain.column(p.pos.x as i32);
        let top = col.map_or(0, |c| c.sky.max(0));
        let beam_x = p.pos.x as i32 - s.scroll_x;
        let beam_bottom = (p.pos.y - p.h() as f32 / 2.0) as i32;
        surface.fill_rect(beam_x - 1, top, 3, (beam_bottom - top).max(0), Color::rgb(160, 255, 160));
    }
}

/// Pass two: the craft alone, after the terrain readback.
pub fn draw_craft(s: &Session, surface: &mut dyn DrawSurface) {
    let e = &s.craft.entity;
    if !e.interactive() {
        return;
    }
    let tl = e.top_left();
    surface.blit(
        &e.sprite,
        e.frame,
        tl.x as i32 - s.scroll_x,
        tl.y as i32,
        Color::rgb(240, 240, 240),
    );
}

/// Cosmetic layer: explosion specks and floating score text markers.
fn draw_effects(s: &Session, surface: &mut dyn DrawSurface) {
    for ex in &s.explosions {
        for speck in &ex.specks {
            surface.fill_rect(
                speck.pos.x as i32 - s.scroll_x,
                speck.pos.y as i32,
                2,
                2,
                Color(speck.color),
            );
        }
    }
}

fn step_effects(s: &mut Session) {
    s.explosions.retain_mut(|ex| ex.update());
    s.texts.retain_mut(|t| t.update());
}
