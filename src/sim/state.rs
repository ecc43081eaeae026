//! Game session state and the coarse-grained state machine.
//!
//! All state that must survive a tick lives here; `sim::tick` mutates it.
//! Phase transitions run their side effects exactly once; re-entering the
//! current phase is an explicit no-op.

use glam::Vec2;

use super::demo::{DemoPlayer, DemoRecorder, DemoRecording};
use super::entity::{Entity, Explosion, FloatingText, PlayerCraft, ShipSkin};
use super::generator;
use super::level_file;
use super::params::LevelParams;
use super::sprite::AssetCache;
use super::terrain::Terrain;
use crate::audio::Sound;
use crate::consts::{TICK_DX, VIEWPORT_H, VIEWPORT_W};
use crate::prng::RngPair;
use crate::profile::ProfileStore;

/// Coarse game flow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Title,
    Demo,
    Level,
    LevelDone,
    LevelFail,
    Paused,
    Score,
}

/// Where the Paused interlude goes when its hold timer expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterPause {
    NextLevel,
    RetryLevel,
    Title,
    Score,
}

/// Immutable launch configuration, mapped from the CLI surface.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub viewport_w: i32,
    pub viewport_h: i32,
    /// Scroll distance per tick
    pub tick_dx: i32,
    /// Generate levels internally instead of loading files
    pub internal_levels: bool,
    /// Level file path override (trainer mode)
    pub level_file: Option<std::path::PathBuf>,
    /// Start level number
    pub start_level: u32,
    /// Trainer mode: bypass profile progression and focus pausing
    pub trainer: bool,
    /// Flat single-tone palettes and simple outlines
    pub classic: bool,
    /// Seed gameplay from entropy instead of the fixed default
    pub nondeterministic: bool,
    /// Host clock runs in speed-correction mode; recorded in demos
    pub speed_correction: bool,
    pub user: String,
    /// Failed trigger rolls latch (legacy behavior)
    pub nostart_latch: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            viewport_w: VIEWPORT_W,
            viewport_h: VIEWPORT_H,
            tick_dx: TICK_DX,
            internal_levels: true,
            level_file: None,
            start_level: 1,
            trainer: false,
            classic: false,
            nondeterministic: false,
            speed_correction: false,
            user: String::new(),
            nostart_latch: false,
        }
    }
}

/// Attempts per level before falling back to the title.
pub const MAX_ATTEMPTS: u32 = 3;

/// Hold durations for the timed Paused interlude, in ticks.
pub const HOLD_SUCCESS: u32 = 50;
pub const HOLD_FAIL: u32 = 100;
pub const HOLD_ALL_DONE: u32 = 250;

/// One play session: terrain, live entities, score and flow state.
pub struct Session {
    pub cfg: SessionConfig,
    pub phase: Phase,
    pub after_pause: AfterPause,
    pub rng: RngPair,
    /// Seed the current level's terrain was generated from
    pub level_seed: u32,

    pub level: u32,
    pub attempt: u32,
    pub score: u32,
    /// Profile high score when the run started; the Score phase entry
    /// compares against this, never against a value flushed mid-run
    pub prior_best: u32,
    pub bonus: u32,
    /// Times the whole game has been completed by this user
    pub completed_runs: u32,
    pub done: bool,

    /// Committed scroll offset in whole pixels
    pub scroll_x: i32,
    /// Fractional scroll remainder from speed correction
    pub scroll_frac: f64,
    /// Per-tick scroll multiplier, set by the clock pump each frame
    pub speed_scale: f64,
    pub paused: bool,
    /// Ticks remaining in a timed hold (Paused, LevelDone, LevelFail)
    pub hold_ticks: u32,
    /// Idle ticks on the title screen, for the demo timeout
    pub idle_ticks: u32,
    pub tick_count: u64,

    pub terrain: Terrain,
    pub params: LevelParams,
    pub assets: AssetCache,
    pub craft: PlayerCraft,

    pub rockets: Vec<Entity>,
    pub radars: Vec<Entity>,
    pub drops: Vec<Entity>,
    pub badies: Vec<Entity>,
    pub cumuli: Vec<Entity>,
    pub phasers: Vec<Entity>,
    pub missiles: Vec<Entity>,
    pub bombs: Vec<Entity>,
    pub explosions: Vec<Explosion>,
    pub texts: Vec<FloatingText>,

    /// Sound requests accumulated this tick, drained by the host
    pub sounds: Vec<Sound>,

    pub recorder: Option<DemoRecorder>,
    pub player: Option<DemoPlayer>,
    /// Attraction recording replayed after the title idle timeout: the
    /// last live run that covered its level, or an externally loaded demo
    pub attract: Option<DemoRecording>,

    pub profiles: ProfileStore,
}

impl Session {
    pub fn new(cfg: SessionConfig, profiles: ProfileStore) -> Self {
        let level_seed = if cfg.nondeterministic {
            rand::random::<u32>() | 1
        } else {
            // Fixed default keeps casual runs reproducible end to end
            0xC0FFEE
        };
        let ambient_seed = level_seed.rotate_left(13) ^ 0x5EED;
        let mut assets = AssetCache::new();
        let ship = profiles.get(&cfg.user).ship;
        let sprite = assets.get_or_solid(&format!("ship{ship}"), 40, 20);
        let craft = PlayerCraft::new(sprite, ShipSkin::for_index(ship), Vec2::ZERO);
        let completed_runs = profiles.get(&cfg.user).completed;
        let prior_best = profiles.get(&cfg.user).score;

        Self {
            phase: Phase::Start,
            after_pause: AfterPause::Title,
            rng: RngPair::new(level_seed, ambient_seed),
            level_seed,
            level: cfg.start_level,
            attempt: 1,
            score: 0,
            prior_best,
            bonus: 0,
            completed_runs,
            done: false,
            scroll_x: 0,
            scroll_frac: 0.0,
            speed_scale: 1.0,
            paused: false,
            hold_ticks: 0,
            idle_ticks: 0,
            tick_count: 0,
            terrain: Terrain::new(super::terrain::Palette::flat(
                crate::render::Color::BLACK,
                crate::render::Color::BLACK,
                crate::render::Color::BLACK,
            )),
            params: LevelParams::resolve(cfg.start_level, &Default::default()),
            assets,
            craft,
            rockets: Vec::new(),
            radars: Vec::new(),
            drops: Vec::new(),
            badies: Vec::new(),
            cumuli: Vec::new(),
            phasers: Vec::new(),
            missiles: Vec::new(),
            bombs: Vec::new(),
            explosions: Vec::new(),
            texts: Vec::new(),
            sounds: Vec::new(),
            recorder: None,
            player: None,
            attract: None,
            profiles,
            cfg,
        }
    }

    /// Score additions funnel through here: never negative, and a no-op
    /// during demo playback.
    pub fn add_score(&mut self, points: u32) {
        if self.phase == Phase::Demo {
            return;
        }
        self.score = self.score.saturating_add(points);
    }

    /// Background colors for `width` world columns starting at `from_x`,
    /// color-change markers applied per column. The collision readback
    /// compares each sampled pixel against the color of its own column,
    /// matching what the world pass painted there.
    pub fn background_span(&self, from_x: i32, width: i32) -> Vec<crate::render::Color> {
        let base = self.terrain.palette.bg_for(self.completed_runs);
        let mut color = base;
        let upto = from_x.clamp(0, self.terrain.len());
        for col in &self.terrain.columns[..upto as usize] {
            if let Some(cc) = col.color_change {
                color = if cc.is_restore() { base } else { cc.bg };
            }
        }
        let mut span = Vec::with_capacity(width.max(0) as usize);
        for x in from_x..from_x + width.max(0) {
            if let Some(col) = self.terrain.column(x)
                && let Some(cc) = col.color_change
            {
                color = if cc.is_restore() { base } else { cc.bg };
            }
            span.push(color);
        }
        span
    }

    /// Load or generate the terrain for the current level and reset all
    /// per-level state. Returns false on a level-file load failure, in
    /// which case the session must not enter the Level phase.
    pub fn setup_level(&mut self) -> bool {
        self.rng.level.seed(self.level_seed.wrapping_add(self.level));

        let loaded = if let Some(path) = self.cfg.level_file.clone() {
            match level_file::load_level(&path, self.cfg.viewport_w, self.cfg.viewport_h) {
                Ok(lvl) => Some(lvl),
                Err(err) => {
                    log::error!("level load failed: {err:#}");
                    return false;
                }
            }
        } else if !self.cfg.internal_levels {
            log::error!("file levels requested but no level file configured");
            return false;
        } else {
            None
        };

        let (mut terrain, overrides) = match loaded {
            Some(lvl) => (lvl.terrain, lvl.overrides),
            None => (
                generator::generate(
                    self.level,
                    &mut self.rng.level,
                    self.cfg.viewport_w,
                    self.cfg.viewport_h,
                ),
                Default::default(),
            ),
        };

        // Repeat full completions flip the play direction
        if self.completed_runs % 2 == 1 {
            terrain.reverse();
        }

        // Classic look: single-tone palettes, hairline outlines
        if self.cfg.classic {
            terrain.palette.bg.truncate(1);
            terrain.palette.ground.truncate(1);
            terrain.palette.sky.truncate(1);
            terrain.palette.outline_width = terrain.palette.outline_width.min(1);
        }

        let mut overrides = overrides;
        if self.cfg.nostart_latch {
            overrides.insert("nostart_latch".into(), 1.0);
        }
        self.params = LevelParams::resolve(self.level, &overrides);
        self.bonus = self.params.time_bonus;
        self.terrain = terrain;

        self.scroll_x = 0;
        self.scroll_frac = 0.0;
        self.rockets.clear();
        self.radars.clear();
        self.drops.clear();
        self.badies.clear();
        self.cumuli.clear();
        self.phasers.clear();
        self.missiles.clear();
        self.bombs.clear();
        self.explosions.clear();
        self.texts.clear();

        let e = &mut self.craft.entity;
        e.exploded = false;
        e.exploding = false;
        e.hits = 0;
        e.pos = Vec2::new(
            e.w() as f32,
            self.cfg.viewport_h as f32 / 2.0,
        );
        true
    }

    /// Transition to `next`, running side effects once. Re-entering the
    /// current phase is a guarded no-op.
    pub fn enter_phase(&mut self, next: Phase) {
        if self.phase == next {
            return;
        }
        log::info!("phase {:?} -> {:?}", self.phase, next);
        let prev = self.phase;
        self.phase = next;
        match next {
            Phase::Start => {}
            Phase::Title => {
                self.idle_ticks = 0;
                self.player = None;
                self.recorder = None;
                self.sounds.push(Sound::TitleMusic);
            }
            Phase::Demo => {
                self.sounds.push(Sound::StopMusic);
            }
            Phase::Level => {
                self.attempt = if prev == Phase::LevelFail || prev == Phase::Paused {
                    self.attempt
                } else {
                    1
                };
                self.sounds.push(Sound::LevelMusic);
            }
            Phase::LevelDone => {
                self.sounds.push(Sound::Win);
                self.flush_progress();
            }
            Phase::LevelFail => {
                self.sounds.push(Sound::Fail);
                self.flush_progress();
            }
            Phase::Paused => {
                self.sounds.push(Sound::StopMusic);
            }
            Phase::Score => {
                self.flush_progress();
            }
        }
    }

    /// Persist score/level progress at a checkpoint. Never called per
    /// tick; only on completion, failure and high-score entry.
    pub fn flush_progress(&mut self) {
        if self.cfg.trainer || self.cfg.user.is_empty() {
            return;
        }
        let mut profile = self.profiles.get(&self.cfg.user);
        if self.score > profile.score {
            profile.score = self.score;
        }
        if self.level > profile.level {
            profile.level = self.level;
        }
        profile.completed = self.completed_runs;
        self.profiles.set(&self.cfg.user, profile);
        if let Err(err) = self.profiles.flush() {
            log::warn!("profile flush failed: {err:#}");
        }
    }

    /// Losing input focus forces a pause regardless of phase, except in a
    /// trainer session.
    pub fn on_focus_lost(&mut self) {
        if self.cfg.trainer {
            return;
        }
        match self.phase {
            Phase::Level => {
                self.after_pause = AfterPause::RetryLevel;
                self.hold_ticks = 0; // wait for explicit resume
                self.enter_phase(Phase::Paused);
                self.paused = true;
            }
            Phase::Demo => self.enter_phase(Phase::Title),
            _ => {}
        }
    }

    /// Resume from an explicit (focus/user) pause.
    pub fn resume(&mut self) {
        if self.phase == Phase::Paused && self.paused {
            self.paused = false;
            self.enter_phase(Phase::Level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileStore;

    fn session() -> Session {
        let cfg = SessionConfig {
            trainer: true,
            ..Default::default()
        };
        Session::new(cfg, ProfileStore::in_memory())
    }

    #[test]
    fn add_score_is_suppressed_during_demo() {
        let mut s = session();
        s.enter_phase(Phase::Title);
        s.add_score(10);
        assert_eq!(s.score, 10);
        s.enter_phase(Phase::Demo);
        s.add_score(99);
        assert_eq!(s.score, 10);
    }

    #[test]
    fn score_additions_sum() {
        let mut s = session();
        s.enter_phase(Phase::Level);
        for points in [5, 10, 20, 40] {
            s.add_score(points);
        }
        assert_eq!(s.score, 75);
    }

    #[test]
    fn reentering_phase_is_a_noop() {
        let mut s = session();
        s.enter_phase(Phase::Title);
        s.sounds.clear();
        s.enter_phase(Phase::Title);
        assert!(s.sounds.is_empty());
    }

    #[test]
    fn setup_level_generates_internal_terrain() {
        let mut s = session();
        assert!(s.setup_level());
        assert!(s.terrain.check_invariants(s.cfg.viewport_w, s.cfg.viewport_h));
        assert_eq!(s.scroll_x, 0);
    }

    #[test]
    fn setup_level_fails_for_missing_file() {
        let mut s = session();
        s.cfg.level_file = Some("/nonexistent/level.txt".into());
        assert!(!s.setup_level());
    }

    #[test]
    fn setup_level_is_deterministic_per_seed() {
        let mut a = session();
        let mut b = session();
        a.setup_level();
        b.setup_level();
        assert_eq!(a.terrain.len(), b.terrain.len());
        for (ca, cb) in a.terrain.columns.iter().zip(&b.terrain.columns) {
            assert_eq!(ca.ground, cb.ground);
            assert_eq!(ca.objects, cb.objects);
        }
    }

    #[test]
    fn background_span_tracks_color_changes() {
        use super::super::terrain::{ColorChange, object};
        use crate::render::Color;
        let mut s = session();
        assert!(s.setup_level());
        let base = s.terrain.palette.bg_for(0);
        let cc = ColorChange {
            bg: Color::rgb(50, 0, 0),
            ground: Color::rgb(0, 50, 0),
            sky: Color::rgb(1, 1, 1),
        };
        s.terrain.columns[100].objects |= object::COLOR_CHANGE;
        s.terrain.columns[100].color_change = Some(cc);

        let span = s.background_span(95, 10);
        assert!(span[..5].iter().all(|&c| c == base));
        assert!(span[5..].iter().all(|&c| c == cc.bg));
    }

    #[test]
    fn focus_loss_pauses_level_but_not_trainer() {
        let mut s = session();
        s.enter_phase(Phase::Level);
        s.on_focus_lost(); // trainer: ignored
        assert_eq!(s.phase, Phase::Level);

        let mut s = Session::new(SessionConfig::default(), ProfileStore::in_memory());
        s.enter_phase(Phase::Level);
        s.on_focus_lost();
        assert_eq!(s.phase, Phase::Paused);
        s.resume();
        assert_eq!(s.phase, Phase::Level);
    }
}
