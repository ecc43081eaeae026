//! Demo recording and playback.
//!
//! A demo captures everything needed to reproduce a session bit-exactly:
//! the level seed, the ship skin, the tick distance, and per-tick craft
//! position + fire flags with periodic PRNG state checkpoints. Playback
//! substitutes for live input and re-seeds the level generator from the
//! checkpoints, so enemy trigger decisions replay identically.
//!
//! File format (text):
//!
//! ```text
//! <seed> <ship> <tick_distance> <flags>
//! <ship_x> <ship_y> <bomb> <missile> [<seed_u> <seed_v>]
//! *                                   (identical to previous entry)
//! ```

use anyhow::{Context, Result, bail};

use crate::prng::Lcg16;

/// Flags word layout: low byte completion count, then mode bits.
mod flag {
    pub const COMPLETED_MASK: u32 = 0xFF;
    pub const CLASSIC: u32 = 1 << 8;
    pub const SPEED_CORRECTION: u32 = 1 << 9;
}

/// PRNG checkpoints are written every this many ticks.
const SEED_CHECKPOINT_INTERVAL: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoEntry {
    pub ship_x: i32,
    pub ship_y: i32,
    pub bomb: bool,
    pub missile: bool,
    /// Level PRNG state to restore before this tick runs
    pub reseed: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Default)]
pub struct DemoRecording {
    pub seed: u32,
    pub ship: u32,
    /// Scroll distance per tick the session was recorded at
    pub tick_dx: i32,
    pub completed: u32,
    pub classic: bool,
    pub speed_correction: bool,
    /// One entry per tick, monotonic in scroll offset
    pub entries: Vec<DemoEntry>,
}

impl DemoRecording {
    pub fn new(seed: u32, ship: u32, tick_dx: i32) -> Self {
        Self {
            seed,
            ship,
            tick_dx,
            ..Default::default()
        }
    }

    /// Ticks of playback this recording covers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A demo must cover the whole level; anything shorter is discarded
    /// by the caller rather than played truncated.
    pub fn covers(&self, final_offset: i32) -> bool {
        self.tick_dx > 0 && (self.len() as i32) * self.tick_dx >= final_offset
    }

    pub fn serialize(&self) -> String {
        let mut flags = self.completed & flag::COMPLETED_MASK;
        if self.classic {
            flags |= flag::CLASSIC;
        }
        if self.speed_correction {
            flags |= flag::SPEED_CORRECTION;
        }
        let mut out = format!("{} {} {} {}\n", self.seed, self.ship, self.tick_dx, flags);
        let mut prev: Option<&DemoEntry> = None;
        for entry in &self.entries {
            if prev == Some(entry) {
                out.push_str("*\n");
                continue;
            }
            out.push_str(&format!(
                "{} {} {} {}",
                entry.ship_x,
                entry.ship_y,
                u8::from(entry.bomb),
                u8::from(entry.missile)
            ));
            if let Some((u, v)) = entry.reseed {
                out.push_str(&format!(" {u} {v}"));
            }
            out.push('\n');
            prev = Some(entry);
        }
        out
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().context("empty demo file")?;
        let toks: Vec<&str> = header.split_whitespace().collect();
        if toks.len() != 4 {
            bail!("bad demo header");
        }
        let seed: u32 = toks[0].parse().context("demo seed")?;
        let ship: u32 = toks[1].parse().context("demo ship")?;
        let tick_dx: i32 = toks[2].parse().context("demo tick distance")?;
        let flags: u32 = toks[3].parse().context("demo flags")?;

        let mut rec = Self::new(seed, ship, tick_dx);
        rec.completed = flags & flag::COMPLETED_MASK;
        rec.classic = flags & flag::CLASSIC != 0;
        rec.speed_correction = flags & flag::SPEED_CORRECTION != 0;

        let mut prev: Option<DemoEntry> = None;
        for line in lines {
            let line = line.trim();
            if line == "*" {
                let entry = prev.context("demo starts with a repeat marker")?;
                rec.entries.push(entry);
                prev = Some(entry);
                continue;
            }
            let toks: Vec<&str> = line.split_whitespace().collect();
            if toks.len() != 4 && toks.len() != 6 {
                bail!("bad demo entry '{line}'");
            }
            let entry = DemoEntry {
                ship_x: toks[0].parse().context("demo ship x")?,
                ship_y: toks[1].parse().context("demo ship y")?,
                bomb: toks[2] != "0",
                missile: toks[3] != "0",
                reseed: if toks.len() == 6 {
                    Some((
                        toks[4].parse().context("demo seed u")?,
                        toks[5].parse().context("demo seed v")?,
                    ))
                } else {
                    None
                },
            };
            rec.entries.push(entry);
            prev = Some(entry);
        }
        Ok(rec)
    }
}

/// Observes live ticks and accumulates a recording.
pub struct DemoRecorder {
    pub recording: DemoRecording,
}

impl DemoRecorder {
    pub fn new(seed: u32, ship: u32, tick_dx: i32) -> Self {
        Self {
            recording: DemoRecording::new(seed, ship, tick_dx),
        }
    }

    /// Capture one tick. The PRNG state is checkpointed periodically so
    /// playback can resynchronize even mid-file.
    pub fn observe(&mut self, ship_x: i32, ship_y: i32, bomb: bool, missile: bool, rng: &Lcg16) {
        let reseed = if self.recording.entries.len() % SEED_CHECKPOINT_INTERVAL == 0 {
            Some(rng.state())
        } else {
            None
        };
        self.recording.entries.push(DemoEntry {
            ship_x,
            ship_y,
            bomb,
            missile,
            reseed,
        });
    }
}

/// Replays a recording in place of live input.
pub struct DemoPlayer {
    recording: DemoRecording,
    cursor: usize,
}

impl DemoPlayer {
    pub fn new(recording: DemoRecording) -> Self {
        Self {
            recording,
            cursor: 0,
        }
    }

    /// Next tick's entry; applies any PRNG checkpoint before returning.
    pub fn next(&mut self, rng: &mut Lcg16) -> Option<DemoEntry> {
        let entry = *self.recording.entries.get(self.cursor)?;
        self.cursor += 1;
        if let Some((u, v)) = entry.reseed {
            rng.seed2(u, v);
        }
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recording() -> DemoRecording {
        let mut rec = DemoRecording::new(1234, 1, 3);
        rec.completed = 2;
        rec.classic = true;
        let rng = Lcg16::new(1234);
        let mut recorder = DemoRecorder::new(1234, 1, 3);
        recorder.recording.completed = 2;
        recorder.recording.classic = true;
        for i in 0..120 {
            // Long runs of identical input exercise the repeat marker
            let y = if i < 60 { 300 } else { 310 };
            recorder.observe(100, y, false, i == 80, &rng);
        }
        rec.entries = recorder.recording.entries.clone();
        rec
    }

    #[test]
    fn round_trips_through_text() {
        let rec = sample_recording();
        let text = rec.serialize();
        let parsed = DemoRecording::parse(&text).unwrap();
        assert_eq!(parsed.seed, rec.seed);
        assert_eq!(parsed.ship, rec.ship);
        assert_eq!(parsed.tick_dx, rec.tick_dx);
        assert_eq!(parsed.completed, 2);
        assert!(parsed.classic);
        assert!(!parsed.speed_correction);
        assert_eq!(parsed.entries, rec.entries);
    }

    #[test]
    fn repeat_marker_compacts_storage() {
        let rec = sample_recording();
        let text = rec.serialize();
        let stars = text.lines().filter(|l| *l == "*").count();
        assert!(stars > 100, "only {stars} repeat markers");
    }

    #[test]
    fn playback_reseeds_level_rng() {
        let mut source = Lcg16::new(777);
        for _ in 0..13 {
            source.next();
        }
        let mut recorder = DemoRecorder::new(777, 0, 3);
        recorder.observe(10, 20, false, false, &source);

        let mut player = DemoPlayer::new(recorder.recording);
        let mut replay_rng = Lcg16::new(0);
        let entry = player.next(&mut replay_rng).unwrap();
        assert_eq!(entry.ship_x, 10);
        assert_eq!(replay_rng.state(), source.state());
        assert_eq!(replay_rng.next(), source.next());
    }

    #[test]
    fn short_demo_does_not_cover_level() {
        let mut rec = DemoRecording::new(1, 0, 3);
        for _ in 0..10 {
            rec.entries.push(DemoEntry {
                ship_x: 0,
                ship_y: 0,
                bomb: false,
                missile: false,
                reseed: None,
            });
        }
        assert!(rec.covers(30));
        assert!(!rec.covers(31));
        rec.tick_dx = 0;
        assert!(!rec.covers(1));
    }

    #[test]
    fn truncated_file_is_an_error() {
        assert!(DemoRecording::parse("").is_err());
        assert!(DemoRecording::parse("1 2 3\n").is_err());
        assert!(DemoRecording::parse("1 2 3 0\n*\n").is_err());
        assert!(DemoRecording::parse("1 2 3 0\n5 5 0\n").is_err());
    }
}
