//! Fire-and-forget sound service.
//!
//! The simulation pushes [`Sound`] requests into the session's queue; the
//! host drains them once per tick into a [`SoundService`]. Playback is
//! best-effort: a missing player binary or a failed spawn never affects
//! the simulation, it just logs once.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Every sound the simulation can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    RocketLaunch,
    Drop,
    Missile,
    Bomb,
    Phaser,
    Splash,
    Explosion,
    Win,
    Fail,
    TitleMusic,
    LevelMusic,
    StopMusic,
}

impl Sound {
    /// Asset file stem for this sound.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Sound::RocketLaunch => "launch",
            Sound::Drop => "drip",
            Sound::Missile => "missile",
            Sound::Bomb => "bomb",
            Sound::Phaser => "phaser",
            Sound::Splash => "splash",
            Sound::Explosion => "explosion",
            Sound::Win => "win",
            Sound::Fail => "fail",
            Sound::TitleMusic => "title",
            Sound::LevelMusic => "level",
            Sound::StopMusic => "",
        }
    }
}

/// Host seam for audio output.
pub trait SoundService {
    fn play(&mut self, sound: Sound);
}

/// Discards everything. Headless runs and tests use this.
#[derive(Default)]
pub struct NullSound;

impl SoundService for NullSound {
    fn play(&mut self, _sound: Sound) {}
}

/// Shells out to an external player per sound, detached. Spawn failures
/// are logged once per sound and then dropped silently.
pub struct CommandSound {
    player: String,
    asset_dir: PathBuf,
    failed: HashSet<Sound>,
}

impl CommandSound {
    pub fn new(player: impl Into<String>, asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            player: player.into(),
            asset_dir: asset_dir.into(),
            failed: HashSet::new(),
        }
    }
}

impl SoundService for CommandSound {
    fn play(&mut self, sound: Sound) {
        if sound == Sound::StopMusic || self.failed.contains(&sound) {
            return;
        }
        let path = self.asset_dir.join(format!("{}.wav", sound.file_stem()));
        let spawned = Command::new(&self.player)
            .arg(&path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(err) = spawned {
            log::warn!("sound {sound:?} via {}: {err}", self.player);
            self.failed.insert(sound);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_service_accepts_everything() {
        let mut s = NullSound;
        s.play(Sound::RocketLaunch);
        s.play(Sound::StopMusic);
    }

    #[test]
    fn failed_player_is_only_tried_once() {
        let mut s = CommandSound::new("/nonexistent/definitely-not-a-player", "/tmp");
        s.play(Sound::Bomb);
        assert!(s.failed.contains(&Sound::Bomb));
        // Second call short-circuits on the failed set
        s.play(Sound::Bomb);
        assert_eq!(s.failed.len(), 1);
    }
}
