//! Per-user progress store, persisted as JSON.
//!
//! One file holds every user's best score, reached level, completion
//! count and ship choice, plus the most recently active user name.
//! Reading a name that was never saved yields a zeroed profile, so
//! callers never special-case first runs. A missing or corrupt file
//! degrades to an empty store with a logged warning; play always starts.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Best score achieved
    pub score: u32,
    /// Highest level reached
    pub level: u32,
    /// Times the full game was completed
    pub completed: u32,
    /// Selected ship skin index
    pub ship: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    last_user: String,
    users: HashMap<String, UserProfile>,
}

/// File-backed profile store. All mutation is in memory; `flush` writes.
#[derive(Debug, Default)]
pub struct ProfileStore {
    path: Option<PathBuf>,
    data: StoreFile,
}

impl ProfileStore {
    /// Store with no backing file; `flush` is a no-op. Tests and trainer
    /// sessions use this.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`, tolerating absence and corruption.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(data) => data,
                Err(err) => {
                    log::warn!("profile store {} corrupt, starting empty: {err}", path.display());
                    StoreFile::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(err) => {
                log::warn!("profile store {} unreadable, starting empty: {err}", path.display());
                StoreFile::default()
            }
        };
        Self {
            path: Some(path),
            data,
        }
    }

    /// Profile for a user; never-saved names read as zeroed.
    pub fn get(&self, user: &str) -> UserProfile {
        self.data.users.get(user).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, user: &str, profile: UserProfile) {
        self.data.users.insert(user.to_string(), profile);
        self.data.last_user = user.to_string();
    }

    /// Most recently active user, if any.
    pub fn last_user(&self) -> Option<&str> {
        if self.data.last_user.is_empty() {
            None
        } else {
            Some(&self.data.last_user)
        }
    }

    /// All profiles, best score first. Ties keep name order stable.
    pub fn all_by_score(&self) -> Vec<(&str, &UserProfile)> {
        let mut rows: Vec<(&str, &UserProfile)> = self
            .data
            .users
            .iter()
            .map(|(name, p)| (name.as_str(), p))
            .collect();
        rows.sort_by(|a, b| b.1.score.cmp(&a.1.score).then_with(|| a.0.cmp(b.0)));
        rows
    }

    /// Write the store back to disk. Memory-only stores return Ok.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.data).context("serialize profiles")?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create profile dir {}", dir.display()))?;
        }
        fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn unknown_user_reads_zeroed() {
        let store = ProfileStore::in_memory();
        assert_eq!(store.get("nobody"), UserProfile::default());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profiles.json");
        let mut store = ProfileStore::load(&path);
        store.set(
            "ann",
            UserProfile {
                score: 420,
                level: 7,
                completed: 1,
                ship: 1,
            },
        );
        store.flush().unwrap();

        let again = ProfileStore::load(&path);
        assert_eq!(again.get("ann").score, 420);
        assert_eq!(again.last_user(), Some("ann"));
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = ProfileStore::load(&path);
        assert_eq!(store.get("ann"), UserProfile::default());
        assert!(store.last_user().is_none());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::load(dir.path().join("never-written.json"));
        assert!(store.all_by_score().is_empty());
    }

    #[test]
    fn ranking_sorts_by_score_then_name() {
        let mut store = ProfileStore::in_memory();
        for (name, score) in [("cay", 50), ("ann", 90), ("bob", 50)] {
            store.set(
                name,
                UserProfile {
                    score,
                    ..Default::default()
                },
            );
        }
        let names: Vec<&str> = store.all_by_score().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["ann", "bob", "cay"]);
    }
}
