use crate::engine::MatchRecord;
use crate::flavor::Flavor;
use crate::maps::MapData;
use crate::player::PlayerRecord;
use crate::rank::RankTier;
use crate::settings::Settings;
use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything the bot persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub settings: Settings,
    pub ranks: Vec<RankTier>,
    pub players: Vec<PlayerRecord>,
    pub maps: MapData,
    pub history: Vec<MatchRecord>,
    pub flavor: Flavor,
}

/// Durable storage. Every save replaces the whole collection and is durable once it returns.
pub trait Store: Send + Sync {
    fn load(&self) -> Result<Snapshot>;
    fn save_settings(&mut self, settings: &Settings) -> Result<()>;
    fn save_ranks(&mut self, ranks: &[&RankTier]) -> Result<()>;
    fn save_players(&mut self, players: &[&PlayerRecord]) -> Result<()>;
    fn save_maps(&mut self, maps: &MapData) -> Result<()>;
    fn save_history(&mut self, history: &[&MatchRecord]) -> Result<()>;
    fn save_flavor(&mut self, flavor: &Flavor) -> Result<()>;
}

const SETTINGS_FILE: &str = "settings.json";
const RANKS_FILE: &str = "ranks.json";
const PLAYERS_FILE: &str = "players.json";
const MAPS_FILE: &str = "maps.json";
const HISTORY_FILE: &str = "history.json";
const FLAVOR_FILE: &str = "flavor.json";

/// One pretty-printed JSON file per collection inside a data directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Unable to create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A missing file reads as an empty collection.
    fn read<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(T::default());
        }
        let bytes = fs::read(&path).with_context(|| format!("Unable to read {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("Malformed {}", path.display()))
    }

    fn write<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(value)?;
        fs::write(&tmp, bytes).with_context(|| format!("Unable to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Unable to replace {}", path.display()))?;
        debug!("Saved {}", path.display());
        Ok(())
    }
}

impl Store for JsonStore {
    fn load(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            settings: self.read(SETTINGS_FILE)?,
            ranks: self.read(RANKS_FILE)?,
            players: self.read(PLAYERS_FILE)?,
            maps: self.read(MAPS_FILE)?,
            history: self.read(HISTORY_FILE)?,
            flavor: self.read(FLAVOR_FILE)?,
        })
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        self.write(SETTINGS_FILE, settings)
    }

    fn save_ranks(&mut self, ranks: &[&RankTier]) -> Result<()> {
        self.write(RANKS_FILE, ranks)
    }

    fn save_players(&mut self, players: &[&PlayerRecord]) -> Result<()> {
        self.write(PLAYERS_FILE, players)
    }

    fn save_maps(&mut self, maps: &MapData) -> Result<()> {
        self.write(MAPS_FILE, maps)
    }

    fn save_history(&mut self, history: &[&MatchRecord]) -> Result<()> {
        self.write(HISTORY_FILE, history)
    }

    fn save_flavor(&mut self, flavor: &Flavor) -> Result<()> {
        self.write(FLAVOR_FILE, flavor)
    }
}

/// Keeps the snapshot in memory. Used by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Snapshot,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }
}

fn owned<T: Clone>(items: &[&T]) -> Vec<T> {
    items.iter().map(|t| (*t).clone()).collect()
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot.clone())
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        self.snapshot.settings = settings.clone();
        Ok(())
    }

    fn save_ranks(&mut self, ranks: &[&RankTier]) -> Result<()> {
        self.snapshot.ranks = owned(ranks);
        Ok(())
    }

    fn save_players(&mut self, players: &[&PlayerRecord]) -> Result<()> {
        self.snapshot.players = owned(players);
        Ok(())
    }

    fn save_maps(&mut self, maps: &MapData) -> Result<()> {
        self.snapshot.maps = maps.clone();
        Ok(())
    }

    fn save_history(&mut self, history: &[&MatchRecord]) -> Result<()> {
        self.snapshot.history = owned(history);
        Ok(())
    }

    fn save_flavor(&mut self, flavor: &Flavor) -> Result<()> {
        self.snapshot.flavor = flavor.clone();
        Ok(())
    }
}
