use crate::engine::{Match, MatchEngine, MatchRecord, MatchReport, MatchResult};
use crate::error::JppError;
use crate::flavor::{Activity, ActivityType, Flavor, Presence, Quip, QuipType, Strat, StratSide};
use crate::maps::{GameMap, MapCatalog, MapPool, MapPoolType};
use crate::player::{PlayerRecord, Roster, Streak};
use crate::queue::{MatchQueue, QueueEntry};
use crate::rank::{RankTable, RankTier, RankTransition};
use crate::settings::{ChannelType, Settings};
use crate::store::Store;
use anyhow::Result;
use rand_chacha::ChaCha8Rng;
use serenity::all::{ChannelId, RoleId, UserId};
use tracing::{debug, info};

pub const LEADERBOARD_PAGE_SIZE: usize = 10;

/// A map that is always in the running when a particular user plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapOverride {
    pub user: UserId,
    pub map: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStats {
    pub record: PlayerRecord,
    pub tier: Option<RankTier>,
    pub streak: Streak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub entry: QueueEntry,
    pub queued: usize,
    /// Set when this join filled the queue.
    pub started: Option<Match>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmrChange {
    pub user: UserId,
    pub prev_mmr: i64,
    pub new_mmr: i64,
    pub transition: RankTransition,
}

/// Every rank role to strip from a member, and the roles they should hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRefresh {
    pub remove: Vec<RoleId>,
    pub add: Option<RoleId>,
    /// The registered role, when one is set up.
    pub registered: Option<RoleId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForcedMap {
    /// The running match now plays on this map.
    Match { id: u64, map: String },
    /// The next match will play on this map.
    Queue { map: String },
}

/// One page of the leaderboard, with 1-based positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardPage<'a> {
    pub page: usize,
    pub pages: usize,
    pub entries: Vec<(usize, &'a PlayerRecord)>,
}

/// All bot state. Commands take the lock on this, mutate it and every mutation is saved before
/// the operation returns.
pub struct Jpp {
    settings: Settings,
    ranks: RankTable,
    roster: Roster,
    maps: MapCatalog,
    queue: MatchQueue,
    engine: MatchEngine,
    rng: ChaCha8Rng,
    map_override: Option<MapOverride>,
    flavor: Flavor,
    store: Box<dyn Store>,
}

impl Jpp {
    pub fn load(store: Box<dyn Store>, queue_size: usize, rng: ChaCha8Rng) -> Result<Self> {
        let snapshot = store.load()?;
        info!(
            "Loaded {} players, {} ranks, {} maps and {} finished matches",
            snapshot.players.len(),
            snapshot.ranks.len(),
            snapshot.maps.maps.len(),
            snapshot.history.len()
        );
        Ok(Self {
            settings: snapshot.settings,
            ranks: RankTable::from_tiers(snapshot.ranks),
            roster: Roster::from_records(snapshot.players),
            maps: MapCatalog::from_data(snapshot.maps),
            queue: MatchQueue::new(queue_size),
            engine: MatchEngine::new(snapshot.history),
            rng,
            map_override: None,
            flavor: snapshot.flavor,
            store,
        })
    }

    pub fn with_map_override(mut self, map_override: Option<MapOverride>) -> Self {
        self.map_override = map_override;
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    fn save_settings(&mut self) -> Result<()> {
        self.store.save_settings(&self.settings)
    }

    fn save_ranks(&mut self) -> Result<()> {
        self.store.save_ranks(&self.ranks.sorted())
    }

    fn save_players(&mut self) -> Result<()> {
        self.store.save_players(&self.roster.records())
    }

    fn save_maps(&mut self) -> Result<()> {
        self.store.save_maps(&self.maps.to_data())
    }

    fn save_flavor(&mut self) -> Result<()> {
        self.store.save_flavor(&self.flavor)
    }

    fn save_history(&mut self) -> Result<()> {
        let history: Vec<&MatchRecord> = self.engine.history().collect();
        self.store.save_history(&history)
    }

    // players

    /// Fails the way `register` would, without registering anyone.
    pub fn check_registration(&self, user: UserId, name: &str) -> Result<(), JppError> {
        self.roster.check_register(user, name)
    }

    pub fn register(&mut self, user: UserId, name: &str) -> Result<PlayerRecord> {
        let player = self.roster.register(user, name)?.clone();
        self.save_players()?;
        info!("Registered {} as {}", user, player.name);
        Ok(player)
    }

    pub fn rename(&mut self, user: UserId, name: &str) -> Result<PlayerRecord> {
        let player = self.roster.rename(user, name)?.clone();
        self.save_players()?;
        info!("Renamed {} to {}", user, player.name);
        Ok(player)
    }

    #[cfg(test)]
    pub fn player(&self, user: UserId) -> Result<&PlayerRecord, JppError> {
        self.roster.get(user)
    }

    pub fn stats(&self, user: UserId) -> Result<PlayerStats, JppError> {
        let record = self.roster.get(user)?;
        Ok(PlayerStats {
            tier: self.ranks.lookup(record.mmr).cloned(),
            streak: record.streak(),
            record: record.clone(),
        })
    }

    /// `page` is 1-based and clamped to the available pages.
    pub fn leaderboard(&self, page: usize) -> LeaderboardPage<'_> {
        let players = self.roster.leaderboard();
        let pages = players.len().div_ceil(LEADERBOARD_PAGE_SIZE).max(1);
        let page = page.clamp(1, pages);
        let entries = players
            .into_iter()
            .enumerate()
            .skip((page - 1) * LEADERBOARD_PAGE_SIZE)
            .take(LEADERBOARD_PAGE_SIZE)
            .map(|(i, p)| (i + 1, p))
            .collect();
        LeaderboardPage {
            page,
            pages,
            entries,
        }
    }

    // queue

    pub fn queue(&self) -> &MatchQueue {
        &self.queue
    }

    /// Queues a registered player at their current MMR. A full queue starts a match.
    pub fn join_queue(&mut self, user: UserId) -> Result<JoinOutcome> {
        let mmr = self.roster.get(user)?.mmr;
        if self.engine.is_in_game(user) {
            return Err(JppError::MatchRunning(user).into());
        }
        let entry = self.queue.join(user, mmr)?;
        let queued = self.queue.len();
        info!("{} joined the queue [{}/{}]", user, queued, self.queue.capacity());

        let started = if self.queue.is_full() {
            match self.start_match() {
                Ok(game) => Some(game),
                Err(e) => {
                    // a failed start must not leave the joiner queued
                    if self.queue.contains(user) {
                        self.queue.leave(user)?;
                    }
                    return Err(e);
                }
            }
        } else {
            None
        };
        Ok(JoinOutcome {
            entry,
            queued,
            started,
        })
    }

    /// Also used to kick someone else out of the queue.
    pub fn leave_queue(&mut self, user: UserId) -> Result<QueueEntry> {
        let entry = self.queue.leave(user)?;
        info!("{} left the queue [{}/{}]", user, self.queue.len(), self.queue.capacity());
        Ok(entry)
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        info!("Queue cleared");
    }

    /// Starts a match with whoever is queued, full or not.
    pub fn force_start(&mut self) -> Result<Match> {
        if self.queue.is_empty() {
            return Err(JppError::QueueEmpty.into());
        }
        self.start_match()
    }

    pub fn missing(&self, users: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
        self.queue.missing(users)
    }

    fn override_for<'a>(&self, players: impl IntoIterator<Item = &'a QueueEntry>) -> Option<&str> {
        let rule = self.map_override.as_ref()?;
        players
            .into_iter()
            .any(|p| p.user == rule.user)
            .then_some(rule.map.as_str())
    }

    fn pick_map<'a>(&mut self, players: impl IntoIterator<Item = &'a QueueEntry>) -> Result<String> {
        let override_map = self.override_for(players).map(str::to_owned);
        let map = self.maps.select(override_map.as_deref(), &mut self.rng)?;
        Ok(map.name.clone())
    }

    /// The queue is only consumed once a map has been chosen.
    fn start_match(&mut self) -> Result<Match> {
        let map = match self.queue.forced_map() {
            Some(map) => map.to_owned(),
            None => {
                let entries = self.queue.entries().to_vec();
                self.pick_map(&entries)?
            }
        };
        let pool = self.maps.current_pool().map(|p| p.name.clone());
        let id = self.settings.issue_match_id();
        let (players, _) = self.queue.take();
        let game = self
            .engine
            .start_match(id, players, map, pool, &mut self.rng)
            .clone();
        self.save_settings()?;
        Ok(game)
    }

    // matches

    pub fn current_match(&self) -> Option<&Match> {
        self.engine.current()
    }

    pub fn running_matches(&self) -> impl Iterator<Item = &Match> {
        self.engine.in_flight()
    }

    pub fn report(&mut self, id: u64, result: MatchResult) -> Result<MatchReport> {
        let report = self
            .engine
            .report_result(id, result, &mut self.roster, &self.ranks)?;
        if result != MatchResult::Cancelled {
            self.maps
                .declare_played(&report.record.map, report.record.pool.as_deref());
            self.save_maps()?;
        }
        self.save_players()?;
        self.save_history()?;
        Ok(report)
    }

    pub fn recall(&self, id: u64) -> Result<&MatchRecord, JppError> {
        self.engine.record(id)
    }

    pub fn correct(&mut self, id: u64, result: MatchResult) -> Result<MatchReport> {
        let report = self
            .engine
            .correct_result(id, result, &mut self.roster, &self.ranks)?;
        self.save_players()?;
        self.save_history()?;
        Ok(report)
    }

    /// Changes the running match's map, or else the next match's map.
    pub fn force_map(&mut self, name: &str) -> Result<ForcedMap> {
        let map = self.maps.map(name)?.name.clone();
        if let Some(game) = self.engine.current_mut() {
            game.map = map.clone();
            info!("Match {} forced onto {}", game.id, map);
            return Ok(ForcedMap::Match { id: game.id, map });
        }
        if self.queue.is_empty() {
            return Err(JppError::NoMatchRunning.into());
        }
        self.queue.force_map(map.clone());
        info!("Next match forced onto {}", map);
        Ok(ForcedMap::Queue { map })
    }

    /// Picks a fresh map for the running match. Returns its id and the new map.
    pub fn reroll_map(&mut self) -> Result<(u64, String)> {
        let players = self
            .engine
            .current()
            .ok_or(JppError::NoMatchRunning)?
            .players()
            .copied()
            .collect::<Vec<_>>();
        let map = self.pick_map(&players)?;
        let game = self.engine.current_mut().ok_or(JppError::NoMatchRunning)?;
        game.map = map.clone();
        info!("Match {} rerolled onto {}", game.id, map);
        Ok((game.id, map))
    }

    // ranks

    pub fn ranks(&self) -> Vec<&RankTier> {
        self.ranks.sorted()
    }

    pub fn add_rank(&mut self, role: RoleId, min: i64, max: i64, delta: i64) -> Result<RankTier> {
        let tier = self.ranks.insert(role, min, max, delta)?.clone();
        self.save_ranks()?;
        info!("Added rank {} for {}..={} (±{})", role, min, max, delta);
        Ok(tier)
    }

    pub fn update_rank(
        &mut self,
        role: RoleId,
        min: i64,
        max: i64,
        delta: i64,
    ) -> Result<RankTier> {
        let tier = self.ranks.update(role, min, max, delta)?.clone();
        self.save_ranks()?;
        info!("Updated rank {} to {}..={} (±{})", role, min, max, delta);
        Ok(tier)
    }

    pub fn remove_rank(&mut self, role: RoleId) -> Result<RankTier> {
        let tier = self.ranks.remove(role)?;
        self.save_ranks()?;
        info!("Removed rank {}", role);
        Ok(tier)
    }

    pub fn set_mmr(&mut self, user: UserId, mmr: i64) -> Result<MmrChange> {
        let player = self.roster.get_mut(user)?;
        let prev_mmr = player.mmr;
        player.set_mmr(mmr);
        let new_mmr = player.mmr;
        self.save_players()?;
        info!("Set mmr of {} from {} to {}", user, prev_mmr, new_mmr);
        Ok(MmrChange {
            user,
            prev_mmr,
            new_mmr,
            transition: self.ranks.lookup_transition(prev_mmr, new_mmr),
        })
    }

    pub fn refresh_roles(&self, user: UserId) -> Result<RoleRefresh, JppError> {
        if self.ranks.is_empty() {
            return Err(JppError::NoRanks);
        }
        let mmr = self.roster.get(user)?.mmr;
        let add = self.ranks.lookup(mmr).map(|t| t.role);
        let remove = self
            .ranks
            .roles()
            .into_iter()
            .filter(|r| Some(*r) != add)
            .collect();
        debug!("Refreshing roles of {} at {} mmr", user, mmr);
        Ok(RoleRefresh {
            remove,
            add,
            registered: self.settings.registered_role,
        })
    }

    /// Role refreshes for every registered player.
    pub fn refresh_all_roles(&self) -> Result<Vec<(UserId, RoleRefresh)>, JppError> {
        self.roster
            .records()
            .into_iter()
            .map(|p| Ok((p.user, self.refresh_roles(p.user)?)))
            .collect()
    }

    // maps

    pub fn maps(&self) -> Vec<&GameMap> {
        self.maps.maps()
    }

    pub fn pools(&self) -> Vec<&MapPool> {
        self.maps.pools()
    }

    #[cfg(test)]
    pub fn map_pool(&self, name: &str) -> Result<&MapPool, JppError> {
        self.maps.pool(name)
    }

    pub fn current_pool(&self) -> Option<&MapPool> {
        self.maps.current_pool()
    }

    pub fn add_map(&mut self, name: &str) -> Result<GameMap> {
        let map = self.maps.add_map(name)?.clone();
        self.save_maps()?;
        info!("Added map {}", map.name);
        Ok(map)
    }

    pub fn remove_map(&mut self, name: &str) -> Result<GameMap> {
        let map = self.maps.remove_map(name)?;
        self.save_maps()?;
        info!("Removed map {}", map.name);
        Ok(map)
    }

    pub fn add_pool(&mut self, name: &str, kind: MapPoolType) -> Result<MapPool> {
        let pool = self.maps.add_pool(name, kind)?.clone();
        self.save_maps()?;
        info!("Added map pool {} ({})", pool.name, kind);
        Ok(pool)
    }

    pub fn remove_pool(&mut self, name: &str) -> Result<MapPool> {
        let pool = self.maps.remove_pool(name)?;
        self.save_maps()?;
        info!("Removed map pool {}", pool.name);
        Ok(pool)
    }

    pub fn set_pool_type(&mut self, name: &str, kind: MapPoolType) -> Result<MapPool> {
        let pool = self.maps.set_pool_type(name, kind)?.clone();
        self.save_maps()?;
        info!("Map pool {} is now {}", pool.name, kind);
        Ok(pool)
    }

    pub fn add_pool_map(&mut self, pool: &str, map: &str) -> Result<MapPool> {
        let pool = self.maps.add_pool_map(pool, map)?.clone();
        self.save_maps()?;
        info!("Added {} to map pool {}", map, pool.name);
        Ok(pool)
    }

    pub fn remove_pool_map(&mut self, pool: &str, map: &str) -> Result<MapPool> {
        let pool = self.maps.remove_pool_map(pool, map)?.clone();
        self.save_maps()?;
        info!("Removed {} from map pool {}", map, pool.name);
        Ok(pool)
    }

    pub fn set_current_pool(&mut self, name: Option<&str>) -> Result<Option<MapPool>> {
        let pool = self.maps.set_current_pool(name)?.cloned();
        self.save_maps()?;
        info!(
            "Current map pool is now {}",
            pool.as_ref().map_or("every map", |p| p.name.as_str())
        );
        Ok(pool)
    }

    // quips, activities and strats

    pub fn quips(&self) -> &[Quip] {
        &self.flavor.quips
    }

    pub fn add_quip(&mut self, text: &str, kind: QuipType, user: Option<UserId>) -> Result<Quip> {
        let quip = self.flavor.add_quip(text, kind, user)?.clone();
        self.save_flavor()?;
        info!("Added {} quip {}", kind, quip.text);
        Ok(quip)
    }

    pub fn remove_quip(&mut self, index: usize) -> Result<Quip> {
        let quip = self.flavor.remove_quip(index)?;
        self.save_flavor()?;
        info!("Removed quip {}", quip.text);
        Ok(quip)
    }

    /// A reply for `requester`, if any quip suits them. `emojis` are the guild's emoji names.
    pub fn random_quip(&mut self, requester: UserId, emojis: &[String]) -> Result<Option<Quip>> {
        let quip = self
            .flavor
            .random_quip(requester, emojis, &mut self.rng)
            .cloned();
        if quip.is_some() {
            self.save_flavor()?;
        }
        Ok(quip)
    }

    pub fn activities(&self) -> &[Activity] {
        &self.flavor.activities
    }

    pub fn add_activity(&mut self, name: &str, kind: ActivityType) -> Result<Activity> {
        let activity = self.flavor.add_activity(name, kind)?.clone();
        self.save_flavor()?;
        info!("Added {} activity {}", kind, activity.name);
        Ok(activity)
    }

    pub fn remove_activity(&mut self, index: usize) -> Result<Activity> {
        let activity = self.flavor.remove_activity(index)?;
        self.save_flavor()?;
        info!("Removed activity {}", activity.name);
        Ok(activity)
    }

    /// The presence is left alone while matches are running.
    pub fn next_presence(&mut self) -> Result<Presence> {
        if self.running_matches().next().is_some() {
            return Ok(Presence::Keep);
        }
        let presence = self.flavor.next_presence(&mut self.rng);
        if matches!(presence, Presence::Show(_)) {
            self.save_flavor()?;
        }
        Ok(presence)
    }

    pub fn strats(&self) -> &[Strat] {
        &self.flavor.strats
    }

    pub fn strat_counts(&self) -> (usize, usize, usize) {
        self.flavor.strat_counts()
    }

    pub fn add_strat(&mut self, side: StratSide, title: &str, text: &str) -> Result<Strat> {
        let strat = self.flavor.add_strat(side, title, text)?.clone();
        self.save_flavor()?;
        info!("Added {} strat {}", side, strat.title);
        Ok(strat)
    }

    pub fn remove_strat(&mut self, index: usize) -> Result<Strat> {
        let strat = self.flavor.remove_strat(index)?;
        self.save_flavor()?;
        info!("Removed strat {}", strat.title);
        Ok(strat)
    }

    pub fn draw_strat(&mut self, side: StratSide, previous: Option<&str>) -> Result<Strat> {
        let strat = self
            .flavor
            .draw_strat(side, previous, &mut self.rng)?
            .clone();
        self.save_flavor()?;
        debug!("Drew {} strat {}", side, strat.title);
        Ok(strat)
    }

    // settings

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn channel(&self, ty: ChannelType) -> Option<ChannelId> {
        self.settings.channel(ty)
    }

    pub fn set_channel(&mut self, ty: ChannelType, channel: Option<ChannelId>) -> Result<()> {
        self.settings.set_channel(ty, channel);
        self.save_settings()?;
        info!("{} channel set to {:?}", ty, channel);
        Ok(())
    }

    pub fn registered_role(&self) -> Result<RoleId, JppError> {
        self.settings
            .registered_role
            .ok_or(JppError::RoleUninitialized("registered"))
    }

    pub fn admin_role(&self) -> Result<RoleId, JppError> {
        self.settings
            .admin_role
            .ok_or(JppError::RoleUninitialized("admin"))
    }

    pub fn set_registered_role(&mut self, role: Option<RoleId>) -> Result<()> {
        self.settings.registered_role = role;
        self.save_settings()?;
        info!("Registered role set to {:?}", role);
        Ok(())
    }

    pub fn set_admin_role(&mut self, role: Option<RoleId>) -> Result<()> {
        self.settings.admin_role = role;
        self.save_settings()?;
        info!("Admin role set to {:?}", role);
        Ok(())
    }
}
