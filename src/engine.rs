use crate::error::{JppError, ParseError};
use crate::matching::balance_teams;
use crate::player::{PlayerRecord, Roster, TeamResult};
use crate::queue::QueueEntry;
use crate::rank::{RankTable, RankTransition};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serenity::all::UserId;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    Team1Win,
    Team2Win,
    Cancelled,
}

impl MatchResult {
    /// The result as seen by team 1 and team 2.
    pub fn team_results(self) -> (TeamResult, TeamResult) {
        match self {
            MatchResult::Team1Win => (TeamResult::Win, TeamResult::Lose),
            MatchResult::Team2Win => (TeamResult::Lose, TeamResult::Win),
            MatchResult::Cancelled => (TeamResult::Cancel, TeamResult::Cancel),
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchResult::Team1Win => "Team 1 Win",
            MatchResult::Team2Win => "Team 2 Win",
            MatchResult::Cancelled => "Cancelled",
        })
    }
}

impl FromStr for MatchResult {
    type Err = ParseError;

    /// Accepts the stored values `0`/`1`/`2`, team names (`team1`, `blue`, `team2`, `orange`)
    /// and `cancel`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arg: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match arg.as_str() {
            "0" | "1win" | "t1" | "team1" | "team1win" | "blue" | "b" => Ok(MatchResult::Team1Win),
            "1" | "2win" | "t2" | "team2" | "team2win" | "orange" | "o" => Ok(MatchResult::Team2Win),
            "2" | "c" | "cancel" | "cancelled" | "canceled" => Ok(MatchResult::Cancelled),
            _ => Err(ParseError::MatchResult(s.to_owned())),
        }
    }
}

/// A match between its start and its reported result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: u64,
    pub team1: Vec<QueueEntry>,
    pub team2: Vec<QueueEntry>,
    pub map: String,
    pub pool: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn players(&self) -> impl Iterator<Item = &QueueEntry> {
        self.team1.iter().chain(&self.team2)
    }

    pub fn has_player(&self, user: UserId) -> bool {
        self.players().any(|p| p.user == user)
    }
}

/// One player's MMR snapshot in a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub user: UserId,
    pub prev_mmr: i64,
    pub new_mmr: i64,
    pub mmr_delta: i64,
}

impl MatchPlayer {
    /// The MMR this entry moved its player by.
    pub fn applied_delta(&self) -> i64 {
        (self.new_mmr - self.prev_mmr).abs()
    }
}

/// A finished match. Only [`MatchEngine::correct_result`] changes one after it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: u64,
    pub team1: Vec<MatchPlayer>,
    pub team2: Vec<MatchPlayer>,
    pub result: MatchResult,
    pub map: String,
    pub pool: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn players(&self) -> impl Iterator<Item = &MatchPlayer> {
        self.team1.iter().chain(&self.team2)
    }
}

/// What happened to one player when a result was reported or corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerChange {
    pub user: UserId,
    pub result: TeamResult,
    pub prev_mmr: i64,
    pub new_mmr: i64,
    /// Points moved; for a cancelled match, the points that were at stake.
    pub delta: i64,
    pub transition: RankTransition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport {
    pub record: MatchRecord,
    pub team1: Vec<PlayerChange>,
    pub team2: Vec<PlayerChange>,
}

impl MatchReport {
    pub fn changes(&self) -> impl Iterator<Item = &PlayerChange> {
        self.team1.iter().chain(&self.team2)
    }
}

fn settle(
    player: &mut PlayerRecord,
    result: TeamResult,
    ranks: &RankTable,
) -> (MatchPlayer, PlayerChange) {
    let prev_mmr = player.mmr;
    let stake = ranks.delta_for(prev_mmr);
    player.apply(result, stake);
    let new_mmr = player.mmr;
    let applied = (new_mmr - prev_mmr).abs();

    (
        MatchPlayer {
            user: player.user,
            prev_mmr,
            new_mmr,
            mmr_delta: applied,
        },
        PlayerChange {
            user: player.user,
            result,
            prev_mmr,
            new_mmr,
            delta: if result == TeamResult::Cancel { stake } else { applied },
            transition: ranks.lookup_transition(prev_mmr, new_mmr),
        },
    )
}

fn resettle(
    entry: &mut MatchPlayer,
    player: &mut PlayerRecord,
    prev_result: TeamResult,
    new_result: TeamResult,
    ranks: &RankTable,
) -> PlayerChange {
    let before = player.mmr;
    let old_delta = entry.applied_delta();
    let new_delta = ranks.delta_for(player.undone_mmr(old_delta, prev_result));
    let undone = player.redo(old_delta, new_delta, prev_result, new_result);

    // stored as if the new result had been reported in the first place
    entry.prev_mmr = undone;
    entry.new_mmr = player.mmr;
    entry.mmr_delta = entry.applied_delta();

    PlayerChange {
        user: player.user,
        result: new_result,
        prev_mmr: before,
        new_mmr: player.mmr,
        delta: (player.mmr - before).abs(),
        transition: ranks.lookup_transition(before, player.mmr),
    }
}

/// Tracks matches in flight and the history of finished ones.
#[derive(Debug, Clone, Default)]
pub struct MatchEngine {
    in_flight: BTreeMap<u64, Match>,
    history: BTreeMap<u64, MatchRecord>,
}

impl MatchEngine {
    pub fn new(history: impl IntoIterator<Item = MatchRecord>) -> Self {
        Self {
            in_flight: BTreeMap::new(),
            history: history.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    /// Balances `players` into two teams and tracks the match until its result is reported.
    pub fn start_match<R: Rng + ?Sized>(
        &mut self,
        id: u64,
        players: Vec<QueueEntry>,
        map: String,
        pool: Option<String>,
        rng: &mut R,
    ) -> &Match {
        let teams = balance_teams(&players, rng);
        info!(
            "Match {id} started on {map}, mmr difference {}",
            teams.mmr_difference()
        );
        let game = Match {
            id,
            team1: teams.team1,
            team2: teams.team2,
            map,
            pool,
            created_at: Utc::now(),
        };
        self.in_flight.entry(id).or_insert(game)
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &Match> {
        self.in_flight.values()
    }

    /// The oldest match still waiting for a result.
    pub fn current(&self) -> Option<&Match> {
        self.in_flight.values().next()
    }

    pub fn current_mut(&mut self) -> Option<&mut Match> {
        self.in_flight.values_mut().next()
    }

    pub fn is_in_game(&self, user: UserId) -> bool {
        self.in_flight.values().any(|m| m.has_player(user))
    }

    pub fn history(&self) -> impl Iterator<Item = &MatchRecord> {
        self.history.values()
    }

    pub fn record(&self, id: u64) -> Result<&MatchRecord, JppError> {
        self.history.get(&id).ok_or(JppError::MatchNotFound(id))
    }

    /// Applies `result` to every player of an in-flight match and moves it into the history.
    pub fn report_result(
        &mut self,
        id: u64,
        result: MatchResult,
        roster: &mut Roster,
        ranks: &RankTable,
    ) -> Result<MatchReport, JppError> {
        let game = self.in_flight.get(&id).ok_or(JppError::InvalidMatchId(id))?;
        roster.ensure_registered(game.players().map(|p| &p.user))?;
        let game = self.in_flight.remove(&id).ok_or(JppError::InvalidMatchId(id))?;

        let (team1_result, team2_result) = result.team_results();
        let mut settle_team = |team: &[QueueEntry], team_result| -> Result<_, JppError> {
            let mut records = Vec::with_capacity(team.len());
            let mut changes = Vec::with_capacity(team.len());
            for entry in team {
                let (record, change) = settle(roster.get_mut(entry.user)?, team_result, ranks);
                debug!(
                    "Match {id}: {} {} -> {}",
                    entry.user, change.prev_mmr, change.new_mmr
                );
                records.push(record);
                changes.push(change);
            }
            Ok((records, changes))
        };
        let (team1, team1_changes) = settle_team(&game.team1, team1_result)?;
        let (team2, team2_changes) = settle_team(&game.team2, team2_result)?;

        let record = MatchRecord {
            id,
            team1,
            team2,
            result,
            map: game.map,
            pool: game.pool,
            created_at: game.created_at,
        };
        info!("Match {id} reported as {result}");
        self.history.insert(id, record.clone());

        Ok(MatchReport {
            record,
            team1: team1_changes,
            team2: team2_changes,
        })
    }

    /// Replaces a finished match's result, reversing the old result for every player.
    pub fn correct_result(
        &mut self,
        id: u64,
        new_result: MatchResult,
        roster: &mut Roster,
        ranks: &RankTable,
    ) -> Result<MatchReport, JppError> {
        let record = self.history.get(&id).ok_or(JppError::MatchNotFound(id))?;
        if record.result == new_result {
            return Err(JppError::MatchResultIdentical(new_result));
        }
        roster.ensure_registered(record.players().map(|p| &p.user))?;

        let record = self
            .history
            .get_mut(&id)
            .ok_or(JppError::MatchNotFound(id))?;
        let (old1, old2) = record.result.team_results();
        let (new1, new2) = new_result.team_results();

        let mut changes = [Vec::new(), Vec::new()];
        let sides = [
            (&mut record.team1, old1, new1),
            (&mut record.team2, old2, new2),
        ];
        for (i, (side, prev, next)) in sides.into_iter().enumerate() {
            for entry in side.iter_mut() {
                let player = roster.get_mut(entry.user)?;
                changes[i].push(resettle(entry, player, prev, next, ranks));
            }
        }

        info!("Match {id} corrected from {} to {new_result}", record.result);
        record.result = new_result;
        let [team1, team2] = changes;

        Ok(MatchReport {
            record: record.clone(),
            team1,
            team2,
        })
    }
}
