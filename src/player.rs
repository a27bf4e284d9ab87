use crate::error::JppError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serenity::all::UserId;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

/// Lowest/highest MMR before a player's first update.
pub const UNSET_MMR: i64 = -1;

/// A match outcome from one team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamResult {
    Win,
    Lose,
    Cancel,
}

impl fmt::Display for TeamResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TeamResult::Win => "Win",
            TeamResult::Lose => "Lose",
            TeamResult::Cancel => "Cancel",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Streak {
    Win(u32),
    Lose(u32),
    None,
}

/// Running statistics for a registered player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub user: UserId,
    pub name: String,
    pub mmr: i64,
    pub lowest_mmr: i64,
    pub highest_mmr: i64,
    pub matches_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_streak: u32,
    pub lose_streak: u32,
    pub highest_win_streak: u32,
    pub highest_lose_streak: u32,
}

impl PlayerRecord {
    pub fn new(user: UserId, name: impl Into<String>) -> Self {
        Self {
            user,
            name: name.into(),
            mmr: 0,
            lowest_mmr: UNSET_MMR,
            highest_mmr: UNSET_MMR,
            matches_played: 0,
            wins: 0,
            losses: 0,
            win_streak: 0,
            lose_streak: 0,
            highest_win_streak: 0,
            highest_lose_streak: 0,
        }
    }

    pub fn apply_result(&mut self, is_win: bool, delta: i64) {
        if is_win {
            self.wins += 1;
            self.mmr += delta;
            self.highest_lose_streak = self.highest_lose_streak.max(self.lose_streak);
            self.lose_streak = 0;
            self.win_streak += 1;
            self.highest_win_streak = self.highest_win_streak.max(self.win_streak);
        } else {
            self.losses += 1;
            self.mmr -= delta;
            self.highest_win_streak = self.highest_win_streak.max(self.win_streak);
            self.win_streak = 0;
            self.lose_streak += 1;
            self.highest_lose_streak = self.highest_lose_streak.max(self.lose_streak);
        }
        self.matches_played += 1;
        self.clamp_mmr();
        self.track_extremes();
    }

    /// A cancelled match leaves the record untouched.
    pub fn apply_cancel(&self) {}

    pub fn apply(&mut self, result: TeamResult, delta: i64) {
        match result {
            TeamResult::Win => self.apply_result(true, delta),
            TeamResult::Lose => self.apply_result(false, delta),
            TeamResult::Cancel => self.apply_cancel(),
        }
    }

    /// The MMR [`PlayerRecord::redo`] would land on after reversing `prev_result`, before the new
    /// result is applied.
    pub fn undone_mmr(&self, old_delta: i64, prev_result: TeamResult) -> i64 {
        let mmr = match prev_result {
            TeamResult::Win => self.mmr - old_delta,
            TeamResult::Lose => self.mmr + old_delta,
            TeamResult::Cancel => self.mmr,
        };
        mmr.max(0)
    }

    /// Reverses `prev_result` (worth `old_delta`) and applies `new_result` (worth `new_delta`).
    /// Streaks are not replayed. Returns the MMR between the two steps, after clamping.
    pub fn redo(
        &mut self,
        old_delta: i64,
        new_delta: i64,
        prev_result: TeamResult,
        new_result: TeamResult,
    ) -> i64 {
        match prev_result {
            TeamResult::Win => {
                self.wins = self.wins.saturating_sub(1);
                self.mmr -= old_delta;
                self.matches_played = self.matches_played.saturating_sub(1);
            }
            TeamResult::Lose => {
                self.losses = self.losses.saturating_sub(1);
                self.mmr += old_delta;
                self.matches_played = self.matches_played.saturating_sub(1);
            }
            TeamResult::Cancel => {}
        }

        // clamp before reapplying so a clamp from the original result is reproduced
        self.clamp_mmr();
        let undone = self.mmr;

        match new_result {
            TeamResult::Win => {
                self.wins += 1;
                self.mmr += new_delta;
                self.matches_played += 1;
            }
            TeamResult::Lose => {
                self.losses += 1;
                self.mmr -= new_delta;
                self.matches_played += 1;
            }
            TeamResult::Cancel => {}
        }

        self.clamp_mmr();
        self.track_extremes();
        undone
    }

    /// Admin override. Negative values are clamped to zero.
    pub fn set_mmr(&mut self, mmr: i64) {
        self.mmr = mmr;
        self.clamp_mmr();
        self.track_extremes();
    }

    pub fn streak(&self) -> Streak {
        match self.win_streak.cmp(&self.lose_streak) {
            std::cmp::Ordering::Greater => Streak::Win(self.win_streak),
            std::cmp::Ordering::Less => Streak::Lose(self.lose_streak),
            std::cmp::Ordering::Equal => Streak::None,
        }
    }

    fn clamp_mmr(&mut self) {
        self.mmr = self.mmr.max(0);
    }

    fn track_extremes(&mut self) {
        if self.lowest_mmr == UNSET_MMR {
            self.lowest_mmr = self.mmr;
        }
        if self.highest_mmr == UNSET_MMR {
            self.highest_mmr = self.mmr;
        }
        self.lowest_mmr = self.lowest_mmr.min(self.mmr);
        self.highest_mmr = self.highest_mmr.max(self.mmr);
    }
}

/// Every registered player, keyed by Discord user.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: HashMap<UserId, PlayerRecord>,
}

impl Roster {
    pub fn from_records(records: impl IntoIterator<Item = PlayerRecord>) -> Self {
        Self {
            players: records.into_iter().map(|p| (p.user, p)).collect(),
        }
    }

    pub fn is_registered(&self, user: UserId) -> bool {
        self.players.contains_key(&user)
    }

    pub fn get(&self, user: UserId) -> Result<&PlayerRecord, JppError> {
        self.players
            .get(&user)
            .ok_or(JppError::UserNotRegistered(user))
    }

    pub fn get_mut(&mut self, user: UserId) -> Result<&mut PlayerRecord, JppError> {
        self.players
            .get_mut(&user)
            .ok_or(JppError::UserNotRegistered(user))
    }

    pub fn ensure_registered<'a>(
        &self,
        users: impl IntoIterator<Item = &'a UserId>,
    ) -> Result<(), JppError> {
        users
            .into_iter()
            .try_for_each(|u| self.get(*u).map(|_| ()))
    }

    pub fn check_register(&self, user: UserId, name: &str) -> Result<(), JppError> {
        valid_name(name)?;
        if self.is_registered(user) {
            return Err(JppError::UserAlreadyRegistered(user));
        }
        Ok(())
    }

    pub fn register(&mut self, user: UserId, name: &str) -> Result<&PlayerRecord, JppError> {
        self.check_register(user, name)?;
        let name = valid_name(name)?;
        Ok(self
            .players
            .entry(user)
            .or_insert(PlayerRecord::new(user, name)))
    }

    pub fn rename(&mut self, user: UserId, name: &str) -> Result<&PlayerRecord, JppError> {
        let name = valid_name(name)?;
        let player = self.get_mut(user)?;
        player.name = name.to_owned();
        Ok(player)
    }

    /// Highest MMR first; ties by name so pages stay stable.
    pub fn leaderboard(&self) -> Vec<&PlayerRecord> {
        self.players
            .values()
            .sorted_by_key(|p| (Reverse(p.mmr), p.name.to_lowercase()))
            .collect()
    }

    pub fn records(&self) -> Vec<&PlayerRecord> {
        self.players.values().sorted_by_key(|p| p.user).collect()
    }
}

pub(crate) fn valid_name(name: &str) -> Result<&str, JppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(JppError::EmptyName);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(mmr: i64) -> PlayerRecord {
        let mut p = PlayerRecord::new(UserId::new(1), "tester");
        p.mmr = mmr;
        p
    }

    #[test]
    fn win_and_loss_update_streaks() {
        let mut p = player(0);
        p.apply_result(true, 10);
        p.apply_result(true, 10);
        assert_eq!((p.mmr, p.wins, p.win_streak, p.matches_played), (20, 2, 2, 2));
        assert_eq!(p.streak(), Streak::Win(2));

        p.apply_result(false, 10);
        assert_eq!((p.mmr, p.losses, p.win_streak, p.lose_streak), (10, 1, 0, 1));
        assert_eq!(p.highest_win_streak, 2);
        assert_eq!(p.highest_lose_streak, 1);
        assert_eq!(p.streak(), Streak::Lose(1));
        assert_eq!((p.lowest_mmr, p.highest_mmr), (10, 20));
    }

    #[test]
    fn first_update_seeds_extremes() {
        let mut p = player(50);
        assert_eq!(p.lowest_mmr, UNSET_MMR);
        p.apply_result(true, 5);
        assert_eq!((p.lowest_mmr, p.highest_mmr), (55, 55));
    }

    #[test]
    fn loss_clamps_at_zero() {
        let mut p = player(5);
        p.apply_result(false, 10);
        assert_eq!(p.mmr, 0);
        assert_eq!(p.lowest_mmr, 0);
    }

    #[test]
    fn cancel_is_a_no_op() {
        let mut p = player(50);
        p.wins = 3;
        p.matches_played = 5;
        let before = p.clone();
        p.apply_cancel();
        p.apply(TeamResult::Cancel, 10);
        assert_eq!(p, before);
    }

    #[test]
    fn redo_round_trips_without_clamping() {
        let mut p = player(200);
        p.apply_result(true, 15);
        let before = p.clone();

        p.redo(15, 10, TeamResult::Win, TeamResult::Lose);
        assert_eq!((p.mmr, p.wins, p.losses, p.matches_played), (190, 0, 1, 1));

        p.redo(10, 15, TeamResult::Lose, TeamResult::Win);
        assert_eq!(p.mmr, before.mmr);
        assert_eq!(p.wins, before.wins);
        assert_eq!(p.losses, before.losses);
        assert_eq!(p.matches_played, before.matches_played);
    }

    #[test]
    fn redo_does_not_replay_streaks() {
        let mut p = player(100);
        p.apply_result(true, 10);
        p.redo(10, 10, TeamResult::Win, TeamResult::Lose);
        assert_eq!(p.win_streak, 1);
        assert_eq!(p.lose_streak, 0);
    }

    #[test]
    fn redo_clamps_after_undo() {
        let mut p = player(0);
        p.wins = 1;
        p.matches_played = 1;
        // undoing a win worth more than the current mmr clamps before the loss applies
        let undone = p.redo(20, 10, TeamResult::Win, TeamResult::Lose);
        assert_eq!(undone, 0);
        assert_eq!(p.mmr, 0);
    }

    #[test]
    fn redo_from_cancel_counts_once() {
        let mut p = player(100);
        assert_eq!(p.undone_mmr(0, TeamResult::Cancel), 100);
        p.redo(0, 15, TeamResult::Cancel, TeamResult::Win);
        assert_eq!((p.mmr, p.wins, p.matches_played), (115, 1, 1));
    }

    #[test]
    fn set_mmr_never_goes_negative() {
        let mut p = player(40);
        p.set_mmr(-20);
        assert_eq!(p.mmr, 0);
        p.set_mmr(300);
        assert_eq!((p.lowest_mmr, p.highest_mmr), (0, 300));
        assert_eq!(p.wins, 0);
    }

    #[test]
    fn mmr_stays_non_negative_over_random_sequences() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        let mut p = player(0);
        for _ in 0..1000 {
            match rng.gen_range(0..3) {
                0 => p.apply_result(rng.gen(), rng.gen_range(0..40)),
                1 => {
                    let results = [TeamResult::Win, TeamResult::Lose, TeamResult::Cancel];
                    p.redo(
                        rng.gen_range(0..40),
                        rng.gen_range(0..40),
                        results[rng.gen_range(0..3)],
                        results[rng.gen_range(0..3)],
                    );
                }
                _ => p.set_mmr(rng.gen_range(-50..200)),
            }
            assert!(p.mmr >= 0);
            assert!(p.lowest_mmr <= p.mmr && p.mmr <= p.highest_mmr);
        }
    }

    #[test]
    fn roster_registration() {
        let mut roster = Roster::default();
        let user = UserId::new(42);
        assert_eq!(roster.register(user, "  ").unwrap_err(), JppError::EmptyName);
        assert_eq!(roster.register(user, " Ash ").unwrap().name, "Ash");
        assert_eq!(
            roster.register(user, "Ash").unwrap_err(),
            JppError::UserAlreadyRegistered(user)
        );
        assert_eq!(roster.rename(user, "Blitz").unwrap().name, "Blitz");
        assert_eq!(
            roster.rename(UserId::new(7), "x").unwrap_err(),
            JppError::UserNotRegistered(UserId::new(7))
        );
    }

    #[test]
    fn leaderboard_is_sorted_by_mmr() {
        let mut roster = Roster::default();
        for (id, mmr) in [(1, 50), (2, 150), (3, 100)] {
            roster.register(UserId::new(id), &format!("p{id}")).unwrap();
            roster.get_mut(UserId::new(id)).unwrap().set_mmr(mmr);
        }
        let order: Vec<_> = roster.leaderboard().iter().map(|p| p.mmr).collect();
        assert_eq!(order, vec![150, 100, 50]);
    }
}
