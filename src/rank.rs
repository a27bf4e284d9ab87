use crate::error::JppError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serenity::all::RoleId;
use std::collections::HashMap;

/// A contiguous, inclusive MMR range mapped to a Discord role, with the number of points a
/// player in this range wins or loses per match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankTier {
    pub role: RoleId,
    pub min_mmr: i64,
    pub max_mmr: i64,
    pub delta: i64,
}

impl RankTier {
    pub fn contains(&self, mmr: i64) -> bool {
        self.min_mmr <= mmr && mmr <= self.max_mmr
    }

    fn overlaps(&self, min: i64, max: i64) -> bool {
        min <= self.max_mmr && self.min_mmr <= max
    }
}

/// Roles to strip from and grant to a member after their MMR moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChange {
    pub remove: Option<RoleId>,
    pub add: Option<RoleId>,
}

/// The tiers a player was in before and after an MMR change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RankTransition {
    pub before: Option<RankTier>,
    pub after: Option<RankTier>,
}

impl RankTransition {
    /// Both lookups resolving to the same tier is not a change, even though neither side is empty.
    pub fn is_change(&self) -> bool {
        let role = |t: &Option<RankTier>| t.as_ref().map(|t| t.role);
        role(&self.before) != role(&self.after)
    }

    pub fn role_change(&self) -> Option<RoleChange> {
        self.is_change().then(|| RoleChange {
            remove: self.before.as_ref().map(|t| t.role),
            add: self.after.as_ref().map(|t| t.role),
        })
    }
}

/// Set of rank tiers keyed by role. Ranges never overlap, so any MMR maps to at most one tier.
#[derive(Debug, Clone, Default)]
pub struct RankTable {
    tiers: HashMap<RoleId, RankTier>,
}

impl RankTable {
    pub fn from_tiers(tiers: impl IntoIterator<Item = RankTier>) -> Self {
        Self {
            tiers: tiers.into_iter().map(|t| (t.role, t)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn contains_role(&self, role: RoleId) -> bool {
        self.tiers.contains_key(&role)
    }

    pub fn is_range_free(&self, min: i64, max: i64) -> bool {
        self.is_range_free_except(min, max, None)
    }

    fn is_range_free_except(&self, min: i64, max: i64, except: Option<RoleId>) -> bool {
        self.tiers
            .values()
            .filter(|t| Some(t.role) != except)
            .all(|t| !t.overlaps(min, max))
    }

    pub fn insert(
        &mut self,
        role: RoleId,
        min: i64,
        max: i64,
        delta: i64,
    ) -> Result<&RankTier, JppError> {
        if min > max {
            return Err(JppError::InvalidRange { min, max });
        }
        if self.contains_role(role) {
            return Err(JppError::RankExists(role));
        }
        if !self.is_range_free(min, max) {
            return Err(JppError::RankRangeConflict { min, max });
        }
        let tier = RankTier {
            role,
            min_mmr: min,
            max_mmr: max,
            delta,
        };
        Ok(self.tiers.entry(role).or_insert(tier))
    }

    /// The tier's own current range does not count against the new one.
    pub fn update(
        &mut self,
        role: RoleId,
        min: i64,
        max: i64,
        delta: i64,
    ) -> Result<&RankTier, JppError> {
        if min > max {
            return Err(JppError::InvalidRange { min, max });
        }
        if !self.contains_role(role) {
            return Err(JppError::InvalidRank(role));
        }
        if !self.is_range_free_except(min, max, Some(role)) {
            return Err(JppError::RankRangeConflict { min, max });
        }
        let tier = self
            .tiers
            .get_mut(&role)
            .ok_or(JppError::InvalidRank(role))?;
        tier.min_mmr = min;
        tier.max_mmr = max;
        tier.delta = delta;
        Ok(tier)
    }

    pub fn remove(&mut self, role: RoleId) -> Result<RankTier, JppError> {
        self.tiers.remove(&role).ok_or(JppError::InvalidRank(role))
    }

    pub fn lookup(&self, mmr: i64) -> Option<&RankTier> {
        self.tiers.values().find(|t| t.contains(mmr))
    }

    /// Points at stake for a player currently at `mmr`; unranked players play for nothing.
    pub fn delta_for(&self, mmr: i64) -> i64 {
        self.lookup(mmr).map_or(0, |t| t.delta)
    }

    pub fn lookup_transition(&self, old_mmr: i64, new_mmr: i64) -> RankTransition {
        RankTransition {
            before: self.lookup(old_mmr).cloned(),
            after: self.lookup(new_mmr).cloned(),
        }
    }

    pub fn roles(&self) -> Vec<RoleId> {
        self.sorted().into_iter().map(|t| t.role).collect()
    }

    /// Tiers by ascending minimum MMR, for display.
    pub fn sorted(&self) -> Vec<&RankTier> {
        self.tiers.values().sorted_by_key(|t| t.min_mmr).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const A: RoleId = RoleId::new(1);
    const B: RoleId = RoleId::new(2);
    const C: RoleId = RoleId::new(3);

    fn table() -> RankTable {
        let mut ranks = RankTable::default();
        ranks.insert(A, 0, 99, 10).unwrap();
        ranks.insert(B, 100, 199, 15).unwrap();
        ranks
    }

    #[test]
    fn lookup_finds_containing_tier() {
        let ranks = table();
        assert_eq!(ranks.lookup(0).unwrap().role, A);
        assert_eq!(ranks.lookup(99).unwrap().role, A);
        assert_eq!(ranks.lookup(100).unwrap().role, B);
        assert!(ranks.lookup(200).is_none());
        assert_eq!(ranks.delta_for(150), 15);
        assert_eq!(ranks.delta_for(500), 0);
    }

    #[test]
    fn overlapping_insert_is_rejected() {
        let mut ranks = table();
        assert_eq!(
            ranks.insert(C, 150, 250, 20).unwrap_err(),
            JppError::RankRangeConflict { min: 150, max: 250 }
        );
        assert_eq!(
            ranks.insert(C, -50, 0, 20).unwrap_err(),
            JppError::RankRangeConflict { min: -50, max: 0 }
        );
        // a range that swallows an existing tier whole
        assert!(!ranks.is_range_free(-10, 500));
        assert!(ranks.insert(C, 200, 299, 20).is_ok());
        assert_eq!(ranks.roles(), vec![A, B, C]);
    }

    #[test]
    fn duplicate_role_is_rejected() {
        let mut ranks = table();
        assert_eq!(
            ranks.insert(A, 500, 600, 5).unwrap_err(),
            JppError::RankExists(A)
        );
    }

    #[test]
    fn update_ignores_own_range() {
        let mut ranks = table();
        let tier = ranks.update(A, 0, 89, 12).unwrap();
        assert_eq!((tier.min_mmr, tier.max_mmr, tier.delta), (0, 89, 12));
        assert!(ranks.update(A, 50, 100, 12).is_err());
        assert_eq!(
            ranks.update(C, 0, 10, 1).unwrap_err(),
            JppError::InvalidRank(C)
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut ranks = table();
        assert_eq!(
            ranks.insert(C, 300, 200, 1).unwrap_err(),
            JppError::InvalidRange { min: 300, max: 200 }
        );
    }

    #[test]
    fn transition_within_a_tier_is_not_a_change() {
        let ranks = table();
        let same = ranks.lookup_transition(10, 20);
        assert!(same.before.is_some() && same.after.is_some());
        assert!(!same.is_change());
        assert_eq!(same.role_change(), None);

        let up = ranks.lookup_transition(95, 105);
        assert_eq!(
            up.role_change(),
            Some(RoleChange {
                remove: Some(A),
                add: Some(B)
            })
        );

        let off_table = ranks.lookup_transition(190, 210);
        assert_eq!(
            off_table.role_change(),
            Some(RoleChange {
                remove: Some(B),
                add: None
            })
        );
    }

    #[test]
    fn random_inserts_and_updates_keep_ranges_disjoint() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut ranks = RankTable::default();
        for _ in 0..500 {
            let before: Vec<RankTier> = ranks.sorted().into_iter().cloned().collect();
            let role = RoleId::new(rng.gen_range(1..=6));
            let min = rng.gen_range(-50..300);
            let max = min + rng.gen_range(-5..60);
            let delta = rng.gen_range(1..30);
            let result = if rng.gen_bool(0.5) {
                ranks.insert(role, min, max, delta).map(|_| ())
            } else {
                ranks.update(role, min, max, delta).map(|_| ())
            };

            let after: Vec<RankTier> = ranks.sorted().into_iter().cloned().collect();
            if result.is_err() {
                assert_eq!(after, before);
            }
            for tier in &after {
                assert!(tier.min_mmr <= tier.max_mmr);
            }
            for (a, b) in after.iter().tuple_combinations() {
                assert!(
                    !a.overlaps(b.min_mmr, b.max_mmr),
                    "{a:?} overlaps {b:?}"
                );
            }
        }
        assert!(!ranks.is_empty());
    }

    #[test]
    fn sorted_by_min_mmr() {
        let mut ranks = table();
        ranks.insert(C, -100, -1, 5).unwrap();
        assert_eq!(ranks.roles(), vec![C, A, B]);
        ranks.remove(C).unwrap();
        assert_eq!(ranks.remove(C).unwrap_err(), JppError::InvalidRank(C));
    }
}
