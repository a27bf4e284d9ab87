use crate::error::{JppError, ParseError};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serenity::all::UserId;
use std::fmt;
use std::str::FromStr;

/// Decides who a quip can be said to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuipType {
    Regular,
    /// The quip text is the name of a guild emoji, which is sent instead.
    GuildEmoji,
    /// Only said to one user.
    SpecificUser,
}

impl fmt::Display for QuipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuipType::Regular => "Regular",
            QuipType::GuildEmoji => "Emoji",
            QuipType::SpecificUser => "User",
        })
    }
}

impl FromStr for QuipType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arg = s.trim().to_lowercase();
        match arg.as_str() {
            "0" | "r" => return Ok(QuipType::Regular),
            "1" | "e" => return Ok(QuipType::GuildEmoji),
            "2" | "u" => return Ok(QuipType::SpecificUser),
            _ => {}
        }
        if arg.contains("regular") {
            Ok(QuipType::Regular)
        } else if arg.contains("emoji") {
            Ok(QuipType::GuildEmoji)
        } else if arg.contains("user") {
            Ok(QuipType::SpecificUser)
        } else {
            Err(ParseError::QuipType(s.to_owned()))
        }
    }
}

/// A reply the bot gives when it is mentioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quip {
    pub text: String,
    pub kind: QuipType,
    pub user: Option<UserId>,
    pub use_count: u32,
}

impl Quip {
    pub fn is_available(&self, requester: UserId, emojis: &[String]) -> bool {
        match self.kind {
            QuipType::Regular => true,
            QuipType::GuildEmoji => emojis.iter().any(|e| *e == self.text),
            QuipType::SpecificUser => self.user == Some(requester),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    Game,
    Watching,
    Listening,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActivityType::Game => "Game",
            ActivityType::Watching => "Watching",
            ActivityType::Listening => "Listening",
        })
    }
}

impl FromStr for ActivityType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arg = s.trim().to_lowercase();
        match arg.as_str() {
            "0" | "g" => return Ok(ActivityType::Game),
            "1" | "w" => return Ok(ActivityType::Watching),
            "2" | "l" => return Ok(ActivityType::Listening),
            _ => {}
        }
        if arg.contains("game") || arg.contains("play") {
            Ok(ActivityType::Game)
        } else if arg.contains("watch") {
            Ok(ActivityType::Watching)
        } else if arg.contains("listen") {
            Ok(ActivityType::Listening)
        } else {
            Err(ParseError::ActivityType(s.to_owned()))
        }
    }
}

/// Something the bot can show itself doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub kind: ActivityType,
    pub use_count: u32,
}

/// What the bot's presence should become on the next rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// Leave the current presence alone.
    Keep,
    Clear,
    Show(Activity),
}

/// The side a strat is played on. Ordered the way strats are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StratSide {
    Attack,
    Defense,
    Both,
}

impl StratSide {
    /// Whether a strat written for `side` can be drawn when playing on `self`.
    pub fn allows(self, side: StratSide) -> bool {
        self == StratSide::Both || side == StratSide::Both || self == side
    }
}

impl fmt::Display for StratSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StratSide::Attack => "Attack",
            StratSide::Defense => "Defense",
            StratSide::Both => "Both",
        })
    }
}

impl FromStr for StratSide {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arg = s.trim().to_lowercase();
        match arg.as_str() {
            "0" | "a" => return Ok(StratSide::Attack),
            "1" | "d" => return Ok(StratSide::Defense),
            "2" | "b" => return Ok(StratSide::Both),
            _ => {}
        }
        if arg.contains("attack") {
            Ok(StratSide::Attack)
        } else if arg.contains("defen") {
            Ok(StratSide::Defense)
        } else if arg.contains("both") {
            Ok(StratSide::Both)
        } else {
            Err(ParseError::StratSide(s.to_owned()))
        }
    }
}

/// A strat roulette challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strat {
    pub title: String,
    pub text: String,
    pub side: StratSide,
    pub times_played: u32,
}

/// Quips, activities and strats. Entries are addressed by their 0-based position in each list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    pub quips: Vec<Quip>,
    pub activities: Vec<Activity>,
    /// Kept sorted by side.
    pub strats: Vec<Strat>,
}

fn non_empty(text: &str, err: JppError) -> Result<&str, JppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(err);
    }
    Ok(text)
}

impl Flavor {
    /// A specific-user quip needs its user.
    pub fn add_quip(
        &mut self,
        text: &str,
        kind: QuipType,
        user: Option<UserId>,
    ) -> Result<&Quip, JppError> {
        let text = non_empty(text, JppError::EmptyQuip)?;
        let user = match kind {
            QuipType::SpecificUser => Some(user.ok_or(JppError::QuipUserMissing)?),
            _ => None,
        };
        self.quips.push(Quip {
            text: text.to_owned(),
            kind,
            user,
            use_count: 0,
        });
        Ok(&self.quips[self.quips.len() - 1])
    }

    pub fn remove_quip(&mut self, index: usize) -> Result<Quip, JppError> {
        if index >= self.quips.len() {
            return Err(JppError::InvalidQuipIndex(index));
        }
        Ok(self.quips.remove(index))
    }

    /// Picks a quip `requester` may hear and counts the use. `emojis` are the guild's emoji names.
    pub fn random_quip<R: Rng + ?Sized>(
        &mut self,
        requester: UserId,
        emojis: &[String],
        rng: &mut R,
    ) -> Option<&Quip> {
        let available: Vec<usize> = self
            .quips
            .iter()
            .enumerate()
            .filter(|(_, q)| q.is_available(requester, emojis))
            .map(|(i, _)| i)
            .collect();
        let index = *available.choose(rng)?;
        let quip = &mut self.quips[index];
        quip.use_count += 1;
        Some(quip)
    }

    pub fn add_activity(&mut self, name: &str, kind: ActivityType) -> Result<&Activity, JppError> {
        let name = non_empty(name, JppError::EmptyName)?;
        self.activities.push(Activity {
            name: name.to_owned(),
            kind,
            use_count: 0,
        });
        Ok(&self.activities[self.activities.len() - 1])
    }

    pub fn remove_activity(&mut self, index: usize) -> Result<Activity, JppError> {
        if index >= self.activities.len() {
            return Err(JppError::InvalidActivityIndex(index));
        }
        Ok(self.activities.remove(index))
    }

    /// Half of the rotations clear the presence, the rest show a random activity.
    pub fn next_presence<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Presence {
        if self.activities.is_empty() || !rng.gen_bool(0.5) {
            return Presence::Clear;
        }
        match self.activities.choose_mut(rng) {
            Some(activity) => {
                activity.use_count += 1;
                Presence::Show(activity.clone())
            }
            None => Presence::Clear,
        }
    }

    pub fn add_strat(
        &mut self,
        side: StratSide,
        title: &str,
        text: &str,
    ) -> Result<&Strat, JppError> {
        let title = non_empty(title, JppError::EmptyStrat)?;
        let text = non_empty(text, JppError::EmptyStrat)?;
        let strat = Strat {
            title: title.to_owned(),
            text: text.to_owned(),
            side,
            times_played: 0,
        };
        // after every strat of the same side, so earlier indexes stay put
        let index = self.strats.partition_point(|s| s.side <= side);
        self.strats.insert(index, strat);
        Ok(&self.strats[index])
    }

    pub fn remove_strat(&mut self, index: usize) -> Result<Strat, JppError> {
        if index >= self.strats.len() {
            return Err(JppError::InvalidStratIndex(index));
        }
        Ok(self.strats.remove(index))
    }

    /// Draws a strat playable on `side` and counts the play. The strat titled `previous` is only
    /// drawn again when nothing else fits.
    pub fn draw_strat<R: Rng + ?Sized>(
        &mut self,
        side: StratSide,
        previous: Option<&str>,
        rng: &mut R,
    ) -> Result<&Strat, JppError> {
        let playable: Vec<usize> = self
            .strats
            .iter()
            .enumerate()
            .filter(|(_, s)| side.allows(s.side))
            .map(|(i, _)| i)
            .collect();
        let fresh: Vec<usize> = playable
            .iter()
            .copied()
            .filter(|i| previous.map_or(true, |p| !self.strats[*i].title.eq_ignore_ascii_case(p)))
            .collect();
        let candidates = if fresh.is_empty() { &playable } else { &fresh };
        let index = *candidates.choose(rng).ok_or(JppError::NoStrats)?;
        let strat = &mut self.strats[index];
        strat.times_played += 1;
        Ok(strat)
    }

    /// Number of attack, defense and both-sides strats.
    pub fn strat_counts(&self) -> (usize, usize, usize) {
        let count = |side| self.strats.iter().filter(|s| s.side == side).count();
        (
            count(StratSide::Attack),
            count(StratSide::Defense),
            count(StratSide::Both),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    const ASH: UserId = UserId::new(1);
    const BROCK: UserId = UserId::new(2);

    #[test]
    fn keyword_parsing() {
        assert_eq!("emoji".parse::<QuipType>().unwrap(), QuipType::GuildEmoji);
        assert_eq!("2".parse::<QuipType>().unwrap(), QuipType::SpecificUser);
        assert_eq!("Watching".parse::<ActivityType>().unwrap(), ActivityType::Watching);
        assert_eq!("l".parse::<ActivityType>().unwrap(), ActivityType::Listening);
        assert_eq!("defender".parse::<StratSide>().unwrap(), StratSide::Defense);
        assert_eq!("b".parse::<StratSide>().unwrap(), StratSide::Both);
        assert_eq!(
            "sideways".parse::<StratSide>().unwrap_err(),
            ParseError::StratSide("sideways".into())
        );
    }

    #[test]
    fn quips_are_filtered_by_requester_and_guild_emojis() {
        let mut flavor = Flavor::default();
        flavor.add_quip("hello", QuipType::Regular, None).unwrap();
        flavor.add_quip("jpp", QuipType::GuildEmoji, None).unwrap();
        flavor
            .add_quip("only for brock", QuipType::SpecificUser, Some(BROCK))
            .unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut heard = |flavor: &mut Flavor, user, emojis: &[String]| {
            (0..50)
                .filter_map(|_| flavor.random_quip(user, emojis, &mut rng).map(|q| q.text.clone()))
                .collect::<HashSet<_>>()
        };
        assert_eq!(heard(&mut flavor, ASH, &[]), HashSet::from(["hello".to_owned()]));
        let emojis = vec!["jpp".to_owned()];
        assert_eq!(heard(&mut flavor, BROCK, &emojis).len(), 3);
        assert_eq!(flavor.quips.iter().map(|q| q.use_count).sum::<u32>(), 100);
    }

    #[test]
    fn quip_validation() {
        let mut flavor = Flavor::default();
        assert_eq!(
            flavor.add_quip("  ", QuipType::Regular, None).unwrap_err(),
            JppError::EmptyQuip
        );
        assert_eq!(
            flavor.add_quip("hi", QuipType::SpecificUser, None).unwrap_err(),
            JppError::QuipUserMissing
        );
        // the user only matters for specific-user quips
        let quip = flavor.add_quip("hi", QuipType::Regular, Some(ASH)).unwrap();
        assert_eq!(quip.user, None);
        assert_eq!(flavor.remove_quip(1).unwrap_err(), JppError::InvalidQuipIndex(1));
        assert_eq!(flavor.remove_quip(0).unwrap().text, "hi");
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(flavor.random_quip(ASH, &[], &mut rng).is_none());
    }

    #[test]
    fn presence_rotation() {
        let mut flavor = Flavor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(flavor.next_presence(&mut rng), Presence::Clear);

        flavor.add_activity("Golf It!", ActivityType::Game).unwrap();
        let shown = (0..100)
            .filter(|_| matches!(flavor.next_presence(&mut rng), Presence::Show(_)))
            .count();
        assert!(shown > 0 && shown < 100);
        assert_eq!(flavor.activities[0].use_count as usize, shown);

        assert_eq!(
            flavor.remove_activity(3).unwrap_err(),
            JppError::InvalidActivityIndex(3)
        );
        assert_eq!(
            flavor.add_activity(" ", ActivityType::Game).unwrap_err(),
            JppError::EmptyName
        );
    }

    #[test]
    fn strats_stay_grouped_by_side() {
        let mut flavor = Flavor::default();
        flavor.add_strat(StratSide::Both, "Pistols", "Pistols only").unwrap();
        flavor.add_strat(StratSide::Attack, "Rush", "Everyone rushes").unwrap();
        flavor.add_strat(StratSide::Defense, "Hide", "Hide in one room").unwrap();
        flavor.add_strat(StratSide::Attack, "Walk", "No sprinting").unwrap();
        let titles: Vec<&str> = flavor.strats.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Rush", "Walk", "Hide", "Pistols"]);
        assert_eq!(flavor.strat_counts(), (2, 1, 1));
        assert_eq!(
            flavor.add_strat(StratSide::Attack, "x", "").unwrap_err(),
            JppError::EmptyStrat
        );
    }

    #[test]
    fn drawing_avoids_the_previous_strat() {
        let mut flavor = Flavor::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        assert_eq!(
            flavor.draw_strat(StratSide::Attack, None, &mut rng).unwrap_err(),
            JppError::NoStrats
        );

        flavor.add_strat(StratSide::Attack, "Rush", "Everyone rushes").unwrap();
        flavor.add_strat(StratSide::Defense, "Hide", "Hide in one room").unwrap();
        flavor.add_strat(StratSide::Both, "Pistols", "Pistols only").unwrap();
        for _ in 0..20 {
            let strat = flavor.draw_strat(StratSide::Attack, Some("rush"), &mut rng).unwrap();
            assert_eq!(strat.title, "Pistols");
        }
        // the only defense option left is still drawn
        flavor.remove_strat(2).unwrap();
        let strat = flavor.draw_strat(StratSide::Defense, Some("Hide"), &mut rng).unwrap();
        assert_eq!(strat.title, "Hide");
        assert_eq!(flavor.strats[1].times_played, 1);
    }
}
