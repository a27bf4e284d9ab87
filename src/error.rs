use crate::engine::MatchResult;
use serenity::all::{RoleId, UserId};
use thiserror::Error;

/// Broad classes of domain failure. None of them leave partial state behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
}

/// Failures from parsing loose keyword or integer input into a typed enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid match result `{0}`")]
    MatchResult(String),
    #[error("invalid map pool type `{0}`")]
    MapPoolType(String),
    #[error("invalid channel type `{0}`")]
    ChannelType(String),
    #[error("invalid quip type `{0}`")]
    QuipType(String),
    #[error("invalid activity type `{0}`")]
    ActivityType(String),
    #[error("invalid strat side `{0}`")]
    StratSide(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JppError {
    #[error("empty name")]
    EmptyName,
    #[error("invalid mmr range {min}..={max}")]
    InvalidRange { min: i64, max: i64 },
    #[error("mmr range {min}..={max} overlaps an existing rank")]
    RankRangeConflict { min: i64, max: i64 },
    #[error("role {0} is already a rank")]
    RankExists(RoleId),
    #[error("role {0} is not a rank")]
    InvalidRank(RoleId),
    #[error("there are no ranks")]
    NoRanks,

    #[error("user {0} is already registered")]
    UserAlreadyRegistered(UserId),
    #[error("user {0} is not registered")]
    UserNotRegistered(UserId),

    #[error("user {0} is already queued")]
    PlayerAlreadyQueued(UserId),
    #[error("user {0} is not queued")]
    PlayerNotQueued(UserId),
    #[error("the queue is empty")]
    QueueEmpty,
    #[error("user {0} is playing in a running match")]
    MatchRunning(UserId),
    #[error("no match is running")]
    NoMatchRunning,

    #[error("map `{0}` already exists")]
    MapExists(String),
    #[error("map `{0}` does not exist")]
    InvalidMap(String),
    #[error("there are no maps to choose from")]
    NoMaps,
    #[error("map pool `{0}` already exists")]
    MapPoolExists(String),
    #[error("map pool `{0}` does not exist")]
    InvalidMapPool(String),
    #[error("map `{map}` is already in pool `{pool}`")]
    MapPoolMapExists { pool: String, map: String },
    #[error("map `{map}` is not in pool `{pool}`")]
    InvalidMapPoolMap { pool: String, map: String },

    #[error("match {0} is not in progress")]
    InvalidMatchId(u64),
    #[error("match {0} has no recorded result")]
    MatchNotFound(u64),
    #[error("match already has result {0}")]
    MatchResultIdentical(MatchResult),

    #[error("the {0} role has not been set up")]
    RoleUninitialized(&'static str),

    #[error("empty quip")]
    EmptyQuip,
    #[error("a user quip needs a user")]
    QuipUserMissing,
    #[error("no quip at index {0}")]
    InvalidQuipIndex(usize),
    #[error("no activity at index {0}")]
    InvalidActivityIndex(usize),
    #[error("empty strat")]
    EmptyStrat,
    #[error("no strat at index {0}")]
    InvalidStratIndex(usize),
    #[error("there are no strats to draw from")]
    NoStrats,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl JppError {
    pub fn kind(&self) -> ErrorKind {
        use JppError::*;
        match self {
            EmptyName
            | InvalidRange { .. }
            | RankRangeConflict { .. }
            | RankExists(_)
            | UserAlreadyRegistered(_)
            | PlayerAlreadyQueued(_)
            | MapExists(_)
            | MapPoolExists(_)
            | MapPoolMapExists { .. }
            | EmptyQuip
            | QuipUserMissing
            | EmptyStrat
            | Parse(_) => ErrorKind::Validation,
            InvalidRank(_)
            | NoRanks
            | UserNotRegistered(_)
            | PlayerNotQueued(_)
            | QueueEmpty
            | NoMatchRunning
            | InvalidMap(_)
            | NoMaps
            | InvalidMapPool(_)
            | InvalidMapPoolMap { .. }
            | InvalidMatchId(_)
            | MatchNotFound(_)
            | RoleUninitialized(_)
            | InvalidQuipIndex(_)
            | InvalidActivityIndex(_)
            | InvalidStratIndex(_)
            | NoStrats => ErrorKind::NotFound,
            MatchRunning(_) | MatchResultIdentical(_) => ErrorKind::Conflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_result_is_a_conflict() {
        let err = JppError::MatchResultIdentical(MatchResult::Team1Win);
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn parse_errors_are_validation() {
        let err: JppError = ParseError::MatchResult("nope".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "invalid match result `nope`");
    }
}
