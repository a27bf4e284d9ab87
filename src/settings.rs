use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use serenity::all::{ChannelId, RoleId};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// What a configured text channel is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    Lobby,
    Results,
    Admin,
    Register,
    Report,
}

impl ChannelType {
    pub const ALL: [ChannelType; 5] = [
        ChannelType::Lobby,
        ChannelType::Results,
        ChannelType::Admin,
        ChannelType::Register,
        ChannelType::Report,
    ];
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelType::Lobby => "lobby",
            ChannelType::Results => "results",
            ChannelType::Admin => "admin",
            ChannelType::Register => "register",
            ChannelType::Report => "report",
        })
    }
}

impl FromStr for ChannelType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arg = s.to_lowercase();
        [
            ("lobby", ChannelType::Lobby),
            ("result", ChannelType::Results),
            ("admin", ChannelType::Admin),
            ("register", ChannelType::Register),
            ("report", ChannelType::Report),
        ]
        .into_iter()
        .find(|(keyword, _)| arg.contains(keyword))
        .map(|(_, ty)| ty)
        .ok_or_else(|| ParseError::ChannelType(s.to_owned()))
    }
}

/// Bot-wide settings that survive restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub next_match_id: u64,
    pub channels: BTreeMap<ChannelType, ChannelId>,
    pub registered_role: Option<RoleId>,
    pub admin_role: Option<RoleId>,
}

impl Settings {
    /// Issues a match id. Ids only ever increase.
    pub fn issue_match_id(&mut self) -> u64 {
        let id = self.next_match_id;
        self.next_match_id += 1;
        id
    }

    pub fn channel(&self, ty: ChannelType) -> Option<ChannelId> {
        self.channels.get(&ty).copied()
    }

    pub fn set_channel(&mut self, ty: ChannelType, channel: Option<ChannelId>) {
        match channel {
            Some(channel) => self.channels.insert(ty, channel),
            None => self.channels.remove(&ty),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_type_parsing_matches_substrings() {
        assert_eq!("Lobby".parse::<ChannelType>().unwrap(), ChannelType::Lobby);
        assert_eq!("match-results".parse::<ChannelType>().unwrap(), ChannelType::Results);
        assert_eq!("REPORT".parse::<ChannelType>().unwrap(), ChannelType::Report);
        assert_eq!(
            "general".parse::<ChannelType>().unwrap_err(),
            ParseError::ChannelType("general".into())
        );
    }

    #[test]
    fn match_ids_are_monotonic() {
        let mut settings = Settings::default();
        assert_eq!(settings.issue_match_id(), 0);
        assert_eq!(settings.issue_match_id(), 1);
        assert_eq!(settings.next_match_id, 2);
    }

    #[test]
    fn channels_set_and_clear() {
        let mut settings = Settings::default();
        settings.set_channel(ChannelType::Lobby, Some(ChannelId::new(5)));
        assert_eq!(settings.channel(ChannelType::Lobby), Some(ChannelId::new(5)));
        settings.set_channel(ChannelType::Lobby, None);
        assert_eq!(settings.channel(ChannelType::Lobby), None);
    }

    #[test]
    fn settings_survive_json() {
        let mut settings = Settings::default();
        settings.set_channel(ChannelType::Results, Some(ChannelId::new(9)));
        settings.admin_role = Some(RoleId::new(3));
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(serde_json::from_str::<Settings>(&json).unwrap(), settings);
    }
}
