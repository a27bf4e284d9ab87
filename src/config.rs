use crate::context::MapOverride;
use anyhow::{bail, Context, Result};
use serenity::all::UserId;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_QUEUE_SIZE: usize = 10;
const DEFAULT_PREFIX: &str = "!";

/// Process configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    /// Directory holding the JSON files.
    pub data_dir: PathBuf,
    /// Number of queued players that starts a match.
    pub queue_size: usize,
    pub prefix: String,
    /// Hashed into the RNG seed when set.
    pub seed: Option<String>,
    pub map_override: Option<MapOverride>,
}

impl Config {
    /// Loads configuration from environment variables, reading `.env` first if present.
    ///
    /// Required environment variables:
    /// - `DISCORD_TOKEN`: bot token
    ///
    /// Optional environment variables:
    /// - `JPP_DATA_DIR` (default: `data`)
    /// - `JPP_QUEUE_SIZE` (default: `10`)
    /// - `JPP_PREFIX` (default: `!`)
    /// - `JPP_SEED`
    /// - `JPP_OVERRIDE_USER` and `JPP_OVERRIDE_MAP`, together or not at all
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token =
            var("DISCORD_TOKEN").context("DISCORD_TOKEN environment variable not set")?;

        let queue_size = match var("JPP_QUEUE_SIZE") {
            Some(size) => size
                .trim()
                .parse()
                .with_context(|| format!("JPP_QUEUE_SIZE is not a number: {size}"))?,
            None => DEFAULT_QUEUE_SIZE,
        };
        if queue_size < 2 {
            bail!("JPP_QUEUE_SIZE must be at least 2 (got {queue_size})");
        }

        let map_override = match (var("JPP_OVERRIDE_USER"), var("JPP_OVERRIDE_MAP")) {
            (Some(user), Some(map)) => {
                let user: u64 = user
                    .trim()
                    .parse()
                    .with_context(|| format!("JPP_OVERRIDE_USER is not a user id: {user}"))?;
                if user == 0 {
                    bail!("JPP_OVERRIDE_USER must not be 0");
                }
                Some(MapOverride {
                    user: UserId::new(user),
                    map: map.trim().to_owned(),
                })
            }
            (None, None) => None,
            _ => bail!("JPP_OVERRIDE_USER and JPP_OVERRIDE_MAP must be set together"),
        };

        Ok(Self {
            discord_token,
            data_dir: var("JPP_DATA_DIR").map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            queue_size,
            prefix: var("JPP_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_owned()),
            seed: var("JPP_SEED"),
            map_override,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.queue_size, 10);
        assert_eq!(config.prefix, "!");
        assert_eq!(config.seed, None);
        assert_eq!(config.map_override, None);
    }

    #[test]
    fn token_is_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn overrides_parse() {
        let config = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("JPP_QUEUE_SIZE", "6"),
            ("JPP_SEED", "lan night"),
            ("JPP_OVERRIDE_USER", "90342358620573696"),
            ("JPP_OVERRIDE_MAP", "Villa"),
        ])
        .unwrap();
        assert_eq!(config.queue_size, 6);
        assert_eq!(config.seed.as_deref(), Some("lan night"));
        assert_eq!(
            config.map_override,
            Some(MapOverride {
                user: UserId::new(90342358620573696),
                map: "Villa".into(),
            })
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("JPP_QUEUE_SIZE", "ten")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("JPP_QUEUE_SIZE", "1")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("JPP_OVERRIDE_MAP", "Villa")]).is_err());
    }
}
