use crate::engine::{Match, MatchPlayer, MatchRecord, MatchReport, PlayerChange};
use crate::error::JppError;
use crate::player::TeamResult;
use crate::queue::QueueEntry;
use crate::rank::RankTransition;
use crate::types::{Context, Data, Error};
use anyhow::Result;
use itertools::Itertools;
use poise::{CreateReply, FrameworkError};
use serenity::all::{ChannelId, RoleId, UserId};
use tracing::error;

pub const TEAM1_NAME: &str = "Team Blue :blue_square:";
pub const TEAM2_NAME: &str = "Team Orange :orange_square:";

/// Replies to the invoking user with a readable error instead of failing silently.
pub async fn handle_error(error: FrameworkError<'_, Data, Error>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            error!("/{} failed: {:?}", ctx.command().name, error);
            reply_ephemeral(ctx, describe_error(&error)).await;
        }
        FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            let message = match error {
                Some(error) => describe_error(&error),
                None => "You need the admin role to use this command.".to_owned(),
            };
            reply_ephemeral(ctx, message).await;
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

async fn reply_ephemeral(ctx: Context<'_>, text: String) {
    let reply = CreateReply::default()
        .content(text)
        .reply(true)
        .ephemeral(true);
    if let Err(e) = ctx.send(reply).await {
        error!("Unable to send error reply: {}", e);
    }
}

/// Passes when the author holds the configured admin role.
pub async fn is_admin(ctx: Context<'_>) -> Result<bool> {
    let role = ctx.data().jpp.lock().await.admin_role()?;
    let Some(member) = ctx.author_member().await else {
        return Ok(false);
    };
    Ok(member.roles.contains(&role))
}

/// Turns an error into a message for Discord, with mentions where the error names someone.
pub fn describe_error(err: &anyhow::Error) -> String {
    let Some(err) = err.downcast_ref::<JppError>() else {
        return format!("Error: {err}");
    };
    use JppError::*;
    match err {
        EmptyName => "Names cannot be empty.".to_owned(),
        InvalidRange { min, max } => {
            format!("{min} to {max} is not a valid range. The minimum must not be above the maximum.")
        }
        RankRangeConflict { min, max } => {
            format!("The range {min} to {max} overlaps with an existing rank.")
        }
        RankExists(role) => format!("{} is already a rank.", format_role(role)),
        InvalidRank(role) => format!("{} is not a rank.", format_role(role)),
        NoRanks => "There are no ranks set up yet.".to_owned(),
        UserAlreadyRegistered(user) => format!("{} is already registered.", format_id(user)),
        UserNotRegistered(user) => format!(
            "{} is not registered. Use `/register` first.",
            format_id(user)
        ),
        PlayerAlreadyQueued(user) => format!("{} is already in the queue.", format_id(user)),
        PlayerNotQueued(user) => format!("{} is not in the queue.", format_id(user)),
        QueueEmpty => "The queue is empty.".to_owned(),
        MatchRunning(user) => format!("{} is still playing a match.", format_id(user)),
        NoMatchRunning => {
            "There is no match running and nobody is queued.".to_owned()
        }
        MapExists(map) => format!("**{map}** is already a map."),
        InvalidMap(map) => format!("**{map}** is not a map."),
        NoMaps => "There are no maps to choose from. Add some with `/add_map`.".to_owned(),
        MapPoolExists(pool) => format!("**{pool}** is already a map pool."),
        InvalidMapPool(pool) => format!("**{pool}** is not a map pool."),
        MapPoolMapExists { pool, map } => format!("**{map}** is already in **{pool}**."),
        InvalidMapPoolMap { pool, map } => format!("**{map}** is not in **{pool}**."),
        InvalidMatchId(id) => format!("Game #{id} is not waiting for a result."),
        MatchNotFound(id) => format!("Game #{id} has no recorded result."),
        MatchResultIdentical(result) => format!("That game was already reported as {result}."),
        RoleUninitialized(name) => format!(
            "The {name} role has not been set up. An administrator can set it with `/set_{name}_role`."
        ),
        EmptyQuip => "Quips cannot be empty.".to_owned(),
        QuipUserMissing => "User quips need a user to be said to.".to_owned(),
        InvalidQuipIndex(i) => format!("{i} is not a valid quip index."),
        InvalidActivityIndex(i) => format!("{i} is not a valid activity index."),
        EmptyStrat => "Strats need a title and a description.".to_owned(),
        InvalidStratIndex(i) => format!("{i} is not a valid strat index."),
        NoStrats => "There are no strats yet. Add some with `/add_strat`.".to_owned(),
        Parse(e) => format!("Could not understand that: {e}."),
    }
}

/// Formats an ID for display as a ping in discord
pub fn format_id(id: &UserId) -> String {
    format!("<@{id}>")
}

pub fn format_role(id: &RoleId) -> String {
    format!("<@&{id}>")
}

pub fn format_channel(id: &ChannelId) -> String {
    format!("<#{id}>")
}

fn format_team(team: &[QueueEntry]) -> String {
    team.iter()
        .map(|p| format!("{} [{}]", format_id(&p.user), p.mmr))
        .join("\n")
}

/// Announcement for a freshly started match.
pub fn format_match(game: &Match) -> String {
    let pool = game
        .pool
        .as_deref()
        .map(|p| format!(" ({p})"))
        .unwrap_or_default();
    format!(
        "**Game #{} Started**\n**Creation Time:** {} UTC\n**Map:** {}{}\n\n**{}**\n{}\n\n**{}**\n{}\n\nReport the result with `/report {} <result>`.",
        game.id,
        game.created_at.format("%d %b %Y %H:%M"),
        game.map,
        pool,
        TEAM1_NAME,
        format_team(&game.team1),
        TEAM2_NAME,
        format_team(&game.team2),
        game.id
    )
}

/// Role change suffix, empty when the rank is unchanged.
fn format_transition(transition: &RankTransition) -> String {
    if !transition.is_change() {
        return String::new();
    }
    match &transition.after {
        Some(tier) => format!(", now {}", format_role(&tier.role)),
        None => ", now unranked".to_owned(),
    }
}

/// Results message listing every player's MMR movement.
pub fn format_report(report: &MatchReport) -> String {
    let team = |changes: &[PlayerChange]| {
        changes
            .iter()
            .map(|c| match c.result {
                TeamResult::Win => format!(
                    "{} {} -> {} (+{}){}",
                    format_id(&c.user),
                    c.prev_mmr,
                    c.new_mmr,
                    c.delta,
                    format_transition(&c.transition)
                ),
                TeamResult::Lose => format!(
                    "{} {} -> {} (-{}){}",
                    format_id(&c.user),
                    c.prev_mmr,
                    c.new_mmr,
                    c.delta,
                    format_transition(&c.transition)
                ),
                TeamResult::Cancel => format!(
                    "{} {} (±{} not played)",
                    format_id(&c.user),
                    c.prev_mmr,
                    c.delta
                ),
            })
            .join("\n")
    };
    let record = &report.record;
    format!(
        "**Game #{} Results: {}**\n**Map:** {}\n\n**{}**\n{}\n\n**{}**\n{}",
        record.id,
        record.result,
        record.map,
        TEAM1_NAME,
        team(&report.team1),
        TEAM2_NAME,
        team(&report.team2)
    )
}

/// Summary of a finished match from the history.
pub fn format_record(record: &MatchRecord) -> String {
    let team = |players: &[MatchPlayer]| {
        players
            .iter()
            .map(|p| {
                format!(
                    "{} {} -> {}",
                    format_id(&p.user),
                    p.prev_mmr,
                    p.new_mmr
                )
            })
            .join("\n")
    };
    format!(
        "**Game #{}: {}**\n**Played:** {} UTC\n**Map:** {}\n\n**{}**\n{}\n\n**{}**\n{}",
        record.id,
        record.result,
        record.created_at.format("%d %b %Y %H:%M"),
        record.map,
        TEAM1_NAME,
        team(&record.team1),
        TEAM2_NAME,
        team(&record.team2)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MatchResult;
    use crate::rank::RankTier;
    use chrono::Utc;

    #[test]
    fn mentions() {
        assert_eq!(format_id(&UserId::new(42)), "<@42>");
        assert_eq!(format_role(&RoleId::new(7)), "<@&7>");
        assert_eq!(format_channel(&ChannelId::new(3)), "<#3>");
    }

    #[test]
    fn domain_errors_get_friendly_text() {
        let err: anyhow::Error = JppError::UserNotRegistered(UserId::new(5)).into();
        assert_eq!(
            describe_error(&err),
            "<@5> is not registered. Use `/register` first."
        );
        let err = anyhow::anyhow!("disk full");
        assert_eq!(describe_error(&err), "Error: disk full");
    }

    #[test]
    fn report_lists_changes_and_rank_ups() {
        let silver = RankTier {
            role: RoleId::new(2),
            min_mmr: 100,
            max_mmr: 199,
            delta: 15,
        };
        let change = |user: u64, result, prev, new, delta, after: Option<RankTier>| PlayerChange {
            user: UserId::new(user),
            result,
            prev_mmr: prev,
            new_mmr: new,
            delta,
            transition: RankTransition {
                before: None,
                after,
            },
        };
        let report = MatchReport {
            record: MatchRecord {
                id: 9,
                team1: vec![MatchPlayer {
                    user: UserId::new(1),
                    prev_mmr: 95,
                    new_mmr: 105,
                    mmr_delta: 10,
                }],
                team2: vec![],
                result: MatchResult::Team1Win,
                map: "Bank".into(),
                pool: None,
                created_at: Utc::now(),
            },
            team1: vec![change(1, TeamResult::Win, 95, 105, 10, Some(silver))],
            team2: vec![change(2, TeamResult::Lose, 20, 10, 10, None)],
        };
        let text = format_report(&report);
        assert!(text.contains("**Game #9 Results: Team 1 Win**"));
        assert!(text.contains("<@1> 95 -> 105 (+10), now <@&2>"));
        assert!(text.contains("<@2> 20 -> 10 (-10)\n") || text.ends_with("<@2> 20 -> 10 (-10)"));
    }
}
