use crate::context::ForcedMap;
use crate::discord_helpers::{guild_id, post, refresh_member_roles, sync_rank_roles};
use crate::engine::{MatchReport, MatchResult};
use crate::error::JppError;
use crate::helpers::{
    describe_error, format_match, format_record, format_report, handle_error, is_admin,
};
use crate::settings::ChannelType;
use crate::types::Context;
use anyhow::Result;
use itertools::Itertools;
use serenity::all::ChannelId;
use tracing::{info, warn};

async fn handle_report(
    ctx: Context<'_>,
    id: u64,
    result: String,
) -> Result<(Option<ChannelId>, MatchReport)> {
    let guild_id = guild_id(&ctx)?;
    let result: MatchResult = result.parse().map_err(JppError::from)?;
    let (report, results_channel) = {
        let mut jpp = ctx.data().jpp.lock().await;
        (jpp.report(id, result)?, jpp.channel(ChannelType::Results))
    };
    info!("{} reported game #{} as {}", ctx.author().id, id, result);
    sync_rank_roles(&ctx, guild_id, report.changes()).await;
    Ok((results_channel, report))
}

/// Report the result of a running match
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn report(
    ctx: Context<'_>,
    #[description = "The game number"] id: u64,
    #[description = "blue/team1, orange/team2, or cancel"] result: String,
) -> Result<()> {
    match handle_report(ctx, id, result).await {
        Ok((channel, report)) => post(&ctx, channel, format_report(&report)).await?,
        Err(e) => {
            ctx.say(describe_error(&e)).await?;
        }
    }
    Ok(())
}

async fn handle_correct(
    ctx: Context<'_>,
    id: u64,
    result: String,
) -> Result<(Option<ChannelId>, String)> {
    let guild_id = guild_id(&ctx)?;
    let result: MatchResult = result.parse().map_err(JppError::from)?;
    let (report, refreshes, admin_channel) = {
        let mut jpp = ctx.data().jpp.lock().await;
        let report = jpp.correct(id, result)?;
        let refreshes = report
            .changes()
            .filter_map(|c| jpp.refresh_roles(c.user).ok().map(|r| (c.user, r)))
            .collect_vec();
        (report, refreshes, jpp.channel(ChannelType::Admin))
    };
    info!("{} corrected game #{} to {}", ctx.author().id, id, result);
    for (user, refresh) in &refreshes {
        if let Err(e) = refresh_member_roles(&ctx, guild_id, *user, refresh).await {
            warn!("{:#}", e);
        }
    }
    Ok((
        admin_channel,
        format!("**Corrected.**\n{}", format_report(&report)),
    ))
}

/// Change the result of a finished match
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn correct(
    ctx: Context<'_>,
    #[description = "The game number"] id: u64,
    #[description = "blue/team1, orange/team2, or cancel"] result: String,
) -> Result<()> {
    match handle_correct(ctx, id, result).await {
        Ok((channel, resp)) => post(&ctx, channel, resp).await?,
        Err(e) => {
            ctx.say(describe_error(&e)).await?;
        }
    }
    Ok(())
}

/// Look up a finished match
#[poise::command(slash_command, prefix_command, on_error = "handle_error")]
pub async fn recall(
    ctx: Context<'_>,
    #[description = "The game number"] id: u64,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .recall(id)
        .map(format_record)
        .unwrap_or_else(|e| describe_error(&e.into()));
    ctx.say(resp).await?;
    Ok(())
}

/// Show matches waiting for a result
#[poise::command(slash_command, prefix_command, on_error = "handle_error")]
pub async fn matches(ctx: Context<'_>) -> Result<()> {
    let resp = {
        let jpp = ctx.data().jpp.lock().await;
        let running = jpp.running_matches().map(format_match).collect_vec();
        if running.is_empty() {
            "No matches are running.".to_owned()
        } else {
            running.join("\n\n")
        }
    };
    ctx.say(resp).await?;
    Ok(())
}

/// Set the map for the running match, or for the next one
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn force_map(
    ctx: Context<'_>,
    #[description = "The map to play"] map: String,
) -> Result<()> {
    let resp = match ctx.data().jpp.lock().await.force_map(&map) {
        Ok(ForcedMap::Match { id, map }) => {
            format!("The map for Game #{id} has been changed to {map}.")
        }
        Ok(ForcedMap::Queue { map }) => format!("The next map will be {map}."),
        Err(e) => describe_error(&e),
    };
    ctx.say(resp).await?;
    Ok(())
}

/// Pick a new random map for the running match
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn reroll(ctx: Context<'_>) -> Result<()> {
    let rerolled = ctx.data().jpp.lock().await.reroll_map();
    let resp = match rerolled {
        Ok((id, map)) => format!("The map for Game #{id} has been changed to {map}."),
        Err(e) => describe_error(&e),
    };
    ctx.say(resp).await?;
    Ok(())
}
