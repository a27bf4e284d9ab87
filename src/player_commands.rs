use crate::context::PlayerStats;
use crate::discord_helpers::{add_role, guild_id, post, refresh_member_roles};
use crate::helpers::{describe_error, format_id, format_role, handle_error};
use crate::player::{Streak, UNSET_MMR};
use crate::settings::ChannelType;
use crate::types::Context;
use anyhow::Result;
use itertools::Itertools;
use serenity::all::{ChannelId, User};
use tracing::{debug, warn};

async fn handle_register(
    ctx: Context<'_>,
    name: Option<String>,
) -> Result<(Option<ChannelId>, String)> {
    let guild_id = guild_id(&ctx)?;
    let author = ctx.author();
    let name = name.unwrap_or_else(|| {
        author
            .global_name
            .clone()
            .unwrap_or_else(|| author.name.clone())
    });

    let (player, refresh, channel) = {
        let mut jpp = ctx.data().jpp.lock().await;
        let role = jpp.registered_role()?;
        jpp.check_registration(author.id, &name)?;
        // the player is only saved once they hold the role
        add_role(&ctx, guild_id, author.id, role, "Registered").await?;
        let player = jpp.register(author.id, &name)?;
        (
            player,
            jpp.refresh_roles(author.id).ok(),
            jpp.channel(ChannelType::Register),
        )
    };

    if let Some(refresh) = refresh {
        if let Err(e) = refresh_member_roles(&ctx, guild_id, author.id, &refresh).await {
            warn!("{:#}", e);
        }
    }
    Ok((
        channel,
        format!(
            "{} registered as **{}** with {} MMR.",
            format_id(&author.id),
            player.name,
            player.mmr
        ),
    ))
}

/// Register to play in ranked matches
#[poise::command(slash_command, prefix_command, guild_only, on_error = "handle_error")]
pub async fn register(
    ctx: Context<'_>,
    #[description = "The name to show on the leaderboard (defaults to your Discord name)"]
    name: Option<String>,
) -> Result<()> {
    match handle_register(ctx, name).await {
        Ok((channel, resp)) => post(&ctx, channel, resp).await?,
        Err(e) => {
            ctx.say(describe_error(&e)).await?;
        }
    }
    Ok(())
}

/// Change the name shown on the leaderboard
#[poise::command(slash_command, prefix_command, on_error = "handle_error")]
pub async fn rename(
    ctx: Context<'_>,
    #[description = "Your new name"] name: String,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .rename(ctx.author().id, &name)
        .map(|p| format!("{} is now known as **{}**.", format_id(&p.user), p.name))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

fn format_streak(streak: Streak) -> String {
    match streak {
        Streak::Win(n) => format!("{n} win{}", if n == 1 { "" } else { "s" }),
        Streak::Lose(n) => format!("{n} loss{}", if n == 1 { "" } else { "es" }),
        Streak::None => "none".to_owned(),
    }
}

fn format_stats(stats: &PlayerStats) -> String {
    let p = &stats.record;
    let rank = stats
        .tier
        .as_ref()
        .map_or_else(|| "unranked".to_owned(), |t| format_role(&t.role));
    let extreme = |mmr: i64| {
        if mmr == UNSET_MMR {
            "-".to_owned()
        } else {
            mmr.to_string()
        }
    };
    [
        format!("**{}** ({})", p.name, format_id(&p.user)),
        format!("**MMR:** {} ({rank})", p.mmr),
        format!(
            "**Matches:** {} ({} W / {} L)",
            p.matches_played, p.wins, p.losses
        ),
        format!("**Streak:** {}", format_streak(stats.streak)),
        format!(
            "**Highest MMR:** {} / **Lowest MMR:** {}",
            extreme(p.highest_mmr),
            extreme(p.lowest_mmr)
        ),
        format!(
            "**Longest streaks:** {} wins / {} losses",
            p.highest_win_streak, p.highest_lose_streak
        ),
    ]
    .join("\n")
}

/// Show a player's MMR, rank and record
#[poise::command(slash_command, prefix_command, on_error = "handle_error")]
pub async fn stats(
    ctx: Context<'_>,
    #[description = "The player to look up (defaults to you)"] user: Option<User>,
) -> Result<()> {
    let user = user.as_ref().unwrap_or_else(|| ctx.author());
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .stats(user.id)
        .map(|s| format_stats(&s))
        .unwrap_or_else(|e| describe_error(&e.into()));
    ctx.say(resp).await?;
    Ok(())
}

/// Show the players with the highest MMR
#[poise::command(slash_command, prefix_command, on_error = "handle_error")]
pub async fn leaderboard(
    ctx: Context<'_>,
    #[description = "Page number"]
    #[min = 1]
    page: Option<usize>,
) -> Result<()> {
    let resp = {
        let jpp = ctx.data().jpp.lock().await;
        let board = jpp.leaderboard(page.unwrap_or(1));
        if board.entries.is_empty() {
            "Nobody has registered yet.".to_owned()
        } else {
            let rows = board
                .entries
                .iter()
                .map(|(pos, p)| format!("**{pos}.** {} ({}) [{}]", p.name, format_id(&p.user), p.mmr))
                .join("\n");
            format!("**Leaderboard** (page {}/{})\n{rows}", board.page, board.pages)
        }
    };
    debug!("{} viewed the leaderboard", ctx.author().id);
    ctx.say(resp).await?;
    Ok(())
}
