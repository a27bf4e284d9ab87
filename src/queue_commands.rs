use crate::discord_helpers::{post, voice_channel_members};
use crate::engine::Match;
use crate::helpers::{describe_error, format_id, format_match, handle_error, is_admin};
use crate::settings::ChannelType;
use crate::types::Context;
use anyhow::Result;
use itertools::Itertools;
use serenity::all::{User, UserId};

/// Posts a started match to the lobby channel, with a reminder in the report channel if there is one.
async fn announce_match(ctx: Context<'_>, game: &Match) -> Result<()> {
    let (lobby, report) = {
        let jpp = ctx.data().jpp.lock().await;
        (jpp.channel(ChannelType::Lobby), jpp.channel(ChannelType::Report))
    };
    post(&ctx, lobby, format_match(game)).await?;
    if let Some(report) = report.filter(|r| Some(*r) != lobby) {
        report
            .say(
                ctx.http(),
                format!(
                    "Game #{} on {} is waiting for a result: `/report {} <result>`",
                    game.id, game.map, game.id
                ),
            )
            .await?;
    }
    Ok(())
}

async fn handle_join(ctx: Context<'_>) -> Result<(String, Option<Match>)> {
    let author = ctx.author().id;
    let mut jpp = ctx.data().jpp.lock().await;
    let outcome = jpp.join_queue(author)?;
    let capacity = jpp.queue().capacity();
    let resp = if outcome.started.is_some() {
        format!(
            "{} [{}] joined the queue.\nThe queue is now full, starting a match...",
            format_id(&author),
            outcome.entry.mmr
        )
    } else {
        format!(
            "**[{}/{}]** {} [{}] joined the queue.",
            outcome.queued,
            capacity,
            format_id(&author),
            outcome.entry.mmr
        )
    };
    Ok((resp, outcome.started))
}

/// Join the queue for the next match
#[poise::command(slash_command, prefix_command, guild_only, aliases("q"), on_error = "handle_error")]
pub async fn join(ctx: Context<'_>) -> Result<()> {
    match handle_join(ctx).await {
        Ok((resp, started)) => {
            ctx.say(resp).await?;
            if let Some(game) = started {
                announce_match(ctx, &game).await?;
            }
        }
        Err(e) => {
            ctx.say(describe_error(&e)).await?;
        }
    }
    Ok(())
}

fn left_message(queued: usize, capacity: usize, user: &UserId, mmr: i64) -> String {
    if queued == 0 {
        format!(
            "{} [{mmr}] left the queue.\nThe queue is now empty.",
            format_id(user)
        )
    } else {
        format!(
            "**[{queued}/{capacity}]** {} [{mmr}] left the queue.",
            format_id(user)
        )
    }
}

/// Leave the queue
#[poise::command(slash_command, prefix_command, guild_only, on_error = "handle_error")]
pub async fn leave(ctx: Context<'_>) -> Result<()> {
    let resp = {
        let mut jpp = ctx.data().jpp.lock().await;
        match jpp.leave_queue(ctx.author().id) {
            Ok(entry) => left_message(
                jpp.queue().len(),
                jpp.queue().capacity(),
                &entry.user,
                entry.mmr,
            ),
            Err(e) => describe_error(&e),
        }
    };
    ctx.say(resp).await?;
    Ok(())
}

/// Remove a player from the queue
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "The player to remove"] user: User,
) -> Result<()> {
    let resp = {
        let mut jpp = ctx.data().jpp.lock().await;
        match jpp.leave_queue(user.id) {
            Ok(entry) => format!(
                "{}\nRemoved by {}.",
                left_message(
                    jpp.queue().len(),
                    jpp.queue().capacity(),
                    &entry.user,
                    entry.mmr
                ),
                format_id(&ctx.author().id)
            ),
            Err(e) => describe_error(&e),
        }
    };
    ctx.say(resp).await?;
    Ok(())
}

/// Show who is queued
#[poise::command(slash_command, prefix_command, rename = "queue", on_error = "handle_error")]
pub async fn show_queue(ctx: Context<'_>) -> Result<()> {
    let resp = {
        let jpp = ctx.data().jpp.lock().await;
        let queue = jpp.queue();
        if queue.is_empty() {
            "The queue is empty.".to_owned()
        } else {
            let players = queue
                .entries()
                .iter()
                .map(|e| format!("{} [{}]", format_id(&e.user), e.mmr))
                .join("\n");
            let forced = queue
                .forced_map()
                .map(|m| format!("\n**Next map:** {m}"))
                .unwrap_or_default();
            format!(
                "**[{}/{}] Queued players**\n{players}{forced}",
                queue.len(),
                queue.capacity()
            )
        }
    };
    ctx.say(resp).await?;
    Ok(())
}

/// Empty the queue
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn clear_queue(ctx: Context<'_>) -> Result<()> {
    ctx.data().jpp.lock().await.clear_queue();
    ctx.say("The queue has been cleared.").await?;
    Ok(())
}

/// Start a match with whoever is queued
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn force_start(ctx: Context<'_>) -> Result<()> {
    let started = ctx.data().jpp.lock().await.force_start();
    match started {
        Ok(game) => announce_match(ctx, &game).await?,
        Err(e) => {
            ctx.say(describe_error(&e)).await?;
        }
    }
    Ok(())
}

/// List players in your voice channel who have not joined the queue
#[poise::command(slash_command, prefix_command, guild_only, on_error = "handle_error")]
pub async fn missing(ctx: Context<'_>) -> Result<()> {
    let resp = match voice_channel_members(&ctx) {
        Ok(members) => {
            let missing = ctx.data().jpp.lock().await.missing(members);
            if missing.is_empty() {
                "Everyone in your voice channel is queued.".to_owned()
            } else {
                format!(
                    "Not in the queue: {}",
                    missing.iter().map(format_id).join(", ")
                )
            }
        }
        Err(e) => describe_error(&e),
    };
    ctx.say(resp).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_messages() {
        let user = UserId::new(4);
        assert_eq!(
            left_message(0, 10, &user, 40),
            "<@4> [40] left the queue.\nThe queue is now empty."
        );
        assert_eq!(
            left_message(3, 10, &user, 40),
            "**[3/10]** <@4> [40] left the queue."
        );
    }
}
