use crate::discord_helpers::{guild_id, refresh_member_roles, revoke_role_from_all};
use crate::helpers::{describe_error, format_id, format_role, handle_error, is_admin};
use crate::rank::RankTier;
use crate::types::Context;
use anyhow::Result;
use itertools::Itertools;
use serenity::all::{Role, User};
use tracing::{info, warn};

fn format_tier(tier: &RankTier) -> String {
    format!(
        "{}: {} to {} MMR, ±{} per match",
        format_role(&tier.role),
        tier.min_mmr,
        tier.max_mmr,
        tier.delta
    )
}

/// Make a role a rank covering an MMR range
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    on_error = "handle_error"
)]
pub async fn add_rank(
    ctx: Context<'_>,
    #[description = "The rank role"] role: Role,
    #[description = "Lowest MMR in this rank"] min_mmr: i64,
    #[description = "Highest MMR in this rank"] max_mmr: i64,
    #[description = "MMR won or lost per match in this rank"] delta: i64,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .add_rank(role.id, min_mmr, max_mmr, delta)
        .map(|t| format!("Added rank {}", format_tier(&t)))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Change the MMR range or points of a rank
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    on_error = "handle_error"
)]
pub async fn update_rank(
    ctx: Context<'_>,
    #[description = "The rank role"] role: Role,
    #[description = "Lowest MMR in this rank"] min_mmr: i64,
    #[description = "Highest MMR in this rank"] max_mmr: i64,
    #[description = "MMR won or lost per match in this rank"] delta: i64,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .update_rank(role.id, min_mmr, max_mmr, delta)
        .map(|t| format!("Updated rank {}", format_tier(&t)))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

async fn handle_remove_rank(ctx: Context<'_>, role: Role) -> Result<String> {
    let guild_id = guild_id(&ctx)?;
    let tier = ctx.data().jpp.lock().await.remove_rank(role.id)?;
    let revoked = revoke_role_from_all(&ctx, guild_id, tier.role, "Rank removed").await?;
    info!("Revoked {} from {} members", tier.role, revoked);
    Ok(format!(
        "Removed rank {} and took it from {revoked} member{}.",
        format_role(&tier.role),
        if revoked == 1 { "" } else { "s" }
    ))
}

/// Stop using a role as a rank
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    on_error = "handle_error"
)]
pub async fn remove_rank(
    ctx: Context<'_>,
    #[description = "The rank role"] role: Role,
) -> Result<()> {
    let resp = handle_remove_rank(ctx, role)
        .await
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// List every rank
#[poise::command(slash_command, prefix_command, on_error = "handle_error")]
pub async fn ranks(ctx: Context<'_>) -> Result<()> {
    let resp = {
        let jpp = ctx.data().jpp.lock().await;
        let ranks = jpp.ranks();
        if ranks.is_empty() {
            "There are no ranks set up yet.".to_owned()
        } else {
            format!("**Ranks**\n{}", ranks.into_iter().map(format_tier).join("\n"))
        }
    };
    ctx.say(resp).await?;
    Ok(())
}

async fn handle_set_mmr(ctx: Context<'_>, user: User, mmr: i64) -> Result<String> {
    let guild_id = guild_id(&ctx)?;
    let (change, refresh) = {
        let mut jpp = ctx.data().jpp.lock().await;
        let change = jpp.set_mmr(user.id, mmr)?;
        (change, jpp.refresh_roles(user.id).ok())
    };
    if let Some(refresh) = refresh {
        refresh_member_roles(&ctx, guild_id, user.id, &refresh).await?;
    }
    Ok(format!(
        "{}'s MMR changed from {} to {}.",
        format_id(&change.user),
        change.prev_mmr,
        change.new_mmr
    ))
}

/// Set a player's MMR
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn set_mmr(
    ctx: Context<'_>,
    #[description = "The player"] user: User,
    #[description = "Their new MMR (negative values become 0)"] mmr: i64,
) -> Result<()> {
    let resp = handle_set_mmr(ctx, user, mmr)
        .await
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

async fn handle_refresh_roles(ctx: Context<'_>, user: Option<User>) -> Result<String> {
    let guild_id = guild_id(&ctx)?;
    let user = user.as_ref().unwrap_or_else(|| ctx.author()).id;
    let refresh = ctx.data().jpp.lock().await.refresh_roles(user)?;
    refresh_member_roles(&ctx, guild_id, user, &refresh).await?;
    Ok(match refresh.add {
        Some(role) => format!("{} now has the {} rank.", format_id(&user), format_role(&role)),
        None => format!("{} is unranked.", format_id(&user)),
    })
}

/// Give a player the rank role matching their MMR
#[poise::command(slash_command, prefix_command, guild_only, on_error = "handle_error")]
pub async fn refresh_roles(
    ctx: Context<'_>,
    #[description = "The player (defaults to you)"] user: Option<User>,
) -> Result<()> {
    let resp = handle_refresh_roles(ctx, user)
        .await
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

async fn handle_refresh_all_roles(ctx: Context<'_>) -> Result<String> {
    let guild_id = guild_id(&ctx)?;
    let refreshes = ctx.data().jpp.lock().await.refresh_all_roles()?;
    let mut skipped = 0;
    for (user, refresh) in &refreshes {
        // players who left the server are skipped
        if let Err(e) = refresh_member_roles(&ctx, guild_id, *user, refresh).await {
            warn!("Skipping role refresh of {}: {:#}", user, e);
            skipped += 1;
        }
    }
    info!("Refreshed roles of {} players", refreshes.len() - skipped);
    Ok(refresh_summary(refreshes.len() - skipped, skipped))
}

fn refresh_summary(updated: usize, skipped: usize) -> String {
    match skipped {
        0 => format!("Refreshed the roles of {updated} players."),
        _ => format!("Refreshed the roles of {updated} players, skipped {skipped}."),
    }
}

/// Give every registered player the rank role matching their MMR
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn refresh_all_roles(ctx: Context<'_>) -> Result<()> {
    ctx.defer().await?;
    let resp = handle_refresh_all_roles(ctx)
        .await
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::all::RoleId;

    #[test]
    fn tier_line() {
        let tier = RankTier {
            role: RoleId::new(12),
            min_mmr: 100,
            max_mmr: 199,
            delta: 15,
        };
        assert_eq!(format_tier(&tier), "<@&12>: 100 to 199 MMR, ±15 per match");
    }

    #[test]
    fn refresh_summary_mentions_skips() {
        assert_eq!(refresh_summary(3, 0), "Refreshed the roles of 3 players.");
        assert_eq!(
            refresh_summary(3, 2),
            "Refreshed the roles of 3 players, skipped 2."
        );
    }
}
