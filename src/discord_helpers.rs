use crate::context::RoleRefresh;
use crate::engine::PlayerChange;
use crate::rank::RoleChange;
use crate::types::Context;
use anyhow::{Context as _, Result};
use itertools::Itertools;
use serenity::all::{ChannelId, GuildId, RoleId, UserId};
use tracing::{debug, warn};

pub fn guild_id(ctx: &Context<'_>) -> Result<GuildId> {
    ctx.guild_id()
        .context("This command must be called from a guild (server).")
}

/// Returns a vector of all guild members with the specified role ID.
pub async fn guild_members_with_role(
    ctx: &Context<'_>,
    guild_id: GuildId,
    role_id: RoleId,
) -> Result<Vec<UserId>> {
    // max number of pages to try to fetch (to avoid infinite loops in the event of the server
    // response format changing in a way that breaks the end-of-page detection)
    const MAX_PAGES: u64 = 20;

    // maximum number of members to request per page
    const PAGE_LIMIT: u64 = 1000;

    let mut last_member = None;
    let mut members_with_role = Vec::new();

    for _ in 0..MAX_PAGES {
        let page = guild_id
            .members(ctx.http(), Some(PAGE_LIMIT), last_member)
            .await?;

        members_with_role.extend(
            page.iter()
                .filter(|m| m.roles.iter().contains(&role_id))
                .map(|m| m.user.id),
        );

        match page.last() {
            Some(last) if page.len() as u64 == PAGE_LIMIT => last_member = Some(last.user.id),
            _ => break,
        }
    }

    Ok(members_with_role)
}

/// Members sharing the author's voice channel.
pub fn voice_channel_members(ctx: &Context<'_>) -> Result<Vec<UserId>> {
    let guild = ctx
        .guild()
        .context("This command must be called from a guild (server).")?;
    let channel = guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|state| state.channel_id)
        .context("You need to be in a voice channel to use this command.")?;
    Ok(guild
        .voice_states
        .values()
        .filter(|state| state.channel_id == Some(channel))
        .map(|state| state.user_id)
        .sorted()
        .collect())
}

pub async fn add_role(
    ctx: &Context<'_>,
    guild_id: GuildId,
    user: UserId,
    role: RoleId,
    reason: &str,
) -> Result<()> {
    ctx.http()
        .add_member_role(guild_id, user, role, Some(reason))
        .await
        .with_context(|| format!("Unable to give <@&{role}> to <@{user}>"))
}

pub async fn remove_role(
    ctx: &Context<'_>,
    guild_id: GuildId,
    user: UserId,
    role: RoleId,
    reason: &str,
) -> Result<()> {
    ctx.http()
        .remove_member_role(guild_id, user, role, Some(reason))
        .await
        .with_context(|| format!("Unable to take <@&{role}> from <@{user}>"))
}

async fn apply_role_change(
    ctx: &Context<'_>,
    guild_id: GuildId,
    user: UserId,
    change: RoleChange,
    reason: &str,
) -> Result<()> {
    if let Some(role) = change.remove {
        remove_role(ctx, guild_id, user, role, reason).await?;
    }
    if let Some(role) = change.add {
        add_role(ctx, guild_id, user, role, reason).await?;
    }
    Ok(())
}

/// Moves every player whose rank changed to their new rank role. Failures are logged and skipped
/// so one missing member does not hold up the rest.
pub async fn sync_rank_roles<'a>(
    ctx: &Context<'_>,
    guild_id: GuildId,
    changes: impl IntoIterator<Item = &'a PlayerChange>,
) {
    for change in changes {
        let Some(role_change) = change.transition.role_change() else {
            continue;
        };
        debug!("Updating rank role of {}", change.user);
        if let Err(e) = apply_role_change(ctx, guild_id, change.user, role_change, "Rank changed").await {
            warn!("{:#}", e);
        }
    }
}

/// Strips stale rank roles from a member and grants the one matching their MMR, along with the
/// registered role if they lost it.
pub async fn refresh_member_roles(
    ctx: &Context<'_>,
    guild_id: GuildId,
    user: UserId,
    refresh: &RoleRefresh,
) -> Result<()> {
    let member = guild_id.member(ctx.http(), user).await?;
    for role in refresh.remove.iter().filter(|r| member.roles.contains(r)) {
        remove_role(ctx, guild_id, user, *role, "Rank refresh").await?;
    }
    if let Some(role) = refresh.add.filter(|r| !member.roles.contains(r)) {
        add_role(ctx, guild_id, user, role, "Rank refresh").await?;
    }
    if let Some(role) = refresh.registered.filter(|r| !member.roles.contains(r)) {
        add_role(ctx, guild_id, user, role, "Registered").await?;
    }
    Ok(())
}

/// Takes a role away from everyone holding it. Returns how many members lost it.
pub async fn revoke_role_from_all(
    ctx: &Context<'_>,
    guild_id: GuildId,
    role: RoleId,
    reason: &str,
) -> Result<usize> {
    let members = guild_members_with_role(ctx, guild_id, role).await?;
    for user in &members {
        remove_role(ctx, guild_id, *user, role, reason).await?;
    }
    Ok(members.len())
}

/// Posts to `channel`, or replies in place when no channel is configured.
pub async fn post(ctx: &Context<'_>, channel: Option<ChannelId>, content: String) -> Result<()> {
    match channel {
        Some(channel) if channel != ctx.channel_id() => {
            channel.say(ctx.http(), content).await?;
            ctx.say(format!("Posted in <#{channel}>.")).await?;
        }
        _ => {
            ctx.say(content).await?;
        }
    }
    Ok(())
}
