use crate::error::JppError;
use crate::helpers::{describe_error, format_channel, format_role, handle_error};
use crate::settings::{ChannelType, Settings};
use crate::types::Context;
use anyhow::Result;
use serenity::all::{GuildChannel, Role, RoleId};

fn format_settings(settings: &Settings) -> String {
    let role = |role: Option<RoleId>| {
        role.map_or_else(|| "not set".to_owned(), |r| format_role(&r))
    };
    let mut lines = vec![
        "**Settings**".to_owned(),
        format!("**Registered role:** {}", role(settings.registered_role)),
        format!("**Admin role:** {}", role(settings.admin_role)),
        format!("**Next game:** #{}", settings.next_match_id),
    ];
    lines.extend(ChannelType::ALL.iter().map(|ty| {
        format!(
            "**{ty} channel:** {}",
            settings
                .channel(*ty)
                .map_or_else(|| "not set".to_owned(), |c| format_channel(&c))
        )
    }));
    lines.join("\n")
}

fn parse_channel_type(channel_type: &str) -> Result<ChannelType> {
    Ok(channel_type.parse().map_err(JppError::from)?)
}

/// Use a channel for lobby, results, admin, register or report messages
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    on_error = "handle_error"
)]
pub async fn set_channel(
    ctx: Context<'_>,
    #[description = "lobby, results, admin, register or report"] channel_type: String,
    #[description = "The channel (defaults to this one)"] channel: Option<GuildChannel>,
) -> Result<()> {
    let channel = channel.map_or_else(|| ctx.channel_id(), |c| c.id);
    let set = match parse_channel_type(&channel_type) {
        Ok(ty) => ctx
            .data()
            .jpp
            .lock()
            .await
            .set_channel(ty, Some(channel))
            .map(|()| ty),
        Err(e) => Err(e),
    };
    let resp = set
        .map(|ty| format!("{} is now the {ty} channel.", format_channel(&channel)))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Stop using a dedicated channel for a message type
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    on_error = "handle_error"
)]
pub async fn clear_channel(
    ctx: Context<'_>,
    #[description = "lobby, results, admin, register or report"] channel_type: String,
) -> Result<()> {
    let cleared = match parse_channel_type(&channel_type) {
        Ok(ty) => ctx
            .data()
            .jpp
            .lock()
            .await
            .set_channel(ty, None)
            .map(|()| ty),
        Err(e) => Err(e),
    };
    let resp = cleared
        .map(|ty| format!("The {ty} channel has been cleared."))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Set the role given to registered players
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    on_error = "handle_error"
)]
pub async fn set_registered_role(
    ctx: Context<'_>,
    #[description = "The role (leave empty to unset)"] role: Option<Role>,
) -> Result<()> {
    let role = role.map(|r| r.id);
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .set_registered_role(role)
        .map(|()| match role {
            Some(r) => format!("Registered players will get {}.", format_role(&r)),
            None => "The registered role has been unset.".to_owned(),
        })
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Set the role allowed to run matches
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    on_error = "handle_error"
)]
pub async fn set_admin_role(
    ctx: Context<'_>,
    #[description = "The role (leave empty to unset)"] role: Option<Role>,
) -> Result<()> {
    let role = role.map(|r| r.id);
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .set_admin_role(role)
        .map(|()| match role {
            Some(r) => format!("{} can now run matches.", format_role(&r)),
            None => "The admin role has been unset.".to_owned(),
        })
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Show the bot's settings
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    ephemeral,
    required_permissions = "ADMINISTRATOR",
    on_error = "handle_error"
)]
pub async fn settings(ctx: Context<'_>) -> Result<()> {
    let resp = format_settings(ctx.data().jpp.lock().await.settings());
    ctx.say(resp).await?;
    Ok(())
}
