use crate::error::JppError;
use crate::flavor::{Activity, ActivityType, Quip, QuipType, Strat, StratSide};
use crate::helpers::{describe_error, format_id, handle_error, is_admin};
use crate::types::Context;
use anyhow::Result;
use itertools::Itertools;
use poise::CreateReply;
use rand::seq::SliceRandom;
use serenity::all::{Member, User, UserId};

const TROUT_QUIPS: [&str; 5] = [
    "On it boss!",
    "*Trout incoming*",
    "Somebody call an ambulance... but not for me!",
    "Salmon cannons are overrated, trout cannon when?",
    "You might want to get some ice",
];

fn parse<T>(arg: &str) -> Result<T>
where
    T: std::str::FromStr<Err = crate::error::ParseError>,
{
    Ok(arg.parse().map_err(JppError::from)?)
}

fn format_quip(index: usize, quip: &Quip) -> String {
    let target = match quip.user {
        Some(user) => format!(" for {}", format_id(&user)),
        None => String::new(),
    };
    format!(
        "{index}. [{}{target}] {} (used {})",
        quip.kind, quip.text, quip.use_count
    )
}

fn format_activity(index: usize, activity: &Activity) -> String {
    format!(
        "{index}. [{}] {} (shown {})",
        activity.kind, activity.name, activity.use_count
    )
}

fn format_strat(index: usize, strat: &Strat) -> String {
    format!("{index}. [{}] `[{}] {}`", strat.side, strat.title, strat.text)
}

fn format_strats(strats: &[Strat], (attack, defense, both): (usize, usize, usize)) -> String {
    if strats.is_empty() {
        return "There are no strats yet.".to_owned();
    }
    let mut lines = strats
        .iter()
        .enumerate()
        .map(|(i, s)| format_strat(i, s))
        .collect_vec();
    lines.push(format!(
        "**{attack}** attack, **{defense}** defense and **{both}** both sides strats"
    ));
    lines.join("\n")
}

fn numbered<T>(items: &[T], empty: &str, format: fn(usize, &T) -> String) -> String {
    if items.is_empty() {
        return empty.to_owned();
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format(i, item))
        .join("\n")
}

/// jpp
#[poise::command(slash_command, prefix_command, guild_only, on_error = "handle_error")]
pub async fn jpp(ctx: Context<'_>) -> Result<()> {
    let emoji = ctx.guild().and_then(|guild| {
        guild
            .emojis
            .values()
            .find(|e| e.name == "jpp")
            .map(|e| e.to_string())
    });
    ctx.say(emoji.unwrap_or_else(|| "jpp".to_owned())).await?;
    Ok(())
}

/// Slap someone around a bit with a large trout
#[poise::command(slash_command, prefix_command, guild_only, on_error = "handle_error")]
pub async fn slap(
    ctx: Context<'_>,
    #[description = "Who deserves it"] member: Member,
) -> Result<()> {
    let quip = TROUT_QUIPS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(TROUT_QUIPS[0]);
    ctx.send(CreateReply::default().content(quip).ephemeral(true))
        .await?;
    ctx.channel_id()
        .say(ctx.http(), slap_line(ctx.author().id, member.user.id))
        .await?;
    Ok(())
}

fn slap_line(author: UserId, target: UserId) -> String {
    format!(
        "{} slaps {} around a bit with a large trout",
        format_id(&author),
        format_id(&target)
    )
}

/// Add something the bot may say when mentioned
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn add_quip(
    ctx: Context<'_>,
    #[description = "regular, emoji or user"] quip_type: String,
    #[description = "The quip, or the emoji name for emoji quips"] text: String,
    #[description = "The only user who hears it (user quips)"] user: Option<User>,
) -> Result<()> {
    let added = match parse::<QuipType>(&quip_type) {
        Ok(kind) => ctx
            .data()
            .jpp
            .lock()
            .await
            .add_quip(&text, kind, user.map(|u| u.id)),
        Err(e) => Err(e),
    };
    let resp = added
        .map(|q| format!("Added quip: {}", q.text))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Remove a quip by its number in /quips
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn remove_quip(
    ctx: Context<'_>,
    #[description = "The quip's number"] index: usize,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .remove_quip(index)
        .map(|q| format!("Removed quip: {}", q.text))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// List the quips
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn quips(ctx: Context<'_>) -> Result<()> {
    let resp = numbered(
        ctx.data().jpp.lock().await.quips(),
        "There are no quips yet.",
        format_quip,
    );
    ctx.say(resp).await?;
    Ok(())
}

/// Add an activity to the presence rotation
#[poise::command(slash_command, prefix_command, owners_only, on_error = "handle_error")]
pub async fn add_activity(
    ctx: Context<'_>,
    #[description = "game, watching or listening"] activity_type: String,
    #[description = "What the bot is doing"] name: String,
) -> Result<()> {
    let added = match parse::<ActivityType>(&activity_type) {
        Ok(kind) => ctx.data().jpp.lock().await.add_activity(&name, kind),
        Err(e) => Err(e),
    };
    let resp = added
        .map(|a| format!("Added activity: {} {}", a.kind, a.name))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Remove an activity by its number in /activities
#[poise::command(slash_command, prefix_command, owners_only, on_error = "handle_error")]
pub async fn remove_activity(
    ctx: Context<'_>,
    #[description = "The activity's number"] index: usize,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .remove_activity(index)
        .map(|a| format!("Removed activity: {}", a.name))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// List the activities in the presence rotation
#[poise::command(slash_command, prefix_command, owners_only, on_error = "handle_error")]
pub async fn activities(ctx: Context<'_>) -> Result<()> {
    let resp = numbered(
        ctx.data().jpp.lock().await.activities(),
        "There are no activities yet.",
        format_activity,
    );
    ctx.say(resp).await?;
    Ok(())
}

/// Add a strat roulette challenge
#[poise::command(slash_command, prefix_command, guild_only, on_error = "handle_error")]
pub async fn add_strat(
    ctx: Context<'_>,
    #[description = "attack, defense or both"] side: String,
    #[description = "A short title"] title: String,
    #[description = "What the team has to do"] strat: String,
) -> Result<()> {
    let added = match parse::<StratSide>(&side) {
        Ok(side) => ctx.data().jpp.lock().await.add_strat(side, &title, &strat),
        Err(e) => Err(e),
    };
    let resp = added
        .map(|s| format!("Added strat: {}", format_strat_short(&s)))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

fn format_strat_short(strat: &Strat) -> String {
    format!("[{}] `[{}] {}`", strat.side, strat.title, strat.text)
}

/// Remove a strat by its number in /strats
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn remove_strat(
    ctx: Context<'_>,
    #[description = "The strat's number"] index: usize,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .remove_strat(index)
        .map(|s| format!("Removed strat: {}", s.title))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// List the strat roulette challenges
#[poise::command(slash_command, prefix_command, guild_only, on_error = "handle_error")]
pub async fn strats(ctx: Context<'_>) -> Result<()> {
    let resp = {
        let jpp = ctx.data().jpp.lock().await;
        format_strats(jpp.strats(), jpp.strat_counts())
    };
    ctx.say(resp).await?;
    Ok(())
}

/// Draw a random strat for your side
#[poise::command(slash_command, prefix_command, guild_only, on_error = "handle_error")]
pub async fn strat(
    ctx: Context<'_>,
    #[description = "attack, defense or both"] side: String,
    #[description = "The strat you just played, so it is not drawn again"]
    previous: Option<String>,
) -> Result<()> {
    let drawn = match parse::<StratSide>(&side) {
        Ok(side) => ctx
            .data()
            .jpp
            .lock()
            .await
            .draw_strat(side, previous.as_deref()),
        Err(e) => Err(e),
    };
    let resp = drawn
        .map(|s| format!("**{}**\n{}", s.title, s.text))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(side: StratSide, title: &str, text: &str) -> Strat {
        Strat {
            title: title.into(),
            text: text.into(),
            side,
            times_played: 0,
        }
    }

    #[test]
    fn strat_listing_has_counts() {
        let strats = vec![
            entry(StratSide::Attack, "Rush", "Everyone rushes"),
            entry(StratSide::Both, "Knives", "Knives only"),
        ];
        assert_eq!(
            format_strats(&strats, (1, 0, 1)),
            "0. [Attack] `[Rush] Everyone rushes`\n\
             1. [Both] `[Knives] Knives only`\n\
             **1** attack, **0** defense and **1** both sides strats"
        );
        assert_eq!(format_strats(&[], (0, 0, 0)), "There are no strats yet.");
    }

    #[test]
    fn quip_listing() {
        let quips = vec![
            Quip {
                text: "Hello".into(),
                kind: QuipType::Regular,
                user: None,
                use_count: 2,
            },
            Quip {
                text: "Hi you".into(),
                kind: QuipType::SpecificUser,
                user: Some(UserId::new(9)),
                use_count: 0,
            },
        ];
        assert_eq!(
            numbered(&quips, "none", format_quip),
            "0. [Regular] Hello (used 2)\n1. [User for <@9>] Hi you (used 0)"
        );
        assert_eq!(numbered::<Quip>(&[], "none", format_quip), "none");
    }

    #[test]
    fn slapping() {
        assert_eq!(
            slap_line(UserId::new(3), UserId::new(4)),
            "<@3> slaps <@4> around a bit with a large trout"
        );
    }
}
