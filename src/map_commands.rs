use crate::error::JppError;
use crate::helpers::{describe_error, handle_error, is_admin};
use crate::maps::{MapPool, MapPoolType};
use crate::types::Context;
use anyhow::Result;
use itertools::Itertools;

fn format_pool(pool: &MapPool) -> String {
    let maps = if pool.maps.is_empty() {
        "no maps".to_owned()
    } else {
        pool.maps.join(", ")
    };
    format!(
        "**{}** ({}, played {} times): {maps}",
        pool.name, pool.kind, pool.times_played
    )
}

fn parse_pool_type(pool_type: &str) -> Result<MapPoolType> {
    Ok(pool_type.parse().map_err(JppError::from)?)
}

/// Add a map to the rotation
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn add_map(ctx: Context<'_>, #[description = "The map name"] name: String) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .add_map(&name)
        .map(|m| format!("Added map **{}**.", m.name))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Remove a map from the rotation and from every pool
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn remove_map(
    ctx: Context<'_>,
    #[description = "The map name"] name: String,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .remove_map(&name)
        .map(|m| format!("Removed map **{}**.", m.name))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// List every map
#[poise::command(slash_command, prefix_command, on_error = "handle_error")]
pub async fn maps(ctx: Context<'_>) -> Result<()> {
    let resp = {
        let jpp = ctx.data().jpp.lock().await;
        let maps = jpp.maps();
        if maps.is_empty() {
            "There are no maps.".to_owned()
        } else {
            let current = jpp
                .current_pool()
                .map_or_else(|| "every map".to_owned(), |p| format!("**{}**", p.name));
            format!(
                "**Maps** (choosing from {current})\n{}",
                maps.into_iter()
                    .map(|m| format!("{} (played {} times)", m.name, m.times_played))
                    .join("\n")
            )
        }
    };
    ctx.say(resp).await?;
    Ok(())
}

/// Create a map pool
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn add_map_pool(
    ctx: Context<'_>,
    #[description = "The pool name"] name: String,
    #[description = "all, custom (only listed maps) or exclude (all but listed maps)"]
    pool_type: String,
) -> Result<()> {
    let added = match parse_pool_type(&pool_type) {
        Ok(kind) => ctx.data().jpp.lock().await.add_pool(&name, kind),
        Err(e) => Err(e),
    };
    let resp = added
        .map(|p| format!("Added map pool {}", format_pool(&p)))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Delete a map pool
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn remove_map_pool(
    ctx: Context<'_>,
    #[description = "The pool name"] name: String,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .remove_pool(&name)
        .map(|p| format!("Removed map pool **{}**.", p.name))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Change how a map pool treats its listed maps
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn set_map_pool_type(
    ctx: Context<'_>,
    #[description = "The pool name"] name: String,
    #[description = "all, custom (only listed maps) or exclude (all but listed maps)"]
    pool_type: String,
) -> Result<()> {
    let updated = match parse_pool_type(&pool_type) {
        Ok(kind) => ctx.data().jpp.lock().await.set_pool_type(&name, kind),
        Err(e) => Err(e),
    };
    let resp = updated
        .map(|p| format!("Updated map pool {}", format_pool(&p)))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// List a map in a pool
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn add_map_pool_map(
    ctx: Context<'_>,
    #[description = "The pool name"] pool: String,
    #[description = "The map name"] map: String,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .add_pool_map(&pool, &map)
        .map(|p| format!("Updated map pool {}", format_pool(&p)))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// Take a map out of a pool
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn remove_map_pool_map(
    ctx: Context<'_>,
    #[description = "The pool name"] pool: String,
    #[description = "The map name"] map: String,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .remove_pool_map(&pool, &map)
        .map(|p| format!("Updated map pool {}", format_pool(&p)))
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

/// List every map pool
#[poise::command(slash_command, prefix_command, on_error = "handle_error")]
pub async fn map_pools(ctx: Context<'_>) -> Result<()> {
    let resp = {
        let jpp = ctx.data().jpp.lock().await;
        let pools = jpp.pools();
        if pools.is_empty() {
            "There are no map pools.".to_owned()
        } else {
            format!(
                "**Map pools**\n{}",
                pools.into_iter().map(format_pool).join("\n")
            )
        }
    };
    ctx.say(resp).await?;
    Ok(())
}

/// Choose maps from a pool, or from every map when no pool is given
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "is_admin",
    on_error = "handle_error"
)]
pub async fn set_map_pool(
    ctx: Context<'_>,
    #[description = "The pool name (leave empty for every map)"] name: Option<String>,
) -> Result<()> {
    let resp = ctx
        .data()
        .jpp
        .lock()
        .await
        .set_current_pool(name.as_deref())
        .map(|p| match p {
            Some(p) => format!("Maps will now be chosen from **{}**.", p.name),
            None => "Maps will now be chosen from every map.".to_owned(),
        })
        .unwrap_or_else(|e| describe_error(&e));
    ctx.say(resp).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_line() {
        let mut pool = MapPool::new("Comp", MapPoolType::Custom);
        assert_eq!(
            format_pool(&pool),
            "**Comp** (Custom, played 0 times): no maps"
        );
        pool.maps = vec!["Bank".into(), "Villa".into()];
        assert!(format_pool(&pool).ends_with(": Bank, Villa"));
    }

    #[test]
    fn bad_pool_type_is_a_domain_error() {
        let err = parse_pool_type("sometimes").unwrap_err();
        assert!(err.downcast_ref::<JppError>().is_some());
    }
}
