mod admin_commands;
mod config;
mod context;
mod discord_helpers;
mod engine;
mod error;
mod flavor;
mod fun_commands;
mod handler;
mod helpers;
mod map_commands;
mod maps;
mod match_commands;
mod matching;
mod player;
mod player_commands;
mod queue;
mod queue_commands;
mod rank;
mod rank_commands;
mod settings;
mod store;
mod types;

use crate::config::Config;
use crate::context::Jpp;
use crate::handler::JppEventHandler;
use crate::helpers::handle_error;
use crate::matching::match_rng;
use crate::store::JsonStore;
use crate::types::{Data, Error};
use anyhow::{Context as _, Result};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        player_commands::register(),
        player_commands::rename(),
        player_commands::stats(),
        player_commands::leaderboard(),
        queue_commands::join(),
        queue_commands::leave(),
        queue_commands::kick(),
        queue_commands::show_queue(),
        queue_commands::clear_queue(),
        queue_commands::force_start(),
        queue_commands::missing(),
        match_commands::report(),
        match_commands::correct(),
        match_commands::recall(),
        match_commands::matches(),
        match_commands::force_map(),
        match_commands::reroll(),
        rank_commands::add_rank(),
        rank_commands::update_rank(),
        rank_commands::remove_rank(),
        rank_commands::ranks(),
        rank_commands::set_mmr(),
        rank_commands::refresh_roles(),
        rank_commands::refresh_all_roles(),
        map_commands::add_map(),
        map_commands::remove_map(),
        map_commands::maps(),
        map_commands::add_map_pool(),
        map_commands::remove_map_pool(),
        map_commands::set_map_pool_type(),
        map_commands::add_map_pool_map(),
        map_commands::remove_map_pool_map(),
        map_commands::map_pools(),
        map_commands::set_map_pool(),
        admin_commands::set_channel(),
        admin_commands::clear_channel(),
        admin_commands::set_registered_role(),
        admin_commands::set_admin_role(),
        admin_commands::settings(),
        fun_commands::jpp(),
        fun_commands::slap(),
        fun_commands::add_quip(),
        fun_commands::remove_quip(),
        fun_commands::quips(),
        fun_commands::add_activity(),
        fun_commands::remove_activity(),
        fun_commands::activities(),
        fun_commands::add_strat(),
        fun_commands::remove_strat(),
        fun_commands::strats(),
        fun_commands::strat(),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let store = JsonStore::open(&config.data_dir)?;
    info!("Using data directory {}", store.dir().display());
    let jpp = Jpp::load(
        Box::new(store),
        config.queue_size,
        match_rng(config.seed.as_deref()),
    )?
    .with_map_override(config.map_override);
    let jpp = Arc::new(Mutex::new(jpp));
    let handler = JppEventHandler::new(Arc::clone(&jpp));

    let token = config.discord_token;
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            on_error: |err| Box::pin(handle_error(err)),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.prefix),
                edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                    std::time::Duration::from_secs(3600),
                ))),
                case_insensitive_commands: true,
                ..Default::default()
            },
            commands: commands(),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Logged in as {}", ready.user.name);
                Ok(Data { jpp })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .event_handler(handler)
        .await
        .context("Unable to create the Discord client")?;
    client.start().await.context("Discord client stopped")?;
    Ok(())
}
