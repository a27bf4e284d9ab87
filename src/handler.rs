use crate::context::Jpp;
use crate::flavor::{ActivityType, Presence, Quip, QuipType};
use anyhow::Result;
use serenity::all::{ActivityData, Context, EventHandler, GuildId, Message, Ready};
use serenity::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, info, warn};

const PRESENCE_INTERVAL: Duration = Duration::from_secs(30 * 60);

pub struct JppEventHandler {
    pub jpp: Arc<Mutex<Jpp>>,
    rotating: AtomicBool,
}

impl JppEventHandler {
    pub fn new(jpp: Arc<Mutex<Jpp>>) -> Self {
        Self {
            jpp,
            rotating: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EventHandler for JppEventHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Connected as {} (gateway v{})", ready.user.tag(), ready.version);

        // ready fires again on reconnect
        if self.rotating.swap(true, Ordering::SeqCst) {
            return;
        }
        let jpp = Arc::clone(&self.jpp);
        tokio::spawn(async move {
            let mut interval = time::interval(PRESENCE_INTERVAL);
            loop {
                interval.tick().await;
                let presence = match jpp.lock().await.next_presence() {
                    Ok(presence) => presence,
                    Err(e) => {
                        warn!("Unable to rotate the presence: {:#}", e);
                        continue;
                    }
                };
                match presence {
                    Presence::Keep => {}
                    Presence::Clear => ctx.set_activity(None),
                    Presence::Show(activity) => {
                        debug!("Showing activity {}", activity.name);
                        ctx.set_activity(Some(activity_data(activity.kind, activity.name)));
                    }
                }
            }
        });
        info!("Presence rotation active");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = self.reply_to_mention(&ctx, &msg).await {
            warn!("Unable to reply to {}: {:#}", msg.author.id, e);
        }
    }
}

impl JppEventHandler {
    async fn reply_to_mention(&self, ctx: &Context, msg: &Message) -> Result<()> {
        let Some(guild_id) = msg.guild_id else {
            return Ok(());
        };
        if msg.author.bot || msg.mention_everyone {
            return Ok(());
        }
        if !msg.mentions_user_id(ctx.cache.current_user().id) {
            return Ok(());
        }

        let emojis = guild_emojis(ctx, guild_id);
        let names: Vec<String> = emojis.iter().map(|(name, _)| name.clone()).collect();
        let quip = self.jpp.lock().await.random_quip(msg.author.id, &names)?;
        if let Some(reply) = quip.and_then(|q| quip_reply(&q, &emojis)) {
            msg.channel_id.say(&ctx.http, reply).await?;
        }
        Ok(())
    }
}

/// Names and mention text of the guild's emojis, read from the cache.
fn guild_emojis(ctx: &Context, guild_id: GuildId) -> Vec<(String, String)> {
    ctx.cache
        .guild(guild_id)
        .map(|guild| {
            guild
                .emojis
                .values()
                .map(|e| (e.name.clone(), e.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Emoji quips are sent as the emoji itself.
fn quip_reply(quip: &Quip, emojis: &[(String, String)]) -> Option<String> {
    match quip.kind {
        QuipType::GuildEmoji => emojis
            .iter()
            .find(|(name, _)| *name == quip.text)
            .map(|(_, emoji)| emoji.clone()),
        _ => Some(quip.text.clone()),
    }
}

fn activity_data(kind: ActivityType, name: String) -> ActivityData {
    match kind {
        ActivityType::Game => ActivityData::playing(name),
        ActivityType::Watching => ActivityData::watching(name),
        ActivityType::Listening => ActivityData::listening(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::all::UserId;

    fn quip(text: &str, kind: QuipType) -> Quip {
        Quip {
            text: text.into(),
            kind,
            user: Some(UserId::new(1)).filter(|_| kind == QuipType::SpecificUser),
            use_count: 0,
        }
    }

    #[test]
    fn emoji_quips_send_the_emoji() {
        let emojis = vec![("jpp".to_owned(), "<:jpp:42>".to_owned())];
        assert_eq!(
            quip_reply(&quip("jpp", QuipType::GuildEmoji), &emojis).as_deref(),
            Some("<:jpp:42>")
        );
        assert_eq!(quip_reply(&quip("gone", QuipType::GuildEmoji), &emojis), None);
        assert_eq!(
            quip_reply(&quip("Hi you", QuipType::SpecificUser), &emojis).as_deref(),
            Some("Hi you")
        );
    }

    #[test]
    fn activity_kinds() {
        let data = activity_data(ActivityType::Watching, "the queue".into());
        assert_eq!(data.kind, serenity::all::ActivityType::Watching);
        assert_eq!(data.name, "the queue");
        assert_eq!(
            activity_data(ActivityType::Game, "Golf It!".into()).kind,
            serenity::all::ActivityType::Playing
        );
    }
}
