use crate::context::Jpp;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Data {
    /// Held for the whole of a command, so commands never interleave.
    pub jpp: Arc<Mutex<Jpp>>,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;
