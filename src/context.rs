use crate::{config::Config, llm::Completion, transport::ChatTransport};
use serenity::all::UserId;

/// Everything a plugin needs to handle one event
///
/// Built fresh for every event from long-lived clients, so plugins never reach for globals.
pub struct Context<'a> {
    // Axebot's own context types
    pub cfg: &'a Config,
    pub completion: &'a dyn Completion,
    // Discord/Serenity context types
    pub bot_id: UserId,
    pub transport: &'a dyn ChatTransport,
}
