mod config;
mod context;
mod event;
mod handler;
mod helper;
mod llm;
mod logging;
mod plugin;
mod prompt;
mod transport;
mod trigger;

use serenity::{all::GatewayIntents, Client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = crate::config::Config::load().await?;
    let token = cfg.general.discord_token.clone();
    let completion = crate::llm::MistralClient::new(&cfg.llm)?;
    let handler = handler::Handler::new(cfg, completion);

    // Things we want discord to tell us about.
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    Client::builder(&token, intents)
        .event_handler(handler)
        .await?
        .start()
        .await
        .map_err(Into::into)
}
