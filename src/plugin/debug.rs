use crate::{event::*, log_event, logging::*, plugin::*};
use anyhow::Result;

/// Prints debug information about event to stdout
pub struct Debug;

#[serenity::async_trait]
impl Plugin for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn handle(&self, ctx: &Context<'_>, event: &Event) -> Result<EventHandled> {
        match event {
            Event::Ready {
                user_name,
                guild_count,
            } => {
                log_event!(
                    "Connected to {} server(s) as {}",
                    guild_count,
                    user_name.color(),
                );
            }
            Event::Message(msg) => {
                log_event!(
                    "{}{}{} {}",
                    msg.channel_id.color(ctx.transport).await,
                    Glue {}.color(),
                    msg.author_name.color(),
                    msg.content,
                );
            }
            Event::GuildJoin { guild_name } => {
                log_event!("Joined guild: {}", guild_name);
            }
            Event::MemberJoin(member) => {
                log_event!("{} joined the server", member.display_name.color());
            }
        }

        Ok(EventHandled::No)
    }
}
