use crate::{event::*, helper::send_split, llm::CompletionRequest, log_internal, plugin::*};
use anyhow::Result;

/// Greets new server members in the configured welcome channel
pub struct Welcome;

#[serenity::async_trait]
impl Plugin for Welcome {
    fn name(&self) -> &'static str {
        "welcome"
    }

    async fn handle(&self, ctx: &Context<'_>, event: &Event) -> Result<EventHandled> {
        let Event::MemberJoin(member) = event else {
            return Ok(EventHandled::No);
        };

        // Interpret a missing welcome channel as opting out of greetings
        let Some(channel_id) = ctx.cfg.general.welcome_channel() else {
            return Ok(EventHandled::No);
        };

        log_internal!("Welcoming {}", member.display_name);
        let request = CompletionRequest::welcome(ctx.cfg, member);
        let response = ctx.completion.complete(&request).await?;

        send_split(ctx.transport, channel_id, &response).await?;
        Ok(EventHandled::Yes)
    }
}
