use crate::{
    event::*, helper::send_split, llm::CompletionRequest, log_internal, plugin::*,
    trigger::is_trigger,
};
use anyhow::Result;
use serenity::all::Timestamp;

/// Replies to messages that mention the bot, using recent channel history as context
pub struct LlmReply;

#[serenity::async_trait]
impl Plugin for LlmReply {
    fn name(&self) -> &'static str {
        "llm_reply"
    }

    async fn handle(&self, ctx: &Context<'_>, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };

        if !is_trigger(&ctx.cfg.trigger, msg, ctx.bot_id) {
            return Ok(EventHandled::No);
        }

        let fetched = ctx
            .transport
            .history(msg.channel_id, ctx.cfg.history.fetch_limit)
            .await?;
        let request =
            CompletionRequest::reply(ctx.cfg, msg, &fetched, Timestamp::now(), ctx.bot_id);
        log_internal!(
            "Replying to {} with {} message(s) of history",
            msg.author_name,
            request.messages.len() - 1
        );

        let response = ctx.completion.complete(&request).await?;

        send_split(ctx.transport, msg.channel_id, &response).await?;
        Ok(EventHandled::Yes)
    }
}
