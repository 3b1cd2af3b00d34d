use crate::{event::*, log_internal, logging::AsyncPrintColor, plugin::*};
use anyhow::{anyhow, Result};

/// Checks configuration that can only be verified once connected to Discord.
pub struct Ready;

#[serenity::async_trait]
impl Plugin for Ready {
    fn name(&self) -> &'static str {
        "ready"
    }

    async fn handle(&self, ctx: &Context<'_>, event: &Event) -> Result<EventHandled> {
        let Event::Ready { .. } = event else {
            return Ok(EventHandled::No);
        };

        let Some(channel_id) = ctx.cfg.general.welcome_channel() else {
            log_internal!("No welcome channel configured, new members will not be greeted");
            return Ok(EventHandled::Yes);
        };

        // A bad id would otherwise only surface when the first member joins.
        ctx.transport.channel_name(channel_id).await.map_err(|e| {
            anyhow!(
                "Welcome channel {} (general.welcome_channel_id) could not be resolved: {}",
                channel_id,
                e
            )
        })?;

        log_internal!(
            "Greeting new members in {}",
            channel_id.color(ctx.transport).await
        );
        Ok(EventHandled::Yes)
    }
}
