//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! `handler` translates the callbacks into a distinct Event enum holding only what the plugins
//! need.

use crate::{context::Context, helper::MessageHelper, log_error};
use serenity::all::{ChannelId, Member, Message, MessageId, UserId};

/// A Discord event
#[derive(Debug)]
pub enum Event {
    Ready { user_name: String, guild_count: usize },
    Message(IncomingMessage),
    GuildJoin { guild_name: String },
    MemberJoin(NewMember),
}

/// A message posted to a channel the bot can see
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_name: String,
    pub content: String,
}

/// A member who just joined the server
#[derive(Clone, Debug)]
pub struct NewMember {
    pub id: UserId,
    pub display_name: String,
}

impl From<&Message> for IncomingMessage {
    fn from(msg: &Message) -> Self {
        Self {
            id: msg.id,
            channel_id: msg.channel_id,
            author_id: msg.author.id,
            author_name: msg.author_display_name(),
            content: msg.content.clone(),
        }
    }
}

impl From<&Member> for NewMember {
    fn from(member: &Member) -> Self {
        Self {
            id: member.user.id,
            display_name: member.display_name().to_owned(),
        }
    }
}

impl Event {
    // When an event occurs, iterate over all the plugins to see if any can/should handle it.
    //
    // A failing plugin is logged and does not stop later plugins or later events.
    pub async fn handle(self, ctx: Context<'_>) {
        for plugin in crate::plugin::plugins() {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => log_error!("Error in plugin {}: {:#}", plugin.name(), err),
            }
        }
    }
}

pub enum EventHandled {
    Yes,
    No,
}
