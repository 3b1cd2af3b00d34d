//! The slice of the chat platform the bot depends on.  Serenity's `Http` client provides it in
//! production; tests substitute a mock.

use anyhow::Result;
use serenity::all::{ChannelId, GetMessages, Http, Message, Timestamp, UserId};

/// A prior channel message as seen by the prompt builder
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryMessage {
    pub author_id: UserId,
    pub content: String,
    pub timestamp: Timestamp,
}

#[serenity::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Most recent `limit` messages of a channel, newest first.
    async fn history(&self, channel_id: ChannelId, limit: u8) -> Result<Vec<HistoryMessage>>;
    /// Post `text` to a channel.
    async fn send(&self, channel_id: ChannelId, text: &str) -> Result<()>;
    /// Human-facing channel name.  Errors if the channel does not exist or is not visible.
    async fn channel_name(&self, channel_id: ChannelId) -> Result<String>;
}

impl From<&Message> for HistoryMessage {
    fn from(msg: &Message) -> Self {
        Self {
            author_id: msg.author.id,
            content: msg.content.clone(),
            timestamp: msg.timestamp,
        }
    }
}

#[serenity::async_trait]
impl ChatTransport for Http {
    async fn history(&self, channel_id: ChannelId, limit: u8) -> Result<Vec<HistoryMessage>> {
        let messages = channel_id
            .messages(self, GetMessages::new().limit(limit))
            .await?;

        Ok(messages.iter().map(HistoryMessage::from).collect())
    }

    async fn send(&self, channel_id: ChannelId, text: &str) -> Result<()> {
        channel_id.say(self, text).await?;
        Ok(())
    }

    async fn channel_name(&self, channel_id: ChannelId) -> Result<String> {
        Ok(channel_id.name(self).await?)
    }
}
