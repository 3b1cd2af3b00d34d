//! Miscellaneous convenience methods

use crate::transport::ChatTransport;
use anyhow::Result;
use serenity::all::ChannelId;

/// Discord rejects messages longer than this many characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

pub trait MessageHelper {
    fn author_display_name(&self) -> String;
}

impl MessageHelper for serenity::all::Message {
    /// Server nickname if there is one, otherwise the global display name.
    fn author_display_name(&self) -> String {
        // `member` is only populated for guild messages, e.g. not DMs.
        self.member
            .as_ref()
            .and_then(|member| member.nick.clone())
            .unwrap_or_else(|| self.author.display_name().to_owned())
    }
}

/// Split text into pieces Discord will accept, preferring to break at newlines, then spaces.
pub fn split_message(text: &str, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while rest.chars().count() > limit {
        // Byte offset just past the last character that fits
        let hard_end = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..hard_end];

        let separator = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|i| *i > 0);

        // Drop only the separator itself so indentation on the next line survives.
        match separator {
            Some(end) => {
                pieces.push(&rest[..end]);
                rest = &rest[end + 1..];
            }
            None => {
                pieces.push(&rest[..hard_end]);
                rest = &rest[hard_end..];
            }
        }
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

/// Send text to a channel, as several messages if it is over Discord's length limit.
pub async fn send_split(
    transport: &dyn ChatTransport,
    channel_id: ChannelId,
    text: &str,
) -> Result<()> {
    for piece in split_message(text, DISCORD_MESSAGE_LIMIT) {
        transport.send(channel_id, piece).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_piece() {
        assert_eq!(split_message("G'day mate", 2000), vec!["G'day mate"]);
        assert!(split_message("", 2000).is_empty());
    }

    #[test]
    fn prefers_line_then_word_boundaries() {
        assert_eq!(
            split_message("first line\nsecond line", 15),
            vec!["first line", "second line"]
        );
        assert_eq!(
            split_message("alpha beta gamma", 12),
            vec!["alpha beta", "gamma"]
        );
    }

    #[test]
    fn keeps_indentation_of_continuation_line() {
        let pieces = split_message("fn main() {\n    let x = 1;\n}", 12);

        assert_eq!(pieces[0], "fn main() {");
        assert!(pieces[1].starts_with("    let"));
        assert!(pieces.iter().all(|p| p.chars().count() <= 12));
    }

    #[test]
    fn hard_splits_without_boundaries_respect_char_limit() {
        let text = "é".repeat(25);
        let pieces = split_message(&text, 10);

        assert_eq!(pieces.len(), 3);
        assert!(pieces.iter().all(|p| p.chars().count() <= 10));
        assert_eq!(pieces.concat(), text);
    }
}
