//! Decides whether a message should get a reply.

use crate::{config::Trigger, event::IncomingMessage};
use serenity::all::UserId;

/// True iff `msg` was written by someone other than the bot and mentions one of the configured
/// keywords.
///
/// Keywords are matched as literal substrings unless `case_insensitive` is set, so with the
/// default `["axebot", "Axebot"]` a message containing only "AXEBOT" is ignored.
pub fn is_trigger(settings: &Trigger, msg: &IncomingMessage, bot_id: UserId) -> bool {
    if msg.author_id == bot_id {
        return false;
    }

    if settings.case_insensitive {
        let content = msg.content.to_lowercase();
        settings
            .keywords
            .iter()
            .any(|keyword| content.contains(&keyword.to_lowercase()))
    } else {
        settings
            .keywords
            .iter()
            .any(|keyword| msg.content.contains(keyword.as_str()))
    }
}
