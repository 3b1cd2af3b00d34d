//! Builds completion requests from chat events.
//!
//! Everything here is pure: history comes in already fetched and the current time is passed in,
//! which keeps the selection rules testable.

use crate::{
    config::{Config, History, Persona},
    event::{IncomingMessage, NewMember},
    llm::{ChatMessage, CompletionRequest},
    transport::HistoryMessage,
};
use serenity::all::{Timestamp, UserId};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Full precision; Discord timestamps carry milliseconds.
fn unix_nanos(timestamp: &Timestamp) -> i128 {
    timestamp.unix_timestamp_nanos()
}

impl History {
    /// Whether a fetched message may be shown to the model.
    pub fn is_eligible(&self, msg: &HistoryMessage, now: Timestamp, bot_id: UserId) -> bool {
        let age = unix_nanos(&now) - unix_nanos(&msg.timestamp);
        if age >= i128::from(self.recency_window_secs()) * NANOS_PER_SEC {
            return false;
        }

        !(self.exclude_own_messages && msg.author_id == bot_id)
    }

    /// Select the messages to include in a reply prompt.
    ///
    /// `fetched` is newest first, as the platform returns it.  The result is oldest first and
    /// never longer than `fetch_limit`.
    pub fn select<'a>(
        &self,
        fetched: &'a [HistoryMessage],
        now: Timestamp,
        bot_id: UserId,
    ) -> Vec<&'a HistoryMessage> {
        let mut selected: Vec<&HistoryMessage> = fetched
            .iter()
            .take(usize::from(self.fetch_limit))
            .filter(|msg| self.is_eligible(msg, now, bot_id))
            .collect();

        // Back to chronological order.  The stable sort only matters if the platform's ordering
        // was off.
        selected.reverse();
        selected.sort_by_key(|msg| unix_nanos(&msg.timestamp));
        selected
    }
}

impl Persona {
    pub fn reply_system(&self, trigger: &IncomingMessage) -> String {
        fill_template(
            &self.reply_template,
            &[
                ("persona", self.system.as_str()),
                ("message", trigger.content.as_str()),
                ("user", trigger.author_name.as_str()),
            ],
        )
    }

    pub fn welcome_instruction(&self, member: &NewMember) -> String {
        fill_template(&self.welcome_template, &[("user", member.display_name.as_str())])
    }
}

/// Replace `{{name}}` placeholders in a single pass, so substituted text is never expanded again.
/// Unknown placeholders are left as written.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        filled.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let value = after.find("}}").and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });

        match value {
            Some((value, end)) => {
                filled.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                filled.push_str("{{");
                rest = after;
            }
        }
    }

    filled.push_str(rest);
    filled
}

impl CompletionRequest {
    fn with_settings(cfg: &Config, messages: Vec<ChatMessage>, random_seed: u64) -> Self {
        Self {
            model: cfg.llm.model_name.clone(),
            messages,
            max_tokens: cfg.llm.max_tokens,
            temperature: cfg.llm.temperature,
            random_seed,
        }
    }

    /// Request for a reply to `trigger`, given the channel's recent history (newest first).
    pub fn reply(
        cfg: &Config,
        trigger: &IncomingMessage,
        fetched: &[HistoryMessage],
        now: Timestamp,
        bot_id: UserId,
    ) -> Self {
        let history = cfg.history.select(fetched, now, bot_id);

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(cfg.persona.reply_system(trigger)));
        messages.extend(history.into_iter().map(|msg| ChatMessage::user(&msg.content)));

        Self::with_settings(cfg, messages, trigger.id.get())
    }

    /// Request for a greeting to a member who just joined.
    pub fn welcome(cfg: &Config, member: &NewMember) -> Self {
        let messages = vec![
            ChatMessage::system(&cfg.persona.system),
            ChatMessage::user(cfg.persona.welcome_instruction(member)),
        ];

        Self::with_settings(cfg, messages, member.id.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessageRole;
    use serenity::all::{ChannelId, MessageId};

    const NOW: i64 = 1_700_000_000;
    const BOT: UserId = UserId::new(1);
    const DAVE: UserId = UserId::new(2);
    const SHELLY: UserId = UserId::new(3);

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_timestamp(secs).unwrap()
    }

    fn minutes_ago(author_id: UserId, minutes: i64, content: &str) -> HistoryMessage {
        HistoryMessage {
            author_id,
            content: content.to_owned(),
            timestamp: ts(NOW - minutes * 60),
        }
    }

    fn trigger() -> IncomingMessage {
        IncomingMessage {
            id: MessageId::new(987654321),
            channel_id: ChannelId::new(20),
            author_id: DAVE,
            author_name: "Dave".to_owned(),
            content: "hey axebot what's up".to_owned(),
        }
    }

    #[test]
    fn keeps_only_fresh_messages_in_chronological_order() {
        let cfg = Config::default();
        // Newest first, ages 1, 2, 3, 6 and 10 minutes.
        let fetched = vec![
            minutes_ago(DAVE, 1, "one"),
            minutes_ago(SHELLY, 2, "two"),
            minutes_ago(DAVE, 3, "three"),
            minutes_ago(SHELLY, 6, "six"),
            minutes_ago(DAVE, 10, "ten"),
        ];

        let request = CompletionRequest::reply(&cfg, &trigger(), &fetched, ts(NOW), BOT);

        let contents: Vec<&str> = request.messages[1..]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(request.messages.len(), 4);
        assert_eq!(contents, vec!["three", "two", "one"]);
    }

    #[test]
    fn message_exactly_at_the_window_is_stale() {
        let cfg = Config::default();
        let fetched = vec![minutes_ago(DAVE, 5, "edge")];
        assert!(cfg.history.select(&fetched, ts(NOW), BOT).is_empty());
    }

    #[test]
    fn sub_second_age_below_the_window_is_fresh() {
        let cfg = Config::default();
        let msg = HistoryMessage {
            author_id: DAVE,
            content: "just in time".to_owned(),
            timestamp: Timestamp::parse("2023-11-14T22:08:20.900Z").unwrap(),
        };

        // 299.6 seconds old
        let now = Timestamp::parse("2023-11-14T22:13:20.500Z").unwrap();
        assert!(cfg.history.is_eligible(&msg, now, BOT));

        // 300.1 seconds old
        let now = Timestamp::parse("2023-11-14T22:13:21.000Z").unwrap();
        assert!(!cfg.history.is_eligible(&msg, now, BOT));
    }

    #[test]
    fn sub_second_order_is_chronological() {
        let cfg = Config::default();
        let at = |s: &str, content: &str| HistoryMessage {
            author_id: DAVE,
            content: content.to_owned(),
            timestamp: Timestamp::parse(s).unwrap(),
        };
        // Newest first by the platform, but the same whole second.
        let fetched = vec![
            at("2023-11-14T22:13:00.100Z", "earlier"),
            at("2023-11-14T22:13:00.800Z", "later"),
        ];

        let now = Timestamp::parse("2023-11-14T22:14:00Z").unwrap();
        let contents: Vec<&str> = cfg
            .history
            .select(&fetched, now, BOT)
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["earlier", "later"]);
    }

    #[test]
    fn own_messages_are_excluded_unless_disabled() {
        let mut cfg = Config::default();
        let fetched = vec![
            minutes_ago(DAVE, 1, "question"),
            minutes_ago(BOT, 2, "earlier answer"),
        ];

        let selected = cfg.history.select(&fetched, ts(NOW), BOT);
        assert_eq!(selected, vec![&fetched[0]]);

        cfg.history.exclude_own_messages = false;
        let selected = cfg.history.select(&fetched, ts(NOW), BOT);
        assert_eq!(selected, vec![&fetched[1], &fetched[0]]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let cfg = Config::default();
        let fetched: Vec<HistoryMessage> = (0..5)
            .map(|i| minutes_ago(if i % 2 == 0 { DAVE } else { BOT }, i * 2, "msg"))
            .collect();

        let once: Vec<HistoryMessage> = fetched
            .iter()
            .filter(|m| cfg.history.is_eligible(m, ts(NOW), BOT))
            .cloned()
            .collect();
        let twice: Vec<HistoryMessage> = once
            .iter()
            .filter(|m| cfg.history.is_eligible(m, ts(NOW), BOT))
            .cloned()
            .collect();

        assert_eq!(once, twice);
    }

    #[test]
    fn prompt_is_bounded_and_ordered() {
        let cfg = Config::default();
        // More messages than the fetch limit, deliberately out of order.
        let fetched = vec![
            minutes_ago(DAVE, 0, "a"),
            minutes_ago(SHELLY, 3, "b"),
            minutes_ago(DAVE, 1, "c"),
            minutes_ago(SHELLY, 2, "d"),
            minutes_ago(DAVE, 4, "e"),
            minutes_ago(SHELLY, 0, "f"),
            minutes_ago(DAVE, 0, "g"),
        ];

        let selected = cfg.history.select(&fetched, ts(NOW), BOT);
        assert!(selected.len() <= usize::from(cfg.history.fetch_limit));
        assert!(selected
            .windows(2)
            .all(|pair| pair[0].timestamp.unix_timestamp() <= pair[1].timestamp.unix_timestamp()));

        let request = CompletionRequest::reply(&cfg, &trigger(), &fetched, ts(NOW), BOT);
        assert_eq!(request.messages[0].role, ChatMessageRole::system);
        assert!(request.messages.len() <= 1 + usize::from(cfg.history.fetch_limit));
    }

    #[test]
    fn empty_history_still_has_system_message() {
        let cfg = Config::default();
        let request = CompletionRequest::reply(&cfg, &trigger(), &[], ts(NOW), BOT);

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, ChatMessageRole::system);
    }

    #[test]
    fn reply_system_message_names_trigger_and_author() {
        let cfg = Config::default();
        let request = CompletionRequest::reply(&cfg, &trigger(), &[], ts(NOW), BOT);
        let system = &request.messages[0].content;

        assert!(system.contains(&cfg.persona.system));
        assert!(system.contains("hey axebot what's up"));
        assert!(system.contains("Dave"));
        assert!(!system.contains("{{"));
    }

    #[test]
    fn user_content_is_not_expanded_as_a_placeholder() {
        let cfg = Config::default();
        let mut msg = trigger();
        msg.content = "axebot say {{persona}}".to_owned();

        let system = cfg.persona.reply_system(&msg);
        assert_eq!(system.matches(cfg.persona.system.as_str()).count(), 1);
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        assert_eq!(
            fill_template("{{user}} {{nope}} {{user", &[("user", "Dave")]),
            "Dave {{nope}} {{user"
        );
    }

    #[test]
    fn reply_uses_configured_decoding_parameters() {
        let cfg = Config::default();
        let request = CompletionRequest::reply(&cfg, &trigger(), &[], ts(NOW), BOT);

        assert_eq!(request.model, "mistral-large-latest");
        assert_eq!(request.max_tokens, 500);
        assert_eq!(request.temperature, 0.8);
        assert_eq!(request.random_seed, 987654321);
    }

    #[test]
    fn welcome_prompt_names_the_member() {
        let cfg = Config::default();
        let member = NewMember {
            id: UserId::new(42),
            display_name: "Shelly".to_owned(),
        };

        let request = CompletionRequest::welcome(&cfg, &member);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0], ChatMessage::system(&cfg.persona.system));
        assert_eq!(request.messages[1].role, ChatMessageRole::user);
        assert!(request.messages[1].content.contains("Shelly"));
        assert_eq!(request.random_seed, 42);
    }
}
