use anyhow::{anyhow, bail, Result};
use serenity::all::ChannelId;
use std::{io::ErrorKind, path::PathBuf};
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/axebot/config.toml";
/// Overrides the default configuration path when set.
const CONFIG_PATH_ENV: &str = "AXEBOT_CONFIG";
const DISCORD_TOKEN_ENV: &str = "DISCORD_TOKEN";
const MISTRAL_API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Discord refuses to return more than this many messages per history request.
const MAX_FETCH_LIMIT: u8 = 100;

const DEFAULT_PERSONA: &str = r#"You are AxeBot, a friendly but sarcastic bot with deep knowledge of video gaming lore.
You will be responding to not just one message, but the recent chat history in a channel.
Try to make sense of the conversation and its context before you reply.

You know the following information about yourself and our clan:
 - Our founder and glorious leader is BaronNecro
 - Axebot was built by Axegollod, one of our server admins.
 - Axebot is written in Rust and is powered by the Mistral AI API.
 - This bot runs in the Australian Road Warriors (ARW) discord server.
 - We primarily play PlayerUnknown's Battlegrounds, DayZ and Crossout, but sometimes we play other games too.
 - You should try to encourage players to team up and play games together in one of the voice channels, if it fits the context of the conversation.
 - You can also provide information about the games we play, such as tips and tricks, or even some lore.
 - Most of our clan members are over the age of 30, work full time, and usually game in the evenings or on weekends (AEST).
"#;

const DEFAULT_REPLY_TEMPLATE: &str = r#"{{persona}}
The message you are responding to is: "{{message}}"
It was sent by {{user}}, so address your reply to them.

The chat history will now be provided - please respond with only the message you wish to send back to the channel."#;

const DEFAULT_WELCOME_TEMPLATE: &str = "Write a friendly welcome message to our newest member and encourage them to join us for games soon. Their name is: {{user}}";

/// Bot configuration
#[derive(Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub trigger: Trigger,
    pub history: History,
    pub llm: Llm,
    pub persona: Persona,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct General {
    /// Discord bot token.  `DISCORD_TOKEN` takes precedence.
    pub discord_token: String,
    /// Channel new members are greeted in.  No greeting is sent if unset.
    pub welcome_channel_id: Option<u64>,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Trigger {
    /// Substrings which make the bot respond to a message.
    pub keywords: Vec<String>,
    /// When false, keywords must appear exactly as written.
    pub case_insensitive: bool,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct History {
    /// How many of the most recent channel messages to consider.
    pub fetch_limit: u8,
    /// Messages older than this are left out of the prompt.
    pub recency_window_minutes: u64,
    /// Leave the bot's own prior messages out of the prompt.
    pub exclude_own_messages: bool,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Llm {
    /// Completion API key.  `MISTRAL_API_KEY` takes precedence.
    pub api_key: String,
    pub chat_url: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_seconds: u64,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Persona {
    /// Background the model is given about itself and the server.
    pub system: String,
    /// System message for replies.  Supports `{{persona}}`, `{{message}}` and `{{user}}`.
    pub reply_template: String,
    /// Instruction for greeting new members.  Supports `{{user}}`.
    pub welcome_template: String,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            keywords: vec!["axebot".to_owned(), "Axebot".to_owned()],
            case_insensitive: false,
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self {
            fetch_limit: 5,
            recency_window_minutes: 5,
            exclude_own_messages: true,
        }
    }
}

impl Default for Llm {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            chat_url: "https://api.mistral.ai/v1/chat/completions".to_owned(),
            model_name: "mistral-large-latest".to_owned(),
            max_tokens: 500,
            temperature: 0.8,
            request_timeout_seconds: 60,
        }
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            system: DEFAULT_PERSONA.to_owned(),
            reply_template: DEFAULT_REPLY_TEMPLATE.to_owned(),
            welcome_template: DEFAULT_WELCOME_TEMPLATE.to_owned(),
        }
    }
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        // Without a config file everything but the secrets has a usable default, and the secrets
        // may come from the environment.
        let contents = match tokio::fs::File::open(&path).await {
            Ok(mut file) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents).await.map_err(|e| {
                    anyhow!(
                        "Could not read configuration at `{}`: {}",
                        path.to_string_lossy(),
                        e
                    )
                })?;
                contents
            }
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(anyhow!(
                    "Could not open configuration at `{}`: {}",
                    path.to_string_lossy(),
                    e
                ))
            }
        };

        let mut config = Self::from_toml_str(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;
        config.apply_secrets(|name| std::env::var(name).ok())?;

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Fill in secrets from `lookup` (the environment, outside of tests), which wins over the
    /// file.  Both secrets are required.
    pub fn apply_secrets(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(token) = lookup(DISCORD_TOKEN_ENV).filter(|s| !s.is_empty()) {
            self.general.discord_token = token;
        }
        if let Some(key) = lookup(MISTRAL_API_KEY_ENV).filter(|s| !s.is_empty()) {
            self.llm.api_key = key;
        }

        if self.general.discord_token.is_empty() {
            bail!("Missing Discord token: set {DISCORD_TOKEN_ENV} or general.discord_token");
        }
        if self.llm.api_key.is_empty() {
            bail!("Missing completion API key: set {MISTRAL_API_KEY_ENV} or llm.api_key");
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.general.welcome_channel_id == Some(0) {
            bail!("general.welcome_channel_id must not be 0");
        }
        if !(1..=MAX_FETCH_LIMIT).contains(&self.history.fetch_limit) {
            bail!("history.fetch_limit must be between 1 and {MAX_FETCH_LIMIT}");
        }
        if self.history.recency_window_minutes == 0 {
            bail!("history.recency_window_minutes must be positive");
        }
        if self.llm.max_tokens == 0 {
            bail!("llm.max_tokens must be positive");
        }
        if !(0.0..=1.5).contains(&self.llm.temperature) {
            bail!("llm.temperature must be between 0.0 and 1.5");
        }
        Ok(())
    }
}

impl General {
    pub fn welcome_channel(&self) -> Option<ChannelId> {
        // Zero is rejected by `validate`
        self.welcome_channel_id.filter(|id| *id != 0).map(ChannelId::new)
    }
}

impl History {
    pub fn recency_window_secs(&self) -> i64 {
        i64::try_from(self.recency_window_minutes.saturating_mul(60)).unwrap_or(i64::MAX)
    }
}
