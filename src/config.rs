//! Process configuration read from the environment

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";
const DEFAULT_LINE_DATA_API_BASE: &str = "https://api-data.line.me";

/// Invalid configuration value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be greater than zero")]
    MustBePositive { var: &'static str },
}

/// Credentials and endpoint for the remote assistant
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub assistant_id: Option<String>,
    pub base_url: String,
}

/// LINE messaging platform settings
#[derive(Debug, Clone)]
pub struct LineConfig {
    pub channel_token: Option<String>,
    pub api_base: String,
    pub data_api_base: String,
    pub max_image_bytes: u64,
}

/// Timing of the run polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub poll_interval: Duration,
    pub max_polls: u32,
    /// Wait after a batch of tool outputs has been submitted
    pub tool_settle: Duration,
    /// Wait when the remote still shows an already-answered batch
    pub resubmit_wait: Duration,
    /// Wait after cancelling a run that blocked run creation
    pub conflict_backoff: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_polls: 60,
            tool_settle: Duration::from_millis(700),
            resubmit_wait: Duration::from_millis(800),
            conflict_backoff: Duration::from_secs(2),
        }
    }
}

/// Full process configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub assistant: AssistantConfig,
    pub line: LineConfig,
    pub debounce_window: Duration,
    pub actor_idle: Duration,
    pub run: RunSettings,
    pub http_timeout: Duration,
    /// `None` keeps sessions for the lifetime of the process
    pub session_idle_ttl: Option<Duration>,
    pub reply_min_chars: usize,
    pub pricing_config_path: PathBuf,
    pub slots_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so parsing can be exercised without
    /// touching the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let number = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match var(key) {
                None => Ok(default),
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                    var: key,
                    value: raw,
                }),
            }
        };

        let port = u16::try_from(number("PORT", 8080)?).map_err(|_| ConfigError::InvalidNumber {
            var: "PORT",
            value: var("PORT").unwrap_or_default(),
        })?;

        let debounce_secs = number("DEBOUNCE_WINDOW_SECS", 15)?;
        if debounce_secs == 0 {
            return Err(ConfigError::MustBePositive {
                var: "DEBOUNCE_WINDOW_SECS",
            });
        }

        let max_polls = u32::try_from(number("POLL_MAX_ATTEMPTS", 60)?).map_err(|_| {
            ConfigError::InvalidNumber {
                var: "POLL_MAX_ATTEMPTS",
                value: var("POLL_MAX_ATTEMPTS").unwrap_or_default(),
            }
        })?;
        if max_polls == 0 {
            return Err(ConfigError::MustBePositive {
                var: "POLL_MAX_ATTEMPTS",
            });
        }

        let session_ttl_secs = number("SESSION_IDLE_TTL_SECS", 86_400)?;
        let reply_min_chars = usize::try_from(number("REPLY_MIN_CHARS", 10)?).unwrap_or(usize::MAX);

        Ok(Self {
            port,
            assistant: AssistantConfig {
                api_key: var("OPENAI_API_KEY").or_else(|| var("CHATGPT_API_KEY")),
                assistant_id: var("OPENAI_ASSISTANT_ID"),
                base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
            },
            line: LineConfig {
                channel_token: var("LINE_CHANNEL_ACCESS_TOKEN"),
                api_base: var("LINE_API_BASE").unwrap_or_else(|| DEFAULT_LINE_API_BASE.to_string()),
                data_api_base: var("LINE_DATA_API_BASE")
                    .unwrap_or_else(|| DEFAULT_LINE_DATA_API_BASE.to_string()),
                max_image_bytes: number("MAX_IMAGE_BYTES", 5 * 1024 * 1024)?,
            },
            debounce_window: Duration::from_secs(debounce_secs),
            actor_idle: Duration::from_secs(number("ACTOR_IDLE_SECS", 600)?),
            run: RunSettings {
                poll_interval: Duration::from_millis(number("POLL_INTERVAL_MS", 1000)?),
                max_polls,
                tool_settle: Duration::from_millis(number("TOOL_SETTLE_MS", 700)?),
                resubmit_wait: Duration::from_millis(number("TOOL_RESUBMIT_WAIT_MS", 800)?),
                conflict_backoff: Duration::from_millis(number("RUN_CONFLICT_BACKOFF_MS", 2000)?),
            },
            http_timeout: Duration::from_secs(number("HTTP_TIMEOUT_SECS", 30)?.max(1)),
            session_idle_ttl: (session_ttl_secs > 0).then(|| Duration::from_secs(session_ttl_secs)),
            reply_min_chars,
            pricing_config_path: var("PRICING_CONFIG_PATH")
                .map_or_else(|| PathBuf::from("pricing_config.json"), PathBuf::from),
            slots_endpoint: var("SLOTS_ENDPOINT_URL"),
        })
    }
}
