//! Session synchronizer configuration.
//!
//! Configuration is loaded from environment variables. The connect
//! credential is redacted in Debug output.

use common::secret::SecretString;
use signal_protocol::ReactionVocabulary;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default reaction decay window in milliseconds.
pub const DEFAULT_REACTION_WINDOW_MS: u64 = 5000;

/// Default capacity of the update channel handed to the UI layer.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Session synchronizer configuration.
#[derive(Clone)]
pub struct Config {
    /// Room to join.
    pub room_name: String,

    /// Connect credential (access token).
    /// Protected by `SecretString` to prevent accidental logging.
    pub credential: SecretString,

    /// Reactions accepted on the side channel.
    pub reactions: ReactionVocabulary,

    /// How long a reaction stays visible without a new signal.
    pub reaction_window: Duration,

    /// Ask the provider for dominant-speaker events.
    pub dominant_speaker: bool,

    /// Capacity of the update channel.
    pub event_buffer: usize,
}

/// Custom Debug implementation that redacts the credential.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("room_name", &self.room_name)
            .field("credential", &"[REDACTED]")
            .field("reactions", &self.reactions)
            .field("reaction_window", &self.reaction_window)
            .field("dominant_speaker", &self.dominant_speaker)
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let room_name = vars
            .get("SESSION_ROOM_NAME")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("SESSION_ROOM_NAME".to_string()))?
            .clone();

        let credential = SecretString::from(
            vars.get("SESSION_CREDENTIAL")
                .ok_or_else(|| ConfigError::MissingEnvVar("SESSION_CREDENTIAL".to_string()))?
                .clone(),
        );

        let reactions = match vars.get("SESSION_REACTIONS") {
            Some(list) => {
                let vocabulary = ReactionVocabulary::parse_list(list);
                if vocabulary.is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "SESSION_REACTIONS must name at least one reaction".to_string(),
                    ));
                }
                vocabulary
            }
            None => ReactionVocabulary::default(),
        };

        let reaction_window_ms = match vars.get("SESSION_REACTION_WINDOW_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue(format!("SESSION_REACTION_WINDOW_MS: {e}"))
            })?,
            None => DEFAULT_REACTION_WINDOW_MS,
        };
        if reaction_window_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_REACTION_WINDOW_MS must be greater than 0".to_string(),
            ));
        }

        let dominant_speaker = vars
            .get("SESSION_DOMINANT_SPEAKER")
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        let event_buffer = vars
            .get("SESSION_EVENT_BUFFER")
            .and_then(|s| s.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(DEFAULT_EVENT_BUFFER);

        Ok(Config {
            room_name,
            credential,
            reactions,
            reaction_window: Duration::from_millis(reaction_window_ms),
            dominant_speaker,
            event_buffer,
        })
    }
}
