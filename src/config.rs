//! Client configuration from the environment

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://new-chatbot-backend-n4ob.onrender.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the conversation service
    pub api_url: String,
    /// SQLite file holding durable client state
    pub state_path: PathBuf,
    /// Transport timeout; `None` keeps the HTTP client's default
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("NEWSBOT_API_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let state_path = lookup("NEWSBOT_STATE_DB").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.newsbot/state.db"))
            },
            PathBuf::from,
        );

        let request_timeout = lookup("NEWSBOT_REQUEST_TIMEOUT_SECS")
            .and_then(|secs| secs.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            api_url,
            state_path,
            request_timeout,
        }
    }
}
