//! Runtime configuration read from the environment

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_MODEL: &str = "google/gemma-3-12b";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_HISTORY_TURNS: usize = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Which size metric the context window uses for token budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerKind {
    /// Four characters per token
    #[default]
    Heuristic,
    /// `cl100k_base` BPE
    Cl100k,
}

impl TokenizerKind {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "cl100k" | "cl100k_base" | "tiktoken" => Self::Cl100k,
            _ => Self::Heuristic,
        }
    }
}

/// Settings for the inference backend
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// OpenAI-compatible base URL, e.g. `http://localhost:1234/v1`
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Top-level application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub port: u16,
    pub inference: InferenceConfig,
    pub system_prompt: String,
    /// Most recent turns considered for the context window
    pub history_turns: usize,
    /// Token ceiling for the context window; discovered from the backend when unset
    pub context_tokens: Option<usize>,
    pub tokenizer: TokenizerKind,
    /// Wipe stored history at startup
    pub clear_on_start: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable values fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("LMCHAT_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".lmchat").join("lmchat.db")
            },
            PathBuf::from,
        );

        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let port = lookup("LMCHAT_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let timeout_secs = parsed("LMCHAT_TIMEOUT_SECS")
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            db_path,
            port,
            inference: InferenceConfig {
                base_url: lookup("LM_STUDIO_URL")
                    .map_or_else(|| DEFAULT_BASE_URL.to_string(), |u| u.trim_end_matches('/').to_string()),
                model: lookup("LM_STUDIO_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            system_prompt: lookup("LMCHAT_SYSTEM_PROMPT")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            history_turns: lookup("LMCHAT_HISTORY_LIMIT")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_HISTORY_TURNS),
            context_tokens: lookup("LMCHAT_CONTEXT_TOKENS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n| *n > 0),
            tokenizer: lookup("LMCHAT_TOKENIZER")
                .map(|t| TokenizerKind::parse(&t))
                .unwrap_or_default(),
            clear_on_start: lookup("LMCHAT_CLEAR_ON_START")
                .is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes")),
        }
    }
}
