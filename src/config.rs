use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_IMAP_PORT;

/// Overrides the config file location
const ENV_CONFIG_PATH: &str = "INBOX_DIGEST_CONFIG";

/// Supplies the model API key without writing it to the config file
const ENV_MODEL_KEY: &str = "INBOX_DIGEST_MODEL_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Account used to prefill the connect form
    #[serde(default)]
    pub account: Option<AccountConfig>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub email: String,
    /// Login name when it differs from the address
    #[serde(default)]
    pub username: Option<String>,
    pub imap: ImapConfig,
}

impl AccountConfig {
    /// Get the IMAP login name (defaults to the email address)
    pub fn login(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImapConfig {
    pub server: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    /// Number of most recent messages digested per refresh
    #[serde(default = "default_fetch_limit")]
    pub limit: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mailbox: default_mailbox(),
            limit: default_fetch_limit(),
        }
    }
}

/// Which inference API the summarizer talks to
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerBackend {
    /// Hugging Face style `{"inputs": ..}` summarization endpoint
    #[default]
    HuggingFace,
    /// OpenAI-compatible chat completions (OpenRouter, local servers)
    Chat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub backend: SummarizerBackend,
    /// Base URL; the model name is appended for the Hugging Face backend
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Longer bodies are truncated before inference
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Hard upper bound on the summary shown to the user
    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,
    #[serde(default = "default_min_length")]
    pub min_length: u32,
    #[serde(default = "default_max_length")]
    pub max_length: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            backend: SummarizerBackend::default(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            max_input_chars: default_max_input_chars(),
            max_summary_chars: default_max_summary_chars(),
            min_length: default_min_length(),
            max_length: default_max_length(),
        }
    }
}

impl SummarizerConfig {
    /// API key from config, falling back to the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| env::var(ENV_MODEL_KEY).ok().filter(|k| !k.is_empty()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Dates this many days ahead count as deadlines even without a cue word
    #[serde(default = "default_deadline_horizon_days")]
    pub deadline_horizon_days: i64,
    /// Disable to always flatten structured mail
    #[serde(default = "default_true")]
    pub newsletter_mode: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            deadline_horizon_days: default_deadline_horizon_days(),
            newsletter_mode: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Open the dashboard in the default browser on startup
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_server_port(),
            open_browser: true,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.bind, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped with their digests
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_imap_port() -> u16 {
    DEFAULT_IMAP_PORT
}

fn default_true() -> bool {
    true
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

fn default_fetch_limit() -> usize {
    20
}

fn default_endpoint() -> String {
    "https://router.huggingface.co/hf-inference/models".to_string()
}

fn default_model() -> String {
    "sshleifer/distilbart-cnn-12-6".to_string()
}

fn default_max_input_chars() -> usize {
    4000
}

fn default_max_summary_chars() -> usize {
    600
}

fn default_min_length() -> u32 {
    50
}

fn default_max_length() -> u32 {
    150
}

fn default_deadline_horizon_days() -> i64 {
    30
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8501
}

fn default_idle_timeout_secs() -> u64 {
    1800
}

fn default_max_sessions() -> u64 {
    64
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("inbox-digest");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = env::var(ENV_CONFIG_PATH) {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the config file, or defaults when none exists yet.
    ///
    /// The dashboard works without a file: credentials can be typed into the
    /// connect form.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(
                "No config file at {}, using defaults. Run 'inbox-digest setup' to create one.",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.fetch.limit == 0 {
            anyhow::bail!("fetch.limit must be at least 1");
        }
        if self.summarizer.max_summary_chars < 16 {
            anyhow::bail!("summarizer.max_summary_chars must be at least 16");
        }
        if self.summarizer.max_input_chars == 0 {
            anyhow::bail!("summarizer.max_input_chars must be at least 1");
        }
        if self.summarizer.min_length > self.summarizer.max_length {
            anyhow::bail!("summarizer.min_length cannot exceed summarizer.max_length");
        }
        if self.extraction.deadline_horizon_days < 0 {
            anyhow::bail!("extraction.deadline_horizon_days cannot be negative");
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(Self::config_dir()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [account]
            email = "me@example.com"

            [account.imap]
            server = "imap.example.com"

            [fetch]
            mailbox = "Newsletters"
            limit = 5

            [summarizer]
            backend = "chat"
            endpoint = "https://openrouter.ai/api/v1/chat/completions"
            model = "anthropic/claude-3-haiku"
            max_summary_chars = 300

            [extraction]
            deadline_horizon_days = 14
            newsletter_mode = false

            [server]
            port = 9000
            open_browser = false
        "#;

        let config = Config::parse(toml).unwrap();
        let account = config.account.as_ref().unwrap();
        assert_eq!(account.email, "me@example.com");
        assert_eq!(account.imap.port, 993);
        assert_eq!(account.login(), "me@example.com");
        assert_eq!(config.fetch.mailbox, "Newsletters");
        assert_eq!(config.fetch.limit, 5);
        assert_eq!(config.summarizer.backend, SummarizerBackend::Chat);
        assert_eq!(config.summarizer.max_summary_chars, 300);
        assert_eq!(config.summarizer.max_input_chars, 4000);
        assert_eq!(config.extraction.deadline_horizon_days, 14);
        assert!(!config.extraction.newsletter_mode);
        assert_eq!(config.server.address(), "127.0.0.1:9000");
        assert!(!config.server.open_browser);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.account = Some(AccountConfig {
            email: "me@example.com".into(),
            username: Some("me".into()),
            imap: ImapConfig {
                server: "imap.example.com".into(),
                port: 1993,
            },
        });
        config.fetch.limit = 7;
        config.summarizer.backend = SummarizerBackend::Chat;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        let account = loaded.account.unwrap();
        assert_eq!(account.login(), "me");
        assert_eq!(account.imap.port, 1993);
        assert_eq!(loaded.fetch.limit, 7);
        assert_eq!(loaded.summarizer.backend, SummarizerBackend::Chat);
        assert_eq!(loaded.server.port, config.server.port);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.account.is_none());
        assert_eq!(config.fetch.limit, 20);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.account.is_none());
        assert_eq!(config.fetch.mailbox, "INBOX");
        assert_eq!(config.fetch.limit, 20);
        assert_eq!(config.summarizer.backend, SummarizerBackend::HuggingFace);
        assert_eq!(config.summarizer.model, "sshleifer/distilbart-cnn-12-6");
        assert_eq!(config.server.url(), "http://127.0.0.1:8501/");
        assert_eq!(config.session.idle_timeout_secs, 1800);
    }

    #[test]
    fn test_rejects_invalid_bounds() {
        assert!(Config::parse("[fetch]\nlimit = 0").is_err());
        assert!(Config::parse("[summarizer]\nmax_summary_chars = 3").is_err());
        assert!(Config::parse("[summarizer]\nmin_length = 200\nmax_length = 100").is_err());
    }

    #[test]
    fn test_username_overrides_login() {
        let toml = r#"
            [account]
            email = "me@example.com"
            username = "me"

            [account.imap]
            server = "imap.example.com"
            port = 1993
        "#;
        let config = Config::parse(toml).unwrap();
        let account = config.account.unwrap();
        assert_eq!(account.login(), "me");
        assert_eq!(account.imap.port, 1993);
    }

    #[test]
    fn test_save_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.fetch.limit = 7;

        let content = toml::to_string_pretty(&config).unwrap();
        fs::write(&path, content).unwrap();

        let loaded = Config::parse(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.fetch.limit, 7);
    }
}
