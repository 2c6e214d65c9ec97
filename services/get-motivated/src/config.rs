//! Configuration types and loading
//!
//! Config path precedence: `--config` > `CONFIG_PATH` env var > default.
//! The Reddit password and client secret are loaded from env vars or
//! `*_file` paths, never stored in the TOML directly.

use common::Secret;
use reddit_auth::{API_BASE, Credentials, DEFAULT_SUBREDDIT, DEFAULT_USER_AGENT, TOKEN_ENDPOINT};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::poller::{DEFAULT_MAX_INTERVAL_SECS, DEFAULT_MIN_INTERVAL_SECS, PollInterval};

const PASSWORD_ENV: &str = "REDDIT_PASSWORD";
const CLIENT_SECRET_ENV: &str = "REDDIT_CLIENT_SECRET";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub reddit: RedditConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

/// Account, app credentials, and endpoints
#[derive(Debug, Deserialize)]
pub struct RedditConfig {
    pub username: String,
    pub client_id: String,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// File holding the password (alternative to REDDIT_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    /// File holding the client secret (alternative to REDDIT_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
}

/// Local file locations
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub token_cache: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

/// Bounds for the random wait between posts
#[derive(Debug, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_min_interval")]
    pub min_interval_secs: u64,
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
            max_interval_secs: DEFAULT_MAX_INTERVAL_SECS,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> PollInterval {
        PollInterval::new(self.min_interval_secs, self.max_interval_secs)
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

fn default_token_url() -> String {
    TOKEN_ENDPOINT.into()
}

fn default_api_base() -> String {
    API_BASE.into()
}

fn default_subreddit() -> String {
    DEFAULT_SUBREDDIT.into()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("./get_motivated.log")
}

fn default_min_interval() -> u64 {
    DEFAULT_MIN_INTERVAL_SECS
}

fn default_max_interval() -> u64 {
    DEFAULT_MAX_INTERVAL_SECS
}

impl Config {
    /// Load configuration from a TOML file, then resolve secrets and `~` paths.
    ///
    /// Secret resolution order, for both the password and the client secret:
    /// 1. env var (`REDDIT_PASSWORD` / `REDDIT_CLIENT_SECRET`)
    /// 2. `*_file` path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        for (name, value) in [
            ("reddit.username", &config.reddit.username),
            ("reddit.client_id", &config.reddit.client_id),
            ("reddit.subreddit", &config.reddit.subreddit),
        ] {
            if value.trim().is_empty() {
                return Err(common::Error::Config(format!("{name} must not be empty")));
            }
        }

        for (name, url) in [
            ("token_url", &config.reddit.token_url),
            ("api_base", &config.reddit.api_base),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if config.poll.min_interval_secs == 0 {
            return Err(common::Error::Config(
                "min_interval_secs must be greater than 0".into(),
            ));
        }
        if config.poll.min_interval_secs > config.poll.max_interval_secs {
            return Err(common::Error::Config(format!(
                "min_interval_secs ({}) must not exceed max_interval_secs ({})",
                config.poll.min_interval_secs, config.poll.max_interval_secs
            )));
        }

        config.reddit.password = resolve_secret(
            PASSWORD_ENV,
            config.reddit.password_file.as_deref(),
            "password_file",
        )?;
        config.reddit.client_secret = resolve_secret(
            CLIENT_SECRET_ENV,
            config.reddit.client_secret_file.as_deref(),
            "client_secret_file",
        )?;

        if config.reddit.password.is_none() {
            return Err(common::Error::Config(format!(
                "reddit password not set: export {PASSWORD_ENV} or set reddit.password_file"
            )));
        }
        if config.reddit.client_secret.is_none() {
            return Err(common::Error::Config(format!(
                "reddit client secret not set: export {CLIENT_SECRET_ENV} or set reddit.client_secret_file"
            )));
        }

        config.app.token_cache = expand_home(&config.app.token_cache);
        config.app.log_file = expand_home(&config.app.log_file);

        Ok(config)
    }

    /// Credential set for the token provider.
    pub fn credentials(&self) -> common::Result<Credentials> {
        let missing = |what: &str| common::Error::Config(format!("reddit {what} not loaded"));
        let password = self.reddit.password.as_ref().ok_or_else(|| missing("password"))?;
        let client_secret = self
            .reddit
            .client_secret
            .as_ref()
            .ok_or_else(|| missing("client secret"))?;

        Ok(Credentials {
            username: self.reddit.username.clone(),
            password: password.clone(),
            client_id: self.reddit.client_id.clone(),
            client_secret: client_secret.clone(),
        })
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("get-motivated.toml")
    }
}

/// Env var wins over file. Whitespace-only values count as unset.
fn resolve_secret(
    env_var: &str,
    file: Option<&Path>,
    field: &str,
) -> common::Result<Option<Secret<String>>> {
    if let Ok(value) = std::env::var(env_var) {
        let value = value.trim().to_owned();
        if !value.is_empty() {
            return Ok(Some(Secret::new(value)));
        }
    }

    let Some(file) = file else {
        return Ok(None);
    };
    let value = std::fs::read_to_string(file).map_err(|e| {
        common::Error::Config(format!("failed to read {field} {}: {e}", file.display()))
    })?;
    let value = value.trim().to_owned();
    Ok((!value.is_empty()).then(|| Secret::new(value)))
}

/// Replace a leading `~` component with the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
