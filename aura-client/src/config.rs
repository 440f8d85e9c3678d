use crate::{
    feed::{DEFAULT_FRESHNESS_SECS, DEFAULT_REFRESH_INTERVAL_SECS, FeedConfig},
    profile::DEFAULT_PROFILE_TTL_SECS,
};
use aura_common::{model::auth::LoginCredentials, util::PositiveDuration};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_STORE_PATH: &str = "aura-store.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("{key} must be greater than zero")]
    NonPositiveDuration { key: &'static str },
    #[error("BACKEND_URL must not be empty")]
    EmptyBackendUrl,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    backend_url: String,
    #[serde(default = "default_store_path")]
    store_path: PathBuf,
    #[serde(default = "default_freshness_secs")]
    feed_freshness_secs: u32,
    #[serde(default = "default_refresh_interval_secs")]
    feed_refresh_interval_secs: u32,
    #[serde(default = "default_profile_ttl_secs")]
    profile_ttl_secs: u32,
    aura_username: Option<String>,
    aura_password: Option<String>,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

fn default_freshness_secs() -> u32 {
    DEFAULT_FRESHNESS_SECS
}

fn default_refresh_interval_secs() -> u32 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_profile_ttl_secs() -> u32 {
    DEFAULT_PROFILE_TTL_SECS
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ClientConfig {
    /// Without trailing `/`.
    pub backend_url: String,
    pub store_path: PathBuf,
    pub feed: FeedConfig,
    pub refresh_interval: PositiveDuration,
    pub profile_ttl: PositiveDuration,
    pub credentials: Option<LoginCredentials>,
}

impl ClientConfig {
    /// Reads `.env` if there is one, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if e.not_found() {
                debug!("No .dotenv file found");
            } else {
                return Err(e.into());
            }
        }

        Self::from_env_iter(std::env::vars())
    }

    pub fn from_env_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Env>(vars)?.try_into()
    }
}

fn positive_secs(key: &'static str, secs: u32) -> Result<PositiveDuration, ConfigError> {
    PositiveDuration::from_secs(secs).ok_or(ConfigError::NonPositiveDuration { key })
}

impl TryFrom<Env> for ClientConfig {
    type Error = ConfigError;

    fn try_from(env: Env) -> Result<Self, Self::Error> {
        let backend_url = env.backend_url.trim().trim_end_matches('/').to_owned();
        if backend_url.is_empty() {
            return Err(ConfigError::EmptyBackendUrl);
        }

        let credentials = match (env.aura_username, env.aura_password) {
            (Some(username), Some(password)) => Some(LoginCredentials { username, password }),
            _ => None,
        };

        Ok(Self {
            backend_url,
            store_path: env.store_path,
            feed: FeedConfig {
                freshness: positive_secs("FEED_FRESHNESS_SECS", env.feed_freshness_secs)?,
            },
            refresh_interval: positive_secs(
                "FEED_REFRESH_INTERVAL_SECS",
                env.feed_refresh_interval_secs,
            )?,
            profile_ttl: positive_secs("PROFILE_TTL_SECS", env.profile_ttl_secs)?,
            credentials,
        })
    }
}
