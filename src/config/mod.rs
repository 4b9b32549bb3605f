//! Node Configuration
//!
//! Settings are layered with figment, later sources winning:
//!
//!   built-in defaults  <  postable.toml (or `--config <path>`)  <  POSTABLE_* env vars
//!
//! Keys map one to one: `broadcast = "..."` in the file, `POSTABLE_BROADCAST`
//! in the environment.

use crate::broadcast::types::{ClusterId, Credentials, PeerTarget};

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Deserializer, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "postable.toml";
pub const ENV_PREFIX: &str = "POSTABLE_";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `;`-separated peer base URIs. Empty disables the broadcast route.
    #[serde(default)]
    pub broadcast: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub auth_user: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub auth_pass: Option<String>,
    /// Identity reported in `X-Postable-Cluster-ID`. Random when unset.
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub cluster_id: Option<String>,
    /// Per-peer request timeout. No timeout when unset.
    #[serde(default)]
    pub broadcast_timeout_ms: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            broadcast: String::new(),
            auth_user: None,
            auth_pass: None,
            cluster_id: None,
            broadcast_timeout_ms: None,
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

// Env values arrive typed: `POSTABLE_AUTH_PASS=12345` is a number, not a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Flag(bool),
}

fn scalar_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.map(|scalar| match scalar {
        Scalar::Text(text) => text,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Flag(flag) => flag.to_string(),
    }))
}

impl BrokerConfig {
    /// The provider stack, exposed so callers can add their own layers.
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let file = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::new()
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::figment(config_path)
            .extract()
            .context("Failed to load postable configuration")
    }

    pub fn broadcast_targets(&self) -> Vec<PeerTarget> {
        PeerTarget::parse_list(&self.broadcast)
    }

    /// Basic auth is enforced only when both user and password are set.
    pub fn basic_auth(&self) -> Option<Credentials> {
        match (&self.auth_user, &self.auth_pass) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some(Credentials {
                username: user.clone(),
                password: pass.clone(),
            }),
            _ => None,
        }
    }

    pub fn resolve_cluster_id(&self) -> ClusterId {
        match self.cluster_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => ClusterId(id.to_string()),
            _ => ClusterId::new(),
        }
    }

    pub fn broadcast_timeout(&self) -> Option<Duration> {
        self.broadcast_timeout_ms.map(Duration::from_millis)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests;
