use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::models::DEFAULT_API_SERVER_PORT;

/// How list, page and console-token reads react to collaborator failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Swallow the failure and return an empty or partial result.
    #[default]
    BestEffort,
    /// Surface every failure to the caller.
    Strict,
}

impl ReadPolicy {
    pub fn is_best_effort(&self) -> bool {
        matches!(self, ReadPolicy::BestEffort)
    }
}

impl FromStr for ReadPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best_effort" | "best-effort" => Ok(ReadPolicy::BestEffort),
            "strict" => Ok(ReadPolicy::Strict),
            other => Err(anyhow!("unknown read policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server_address: String,
    pub redis_url: String,
    pub webkubectl_url: String,
    pub default_api_server_port: u16,
    pub read_policy: ReadPolicy,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "0.0.0.0:3001".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            webkubectl_url: "http://localhost:8080".to_string(),
            default_api_server_port: DEFAULT_API_SERVER_PORT,
            read_policy: ReadPolicy::BestEffort,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // .env is only read when explicitly requested
        if env::var("USE_DOTENV").ok().as_deref() == Some("true") {
            dotenv::dotenv().ok();
        }

        let defaults = Config::default();

        let default_api_server_port = match env::var("DEFAULT_API_SERVER_PORT") {
            Ok(port) => port
                .parse::<u16>()
                .with_context(|| format!("Invalid DEFAULT_API_SERVER_PORT '{}'", port))?,
            Err(_) => defaults.default_api_server_port,
        };

        let read_policy = match env::var("CLUSTER_READ_POLICY") {
            Ok(policy) => policy.parse::<ReadPolicy>().context("Invalid CLUSTER_READ_POLICY")?,
            Err(_) => defaults.read_policy,
        };

        let config = Config {
            server_address: env::var("SERVER_ADDRESS").unwrap_or(defaults.server_address),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            webkubectl_url: env::var("WEBKUBECTL_URL").unwrap_or(defaults.webkubectl_url),
            default_api_server_port,
            read_policy,
            log_level: env::var("RUST_LOG").unwrap_or(defaults.log_level),
        };

        Ok(config)
    }

    pub fn webkubectl_token_url(&self) -> String {
        format!("{}/api/kube-token", self.webkubectl_url.trim_end_matches('/'))
    }
}
