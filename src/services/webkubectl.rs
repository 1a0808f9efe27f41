use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Exchanges cluster credentials for a short-lived web console token.
#[async_trait]
pub trait ConnectTokenExchange: Send + Sync {
    async fn get_connect_token(
        &self,
        name: &str,
        api_server: &str,
        access_token: &str,
    ) -> Result<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KubeTokenRequest<'a> {
    name: &'a str,
    api_server: &'a str,
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct KubeTokenResponse {
    success: bool,
    #[serde(default)]
    token: String,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the webkubectl console service.
#[derive(Clone)]
pub struct WebkubectlClient {
    client: Client,
    token_url: String,
}

impl WebkubectlClient {
    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token_url: token_url.into(),
        }
    }
}

#[async_trait]
impl ConnectTokenExchange for WebkubectlClient {
    async fn get_connect_token(
        &self,
        name: &str,
        api_server: &str,
        access_token: &str,
    ) -> Result<String> {
        let body = KubeTokenRequest {
            name,
            api_server,
            token: access_token,
        };

        let resp = self.client.post(&self.token_url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(ClusterError::exchange(format!(
                "webkubectl returned HTTP {}",
                resp.status()
            )));
        }

        let token: KubeTokenResponse = resp.json().await?;
        if !token.success {
            return Err(ClusterError::exchange(
                token
                    .message
                    .unwrap_or_else(|| "webkubectl rejected the token request".to_string()),
            ));
        }

        Ok(token.token)
    }
}
