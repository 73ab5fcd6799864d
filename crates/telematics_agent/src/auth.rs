use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

/// OIDC token endpoint response; only the access token is consumed.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

/// Client-credentials client for the identity provider. Token
/// acquisition is a one-shot startup call; there is no refresh.
pub struct AuthClient {
    http: reqwest::Client,
    issuer: String,
    client_id: String,
    client_secret: String,
}

impl AuthClient {
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build auth HTTP client")?;
        Ok(Self {
            http,
            issuer: issuer.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    /// Obtain an access token. Any failure here is fatal to startup;
    /// the agent must not open a broker session without a credential.
    pub async fn authenticate(&self) -> Result<String> {
        let url = format!("{}/protocol/openid-connect/token", self.issuer);
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .context("token request failed")?
            .error_for_status()
            .context("token endpoint rejected credentials")?;

        let token: TokenResponse = response
            .json()
            .await
            .context("malformed token response")?;

        info!(client_id = %self.client_id, expires_in = token.expires_in, "authenticated");
        Ok(token.access_token)
    }
}
