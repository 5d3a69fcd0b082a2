//! Credential sources: an opaque seam for acquiring the access token an
//! adapter authenticates with. The concrete OAuth handshakes (service
//! account JWT signing for the MCN channel) are out of scope for this
//! system and are injected by the embedding application.

use async_trait::async_trait;
use connector_core::{ConnectorError, ConnectorResult, MappingRecord};
use serde::Deserialize;

#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn access_token(&self, mapping: &MappingRecord) -> ConnectorResult<String>;
}

/// Facebook's page access token is stored directly as `mapping.target_id`.
pub struct FacebookCredentialSource;

#[async_trait]
impl CredentialSource for FacebookCredentialSource {
    async fn access_token(&self, mapping: &MappingRecord) -> ConnectorResult<String> {
        Ok(mapping.target_id.clone())
    }
}

/// YouTube Direct exchanges the per-mapping refresh token (`target_id`) for
/// a short-lived access token against the configured token endpoint. No
/// caching: callers get a fresh token for every adapter call.
pub struct YoutubeDirectCredentialSource {
    client: reqwest::Client,
    token_uri: String,
    client_id: String,
    client_secret: String,
}

impl YoutubeDirectCredentialSource {
    pub fn new(
        client: reqwest::Client,
        token_uri: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_uri: token_uri.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[async_trait]
impl CredentialSource for YoutubeDirectCredentialSource {
    async fn access_token(&self, mapping: &MappingRecord) -> ConnectorResult<String> {
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", mapping.target_id.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConnectorError::PermanentRemote(format!(
                "token refresh failed with status {}",
                response.status()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map(|body| body.access_token)
            .map_err(|e| ConnectorError::PermanentRemote(format!("malformed token response: {e}")))
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    pub struct StaticCredentialSource(pub String);

    #[async_trait]
    impl CredentialSource for StaticCredentialSource {
        async fn access_token(&self, _mapping: &MappingRecord) -> ConnectorResult<String> {
            Ok(self.0.clone())
        }
    }
}
