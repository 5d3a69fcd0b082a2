//! Service-account `CredentialSource` for the YouTube MCN channel.
//!
//! `connector-platform` treats credential acquisition as opaque; the concrete
//! OAuth handshake is an application-level concern injected at construction
//! (see the teacher's `jwt_rs256` module for the RS256 + `reqwest` idiom this
//! follows, here used to sign outgoing JWTs rather than verify incoming
//! ones). The key file is parsed once, at startup, by this crate alone —
//! `connector-core` and `connector-platform` never see its contents.

use async_trait::async_trait;
use connector_core::{ConnectorError, ConnectorResult, MappingRecord};
use connector_platform::CredentialSource;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// The subset of a Google service-account JSON key file this crate reads.
#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Serialize)]
struct JwtAssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    exp: i64,
    iat: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// Signs a short-lived JWT assertion with the service account's private key
/// and exchanges it for an access token via the standard
/// `urn:ietf:params:oauth:grant-type:jwt-bearer` flow. Tokens are cached
/// until 60 seconds before expiry; `mapping` is ignored since the MCN
/// channel authenticates as a single content owner, not per-mapping.
pub struct ServiceAccountCredentialSource {
    client: reqwest::Client,
    client_email: String,
    encoding_key: EncodingKey,
    token_uri: String,
    scope: String,
    cache: RwLock<Option<CachedToken>>,
}

impl ServiceAccountCredentialSource {
    pub fn from_key_file(
        client: reqwest::Client,
        key_file_contents: &str,
        scope: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(key_file_contents)?;
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            client,
            client_email: key.client_email,
            encoding_key,
            token_uri: key.token_uri,
            scope: scope.into(),
            cache: RwLock::new(None),
        })
    }

    async fn fetch_token(&self) -> ConnectorResult<CachedToken> {
        let now = chrono::Utc::now();
        let claims = JwtAssertionClaims {
            iss: self.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.token_uri.clone(),
            exp: (now + chrono::Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| ConnectorError::PermanentRemote(format!("jwt signing failed: {e}")))?;

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ConnectorError::TransientRemote(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConnectorError::PermanentRemote(format!(
                "service account token exchange failed with status {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::PermanentRemote(format!("malformed token response: {e}")))?;

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: now + chrono::Duration::seconds(body.expires_in - 60),
        })
    }
}

#[async_trait]
impl CredentialSource for ServiceAccountCredentialSource {
    async fn access_token(&self, _mapping: &MappingRecord) -> ConnectorResult<String> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.expires_at > chrono::Utc::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.access_token.clone();
        *self.cache.write().await = Some(fresh);
        Ok(token)
    }
}
