//! Configuration module
//!
//! Environment-driven configuration for the connector: database connection,
//! collaborator base URLs, the local scratch directory, and YouTube OAuth
//! client settings. Loaded once at startup via [`Config::from_env`].

use std::env;

const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Top-level configuration, built once at process startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub asset_catalog_base_url: String,
    pub thumbnail_store_base_url: String,
    pub work_dir: String,
    pub test_mode: bool,
    pub youtube_client_id: Option<String>,
    pub youtube_client_secret: Option<String>,
    pub youtube_token_uri: String,
    pub youtube_data_api_base_url: String,
    pub youtube_partner_api_base_url: String,
    pub facebook_graph_base_url: String,
    pub youtube_mcn_service_account_key_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = Self {
            server_port: env::var("CONNECTOR_SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            database_url: env::var("CONNECTOR_DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/connector".to_string()),
            db_max_connections: env::var("CONNECTOR_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            asset_catalog_base_url: env::var("ASSET_CATALOG_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9100".to_string()),
            thumbnail_store_base_url: env::var("THUMBNAIL_STORE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9101".to_string()),
            work_dir: env::var("CONNECTOR_WORK_DIR").unwrap_or_else(|_| "/tmp/connector".into()),
            test_mode: env::var("CONNECTOR_TEST_MODE")
                .ok()
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            youtube_client_id: env::var("YOUTUBE_CLIENT_ID").ok(),
            youtube_client_secret: env::var("YOUTUBE_CLIENT_SECRET").ok(),
            youtube_token_uri: env::var("YOUTUBE_TOKEN_URI")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            youtube_data_api_base_url: env::var("YOUTUBE_DATA_API_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3".to_string()),
            youtube_partner_api_base_url: env::var("YOUTUBE_PARTNER_API_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/youtube/partner/v1".to_string()),
            facebook_graph_base_url: env::var("FACEBOOK_GRAPH_BASE_URL")
                .unwrap_or_else(|_| "https://graph.facebook.com/v19.0".to_string()),
            youtube_mcn_service_account_key_path: env::var(
                "YOUTUBE_MCN_SERVICE_ACCOUNT_KEY_PATH",
            )
            .ok(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database_url.is_empty() {
            anyhow::bail!("CONNECTOR_DATABASE_URL must not be empty");
        }
        if self.work_dir.is_empty() {
            anyhow::bail!("CONNECTOR_WORK_DIR must not be empty");
        }
        if !self.test_mode && (self.youtube_client_id.is_none() || self.youtube_client_secret.is_none())
        {
            tracing::warn!(
                "YOUTUBE_CLIENT_ID/YOUTUBE_CLIENT_SECRET not set outside test mode; YouTube Direct token exchange will fail"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_database_url() {
        let mut config = test_config();
        config.database_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_test_mode_without_youtube_credentials() {
        let mut config = test_config();
        config.test_mode = true;
        config.youtube_client_id = None;
        config.youtube_client_secret = None;
        assert!(config.validate().is_ok());
    }

    fn test_config() -> Config {
        Config {
            server_port: DEFAULT_SERVER_PORT,
            database_url: "postgres://localhost/connector".into(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            asset_catalog_base_url: "http://localhost:9100".into(),
            thumbnail_store_base_url: "http://localhost:9101".into(),
            work_dir: "/tmp/connector".into(),
            test_mode: false,
            youtube_client_id: Some("id".into()),
            youtube_client_secret: Some("secret".into()),
            youtube_token_uri: "https://oauth2.googleapis.com/token".into(),
            youtube_data_api_base_url: "https://www.googleapis.com/youtube/v3".into(),
            youtube_partner_api_base_url: "https://www.googleapis.com/youtube/partner/v1".into(),
            facebook_graph_base_url: "https://graph.facebook.com/v19.0".into(),
            youtube_mcn_service_account_key_path: None,
        }
    }
}
