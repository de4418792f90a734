//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Payment gateway configuration.
    pub gateway: GatewayConfig,
    /// Public URLs used to build gateway redirects and status pages.
    pub app: PublicUrlsConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
///
/// Tokens are issued by the external auth service; this service only
/// validates them with the shared secret.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key shared with the token issuer.
    pub secret: String,
}

/// Payment gateway (Flutterwave) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway API.
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,
    /// Secret API key used as bearer token.
    pub secret_key: String,
    /// Shared secret expected in the `verif-hash` webhook header.
    ///
    /// When unset, webhook signatures are not checked.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// Timeout for a single gateway request, in seconds.
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
    /// Settlement currency (ISO 4217).
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_gateway_base_url() -> String {
    "https://api.flutterwave.com".to_string()
}

fn default_gateway_timeout() -> u64 {
    30
}

fn default_currency() -> String {
    "NGN".to_string()
}

/// Public URLs of this service and the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct PublicUrlsConfig {
    /// Externally reachable base URL of this API (used for callback URLs).
    pub public_url: String,
    /// Base URL of the storefront, where status pages live.
    pub frontend_url: String,
}

impl PublicUrlsConfig {
    /// Browser redirect target handed to the gateway.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!(
            "{}/api/v1/payments/callback",
            self.public_url.trim_end_matches('/')
        )
    }

    /// Server-to-server notification target.
    #[must_use]
    pub fn webhook_url(&self) -> String {
        format!(
            "{}/api/v1/webhooks/flutterwave",
            self.public_url.trim_end_matches('/')
        )
    }

    /// Builds an absolute storefront URL for `path`.
    #[must_use]
    pub fn frontend(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.frontend_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("STORELEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
