use cinema_core::messages::Locale;
use cinema_shared::Theme;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub identity: IdentityConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub booking: BookingConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub resiliency: ResiliencyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 { 5000 }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityProviderKind {
    IdentityToolkit,
    Backend,
    Mock,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    pub provider: IdentityProviderKind,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_identity_url")]
    pub base_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

fn default_identity_url() -> String { "https://identitytoolkit.googleapis.com/v1".into() }
fn default_token_url() -> String { "https://securetoken.googleapis.com/v1/token".into() }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_seconds: u64,
    /// Ask the backend for the user's role after every sign-in.
    #[serde(default = "default_true")]
    pub resolve_roles: bool,
}

fn default_true() -> bool { true }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub redis_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    pub payment_delay_ms: u64,
    #[serde(default = "default_max_tickets")]
    pub max_tickets: u8,
}

fn default_max_tickets() -> u8 { 10 }

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UiConfig {
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub default_theme: Theme,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResiliencyConfig {
    pub failure_threshold: u32,
    pub reset_timeout_seconds: u64,
}

impl Default for ResiliencyConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_seconds: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `CINEMA__BACKEND__BASE_URL=http://localhost:8080/api`
            .add_source(config::Environment::with_prefix("CINEMA").prefix_separator("__").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let raw = r#"
            [server]
            port = 3000
            [backend]
            base_url = "http://localhost:8080/api"
            [identity]
            provider = "mock"
            [auth]
            jwt_secret = "secret"
            session_ttl_seconds = 3600
            [storage]
            backend = "memory"
            [booking]
            payment_delay_ms = 2000
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.identity.provider, IdentityProviderKind::Mock);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.backend.timeout_ms, 5000);
        assert_eq!(config.booking.max_tickets, 10);
        assert!(config.auth.resolve_roles);
        assert_eq!(config.ui.locale, Locale::Es);
        assert_eq!(config.ui.default_theme, Theme::Light);
        assert_eq!(config.resiliency.failure_threshold, 5);
    }
}
