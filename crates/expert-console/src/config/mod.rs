use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub backend: BackendConfig,
    pub review: ReviewConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let timeout_secs = match first_present(&["UPSTREAM_TIMEOUT_SECS"]) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout { value: raw })?,
            None => 10,
        };

        let backend = BackendConfig {
            url: first_present(&["SUPABASE_URL", "NEXT_SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]),
            service_key: first_present(&[
                "SUPABASE_SERVICE_ROLE_KEY",
                "NEXT_SUPABASE_SERVICE_ROLE_KEY",
                "NEXT_PUBLIC_SUPABASE_SERVICE_ROLE_KEY",
            ]),
            requests_table: first_present(&["EXPERT_REQUESTS_TABLE"])
                .unwrap_or_else(|| "expert_requests".to_string()),
            dev_accounts_table: first_present(&["DEV_ACCOUNT_TABLE"])
                .unwrap_or_else(|| "dev_account".to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        let review = ReviewConfig {
            common_account: first_present(&["COMMON_MAIL_ADDRESS", "NEXT_COMMON_MAIL_ADDRESS"]),
            direct_update_enabled: flag("DIRECT_UPDATE_ENABLED")?,
            authorized_update_enabled: flag("AUTHORIZED_UPDATE_ENABLED")?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            backend,
            review,
        })
    }
}

/// Returns the first non-blank value among `names`, trimmed.
fn first_present(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn flag(name: &'static str) -> Result<bool, ConfigError> {
    let Some(raw) = first_present(&[name]) else {
        return Ok(false);
    };

    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name, value: raw }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the persistent store and identity provider.
///
/// Both live behind the same base URL and privileged key. Missing values are
/// tolerated at load time so the server can still report health; callers that
/// need the backend go through [`BackendConfig::credentials`].
#[derive(Clone)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
    pub requests_table: String,
    pub dev_accounts_table: String,
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn credentials(&self) -> Result<BackendCredentials, ConfigError> {
        let url = self
            .url
            .clone()
            .ok_or(ConfigError::MissingSetting { name: "SUPABASE_URL" })?;
        let service_key = self.service_key.clone().ok_or(ConfigError::MissingSetting {
            name: "SUPABASE_SERVICE_ROLE_KEY",
        })?;

        Ok(BackendCredentials {
            url: url.trim_end_matches('/').to_string(),
            service_key,
        })
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("service_key", &self.service_key.as_ref().map(|_| "<redacted>"))
            .field("requests_table", &self.requests_table)
            .field("dev_accounts_table", &self.dev_accounts_table)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Validated endpoint and key.
#[derive(Clone)]
pub struct BackendCredentials {
    pub url: String,
    pub service_key: String,
}

impl fmt::Debug for BackendCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCredentials")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

/// Escalation policy and the switches for the two update paths.
#[derive(Debug, Clone, Default)]
pub struct ReviewConfig {
    pub common_account: Option<String>,
    pub direct_update_enabled: bool,
    pub authorized_update_enabled: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout { value: String },
    InvalidFlag { name: &'static str, value: String },
    MissingSetting { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout { value } => write!(
                f,
                "UPSTREAM_TIMEOUT_SECS must be a positive number of seconds, got '{value}'"
            ),
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false, got '{value}'")
            }
            ConfigError::MissingSetting { name } => write!(f, "{name} is not configured"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout { .. }
            | ConfigError::InvalidFlag { .. }
            | ConfigError::MissingSetting { .. } => None,
        }
    }
}
