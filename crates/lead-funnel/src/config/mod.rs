use chrono::NaiveDate;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_EVENT_DATE: &str = "2025-10-04";

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

/// Top-level configuration for the funnel service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub funnel: FunnelConfig,
    pub admin: AdminConfig,
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

        let store = StoreConfig::from_env()?;
        let funnel = FunnelConfig::from_env()?;
        let admin = AdminConfig {
            token: non_empty_var("ADMIN_TOKEN"),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            store,
            funnel,
            admin,
        })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Connection details for the hosted record store.
///
/// When `url` is absent the service falls back to the in-memory store, which is only
/// suitable for local development and demos.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = non_empty_var("STORE_URL");
        let api_key = non_empty_var("STORE_API_KEY");
        if url.is_some() && api_key.is_none() {
            return Err(ConfigError::MissingStoreKey);
        }

        let timeout_secs = env::var("STORE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(Self {
            url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Event and collection settings shared by the registration flows.
#[derive(Debug, Clone)]
pub struct FunnelConfig {
    pub event_date: NaiveDate,
    pub masterclass_collection: String,
    pub leads_collection: String,
    pub beta_collection: String,
    pub session_ttl: chrono::Duration,
}

impl FunnelConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_date = env::var("EVENT_DATE").unwrap_or_else(|_| DEFAULT_EVENT_DATE.to_string());
        let event_date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d")
            .map_err(|source| ConfigError::InvalidEventDate { source })?;

        let ttl_minutes = env::var("SESSION_TTL_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidSessionTtl)?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::InvalidSessionTtl);
        }

        Ok(Self {
            event_date,
            masterclass_collection: non_empty_var("MASTERCLASS_COLLECTION")
                .unwrap_or_else(|| "masterclass_registrations".to_string()),
            leads_collection: non_empty_var("LEADS_COLLECTION")
                .unwrap_or_else(|| "leads".to_string()),
            beta_collection: non_empty_var("BETA_COLLECTION")
                .unwrap_or_else(|| "beta_testers".to_string()),
            session_ttl: chrono::Duration::minutes(ttl_minutes),
        })
    }
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            event_date: NaiveDate::from_ymd_opt(2025, 10, 4).unwrap_or_default(),
            masterclass_collection: "masterclass_registrations".to_string(),
            leads_collection: "leads".to_string(),
            beta_collection: "beta_testers".to_string(),
            session_ttl: chrono::Duration::minutes(60),
        }
    }
}

/// Admin reporting access; reporting routes stay unmounted without a token.
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    pub token: Option<String>,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    MissingStoreKey,
    InvalidEventDate { source: chrono::ParseError },
    InvalidSessionTtl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "STORE_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::MissingStoreKey => {
                write!(f, "STORE_API_KEY is required when STORE_URL is set")
            }
            ConfigError::InvalidEventDate { .. } => write!(f, "EVENT_DATE must be YYYY-MM-DD"),
            ConfigError::InvalidSessionTtl => {
                write!(f, "SESSION_TTL_MINUTES must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidEventDate { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::MissingStoreKey
            | ConfigError::InvalidSessionTtl => None,
        }
    }
}
