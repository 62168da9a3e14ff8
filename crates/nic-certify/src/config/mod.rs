use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080/api/v1";
const DEFAULT_SIGNATURE_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Distinguishes runtime behavior for different stages of the desk.
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

/// Top-level configuration for the reviewer desk.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub api: ApiConfig,
    pub review: ReviewConfig,
    pub session: SessionConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let base_url = env::var("APP_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }

        let timeout_secs = parse_var("APP_API_TIMEOUT_SECS", 30)?;
        let refresh_delay_ms = parse_var("APP_REFRESH_DELAY_MS", 1500)?;
        let signature_max_bytes =
            parse_var("APP_SIGNATURE_MAX_BYTES", DEFAULT_SIGNATURE_MAX_BYTES)?;
        let page_size = parse_var("APP_PAGE_SIZE", 10usize)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "APP_PAGE_SIZE",
            });
        }

        let session_file = env::var("APP_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".nic-certify/session.json"));

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            api: ApiConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            review: ReviewConfig {
                refresh_delay: Duration::from_millis(refresh_delay_ms),
                signature_max_bytes,
                page_size,
            },
            session: SessionConfig { session_file },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

/// Where the registry API lives and how long a single request may take.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// Knobs for the review submission flow and the queue screens.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub refresh_delay: Duration,
    pub signature_max_bytes: u64,
    pub page_size: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            refresh_delay: Duration::from_millis(1500),
            signature_max_bytes: DEFAULT_SIGNATURE_MAX_BYTES,
            page_size: 10,
        }
    }
}

/// Location of the persisted reviewer session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub session_file: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidBaseUrl(String),
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBaseUrl(value) => write!(
                f,
                "APP_API_BASE_URL must be an http(s) URL, found '{}'",
                value
            ),
            ConfigError::InvalidNumber { key } => {
                write!(f, "{} must be a valid non-negative number", key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
