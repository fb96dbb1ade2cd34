//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use aetheria_core::VARIATION_COUNT;

const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:3000/objects";

/// Largest accepted `VARIATION_COUNT`; each variation is one model call.
const MAX_VARIATION_COUNT: usize = 8;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum file size per upload in MB (default: 25)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 120, model calls are slow)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Allow the mock model when no API key is configured
    /// (default: false, enable with ALLOW_MOCK_MODEL=true)
    pub allow_mock_model: bool,
    /// Root directory of the filesystem object store
    pub storage_dir: PathBuf,
    /// Base URL under which stored objects are served
    pub public_base_url: String,
    /// Postgres connection string; the in-memory document store is used when unset
    pub database_url: Option<String>,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Database connection pool minimum connections (default: 2)
    pub database_min_connections: u32,
    /// Number of model calls per variation request (default: 3)
    pub variation_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 120,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            allow_mock_model: true, // Enabled by default for tests; from_env() defaults to false
            storage_dir: PathBuf::from("./data/objects"),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            database_url: None,
            database_max_connections: 20,
            database_min_connections: 2,
            variation_count: VARIATION_COUNT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|h| h.parse::<std::net::Ipv4Addr>().ok())
            .map(|ip| ip.octets())
            .unwrap_or([127, 0, 0, 1]);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let body_limit_mb = std::env::var("BODY_LIMIT_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);

        let max_file_size_mb = std::env::var("MAX_FILE_SIZE_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(25);

        let timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        let rate_limit_per_sec = std::env::var("RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let rate_limit_burst = std::env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let allow_mock_model = std::env::var("ALLOW_MOCK_MODEL")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let storage_dir = std::env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/objects"));

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|raw| validated_base_url(&raw))
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let database_min_connections = std::env::var("DATABASE_MIN_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let variation_count = std::env::var("VARIATION_COUNT")
            .ok()
            .map(|raw| bounded_variation_count(&raw))
            .unwrap_or(VARIATION_COUNT);

        Self {
            port,
            host,
            allowed_origins,
            body_limit_mb,
            max_file_size_mb,
            timeout_secs,
            rate_limit_enabled,
            rate_limit_per_sec,
            rate_limit_burst,
            allow_mock_model,
            storage_dir,
            public_base_url,
            database_url,
            database_max_connections,
            database_min_connections,
            variation_count,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

/// Accept an absolute http(s) URL, trimming any trailing slash.
fn validated_base_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            raw.trim_end_matches('/').to_string()
        }
        _ => {
            tracing::warn!(
                "Ignoring invalid PUBLIC_BASE_URL {:?}, using {}",
                raw,
                DEFAULT_PUBLIC_BASE_URL
            );
            DEFAULT_PUBLIC_BASE_URL.to_string()
        }
    }
}

/// Parse a variation count, clamping it to `1..=MAX_VARIATION_COUNT`.
fn bounded_variation_count(raw: &str) -> usize {
    match raw.trim().parse::<usize>() {
        Ok(count) if (1..=MAX_VARIATION_COUNT).contains(&count) => count,
        Ok(count) => {
            let clamped = count.clamp(1, MAX_VARIATION_COUNT);
            tracing::warn!(
                "VARIATION_COUNT {} is out of range, using {}",
                count,
                clamped
            );
            clamped
        }
        Err(_) => {
            tracing::warn!(
                "Ignoring invalid VARIATION_COUNT {:?}, using {}",
                raw,
                VARIATION_COUNT
            );
            VARIATION_COUNT
        }
    }
}
