use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_grace_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub query_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Which store implementation backs the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Serve from the in-memory stores when the database cannot be opened.
    pub fallback_to_memory: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing key. Has no default; set it via `BOOKLY__AUTH__JWT_SECRET`
    /// or a config file.
    #[serde(default)]
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub min_password_len: usize,
}

/// Shortest signing secret accepted for HS256 tokens.
pub const MIN_JWT_SECRET_LEN: usize = 32;
/// Longest token lifetime accepted: 30 days.
pub const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

// Secrets copied from docs or samples; signing with them makes tokens forgeable.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "changeme", "change-me-before-deploying", "secret"];

#[derive(Debug, Clone, Deserialize)]
pub struct PurgeConfig {
    /// Number of delete signals that must accumulate before a purge runs.
    pub capacity: usize,
    pub interval_secs: u64,
}

impl PurgeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub purge: PurgeConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: bookly.toml (in CWD)
        .add_source(::config::File::with_name("bookly").required(false));

    if let Ok(custom_path) = std::env::var("BOOKLY_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("BOOKLY").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }
    if cfg.server.request_timeout_secs == 0 {
        return Err(anyhow::anyhow!("server.request_timeout_secs must be > 0"));
    }

    // Database
    if cfg.database.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }
    if cfg.database.query_timeout_secs == 0 {
        return Err(anyhow::anyhow!("database.query_timeout_secs must be > 0"));
    }

    // Auth
    let secret = cfg.auth.jwt_secret.trim();
    if secret.is_empty() {
        return Err(anyhow::anyhow!(
            "auth.jwt_secret is not set (use BOOKLY__AUTH__JWT_SECRET or a config file)"
        ));
    }
    if PLACEHOLDER_SECRETS.iter().any(|p| secret.eq_ignore_ascii_case(p)) {
        return Err(anyhow::anyhow!("auth.jwt_secret is a placeholder value; generate one with: openssl rand -base64 32"));
    }
    let secret_len = secret.chars().count();
    if secret_len < MIN_JWT_SECRET_LEN {
        return Err(anyhow::anyhow!(
            "auth.jwt_secret must be at least {} characters (got {})",
            MIN_JWT_SECRET_LEN,
            secret_len
        ));
    }
    if cfg.auth.token_ttl_secs == 0 || cfg.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
        return Err(anyhow::anyhow!(
            "auth.token_ttl_secs must be in 1..={} (got {})",
            MAX_TOKEN_TTL_SECS,
            cfg.auth.token_ttl_secs
        ));
    }
    if cfg.auth.min_password_len == 0 {
        return Err(anyhow::anyhow!("auth.min_password_len must be > 0"));
    }

    // Purge
    if cfg.purge.capacity == 0 {
        return Err(anyhow::anyhow!("purge.capacity must be > 0"));
    }
    if cfg.purge.interval_secs == 0 {
        return Err(anyhow::anyhow!("purge.interval_secs must be > 0"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        if path.starts_with(':') {
            // in-memory URLs such as sqlite://:memory: have no parent directory
            return Ok(());
        }
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
