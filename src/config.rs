use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde(default)]
    pub seed_sample_regions: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Directory uploads are written to and served from under `/images`.
    pub root_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Lower-case extensions including the leading dot.
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: i64,
    /// Upper bound applied to `pageSize`. Unset means callers may ask for everything.
    #[serde(default)]
    pub max_page_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    pub reader_token: Option<String>,
    pub writer_token: Option<String>,
}

impl AuthConfig {
    pub fn is_enabled(&self) -> bool {
        let set = |t: &Option<String>| t.as_deref().map(|s| !s.is_empty()).unwrap_or(false);
        set(&self.reader_token) || set(&self.writer_token)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub csp: Option<String>,
}

/// Per-IP request budget applied to every route.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
    /// Reverse proxies allowed to name the client via `X-Forwarded-For` / `X-Real-IP`.
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: 1000, window_seconds: 60, trusted_proxies: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub images: ImagesConfig,
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub security: Option<SecurityConfig>,
}

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
            .and_then(|cfg| cfg.try_deserialize::<AppConfig>())
        {
            Ok(app_cfg) => app_cfg,
            Err(e) => {
                eprintln!("FATAL: Failed to load embedded default config: {}", e);
                panic!("Failed to load embedded default config: {}", e);
            }
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: nzwalks.toml (in CWD)
        .add_source(::config::File::with_name("nzwalks").required(false));

    if let Ok(custom_path) = std::env::var("NZWALKS_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("NZWALKS").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    if cfg.database.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }

    if cfg.images.root_dir.as_os_str().is_empty() {
        return Err(anyhow::anyhow!("images.root_dir must not be empty"));
    }
    if cfg.images.max_upload_bytes == 0 {
        return Err(anyhow::anyhow!("images.max_upload_bytes must be > 0"));
    }
    if let Some(bad) = cfg.images.allowed_extensions.iter().find(|e| !e.starts_with('.')) {
        return Err(anyhow::anyhow!("images.allowed_extensions entries must start with '.', got {:?}", bad));
    }

    if cfg.pagination.default_page_size <= 0 {
        return Err(anyhow::anyhow!("pagination.default_page_size must be > 0"));
    }
    if let Some(max) = cfg.pagination.max_page_size {
        if max < cfg.pagination.default_page_size {
            return Err(anyhow::anyhow!(
                "pagination.max_page_size ({}) must be >= default_page_size ({})",
                max,
                cfg.pagination.default_page_size
            ));
        }
    }

    if cfg.rate_limit.max_requests == 0 || cfg.rate_limit.window_seconds == 0 {
        return Err(anyhow::anyhow!("rate_limit.max_requests and rate_limit.window_seconds must be > 0"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        if path.starts_with(':') {
            // sqlite://:memory: and friends have no parent directory
            return Ok(());
        }
        // On Windows, handle URLs like sqlite:///C:/... by stripping the leading '/'
        #[cfg(windows)]
        let path = {
            let bytes = path.as_bytes();
            if bytes.len() >= 3 && bytes[0] == b'/' && bytes[2] == b':' && bytes[1].is_ascii_alphabetic() {
                &path[1..]
            } else {
                path
            }
        };
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
