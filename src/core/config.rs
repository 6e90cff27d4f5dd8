//! # Configuration Module
//!
//! This module handles loading and validating the service configuration.
//!
//! ## Key Features
//! - YAML/JSON configuration parsing with serde
//! - Environment variable override support (`CLUB_<SECTION>_<FIELD>`)
//! - Validation that reports every problem at once
//!
//! The signing secret is read once at startup and handed to the token codec by value;
//! nothing in the running service can change it afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::core::error::{ClubError, ClubResult};

/// Minimum HS256 key length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Routes reachable without an authenticated principal
pub const DEFAULT_PUBLIC_ROUTES: [&str; 5] = [
    "/api/login",
    "/api/entrenadores/registrar",
    "/api/jugadores/registrar",
    "/api/padres/registrar",
    "/uploads/**",
];

/// Main service configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Token signing settings
    pub auth: AuthConfig,

    /// Public/protected route classification
    #[serde(default)]
    pub access: AccessConfig,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ClubConfig {
    /// Build a configuration with defaults around a signing secret
    pub fn with_secret<S: Into<String>>(signing_secret: S) -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig {
                signing_secret: signing_secret.into(),
                bearer_scheme: default_bearer_scheme(),
            },
            access: AccessConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }

    /// Load configuration from a file, with `CLUB_*` environment overrides applied
    pub async fn load<P: AsRef<Path>>(path: P) -> ClubResult<Self> {
        Self::load_with(path, |key| std::env::var(key).ok()).await
    }

    /// Load configuration from a file, resolving overrides through `lookup`
    ///
    /// The parser is picked from the extension: `.json` is JSON, anything else is YAML.
    pub async fn load_with<P, F>(path: P, lookup: F) -> ClubResult<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;

        let mut config = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };

        config.apply_overrides_from(lookup)?;

        config.validate()?;
        Ok(config)
    }

    /// Parse YAML without applying overrides or validation
    pub fn from_yaml_str(content: &str) -> ClubResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse JSON without applying overrides or validation
    pub fn from_json_str(content: &str) -> ClubResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Apply overrides from a key lookup
    ///
    /// Keys follow the pattern `CLUB_<SECTION>_<FIELD>`, for example `CLUB_SERVER_HTTP_PORT`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ClubResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("CLUB_SERVER_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }

        if let Some(port) = lookup("CLUB_SERVER_HTTP_PORT") {
            self.server.http_port = port.parse()
                .map_err(|e| ClubError::config(format!("Invalid CLUB_SERVER_HTTP_PORT: {}", e)))?;
        }

        if let Some(dir) = lookup("CLUB_SERVER_UPLOADS_DIR") {
            self.server.uploads_dir = PathBuf::from(dir);
        }

        if let Some(timeout) = lookup("CLUB_SERVER_REQUEST_TIMEOUT") {
            self.server.request_timeout = humantime::parse_duration(&timeout)
                .map_err(|e| ClubError::config(format!("Invalid CLUB_SERVER_REQUEST_TIMEOUT: {}", e)))?;
        }

        if let Some(secret) = lookup("CLUB_AUTH_SIGNING_SECRET") {
            self.auth.signing_secret = secret;
        }

        if let Some(level) = lookup("CLUB_LOG_LEVEL") {
            self.observability.logging.level = level;
        }

        if let Some(format) = lookup("CLUB_LOG_FORMAT") {
            self.observability.logging.format = format.parse()?;
        }

        Ok(())
    }

    /// Configuration validation with detailed error messages
    pub fn validate(&self) -> ClubResult<()> {
        let mut errors = Vec::new();

        if self.server.bind_address.is_empty() {
            errors.push("bind_address cannot be empty".to_string());
        }

        if self.server.http_port == 0 {
            errors.push("http_port must be greater than 0".to_string());
        }

        if self.server.request_timeout.is_zero() {
            errors.push("request_timeout must be greater than 0".to_string());
        }

        if self.auth.signing_secret.len() < MIN_SECRET_LEN {
            errors.push(format!(
                "signing_secret must be at least {} bytes (got {})",
                MIN_SECRET_LEN,
                self.auth.signing_secret.len()
            ));
        }

        if self.auth.bearer_scheme.is_empty()
            || self.auth.bearer_scheme.chars().any(char::is_whitespace)
        {
            errors.push("bearer_scheme must be a single non-empty word".to_string());
        }

        for (index, route) in self.access.public_routes.iter().enumerate() {
            if !route.starts_with('/') {
                errors.push(format!("Public route {} ('{}') must start with '/'", index, route));
            }
        }

        if self.observability.logging.level.trim().is_empty() {
            errors.push("logging level cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClubError::config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }

    /// Socket address the HTTP server binds to
    pub fn socket_addr(&self) -> ClubResult<SocketAddr> {
        format!("{}:{}", self.server.bind_address, self.server.http_port)
            .parse()
            .map_err(|e| ClubError::config(format!("Invalid bind address: {}", e)))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub bind_address: String,

    /// HTTP port
    pub http_port: u16,

    /// Directory served under `/uploads/`
    pub uploads_dir: PathBuf,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Cross-origin settings for browser and mobile clients
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: 8080,
            uploads_dir: PathBuf::from("uploads"),
            request_timeout: Duration::from_secs(30),
            cors: CorsConfig::default(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Token signing configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Process-wide HS256 signing key
    pub signing_secret: String,

    /// Authorization scheme expected in front of the token
    #[serde(default = "default_bearer_scheme")]
    pub bearer_scheme: String,
}

fn default_bearer_scheme() -> String {
    "Bearer".to_string()
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("bearer_scheme", &self.bearer_scheme)
            .finish()
    }
}

/// Access policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Route patterns reachable without a principal; everything else is protected
    pub public_routes: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            public_routes: DEFAULT_PUBLIC_ROUTES.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    pub level: String,

    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = ClubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" => Ok(LogFormat::Text),
            other => Err(ClubError::config(format!("Unknown log format '{}'", other))),
        }
    }
}
