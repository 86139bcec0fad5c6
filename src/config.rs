//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (MAKIN__SECTION__KEY)
//! 4. Legacy flat variables
//!    (SPOTIFY_CLIENT_ID, SESSION_SECRET, DB_HOST, ...)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Permission scope requested from Spotify on every login.
pub const SPOTIFY_SCOPE: &str = "streaming user-read-email user-read-private ugc-image-upload user-read-playback-state user-modify-playback-state user-read-currently-playing app-remote-control playlist-read-private playlist-read-collaborative playlist-modify-private playlist-modify-public user-follow-modify user-follow-read user-read-playback-position user-top-read user-read-recently-played user-library-modify user-library-read";

const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = [
    "https://makin-music.vercel.app",
    "https://accounts.spotify.com",
];

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub spotify: SpotifyConfig,
    pub session: SessionConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
    /// Directory served for paths no route matches
    pub static_dir: PathBuf,
    /// Maximum accepted request body size
    pub body_limit_bytes: usize,
}

/// Cross-origin policy
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to make credentialed requests
    pub allowed_origins: Vec<String>,
}

/// Spotify OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Authorization endpoint the browser is sent to
    pub authorize_url: String,
    /// Token endpoint used for the code exchange
    pub token_url: String,
    /// Callback URL registered with Spotify
    pub redirect_uri: String,
    /// Front-end page that receives the tokens in its fragment
    pub frontend_callback_url: String,
    pub scope: String,
    /// Upper bound on the token exchange request
    pub token_timeout_seconds: u64,
}

impl SpotifyConfig {
    pub fn token_timeout(&self) -> Duration {
        Duration::from_secs(self.token_timeout_seconds)
    }
}

/// Session cookie and store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Secret used to sign session cookies (32+ bytes)
    pub secret: String,
    pub cookie_name: String,
    /// Session lifetime (default: 30 days)
    pub max_age_seconds: u64,
    /// How often expired sessions are swept (default: 24h)
    pub check_period_seconds: u64,
    /// Mark the cookie `Secure`
    pub secure: bool,
}

impl SessionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }

    pub fn check_period(&self) -> Duration {
        Duration::from_secs(self.check_period_seconds)
    }
}

/// MySQL connection pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    pub name: String,
    /// Maximum concurrent connections (default: 5)
    pub max_connections: u32,
    /// How long a request waits in the pool queue
    pub acquire_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// # Errors
    /// Returns error if configuration is missing or invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let env = |key: &str| std::env::var(key).ok();

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.static_dir", "public")?
            .set_default("server.body_limit_bytes", 100 * 1024)?
            .set_default("cors.allowed_origins", DEFAULT_ALLOWED_ORIGINS.to_vec())?
            .set_default("spotify.authorize_url", "https://accounts.spotify.com/authorize")?
            .set_default("spotify.token_url", "https://accounts.spotify.com/api/token")?
            .set_default(
                "spotify.redirect_uri",
                "https://makin-music-backend.vercel.app/callback",
            )?
            .set_default(
                "spotify.frontend_callback_url",
                "https://makin-music.vercel.app/auth/callback",
            )?
            .set_default("spotify.scope", SPOTIFY_SCOPE)?
            .set_default("spotify.token_timeout_seconds", 10)?
            .set_default("session.cookie_name", "SESSION_ID")?
            .set_default("session.max_age_seconds", 30 * 86_400)?
            .set_default("session.check_period_seconds", 86_400)?
            .set_default("session.secure", true)?
            .set_default("database.host", "127.0.0.1")?
            .set_default("database.port", 3306)?
            .set_default("database.max_connections", 5)?
            .set_default("database.acquire_timeout_seconds", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("MAKIN")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .set_override_option("spotify.client_id", env("SPOTIFY_CLIENT_ID"))?
            .set_override_option("spotify.client_secret", env("SPOTIFY_CLIENT_SECRET"))?
            .set_override_option("session.secret", env("SESSION_SECRET"))?
            .set_override_option("database.host", env("DB_HOST"))?
            .set_override_option("database.port", env("DB_PORT"))?
            .set_override_option("database.username", env("DB_USERNAME"))?
            .set_override_option("database.password", env("DB_PASSWORD"))?
            .set_override_option("database.name", env("DB_DATABASE"))?
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.session.secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "session.secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.spotify.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "spotify.client_id must not be empty".to_string(),
            ));
        }

        if self.spotify.client_secret.trim().is_empty() {
            return Err(AppError::Config(
                "spotify.client_secret must not be empty".to_string(),
            ));
        }

        for (key, value) in [
            ("spotify.authorize_url", &self.spotify.authorize_url),
            ("spotify.token_url", &self.spotify.token_url),
            ("spotify.redirect_uri", &self.spotify.redirect_uri),
            (
                "spotify.frontend_callback_url",
                &self.spotify.frontend_callback_url,
            ),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::Config(format!("{key} is not a valid URL: {e}")))?;
        }

        for origin in &self.cors.allowed_origins {
            axum::http::HeaderValue::from_str(origin).map_err(|_| {
                AppError::Config(format!("cors.allowed_origins contains invalid origin: {origin}"))
            })?;
        }

        if self.spotify.token_timeout_seconds == 0 {
            return Err(AppError::Config(
                "spotify.token_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.session.max_age_seconds == 0 || self.session.check_period_seconds == 0 {
            return Err(AppError::Config(
                "session.max_age_seconds and session.check_period_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(AppError::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                static_dir: PathBuf::from("public"),
                body_limit_bytes: 100 * 1024,
            },
            cors: CorsConfig {
                allowed_origins: DEFAULT_ALLOWED_ORIGINS
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            },
            spotify: SpotifyConfig {
                client_id: "spotify-client-id".to_string(),
                client_secret: "spotify-client-secret".to_string(),
                authorize_url: "https://accounts.spotify.com/authorize".to_string(),
                token_url: "https://accounts.spotify.com/api/token".to_string(),
                redirect_uri: "https://makin-music-backend.vercel.app/callback".to_string(),
                frontend_callback_url: "https://makin-music.vercel.app/auth/callback"
                    .to_string(),
                scope: SPOTIFY_SCOPE.to_string(),
                token_timeout_seconds: 10,
            },
            session: SessionConfig {
                secret: "x".repeat(32),
                cookie_name: "SESSION_ID".to_string(),
                max_age_seconds: 30 * 86_400,
                check_period_seconds: 86_400,
                secure: true,
            },
            database: DatabaseConfig {
                host: "127.0.0.1".to_string(),
                port: 3306,
                username: "makin".to_string(),
                password: None,
                name: "makin_music".to_string(),
                max_connections: 5,
                acquire_timeout_seconds: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.session.secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            AppError::Config(message) if message.contains("session.secret")
        ));
    }

    #[test]
    fn validate_rejects_missing_client_credentials() {
        let mut config = valid_config();
        config.spotify.client_secret = "  ".to_string();

        let error = config.validate().expect_err("empty client secret must fail");
        assert!(matches!(
            error,
            AppError::Config(message) if message.contains("spotify.client_secret")
        ));
    }

    #[test]
    fn validate_rejects_unparseable_token_url() {
        let mut config = valid_config();
        config.spotify.token_url = "not a url".to_string();

        let error = config.validate().expect_err("invalid token url must fail");
        assert!(matches!(
            error,
            AppError::Config(message) if message.contains("spotify.token_url")
        ));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = valid_config();
        config.spotify.token_timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn scope_is_space_separated() {
        assert!(!SPOTIFY_SCOPE.contains("  "));
        assert!(SPOTIFY_SCOPE.starts_with("streaming "));
        assert!(SPOTIFY_SCOPE.ends_with(" user-library-read"));
        assert_eq!(SPOTIFY_SCOPE.split(' ').count(), 19);
    }
}
