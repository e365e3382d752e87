use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Bulk restores of
    /// large archives are the slowest requests this service handles, so
    /// the default is generous compared to a typical CRUD API.
    pub request_timeout_secs: u64,
    /// JWT validation configuration (secret, token lifetime).
    pub jwt: JwtConfig,
    /// SMTP settings for backup summary emails. `None` disables email.
    pub smtp: Option<SmtpConfig>,
}

/// Outbound SMTP settings for backup-summary notifications.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address for summary emails.
    pub from_address: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `JWT_SECRET`           | **required**               |
    /// | `SMTP_HOST`            | unset (email disabled)     |
    /// | `SMTP_PORT`            | `587`                      |
    /// | `SMTP_USERNAME`        | unset                      |
    /// | `SMTP_PASSWORD`        | unset                      |
    /// | `SMTP_FROM`            | `backups@dealerdesk.local` |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            smtp: SmtpConfig::from_env(),
        }
    }
}

impl SmtpConfig {
    /// Load SMTP settings, returning `None` when `SMTP_HOST` is unset.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;

        let port: u16 = std::env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".into())
            .parse()
            .expect("SMTP_PORT must be a valid u16");

        Some(Self {
            host,
            port,
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "backups@dealerdesk.local".into()),
        })
    }
}
