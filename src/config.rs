use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Session lifetime in days for the auth cookie and the sessions table.
    pub session_ttl_days: i64,
    /// Enables /api/debug/* endpoints (admin bootstrap, password reset).
    /// Never turn on in production.
    pub debug_endpoints: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            session_ttl_days: std::env::var("SESSION_TTL_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<i64>()
                .map_err(|_| anyhow::anyhow!("SESSION_TTL_DAYS must be a positive number"))
                .and_then(|days| {
                    if days <= 0 {
                        anyhow::bail!("SESSION_TTL_DAYS must be a positive number");
                    }
                    Ok(days)
                })?,
            debug_endpoints: std::env::var("DEBUG_ENDPOINTS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Session TTL: {} days", config.session_ttl_days);
        if config.debug_endpoints {
            tracing::warn!("Debug endpoints are ENABLED");
        }

        Ok(config)
    }
}
