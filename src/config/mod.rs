pub mod database;
pub mod tls;

use std::env;
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("DATABASE_PORT")
                .unwrap_or_else(|_| "5432".to_string())
                .parse()
                .context("Invalid DATABASE_PORT")?,
            username: env::var("DATABASE_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: env::var("DATABASE_PASSWORD").context("DATABASE_PASSWORD must be set")?,
            database: env::var("DATABASE_NAME").unwrap_or_else(|_| "passport_market".to_string()),
            ssl_mode: env::var("DATABASE_SSL_MODE").unwrap_or_else(|_| "prefer".to_string()),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,
        })
    }

    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.username, self.password, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

/// Background expiry of idle inquiries
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Idle PENDING/NEGOTIATING inquiries older than this are expired
    pub max_idle_days: i64,
    pub sweep_interval_secs: u64,
}

/// Upper bound for the idle window; keeps `now - window` inside chrono's range
pub const MAX_EXPIRY_DAYS: i64 = 36_500;

impl ExpiryConfig {
    pub fn from_env() -> Result<Self> {
        Self::parse(
            &env::var("INQUIRY_EXPIRY_DAYS").unwrap_or_else(|_| "30".to_string()),
            &env::var("INQUIRY_EXPIRY_SWEEP_SECS").unwrap_or_else(|_| "3600".to_string()),
        )
    }

    fn parse(max_idle_days: &str, sweep_interval_secs: &str) -> Result<Self> {
        let max_idle_days: i64 = max_idle_days
            .trim()
            .parse()
            .context("Invalid INQUIRY_EXPIRY_DAYS")?;
        if !(1..=MAX_EXPIRY_DAYS).contains(&max_idle_days) {
            anyhow::bail!(
                "INQUIRY_EXPIRY_DAYS must be between 1 and {}, got {}",
                MAX_EXPIRY_DAYS,
                max_idle_days
            );
        }

        let sweep_interval_secs: u64 = sweep_interval_secs
            .trim()
            .parse()
            .context("Invalid INQUIRY_EXPIRY_SWEEP_SECS")?;
        if sweep_interval_secs == 0 {
            anyhow::bail!("INQUIRY_EXPIRY_SWEEP_SECS must be greater than zero");
        }

        Ok(Self {
            max_idle_days,
            sweep_interval_secs,
        })
    }
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            max_idle_days: 30,
            sweep_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub expiry: ExpiryConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cors_origins = parse_origins(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        );

        Ok(Self {
            database: DatabaseConfig::from_env()?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            cors_origins,
            expiry: ExpiryConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://app.example.com, http://localhost:3000,"),
            vec!["https://app.example.com", "http://localhost:3000"]
        );
    }

    #[test]
    fn test_connection_string() {
        let config = DatabaseConfig {
            host: "db".to_string(),
            port: 5433,
            username: "svc".to_string(),
            password: "pw".to_string(),
            database: "passport_market".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 5,
        };
        assert_eq!(
            config.connection_string(),
            "postgres://svc:pw@db:5433/passport_market?sslmode=disable"
        );
    }

    #[test]
    fn test_expiry_defaults() {
        let expiry = ExpiryConfig::default();
        assert_eq!(expiry.max_idle_days, 30);
        assert_eq!(expiry.sweep_interval_secs, 3600);
    }

    #[test]
    fn test_expiry_parse_accepts_valid_values() {
        let expiry = ExpiryConfig::parse("14", "600").unwrap();
        assert_eq!(expiry.max_idle_days, 14);
        assert_eq!(expiry.sweep_interval_secs, 600);
    }

    #[test]
    fn test_expiry_zero_sweep_interval_rejected() {
        let err = ExpiryConfig::parse("30", "0").unwrap_err();
        assert!(err.to_string().contains("INQUIRY_EXPIRY_SWEEP_SECS"));
    }

    #[test]
    fn test_expiry_days_out_of_range_rejected() {
        for days in ["0", "-5", "36501", "9223372036854775"] {
            let err = ExpiryConfig::parse(days, "3600").unwrap_err();
            assert!(err.to_string().contains("INQUIRY_EXPIRY_DAYS"), "{}", days);
        }
        assert!(ExpiryConfig::parse("thirty", "3600").is_err());
        assert!(ExpiryConfig::parse("36500", "3600").is_ok());
    }
}
