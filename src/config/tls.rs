//! Optional in-process HTTPS
//!
//! `TLS_ENABLED=true` serves through axum-server with certificates loaded
//! from `TLS_CERT_PATH` / `TLS_KEY_PATH` on `TLS_PORT` (default 8443).
//! Otherwise the service speaks plain HTTP behind a terminating proxy.

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use std::env;
use std::path::PathBuf;

const DEFAULT_TLS_PORT: u16 = 8443;

#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub port: u16,
}

impl TlsSettings {
    /// `None` unless `TLS_ENABLED` is set to true
    pub fn from_env() -> Result<Option<Self>> {
        let enabled = env::var("TLS_ENABLED").ok();
        if !is_enabled(enabled.as_deref()) {
            return Ok(None);
        }

        let port = match env::var("TLS_PORT") {
            Ok(port) => port.trim().parse().context("Invalid TLS_PORT")?,
            Err(_) => DEFAULT_TLS_PORT,
        };

        Ok(Some(Self {
            cert_path: env::var("TLS_CERT_PATH")
                .context("TLS_CERT_PATH must be set when TLS is enabled")?
                .into(),
            key_path: env::var("TLS_KEY_PATH")
                .context("TLS_KEY_PATH must be set when TLS is enabled")?
                .into(),
            port,
        }))
    }

    pub async fn load(&self) -> Result<RustlsConfig> {
        for (label, path) in [("certificate", &self.cert_path), ("private key", &self.key_path)] {
            if !path.is_file() {
                anyhow::bail!("TLS {} not found at {}", label, path.display());
            }
        }

        let config = RustlsConfig::from_pem_file(&self.cert_path, &self.key_path)
            .await
            .with_context(|| format!("Failed to load TLS material from {}", self.cert_path.display()))?;

        tracing::info!(cert = %self.cert_path.display(), "TLS certificates loaded");
        Ok(config)
    }
}

fn is_enabled(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_flag() {
        assert!(is_enabled(Some("true")));
        assert!(is_enabled(Some(" TRUE ")));
        assert!(is_enabled(Some("1")));
        assert!(!is_enabled(Some("false")));
        assert!(!is_enabled(Some("")));
        assert!(!is_enabled(None));
    }

    #[tokio::test]
    async fn test_missing_certificate_rejected() {
        let settings = TlsSettings {
            cert_path: PathBuf::from("/nonexistent/cert.pem"),
            key_path: PathBuf::from("/nonexistent/key.pem"),
            port: DEFAULT_TLS_PORT,
        };
        let err = settings.load().await.unwrap_err();
        assert!(err.to_string().contains("certificate not found"));
    }
}
