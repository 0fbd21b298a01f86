//! TLS material for the realtime listener.

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;
use crate::error::{RelayError, Result};

/// Load the PEM certificate and key into a rustls server config.
pub async fn load_rustls_config(tls: &TlsConfig) -> Result<RustlsConfig> {
    for path in [&tls.cert, &tls.key] {
        if !path.exists() {
            return Err(RelayError::Configuration(format!(
                "TLS file not found: {}",
                path.display()
            )));
        }
    }

    // reqwest and axum-server pull in different rustls backends; pin one.
    let _ = rustls::crypto::ring::default_provider().install_default();

    Ok(RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_certificate_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let tls = TlsConfig {
            cert: dir.path().join("cert.pem"),
            key: dir.path().join("key.pem"),
        };
        let err = load_rustls_config(&tls).await.unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));
        assert!(err.to_string().contains("cert.pem"));
    }

    #[tokio::test]
    async fn invalid_pem_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "not a certificate").unwrap();
        std::fs::write(&key, "not a key").unwrap();

        let err = load_rustls_config(&TlsConfig { cert, key }).await.unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }
}
