//! rustls server configuration from the provisioned PEM files.

use axum_server::tls_rustls::RustlsConfig;

use crate::cert::CertificatePair;

use super::server::ServerError;

/// Install the process-wide rustls crypto provider. Safe to call repeatedly.
pub fn install_crypto_provider() {
    // Err means a provider is already installed
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Load the certificate chain and private key into a server TLS context.
pub async fn load_tls_config(pair: &CertificatePair) -> Result<RustlsConfig, ServerError> {
    install_crypto_provider();

    RustlsConfig::from_pem_file(&pair.cert_path, &pair.key_path)
        .await
        .map_err(|e| {
            ServerError::TlsConfig(format!(
                "failed to load certificate {} / key {}: {}",
                pair.cert_path.display(),
                pair.key_path.display(),
                e
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rejects_garbage_pem() {
        let dir = TempDir::new().unwrap();
        let pair = CertificatePair::new(dir.path().join("c.crt"), dir.path().join("c.key"));
        std::fs::write(&pair.cert_path, "not a pem").unwrap();
        std::fs::write(&pair.key_path, "also not a pem").unwrap();

        let result = load_tls_config(&pair).await;
        assert!(matches!(result, Err(ServerError::TlsConfig(_))));
    }

    #[tokio::test]
    async fn test_rejects_missing_files() {
        let dir = TempDir::new().unwrap();
        let pair = CertificatePair::new(dir.path().join("c.crt"), dir.path().join("c.key"));
        assert!(load_tls_config(&pair).await.is_err());
    }

    #[tokio::test]
    async fn test_loads_generated_pair() {
        let dir = TempDir::new().unwrap();
        let pair = CertificatePair::new(dir.path().join("c.crt"), dir.path().join("c.key"));
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        std::fs::write(&pair.cert_path, generated.cert.pem()).unwrap();
        std::fs::write(&pair.key_path, generated.key_pair.serialize_pem()).unwrap();

        assert!(load_tls_config(&pair).await.is_ok());
    }
}
