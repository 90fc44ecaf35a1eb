//! Self-signed certificate provisioning.
//!
//! Makes sure a certificate and private key pair exists on disk before the server
//! starts, creating it with OpenSSL when missing:
//!
//! ```text
//! openssl req -x509 -newkey rsa:4096 -keyout <key> -out <cert> -days 365 -nodes \
//!     -subj /C=FR/ST=IDF/L=Paris/O=TimeSheet/CN=localhost
//! ```
//!
//! Failures never propagate as errors. They collapse into
//! [`Provisioning::Unavailable`] and the server falls back to plain HTTP.

mod command;
mod resolver;

pub use command::{CommandRunner, CommandStatus, SystemRunner};
pub use resolver::{FixedResolver, SearchPathResolver, ToolResolver};

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{TlsConfig, CERT_KEY_SPEC, CERT_SUBJECT, CERT_VALIDITY_DAYS};

/// Paths of a certificate and its private key. The two are always created and
/// checked together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePair {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl CertificatePair {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Both files exist and are non-empty.
    pub fn is_complete(&self) -> bool {
        is_non_empty_file(&self.cert_path) && is_non_empty_file(&self.key_path)
    }

    /// Exactly one of the two files is usable.
    fn is_partial(&self) -> bool {
        is_non_empty_file(&self.cert_path) != is_non_empty_file(&self.key_path)
    }
}

fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Why no certificate is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// No OpenSSL executable answered at any searched location
    ToolNotFound,
    /// OpenSSL could not be started or exited non-zero
    GenerationFailed(String),
    /// OpenSSL reported success but the files are missing or empty
    OutputMissing,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::ToolNotFound => write!(f, "OpenSSL not found"),
            Unavailable::GenerationFailed(reason) => {
                write!(f, "certificate generation failed: {}", reason)
            }
            Unavailable::OutputMissing => {
                write!(f, "certificate generation produced no certificate or key")
            }
        }
    }
}

/// Outcome of [`CertProvisioner::ensure_certificate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioning {
    Ready(CertificatePair),
    Unavailable(Unavailable),
}

impl Provisioning {
    pub fn is_ready(&self) -> bool {
        matches!(self, Provisioning::Ready(_))
    }
}

/// Creates the certificate pair on demand.
pub struct CertProvisioner {
    resolver: Arc<dyn ToolResolver>,
    runner: Arc<dyn CommandRunner>,
}

impl CertProvisioner {
    pub fn new(resolver: Arc<dyn ToolResolver>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { resolver, runner }
    }

    /// Provisioner probing the configured OpenSSL candidates with real processes.
    pub fn from_config(config: &TlsConfig) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
        let resolver = SearchPathResolver::new(config.openssl_candidates.clone(), runner.clone());
        Self::new(Arc::new(resolver), runner)
    }

    /// Ensure `cert_path` and `key_path` hold a certificate pair.
    ///
    /// Returns immediately if both files already exist. Otherwise locates OpenSSL,
    /// generates a new self-signed certificate for `localhost` and verifies both
    /// files were written. A lone certificate or key is regenerated as a pair.
    pub async fn ensure_certificate(&self, cert_path: &Path, key_path: &Path) -> Provisioning {
        let pair = CertificatePair::new(cert_path, key_path);

        if pair.is_complete() {
            tracing::debug!(
                cert = %pair.cert_path.display(),
                key = %pair.key_path.display(),
                "Using existing certificate"
            );
            return Provisioning::Ready(pair);
        }

        if pair.is_partial() {
            tracing::warn!(
                cert = %pair.cert_path.display(),
                key = %pair.key_path.display(),
                "Certificate and key are incomplete, regenerating both"
            );
        }

        let Some(tool) = self.resolver.resolve().await else {
            tracing::warn!("OpenSSL not found, falling back to HTTP with security headers");
            return Provisioning::Unavailable(Unavailable::ToolNotFound);
        };

        tracing::info!(tool = %tool.display(), "Creating self-signed SSL certificate");

        let args = generate_args(&pair);
        match self.runner.run(&tool, &args).await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                tracing::error!(
                    code = ?status.code,
                    stderr = %status.stderr,
                    "Failed to create SSL certificate"
                );
                let reason = match status.code {
                    Some(code) => format!("openssl exited with status {}", code),
                    None => "openssl terminated by signal".to_string(),
                };
                return Provisioning::Unavailable(Unavailable::GenerationFailed(reason));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to run OpenSSL");
                return Provisioning::Unavailable(Unavailable::GenerationFailed(e.to_string()));
            }
        }

        if !pair.is_complete() {
            tracing::error!(
                cert = %pair.cert_path.display(),
                key = %pair.key_path.display(),
                "OpenSSL succeeded but certificate files are missing"
            );
            return Provisioning::Unavailable(Unavailable::OutputMissing);
        }

        tracing::info!(
            cert = %pair.cert_path.display(),
            key = %pair.key_path.display(),
            "SSL certificate created"
        );
        Provisioning::Ready(pair)
    }
}

/// Ensure a certificate pair exists using the default OpenSSL search path.
pub async fn ensure_certificate(cert_path: &Path, key_path: &Path) -> Provisioning {
    CertProvisioner::from_config(&TlsConfig::default())
        .ensure_certificate(cert_path, key_path)
        .await
}

/// Arguments for `openssl req` producing a self-signed certificate without a
/// key passphrase.
fn generate_args(pair: &CertificatePair) -> Vec<OsString> {
    vec![
        "req".into(),
        "-x509".into(),
        "-newkey".into(),
        CERT_KEY_SPEC.into(),
        "-keyout".into(),
        pair.key_path.clone().into_os_string(),
        "-out".into(),
        pair.cert_path.clone().into_os_string(),
        "-days".into(),
        CERT_VALIDITY_DAYS.to_string().into(),
        "-nodes".into(),
        "-subj".into(),
        CERT_SUBJECT.into(),
    ]
}
