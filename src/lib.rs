//! devhttps - local HTTPS server for web builds
//!
//! Serves a directory of static files over HTTPS using a self-signed certificate
//! created with OpenSSL on first run, so browser APIs that require a secure
//! context (camera, microphone) work during local development. Falls back to
//! HTTP with hardened headers when no certificate can be provisioned.

pub mod cert;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;

pub use cert::{ensure_certificate, CertProvisioner, CertificatePair, Provisioning};
pub use config::AppConfig;
pub use error::*;
pub use crate::http::{serve, ServerError};
