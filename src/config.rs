//! Configuration and constants.
//!
//! Defines the fixed defaults the tool runs with (port, document root, certificate
//! file names, OpenSSL invocation parameters) and `AppConfig`, the root configuration
//! struct passed into the provisioner and the server. There is no configuration file;
//! the binary overrides individual fields from command line flags.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use const_format::formatcp;

// =============================================================================
// Server Defaults
// =============================================================================

/// Port the server listens on
pub const DEFAULT_PORT: u16 = 8443;

/// Listen on all interfaces
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Directory produced by the web build step
pub const DEFAULT_DOCUMENT_ROOT: &str = "build/web";

/// Command the operator runs to produce the document root
pub const BUILD_HINT: &str = "flutter build web";

// =============================================================================
// Certificate Defaults
// =============================================================================

/// Certificate file, relative to the working directory
pub const DEFAULT_CERT_FILE: &str = "localhost.crt";

/// Private key file, relative to the working directory
pub const DEFAULT_KEY_FILE: &str = "localhost.key";

/// Key algorithm and size passed to `openssl req -newkey`
pub const CERT_KEY_SPEC: &str = "rsa:4096";

/// Certificate validity in days
pub const CERT_VALIDITY_DAYS: u32 = 365;

pub const CERT_COUNTRY: &str = "FR";
pub const CERT_STATE: &str = "IDF";
pub const CERT_LOCALITY: &str = "Paris";
pub const CERT_ORGANIZATION: &str = "TimeSheet";
pub const CERT_COMMON_NAME: &str = "localhost";

/// Subject passed to `openssl req -subj`
pub const CERT_SUBJECT: &str = formatcp!(
    "/C={}/ST={}/L={}/O={}/CN={}",
    CERT_COUNTRY,
    CERT_STATE,
    CERT_LOCALITY,
    CERT_ORGANIZATION,
    CERT_COMMON_NAME
);

/// Locations tried for the OpenSSL executable, in order. The bare name goes
/// through the regular `PATH` lookup; the rest cover Windows installs where
/// OpenSSL ships with Git or MSYS2 but is not on `PATH`.
pub const OPENSSL_CANDIDATES: &[&str] = &[
    "openssl",
    "C:\\Program Files\\Git\\usr\\bin\\openssl.exe",
    "C:\\Program Files\\Git\\bin\\openssl.exe",
    "C:\\msys64\\usr\\bin\\openssl.exe",
];

// =============================================================================
// Logging Defaults
// =============================================================================

/// Default log filter when neither `--log-level` nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "devhttps=info";

/// Root configuration, threaded through startup.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Listener and document root
    pub http: HttpServerConfig,
    /// Certificate locations and tool search
    pub tls: TlsConfig,
    /// Logging output
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: IpAddr,
    /// Port to bind; `0` picks an ephemeral port
    pub port: u16,
    /// Directory whose contents are served
    pub document_root: PathBuf,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            document_root: PathBuf::from(DEFAULT_DOCUMENT_ROOT),
        }
    }
}

impl HttpServerConfig {
    /// Socket address the listener binds to
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the document root exists and is a directory
    pub fn has_document_root(&self) -> bool {
        self.document_root.is_dir()
    }
}

/// Certificate configuration
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    /// Executables tried for OpenSSL, first match wins
    pub openssl_candidates: Vec<PathBuf>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from(DEFAULT_CERT_FILE),
            key_path: PathBuf::from(DEFAULT_KEY_FILE),
            openssl_candidates: OPENSSL_CANDIDATES.iter().map(PathBuf::from).collect(),
        }
    }
}

impl TlsConfig {
    /// Try `path` before the built-in candidates.
    pub fn prefer_openssl(&mut self, path: impl AsRef<Path>) {
        self.openssl_candidates.insert(0, path.as_ref().to_path_buf());
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Explicit filter, takes priority over RUST_LOG
    pub filter: Option<String>,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Resolve the effective filter: explicit > RUST_LOG > default
    pub fn effective_filter(&self) -> String {
        self.filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }
}
