//! devhttps: serve a web build over HTTPS for local camera testing.
//!
//! This is the application entry point. It initializes tracing, builds the
//! configuration from command line flags, checks the document root, provisions
//! the self-signed certificate and runs the server until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;

use axum_server::Handle;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use devhttps::cert::CertProvisioner;
use devhttps::config::{
    AppConfig, LogFormat, LoggingConfig, DEFAULT_CERT_FILE, DEFAULT_DOCUMENT_ROOT, DEFAULT_KEY_FILE,
    DEFAULT_PORT,
};
use devhttps::http::{serve, setup_shutdown_handler, ServerError};

/// devhttps: serve a web build over HTTPS so camera and microphone work locally
#[derive(Parser, Debug)]
#[command(name = "devhttps", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory to serve
    #[arg(short, long, default_value = DEFAULT_DOCUMENT_ROOT)]
    root: PathBuf,

    /// Certificate file, created if missing
    #[arg(long, default_value = DEFAULT_CERT_FILE)]
    cert: PathBuf,

    /// Private key file, created if missing
    #[arg(long, default_value = DEFAULT_KEY_FILE)]
    key: PathBuf,

    /// OpenSSL executable to try before the default locations
    #[arg(long)]
    openssl: Option<PathBuf>,

    /// Log level filter (e.g., "devhttps=debug")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Args {
    fn into_config(self) -> AppConfig {
        let mut config = AppConfig::default();
        config.http.host = self.host;
        config.http.port = self.port;
        config.http.document_root = self.root;
        config.tls.cert_path = self.cert;
        config.tls.key_path = self.key;
        if let Some(openssl) = self.openssl {
            config.tls.prefer_openssl(openssl);
        }
        config.logging = LoggingConfig {
            filter: self.log_level,
            format: self.log_format,
        };
        config
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::new(logging.effective_filter());
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Check the document root, provision the certificate and serve until interrupted.
async fn run(config: &AppConfig) -> Result<(), ServerError> {
    // Fail before touching certificates if there is nothing to serve
    if !config.http.has_document_root() {
        return Err(ServerError::MissingDocumentRoot(
            config.http.document_root.clone(),
        ));
    }

    let provisioning = CertProvisioner::from_config(&config.tls)
        .ensure_certificate(&config.tls.cert_path, &config.tls.key_path)
        .await;

    let handle = Handle::new();
    setup_shutdown_handler(handle.clone());

    serve(&config.http, provisioning, handle).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Args::parse().into_config();
    init_tracing(&config.logging);

    tracing::info!("Starting secure server for local camera access");

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{}", error);
            ExitCode::FAILURE
        }
    }
}
