//! Transport selection and server startup.
//!
//! The provisioning outcome decides the transport once, at startup:
//! - `Ready`: certificate loaded and a listener bound, serve HTTPS
//! - `Unavailable`: no certificate, serve plain HTTP
//! - `TlsBindFailed`: certificate present but the TLS listener could not be set
//!   up, serve plain HTTP
//!
//! A plain listener that cannot bind is fatal.

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;

use crate::cert::{CertificatePair, Provisioning, Unavailable};
use crate::config::{HttpServerConfig, BUILD_HINT};

use super::headers::TransportMode;
use super::{create_router, tls};

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Directory {} not found. Run `{}` first", .0.display(), BUILD_HINT)]
    MissingDocumentRoot(PathBuf),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load TLS configuration: {0}")]
    TlsConfig(String),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Transport chosen at startup. Every variant is handled by [`bind`].
pub enum Transport {
    /// TLS context loaded and listener bound
    Ready {
        certificate: CertificatePair,
        tls: RustlsConfig,
        listener: TcpListener,
    },
    /// No certificate could be provisioned
    Unavailable(Unavailable),
    /// A certificate exists but the TLS listener could not be set up
    TlsBindFailed(ServerError),
}

impl Transport {
    pub fn mode(&self) -> TransportMode {
        match self {
            Transport::Ready { .. } => TransportMode::Tls,
            Transport::Unavailable(_) | Transport::TlsBindFailed(_) => TransportMode::Plain,
        }
    }
}

/// Try to set up HTTPS for a provisioned certificate.
///
/// Loading the certificate and binding the listener both happen here so any
/// failure is reported as [`Transport::TlsBindFailed`] rather than surfacing once
/// the server is already running.
pub async fn select_transport(config: &HttpServerConfig, provisioning: Provisioning) -> Transport {
    let certificate = match provisioning {
        Provisioning::Ready(pair) => pair,
        Provisioning::Unavailable(reason) => return Transport::Unavailable(reason),
    };

    let tls = match tls::load_tls_config(&certificate).await {
        Ok(tls) => tls,
        Err(e) => return Transport::TlsBindFailed(e),
    };

    match bind_listener(config.addr()) {
        Ok(listener) => Transport::Ready {
            certificate,
            tls,
            listener,
        },
        Err(e) => Transport::TlsBindFailed(e),
    }
}

/// Turn a transport into a bound server, binding a plain listener when HTTPS is
/// not available.
pub fn bind(config: &HttpServerConfig, transport: Transport) -> Result<BoundServer, ServerError> {
    let (listener, tls, certificate) = match transport {
        Transport::Ready {
            certificate,
            tls,
            listener,
        } => (listener, Some(tls), Some(certificate)),
        Transport::Unavailable(reason) => {
            tracing::warn!(%reason, "No certificate available, using HTTP with security headers");
            (bind_listener(config.addr())?, None, None)
        }
        Transport::TlsBindFailed(error) => {
            tracing::error!(%error, "HTTPS server failed, falling back to HTTP with security headers");
            (bind_listener(config.addr())?, None, None)
        }
    };

    Ok(BoundServer {
        listener,
        tls,
        certificate,
        document_root: config.document_root.clone(),
    })
}

fn bind_listener(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    let bind_error = |source| ServerError::Bind { addr, source };
    let listener = TcpListener::bind(addr).map_err(bind_error)?;
    listener.set_nonblocking(true).map_err(bind_error)?;
    Ok(listener)
}

/// A listener ready to serve the document root.
pub struct BoundServer {
    listener: TcpListener,
    tls: Option<RustlsConfig>,
    certificate: Option<CertificatePair>,
    document_root: PathBuf,
}

impl BoundServer {
    pub fn mode(&self) -> TransportMode {
        if self.tls.is_some() {
            TransportMode::Tls
        } else {
            TransportMode::Plain
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Log where the server is reachable and what the operator should do next.
    pub fn announce(&self) {
        let port = self.listener.local_addr().map(|a| a.port()).unwrap_or_default();
        let url = format!("{}://localhost:{}", self.mode().scheme(), port);
        let root = std::path::absolute(&self.document_root)
            .unwrap_or_else(|_| self.document_root.clone());

        match &self.certificate {
            Some(pair) => {
                tracing::info!(%url, root = %root.display(), "HTTPS server started");
                tracing::info!(
                    cert = %pair.cert_path.display(),
                    key = %pair.key_path.display(),
                    "Serving with self-signed certificate"
                );
                tracing::info!("Accept the self-signed certificate in your browser; camera access should then work");
            }
            None => {
                tracing::info!(%url, root = %root.display(), "HTTP server started with security headers");
                tracing::warn!("Camera access may not work in every browser over HTTP; install OpenSSL for full HTTPS support");
            }
        }
        tracing::info!("Press Ctrl+C to stop the server");
    }

    /// Serve until `handle` is told to shut down.
    pub async fn run(self, handle: Handle) -> Result<(), ServerError> {
        let mode = self.mode();
        let addr = self.local_addr()?;
        let app = create_router(&self.document_root, mode);

        match self.tls {
            Some(tls) => {
                axum_server::from_tcp_rustls(self.listener, tls)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await?
            }
            None => {
                axum_server::from_tcp(self.listener)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await?
            }
        }

        tracing::info!(%addr, scheme = mode.scheme(), "Server stopped");
        Ok(())
    }
}

/// Serve `config.document_root` over the transport `provisioning` allows, until
/// `handle` is shut down.
///
/// Fails without binding anything if the document root is missing.
pub async fn serve(
    config: &HttpServerConfig,
    provisioning: Provisioning,
    handle: Handle,
) -> Result<(), ServerError> {
    if !config.has_document_root() {
        return Err(ServerError::MissingDocumentRoot(
            config.document_root.clone(),
        ));
    }

    let transport = select_transport(config, provisioning).await;
    let server = bind(config, transport)?;
    server.announce();
    server.run(handle).await
}
