//! TLS transport.
//!
//! Only implicit TLS is offered; there is no plaintext or STARTTLS path.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::config::Config;
use crate::{Error, Result};

/// A TLS connection to an IMAP server.
pub struct ImapStream(Box<TlsStream<TcpStream>>);

impl ImapStream {
    /// Wraps an established TLS stream.
    #[must_use]
    pub fn new(stream: TlsStream<TcpStream>) -> Self {
        Self(Box::new(stream))
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().0).poll_read(cx, buf)
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut *self.get_mut().0).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().0).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().0).poll_shutdown(cx)
    }
}

/// Creates a TLS connector trusting the webpki root set.
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Dials the server and completes the TLS handshake.
///
/// TCP connect and handshake together must finish within
/// `config.connect_timeout`, otherwise [`Error::Timeout`] is returned.
/// Network failures are reported as [`Error::Connection`].
pub async fn connect_tls(config: &Config) -> Result<ImapStream> {
    let server_name = ServerName::try_from(config.host.clone())?;
    let connector = create_tls_connector();

    let dial = async {
        let tcp = TcpStream::connect((config.host.as_str(), config.port)).await?;
        connector.connect(server_name, tcp).await
    };

    match tokio::time::timeout(config.connect_timeout, dial).await {
        Ok(Ok(tls)) => {
            tracing::debug!(host = %config.host, port = config.port, "TLS connection established");
            Ok(ImapStream::new(tls))
        }
        Ok(Err(e)) => Err(Error::Connection {
            host: config.host.clone(),
            port: config.port,
            reason: e.to_string(),
        }),
        Err(_) => Err(Error::Timeout(config.connect_timeout)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn invalid_host_name_is_rejected_before_dialing() {
        let config = Config::builder("not a host name").build();
        let err = connect_tls(&config).await.err().unwrap();
        assert!(matches!(err, Error::InvalidDnsName(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        // port 1 on loopback has no listener
        let config = Config::builder("127.0.0.1")
            .port(1)
            .connect_timeout(Duration::from_secs(5))
            .build();
        let err = connect_tls(&config).await.err().unwrap();
        assert!(matches!(err, Error::Connection { port: 1, .. }));
        assert!(err.is_fatal());
    }
}
