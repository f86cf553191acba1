//! IMAP backend over TLS.
//!
//! - `mod.rs` - connector, session type and error classification
//! - `client.rs` - listing, fetch and attachment operations

mod client;

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::error::{DigestError, DigestResult};

use super::{Credentials, MailConnector};

pub(crate) type ImapSession = async_imap::Session<Compat<TlsStream<TcpStream>>>;

/// Connects to real IMAP servers using rustls with the webpki root store.
#[derive(Clone)]
pub struct ImapConnector {
    tls: TlsConnector,
}

impl ImapConnector {
    pub fn new() -> DigestResult<Self> {
        let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| DigestError::Config(format!("TLS setup failed: {}", e)))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
        })
    }
}

/// An authenticated IMAP session.
pub struct ImapClient {
    pub(crate) session: ImapSession,
    pub server: String,
    /// Mailbox currently selected on the server
    pub(crate) selected: Option<String>,
}

impl MailConnector for ImapConnector {
    type Session = ImapClient;

    async fn connect(&self, credentials: &Credentials) -> DigestResult<ImapClient> {
        let addr = format!("{}:{}", credentials.server, credentials.port);
        tracing::info!("Connecting to IMAP server {}", addr);

        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| DigestError::Connectivity(format!("cannot reach {}: {}", addr, e)))?;

        let server_name = rustls::pki_types::ServerName::try_from(credentials.server.clone())
            .map_err(|_| {
                DigestError::Connectivity(format!("invalid server name '{}'", credentials.server))
            })?;

        let tls_stream = self
            .tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| DigestError::Connectivity(format!("TLS handshake failed: {}", e)))?;

        // async-imap speaks futures-io; wrap the tokio stream
        let client = async_imap::Client::new(tls_stream.compat());

        let session = client
            .login(&credentials.username, &credentials.password)
            .await
            .map_err(|(e, _)| classify_login_error(e))?;

        tracing::info!("Logged in to {} as {}", credentials.server, credentials.username);

        Ok(ImapClient {
            session,
            server: credentials.server.clone(),
            selected: None,
        })
    }
}

/// A server NO/BAD on LOGIN means the credentials were refused;
/// everything else is a transport problem.
pub(crate) fn classify_login_error(error: async_imap::error::Error) -> DigestError {
    use async_imap::error::Error;

    match error {
        Error::No(msg) | Error::Bad(msg) => DigestError::Authentication(msg),
        other => DigestError::Connectivity(other.to_string()),
    }
}

/// Errors after login are all connectivity failures from the user's side.
pub(crate) fn session_error(context: &str, error: async_imap::error::Error) -> DigestError {
    tracing::warn!("IMAP {} failed: {:?}", context, error);
    DigestError::Connectivity(format!("{}: {}", context, error))
}
