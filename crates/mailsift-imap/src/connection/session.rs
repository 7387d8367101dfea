//! High-level IMAP session.
//!
//! [`Session`] wraps the type-state [`Client`] behind a `&mut self` API and
//! tracks the protocol state at runtime:
//!
//! ```text
//! NotAuthenticated --login--> Authenticated --select_mailbox--> Selected
//!        |                      ^      |                           |
//!        |                      +------+------- unselect ----------+
//!        +---------------- logout (from any state) --------> LoggedOut
//! ```
//!
//! There is no automatic retry or reconnect. A connection-level failure
//! moves the session to [`SessionState::LoggedOut`] and every later call
//! returns [`Error::InvalidState`]; the caller decides whether to open a
//! new session.
//!
//! ```ignore
//! use mailsift_imap::{Session, SessionConfig};
//!
//! let mut session = Session::connect(SessionConfig::new("imap.example.com")).await?;
//! session.login("user@example.com", "password").await?;
//! let info = session.select_mailbox("INBOX").await?;
//! let ids = session.search(None).await?;
//! session.logout().await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use super::client::{Authenticated, Client, NotAuthenticated, Rejected, Selected};
use super::config::Config;
use super::idle::IdleHandle;
use super::{ImapStream, connect_tls};
use crate::command::{FetchItems, SearchCriteria};
use crate::handler::UntaggedHandler;
use crate::stream_fetch::{DEFAULT_CHANNEL_CAPACITY, FetchStream};
use crate::types::{MailboxInfo, SeqNum, SequenceSet};
use crate::{Error, Result};

/// Configuration for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server address and connect deadline.
    pub server: Config,
    /// Deadline for each command, `None` to wait indefinitely.
    pub command_timeout: Option<Duration>,
    /// Capacity of the channel behind owned fetch streams.
    pub channel_capacity: usize,
}

impl SessionConfig {
    /// Creates a configuration for implicit TLS on port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::from_server(Config::new(host))
    }

    /// Creates a configuration from connection settings.
    #[must_use]
    pub const fn from_server(server: Config) -> Self {
        Self {
            server,
            command_timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Sets the per-command deadline.
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Sets the owned fetch stream's channel capacity.
    #[must_use]
    pub const fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Where a [`Session`] is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, greeting read, not logged in.
    NotAuthenticated,
    /// Logged in, no mailbox selected.
    Authenticated,
    /// A mailbox is selected.
    Selected,
    /// Logged out or disconnected; terminal.
    LoggedOut,
}

enum Inner<S> {
    NotAuthenticated(Client<S, NotAuthenticated>),
    Authenticated(Client<S, Authenticated>),
    Selected(Client<S, Selected>),
    LoggedOut,
}

/// A connection to one IMAP server, driven one command at a time.
///
/// Commands take `&mut self`, so a session serves one operation at a
/// time. Failed commands fall into three groups (see [`Error::is_fatal`]):
/// a refused command leaves the session where it was, a malformed message
/// inside a FETCH is skipped, and a lost connection ends the session.
pub struct Session<S = ImapStream> {
    inner: Inner<S>,
    command_timeout: Option<Duration>,
    channel_capacity: usize,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

impl<S> Session<S> {
    /// Returns the current protocol state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        match self.inner {
            Inner::NotAuthenticated(_) => SessionState::NotAuthenticated,
            Inner::Authenticated(_) => SessionState::Authenticated,
            Inner::Selected(ref client) if client.broken => SessionState::LoggedOut,
            Inner::Selected(_) => SessionState::Selected,
            Inner::LoggedOut => SessionState::LoggedOut,
        }
    }
}

impl Session<ImapStream> {
    /// Connects over TLS and reads the greeting.
    ///
    /// Fails with [`Error::Connection`] or [`Error::Timeout`] when the
    /// server cannot be reached within the connect deadline.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let stream = connect_tls(&config.server).await?;
        Self::from_stream(stream, &config).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a session on an already connected stream.
    pub async fn from_stream(stream: S, config: &SessionConfig) -> Result<Self> {
        let client = bounded(config.command_timeout, Client::from_stream(stream)).await?;
        Ok(Self {
            inner: Inner::NotAuthenticated(client),
            command_timeout: config.command_timeout,
            channel_capacity: config.channel_capacity,
        })
    }

    /// Returns the selected mailbox's metadata.
    #[must_use]
    pub fn mailbox(&self) -> Option<&MailboxInfo> {
        match &self.inner {
            Inner::Selected(client) => Some(client.info()),
            _ => None,
        }
    }

    /// Replaces the sink for unsolicited responses.
    pub fn set_handler(&mut self, handler: Box<dyn UntaggedHandler>) {
        match &mut self.inner {
            Inner::NotAuthenticated(c) => c.set_handler(handler),
            Inner::Authenticated(c) => c.set_handler(handler),
            Inner::Selected(c) => c.set_handler(handler),
            Inner::LoggedOut => {}
        }
    }

    /// Logs in.
    ///
    /// On [`Error::Auth`] the session stays
    /// [`SessionState::NotAuthenticated`].
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let client = match self.take() {
            Inner::NotAuthenticated(client) => client,
            other => {
                self.inner = other;
                return self.wrong_state("login");
            }
        };

        match with_deadline(self.command_timeout, client.login(username, password)).await {
            Ok(Ok(client)) => {
                self.inner = Inner::Authenticated(client);
                Ok(())
            }
            Ok(Err(rejected)) => self.restore(rejected, Inner::NotAuthenticated),
            Err(e) => Err(e),
        }
    }

    /// Selects a mailbox, from either the authenticated or selected state.
    ///
    /// On [`Error::Select`] the session is left authenticated.
    pub async fn select_mailbox(&mut self, mailbox: &str) -> Result<MailboxInfo> {
        let result = match self.take() {
            Inner::Authenticated(client) => {
                with_deadline(self.command_timeout, client.select(mailbox)).await
            }
            Inner::Selected(client) => {
                with_deadline(self.command_timeout, client.select(mailbox)).await
            }
            other => {
                self.inner = other;
                return self.wrong_state("select_mailbox");
            }
        };

        match result {
            Ok(Ok(client)) => {
                let info = client.info().clone();
                self.inner = Inner::Selected(client);
                Ok(info)
            }
            Ok(Err(rejected)) => self.restore(rejected, Inner::Authenticated),
            Err(e) => Err(e),
        }
    }

    /// Searches the selected mailbox; `None` means `ALL`.
    pub async fn search(&mut self, criteria: Option<SearchCriteria>) -> Result<Vec<SeqNum>> {
        let timeout = self.command_timeout;
        let client = self.selected("search")?;
        let result = bounded(timeout, client.search(criteria)).await;
        self.settle(result)
    }

    /// Streams envelope, flags and size for `sequence`.
    ///
    /// The stream borrows the session; dropping it early is allowed.
    pub async fn fetch_envelopes(&mut self, sequence: &SequenceSet) -> Result<FetchStream<'_, S>> {
        self.fetch(sequence, FetchItems::envelope()).await
    }

    /// Streams arbitrary FETCH items for `sequence`.
    pub async fn fetch(
        &mut self,
        sequence: &SequenceSet,
        items: FetchItems,
    ) -> Result<FetchStream<'_, S>> {
        let timeout = self.command_timeout;
        let client = self.selected("fetch")?;
        bounded(timeout, client.fetch(sequence, items)).await
    }

    /// Fetches the raw bytes of one message, ready for a MIME reader.
    pub async fn fetch_body(&mut self, seq: SeqNum) -> Result<Vec<u8>> {
        let timeout = self.command_timeout;
        let client = self.selected("fetch_body")?;
        let result = bounded(timeout, client.fetch_body(seq)).await;
        self.settle(result)
    }

    /// Leaves the selected mailbox without expunging.
    pub async fn unselect(&mut self) -> Result<()> {
        let client = match self.take() {
            Inner::Selected(client) => client,
            other => {
                self.inner = other;
                return self.wrong_state("unselect");
            }
        };

        match with_deadline(self.command_timeout, client.unselect()).await {
            Ok(Ok(client)) => {
                self.inner = Inner::Authenticated(client);
                Ok(())
            }
            Ok(Err(rejected)) => self.restore(rejected, Inner::Selected),
            Err(e) => Err(e),
        }
    }

    /// Enters IDLE on the selected mailbox.
    pub async fn idle(&mut self) -> Result<IdleHandle<'_, S>> {
        let timeout = self.command_timeout;
        let client = self.selected("idle")?;
        bounded(timeout, client.idle()).await
    }

    /// Logs out and closes the connection. Calling it again is a no-op.
    pub async fn logout(&mut self) -> Result<()> {
        let timeout = self.command_timeout;
        let result = match self.take() {
            Inner::NotAuthenticated(c) => bounded(timeout, c.logout()).await,
            Inner::Authenticated(c) => bounded(timeout, c.logout()).await,
            Inner::Selected(c) => bounded(timeout, c.logout()).await,
            Inner::LoggedOut => Ok(()),
        };
        tracing::info!("session closed");
        result
    }

    /// Returns the channel capacity to use for owned fetch streams.
    #[must_use]
    pub const fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Takes the selected client out for an owned fetch.
    ///
    /// The session is left logged out; hand the client back with
    /// [`Session::restore_selected`].
    pub fn take_selected(&mut self) -> Result<Client<S, Selected>> {
        match self.take() {
            Inner::Selected(client) => Ok(client),
            other => {
                self.inner = other;
                Err(Error::InvalidState(format!(
                    "no selected mailbox (state: {:?})",
                    self.state()
                )))
            }
        }
    }

    /// Puts a selected client back into the session.
    pub fn restore_selected(&mut self, client: Client<S, Selected>) {
        self.inner = Inner::Selected(client);
    }

    /// Takes the client out, leaving the session logged out. A client whose
    /// connection died under a fetch stream is dropped instead.
    fn take(&mut self) -> Inner<S> {
        match std::mem::replace(&mut self.inner, Inner::LoggedOut) {
            Inner::Selected(client) if client.broken => {
                tracing::error!("connection lost during FETCH");
                Inner::LoggedOut
            }
            other => other,
        }
    }

    fn selected(&mut self, operation: &str) -> Result<&mut Client<S, Selected>> {
        if matches!(&self.inner, Inner::Selected(client) if client.broken) {
            tracing::error!("connection lost during FETCH");
            self.inner = Inner::LoggedOut;
        }
        let state = self.state();
        match &mut self.inner {
            Inner::Selected(client) => Ok(client),
            _ => Err(Error::InvalidState(format!(
                "{operation} requires a selected mailbox (state: {state:?})"
            ))),
        }
    }

    fn wrong_state<T>(&self, operation: &str) -> Result<T> {
        Err(Error::InvalidState(format!(
            "{operation} not allowed in state {:?}",
            self.state()
        )))
    }

    /// Puts a rejected client back unless its connection is gone.
    fn restore<C, T>(&mut self, rejected: Rejected<C>, wrap: impl FnOnce(C) -> Inner<S>) -> Result<T> {
        if rejected.error.closes_connection() {
            tracing::error!(error = %rejected.error, "connection lost");
        } else {
            self.inner = wrap(rejected.client);
        }
        Err(rejected.error)
    }

    /// Drops the connection after an error that closed it.
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && e.closes_connection()
        {
            tracing::error!(error = %e, "connection lost");
            self.inner = Inner::LoggedOut;
        }
        result
    }
}

/// Runs a fallible command under the optional deadline.
async fn bounded<T>(
    deadline: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    with_deadline(deadline, fut).await?
}

/// Applies the optional per-command deadline.
async fn with_deadline<T>(
    deadline: Option<Duration>,
    fut: impl Future<Output = T>,
) -> Result<T> {
    match deadline {
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .map_err(|_| Error::Timeout(d)),
        None => Ok(fut.await),
    }
}
