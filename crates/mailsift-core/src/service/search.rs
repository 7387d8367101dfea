//! Mailbox searches.
//!
//! Every search logs in, selects the configured mailbox and logs out again,
//! also when the search itself fails. Title and content searches fetch in
//! two phases: envelopes for all candidates first, then full bodies only
//! for the messages that are kept.

use mailsift_imap::{
    FetchAttribute, FetchItems, ImapStream, Message, SeqNum, SequenceSet, Session, SessionState,
};
use mailsift_mime::CharsetRegistry;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::config::{MailConfig, validate_config};
use crate::result::{ResultBuilder, SearchResult};
use crate::{Error, Result};

/// Message range covering the newest `requested` of `exists` messages.
///
/// Returns `None` for an empty mailbox. When the mailbox holds more than
/// `requested` messages the range is `exists - requested ..= exists`,
/// otherwise `max(requested, 1) ..= exists`. The lower end never drops
/// below message 1; a range whose lower end ends up above `exists` selects
/// nothing.
#[must_use]
pub const fn recency_range(requested: u32, exists: u32) -> Option<(u32, u32)> {
    if exists == 0 {
        None
    } else if exists > requested {
        Some((exists - requested, exists))
    } else if requested == 0 {
        Some((1, exists))
    } else {
        Some((requested, exists))
    }
}

/// Searches one account.
///
/// Each call opens its own connection, so a `Mailsift` can be shared
/// between tasks.
#[derive(Debug, Clone)]
pub struct Mailsift {
    config: MailConfig,
    builder: ResultBuilder,
}

impl Mailsift {
    /// Creates a searcher for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: MailConfig) -> Result<Self> {
        validate_config(&config)?;
        let builder = ResultBuilder::new(config.key_header.clone());
        Ok(Self { config, builder })
    }

    /// Uses `charsets` when decoding subjects, bodies and filenames.
    #[must_use]
    pub fn with_charsets(mut self, charsets: CharsetRegistry) -> Self {
        self.builder = self.builder.with_charsets(charsets);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Finds messages whose subject contains `title`, newest first.
    ///
    /// An empty title matches every message.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, login, SELECT, SEARCH or a
    /// FETCH fails.
    pub async fn search_by_title(&self, title: &str) -> Result<Vec<SearchResult>> {
        let session = self.connect().await?;
        self.search_by_title_on(session, title).await
    }

    /// [`Mailsift::search_by_title`] on an unauthenticated session.
    ///
    /// # Errors
    ///
    /// See [`Mailsift::search_by_title`].
    pub async fn search_by_title_on<S>(
        &self,
        mut session: Session<S>,
        title: &str,
    ) -> Result<Vec<SearchResult>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.login(&mut session).await?;
        let result = self.title_search(&mut session, title).await;
        finish(&mut session, result).await
    }

    /// Returns the newest `count` messages with envelope fields only.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, login, SELECT or FETCH fails.
    pub async fn search_by_recent(&self, count: u32) -> Result<Vec<SearchResult>> {
        let session = self.connect().await?;
        self.search_by_recent_on(session, count).await
    }

    /// [`Mailsift::search_by_recent`] on an unauthenticated session.
    ///
    /// # Errors
    ///
    /// See [`Mailsift::search_by_recent`].
    pub async fn search_by_recent_on<S>(
        &self,
        mut session: Session<S>,
        count: u32,
    ) -> Result<Vec<SearchResult>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.login(&mut session).await?;
        let result = self.recent_search(&mut session, count).await;
        finish(&mut session, result).await
    }

    /// Finds messages whose body or key header contains `content`, newest
    /// first.
    ///
    /// Every message body in the mailbox is downloaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, login, SELECT, SEARCH or a
    /// FETCH fails.
    pub async fn search_by_content(&self, content: &str) -> Result<Vec<SearchResult>> {
        let session = self.connect().await?;
        self.search_by_content_on(session, content).await
    }

    /// [`Mailsift::search_by_content`] on an unauthenticated session.
    ///
    /// # Errors
    ///
    /// See [`Mailsift::search_by_content`].
    pub async fn search_by_content_on<S>(
        &self,
        mut session: Session<S>,
        content: &str,
    ) -> Result<Vec<SearchResult>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.login(&mut session).await?;
        let result = self.content_search(&mut session, content).await;
        finish(&mut session, result).await
    }

    /// Checks that the server is reachable and accepts the credentials.
    pub async fn is_health(&self) -> bool {
        match self.connect().await {
            Ok(session) => self.is_health_on(session).await,
            Err(e) => {
                error!(host = %self.config.host, error = %e, "health check failed to connect");
                false
            }
        }
    }

    /// [`Mailsift::is_health`] on an unauthenticated session.
    pub async fn is_health_on<S>(&self, mut session: Session<S>) -> bool
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Err(e) = self.login(&mut session).await {
            error!(error = %e, "health check failed to log in");
            return false;
        }
        match session.logout().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "health check failed to log out");
                false
            }
        }
    }

    async fn connect(&self) -> Result<Session<ImapStream>> {
        debug!(host = %self.config.host, port = self.config.port, "connecting");
        Ok(Session::connect(self.config.session_config()).await?)
    }

    async fn login<S>(&self, session: &mut Session<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        session
            .login(&self.config.username, &self.config.password)
            .await?;
        Ok(())
    }

    async fn title_search<S>(
        &self,
        session: &mut Session<S>,
        title: &str,
    ) -> Result<Vec<SearchResult>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let ids = self.select_and_list(session).await?;
        let candidates = fetch_candidates(session, &ids).await?;

        let matches: Vec<Message> = candidates
            .into_iter()
            .filter(|message| self.builder.subject(message).contains(title))
            .collect();
        info!(title, candidates = ids.len(), matches = matches.len(), "title search");

        let mut results = Vec::with_capacity(matches.len());
        for message in matches {
            if let Some(raw) = fetch_body(session, message.seq).await? {
                results.push(self.builder.full(&message, &raw));
            }
        }
        Ok(results)
    }

    async fn content_search<S>(
        &self,
        session: &mut Session<S>,
        needle: &str,
    ) -> Result<Vec<SearchResult>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let ids = self.select_and_list(session).await?;
        let candidates = fetch_candidates(session, &ids).await?;

        let mut results = Vec::new();
        for message in candidates {
            let Some(raw) = fetch_body(session, message.seq).await? else {
                continue;
            };
            let content = self.builder.extract(&raw);
            if content.contains(needle) {
                debug!(seq = message.seq.get(), "content matched");
                results.push(self.builder.assemble(&message, content));
            }
        }
        info!(candidates = ids.len(), matches = results.len(), "content search");
        Ok(results)
    }

    async fn recent_search<S>(
        &self,
        session: &mut Session<S>,
        count: u32,
    ) -> Result<Vec<SearchResult>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mailbox = session.select_mailbox(&self.config.mailbox).await?;
        let Some((from, to)) = recency_range(count, mailbox.exists) else {
            info!(mailbox = %self.config.mailbox, "mailbox is empty");
            return Ok(Vec::new());
        };
        let Some(set) = SequenceSet::range(from, to) else {
            info!(from, to, "recent range is empty");
            return Ok(Vec::new());
        };

        let items = FetchItems::Items(vec![
            FetchAttribute::Envelope,
            FetchAttribute::InternalDate,
            FetchAttribute::Flags,
            FetchAttribute::Rfc822Size,
        ]);
        let mut stream = session.fetch(&set, items).await?;
        let mut results = Vec::new();
        while let Some(message) = stream.next().await {
            results.push(self.builder.basic(&message?));
        }
        info!(from, to, fetched = results.len(), "recent search");
        Ok(results)
    }

    /// Selects the mailbox and lists every message id in it.
    async fn select_and_list<S>(&self, session: &mut Session<S>) -> Result<Vec<SeqNum>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mailbox = session.select_mailbox(&self.config.mailbox).await?;
        debug!(mailbox = %self.config.mailbox, exists = mailbox.exists, "selected");
        Ok(session.search(None).await?)
    }
}

/// Fetches envelopes for `ids`, newest first.
async fn fetch_candidates<S>(session: &mut Session<S>, ids: &[SeqNum]) -> Result<Vec<Message>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let set: SequenceSet = ids.iter().copied().collect();
    let mut stream = session.fetch_envelopes(&set).await?;
    let mut messages = Vec::with_capacity(ids.len());
    while let Some(message) = stream.next().await {
        messages.push(message?);
    }
    messages.sort_unstable_by(|a, b| b.seq.cmp(&a.seq));
    Ok(messages)
}

/// Fetches one message body for the second phase.
///
/// A failure confined to this message is logged and yields `None` so the
/// search goes on with the next one; only a failure that ends the session
/// is returned.
async fn fetch_body<S>(session: &mut Session<S>, seq: SeqNum) -> Result<Option<Vec<u8>>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match session.fetch_body(seq).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.is_fatal() || session.state() == SessionState::LoggedOut => Err(e.into()),
        Err(e) => {
            warn!(seq = seq.get(), error = %e, "skipping message without a usable body");
            Ok(None)
        }
    }
}

/// Logs out, then hands back the search result. A failed logout only
/// matters when the search itself succeeded.
async fn finish<S, T>(session: &mut Session<S>, result: Result<T>) -> Result<T>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if session.state() == SessionState::LoggedOut {
        return result;
    }
    let logout = session.logout().await;
    match (result, logout) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(Error::Imap(e)),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(logout)) => {
            warn!(error = %logout, "logout after failed search also failed");
            Err(e)
        }
    }
}
