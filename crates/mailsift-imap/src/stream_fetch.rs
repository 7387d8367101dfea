//! Streaming FETCH.
//!
//! Messages are handed out one at a time, in the order the server sends
//! them, as each `* n FETCH` block is read off the socket. Nothing is
//! buffered beyond the block being parsed.
//!
//! Two shapes are offered:
//!
//! - [`FetchStream`] borrows the selected client and reads on demand from
//!   the caller's task;
//! - [`OwnedFetchStream`] moves the client into a producer task that feeds
//!   a bounded channel and hands the client back when the FETCH completes.
//!
//! A block that frames correctly but cannot be decoded (for example an
//! ENVELOPE with fewer than ten fields) is logged and skipped; the stream
//! continues with the next message.

#![allow(clippy::missing_errors_doc)]

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::connection::{Client, Selected};
use crate::message::Message;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Status, Tag};
use crate::{Error, Result};

/// Default capacity of the channel behind an [`OwnedFetchStream`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// A FETCH in progress, read on demand.
///
/// Dropping the stream before it is exhausted is allowed: the remaining
/// responses are drained before the client sends its next command.
pub struct FetchStream<'a, S> {
    client: &'a mut Client<S, Selected>,
    tag: Tag,
    done: bool,
}

impl<S> std::fmt::Debug for FetchStream<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchStream")
            .field("tag", &self.tag)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<'a, S> FetchStream<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) const fn new(client: &'a mut Client<S, Selected>, tag: Tag) -> Self {
        Self {
            client,
            tag,
            done: false,
        }
    }

    /// Returns the next message, or `None` once the FETCH has completed.
    ///
    /// A refused FETCH yields one [`Error::Fetch`]. A connection failure
    /// yields its error and ends the stream.
    pub async fn next(&mut self) -> Option<Result<Message>> {
        if self.done {
            return None;
        }

        loop {
            let raw = match self.client.stream.read_response().await {
                Ok(raw) => raw,
                Err(e) => return Some(self.fail(e)),
            };

            match ResponseParser::parse(&raw) {
                Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items })) => {
                    return Some(Ok(Message::from_fetch(seq, items)));
                }
                Ok(Response::Untagged(other)) => self.client.unsolicited(&other),
                Ok(Response::Tagged {
                    tag, status, text, ..
                }) if tag == self.tag => {
                    self.done = true;
                    self.client.in_flight = None;
                    return match status {
                        Status::Ok => None,
                        other => {
                            Some(Err(Error::from_status(other, text).refused_as(Error::Fetch)))
                        }
                    };
                }
                Ok(Response::Tagged { tag, .. }) => {
                    tracing::warn!(tag = %tag, "ignoring completion for unknown tag");
                }
                Ok(Response::Continuation { .. }) => {
                    tracing::warn!("unexpected continuation request during FETCH");
                }
                Err(e) if e.is_per_message() => {
                    tracing::warn!(error = %e, "skipping malformed message");
                }
                Err(e) => return Some(self.fail(e)),
            }
        }
    }

    /// Reads the whole FETCH into memory.
    ///
    /// Stops at the first error.
    pub async fn collect(mut self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        while let Some(message) = self.next().await {
            messages.push(message?);
        }
        Ok(messages)
    }

    fn fail(&mut self, error: Error) -> Result<Message> {
        self.done = true;
        if error.closes_connection() {
            self.client.broken = true;
        }
        tracing::error!(error = %error, "FETCH aborted");
        Err(error)
    }
}

/// A FETCH driven by a producer task on an owned client.
///
/// Messages arrive through a bounded channel, so a slow consumer makes the
/// producer stop reading from the socket instead of buffering.
pub struct OwnedFetchStream<S> {
    rx: mpsc::Receiver<Result<Message>>,
    producer: JoinHandle<Result<Client<S, Selected>>>,
}

impl<S> std::fmt::Debug for OwnedFetchStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedFetchStream").finish_non_exhaustive()
    }
}

impl<S> OwnedFetchStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Starts the producer for a FETCH that has already been sent.
    pub(crate) fn spawn(mut client: Client<S, Selected>, tag: Tag, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let producer = tokio::spawn(async move {
            let mut stream = FetchStream::new(&mut client, tag);
            while let Some(item) = stream.next().await {
                match item {
                    Err(e) if e.closes_connection() => return Err(e),
                    item => {
                        if tx.send(item).await.is_err() {
                            tracing::debug!("fetch consumer went away");
                            break;
                        }
                    }
                }
            }
            drop(stream);
            Ok(client)
        });

        Self { rx, producer }
    }

    /// Returns the next message, or `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<Result<Message>> {
        self.rx.recv().await
    }

    /// Stops consuming and waits for the client to come back.
    ///
    /// Messages not yet received are discarded. If the connection failed
    /// during the FETCH that error is returned here.
    pub async fn finish(self) -> Result<Client<S, Selected>> {
        drop(self.rx);
        self.producer
            .await
            .map_err(|e| Error::ConnectionLost(format!("fetch producer failed: {e}")))?
    }
}
