//! IMAP IDLE command support (RFC 2177).
//!
//! IDLE lets the server push mailbox changes without polling. The client
//! enters with `IDLE`, waits for events, and leaves with `DONE`.

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{Instant, timeout_at};

use super::client::{Client, Selected};
use crate::command::Command;
use crate::parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
use crate::types::{Flags, SeqNum, Status, Tag};
use crate::{Error, Result};

/// Event received during IDLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleEvent {
    /// New message count (EXISTS response).
    Exists(u32),
    /// Message expunged (EXPUNGE response).
    Expunge(SeqNum),
    /// Message flags changed (FETCH response).
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Updated flags.
        flags: Flags,
    },
    /// Recent count changed.
    Recent(u32),
    /// The deadline passed without an event.
    Timeout,
}

/// Handle for an active IDLE.
///
/// Call [`IdleHandle::wait`] to receive events and [`IdleHandle::done`] to
/// leave IDLE; the client is usable again once `done` returns.
pub struct IdleHandle<'a, S> {
    client: &'a mut Client<S, Selected>,
    tag: Tag,
}

impl<S> std::fmt::Debug for IdleHandle<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleHandle")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

impl<'a, S> IdleHandle<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    const fn new(client: &'a mut Client<S, Selected>, tag: Tag) -> Self {
        Self { client, tag }
    }

    /// Waits for a mailbox event or until `duration` has elapsed.
    ///
    /// Responses that are not mailbox events (status text, alerts) go to
    /// the client's handler and do not end the wait. RFC 2177 asks clients
    /// to leave and re-enter IDLE at least every 29 minutes.
    pub async fn wait(&mut self, duration: Duration) -> Result<IdleEvent> {
        let deadline = Instant::now() + duration;

        loop {
            let raw = match timeout_at(deadline, self.client.stream.read_response()).await {
                Ok(raw) => raw?,
                Err(_) => return Ok(IdleEvent::Timeout),
            };

            match ResponseParser::parse(&raw) {
                Ok(Response::Untagged(untagged)) => {
                    if let Some(event) = self.event(untagged) {
                        return Ok(event);
                    }
                }
                Ok(Response::Tagged {
                    tag, status, text, ..
                }) if tag == self.tag => {
                    // the server ended IDLE on its own
                    return Err(match status {
                        Status::Ok => Error::InvalidState(format!("server ended IDLE: {text}")),
                        other => Error::from_status(other, text),
                    });
                }
                Ok(Response::Tagged { tag, .. }) => {
                    return Err(Error::Protocol(format!("unexpected tag {tag} during IDLE")));
                }
                Ok(Response::Continuation { .. }) => {
                    return Err(Error::Protocol(
                        "unexpected continuation during IDLE".to_string(),
                    ));
                }
                Err(e) if e.is_per_message() => {
                    tracing::warn!(error = %e, "skipping malformed response during IDLE");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn event(&mut self, untagged: UntaggedResponse) -> Option<IdleEvent> {
        match untagged {
            UntaggedResponse::Exists(n) => Some(IdleEvent::Exists(n)),
            UntaggedResponse::Recent(n) => Some(IdleEvent::Recent(n)),
            UntaggedResponse::Expunge(seq) => Some(IdleEvent::Expunge(seq)),
            UntaggedResponse::Fetch { seq, items } => {
                let flags = items
                    .into_iter()
                    .find_map(|item| match item {
                        FetchItem::Flags(f) => Some(f),
                        _ => None,
                    })
                    .unwrap_or_default();
                Some(IdleEvent::Fetch { seq, flags })
            }
            other => {
                self.client.unsolicited(&other);
                None
            }
        }
    }

    /// Leaves IDLE by sending DONE and reading the completion.
    pub async fn done(self) -> Result<()> {
        self.client
            .stream
            .write_command(&Command::Done.serialize(""))
            .await?;

        loop {
            let raw = self.client.stream.read_response().await?;
            match ResponseParser::parse(&raw) {
                Ok(Response::Tagged {
                    tag, status, text, ..
                }) if tag == self.tag => {
                    return match status {
                        Status::Ok => Ok(()),
                        other => Err(Error::from_status(other, text)),
                    };
                }
                Ok(Response::Untagged(untagged)) => self.client.unsolicited(&untagged),
                Ok(_) => {}
                Err(e) if e.is_per_message() => {
                    tracing::warn!(error = %e, "skipping malformed response after DONE");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Enters IDLE mode.
    ///
    /// Returns once the server has answered with its `+` continuation.
    /// Check [`Client::supports_idle`] first.
    pub async fn idle(&mut self) -> Result<IdleHandle<'_, S>> {
        let tag = self.send(&Command::Idle).await?;

        loop {
            let raw = self.stream.read_response().await?;
            match ResponseParser::parse(&raw)? {
                Response::Continuation { .. } => break,
                Response::Tagged {
                    tag: t,
                    status,
                    text,
                    ..
                } if t == tag => {
                    return Err(match status {
                        Status::Ok => Error::Protocol("IDLE completed without waiting".into()),
                        other => Error::from_status(other, text),
                    });
                }
                Response::Untagged(untagged) => self.unsolicited(&untagged),
                Response::Tagged { .. } => {}
            }
        }

        tracing::debug!(mailbox = self.mailbox(), "idling");
        Ok(IdleHandle::new(self, tag))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;

    async fn selected(mock: tokio_test::io::Mock) -> Client<tokio_test::io::Mock, Selected> {
        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("u", "p").await.unwrap();
        client.select("INBOX").await.unwrap()
    }

    fn session_script() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN u p\r\n")
            .read(b"A0001 OK logged in\r\n")
            .write(b"A0002 SELECT INBOX\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"A0002 OK [READ-WRITE] done\r\n");
        builder
    }

    #[tokio::test]
    async fn idle_reports_exists_then_done() {
        let mock = session_script()
            .write(b"A0003 IDLE\r\n")
            .read(b"+ idling\r\n")
            .read(b"* 4 EXISTS\r\n")
            .write(b"DONE\r\n")
            .read(b"A0003 OK IDLE terminated\r\n")
            .build();

        let mut client = selected(mock).await;
        let mut handle = client.idle().await.unwrap();
        let event = handle.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(event, IdleEvent::Exists(4));
        handle.done().await.unwrap();
    }

    #[tokio::test]
    async fn idle_refused() {
        let mock = session_script()
            .write(b"A0003 IDLE\r\n")
            .read(b"A0003 BAD IDLE not supported\r\n")
            .build();

        let mut client = selected(mock).await;
        let err = client.idle().await.unwrap_err();
        assert!(matches!(err, Error::Bad(_)));
    }

    #[tokio::test]
    async fn flag_change_during_idle() {
        let mock = session_script()
            .write(b"A0003 IDLE\r\n")
            .read(b"+ idling\r\n")
            .read(b"* OK still here\r\n")
            .read(b"* 2 FETCH (FLAGS (\\Seen))\r\n")
            .build();

        let mut client = selected(mock).await;
        let mut handle = client.idle().await.unwrap();
        let event = handle.wait(Duration::from_secs(5)).await.unwrap();
        let IdleEvent::Fetch { seq, flags } = event else {
            panic!("expected a flag change, got {event:?}");
        };
        assert_eq!(seq.get(), 2);
        assert!(flags.is_seen());
    }
}
