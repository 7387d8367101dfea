//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after connection
//! - `Authenticated`: After successful LOGIN
//! - `Selected`: After successful SELECT
//!
//! Each state only exposes methods that are valid for that state. A
//! transition that the server refuses hands the client back inside
//! [`Rejected`], still in a usable state.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::handler::{LoggingHandler, UntaggedHandler, dispatch};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status, Tag};
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) handler: Box<dyn UntaggedHandler>,
    /// FETCH whose completion has not been read yet.
    pub(crate) in_flight: Option<Tag>,
    /// The connection failed under a fetch stream and must not be reused.
    pub(crate) broken: bool,
    pub(crate) state: State,
}

// FramedStream and the handler have no Debug
impl<S, State: fmt::Debug> fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("in_flight", &self.in_flight)
            .field("broken", &self.broken)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// A refused state transition.
///
/// Carries the error together with the client, which remains in the state
/// it had before the attempt (or, for a failed re-SELECT, in the state the
/// server left it in).
pub struct Rejected<C> {
    /// Why the transition failed.
    pub error: Error,
    /// The client, still connected.
    pub client: C,
}

impl<C> fmt::Debug for Rejected<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<C> fmt::Display for Rejected<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<C> From<Rejected<C>> for Error {
    fn from(rejected: Rejected<C>) -> Self {
        rejected.error
    }
}

/// Outcome of a command that completed with OK.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    /// Untagged data the command solicited, in arrival order.
    pub data: Vec<UntaggedResponse>,
    /// Response code on the tagged OK.
    pub code: Option<ResponseCode>,
    /// Text of the tagged OK.
    pub text: String,
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns true if the server supports IDLE (RFC 2177).
    #[must_use]
    pub fn supports_idle(&self) -> bool {
        self.has_capability(&Capability::Idle)
    }

    /// Returns true if the server supports UNSELECT (RFC 3691).
    #[must_use]
    pub fn supports_unselect(&self) -> bool {
        self.has_capability(&Capability::Unselect)
    }

    /// Returns true if LOGIN is disabled.
    #[must_use]
    pub fn login_disabled(&self) -> bool {
        self.has_capability(&Capability::LoginDisabled)
    }

    /// Replaces the sink for unsolicited responses.
    pub fn set_handler(&mut self, handler: Box<dyn UntaggedHandler>) {
        self.handler = handler;
    }

    /// Sends a NOOP command, giving the server a chance to report updates.
    pub async fn noop(&mut self) -> Result<()> {
        self.execute(&Command::Noop).await?;
        Ok(())
    }

    /// Sends a CAPABILITY command and updates the stored capabilities.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        self.execute(&Command::Capability).await?;
        Ok(self.capabilities.clone())
    }

    /// Logs out and closes the connection.
    ///
    /// A server that hangs up right after its BYE is treated as a clean
    /// logout.
    pub async fn logout(mut self) -> Result<()> {
        match self.execute(&Command::Logout).await {
            Ok(_) | Err(Error::ConnectionLost(_)) => {}
            Err(e) => return Err(e),
        }
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "shutdown after LOGOUT failed");
        }
        tracing::debug!("logged out");
        Ok(())
    }

    /// Moves the connection into another state.
    pub(crate) fn transition<T>(self, state: T) -> Client<S, T> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            handler: self.handler,
            in_flight: self.in_flight,
            broken: self.broken,
            state,
        }
    }

    /// Runs a command to completion.
    ///
    /// Untagged data the command expects is collected in the returned
    /// [`Completion`]; anything else goes to the handler. A tagged NO, BAD
    /// or BYE becomes [`Error::No`], [`Error::Bad`] or [`Error::Bye`].
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Completion> {
        let tag = self.send(command).await?;
        self.read_completion(&tag, command).await
    }

    /// Writes a command, performing the continuation round trip before
    /// every literal. Returns the tag to wait for.
    pub(crate) async fn send(&mut self, command: &Command) -> Result<Tag> {
        command.validate()?;
        self.finish_in_flight().await?;

        let tag = self.tag_gen.next();
        if command.is_sensitive() {
            tracing::debug!(tag = %tag, command = command.name(), "sending (arguments redacted)");
        } else {
            tracing::debug!(tag = %tag, command = command.name(), "sending");
        }

        let encoded = command.encode(tag.as_str());
        let mut segments = encoded.segments().iter();
        if let Some(first) = segments.next() {
            self.stream.write_command(first).await?;
        }
        for segment in segments {
            self.await_continuation(&tag).await?;
            self.stream.write_command(segment).await?;
        }

        Ok(tag)
    }

    /// Reads until the server asks for the next literal.
    async fn await_continuation(&mut self, tag: &Tag) -> Result<()> {
        loop {
            let raw = self.stream.read_response().await?;
            match ResponseParser::parse(&raw) {
                Ok(Response::Continuation { .. }) => return Ok(()),
                Ok(Response::Tagged {
                    tag: t,
                    status,
                    text,
                    ..
                }) if t == *tag => {
                    return Err(match status {
                        Status::Ok | Status::PreAuth => {
                            Error::Protocol("command completed before its literal was sent".into())
                        }
                        other => Error::from_status(other, text),
                    });
                }
                Ok(Response::Tagged { tag: t, .. }) => {
                    tracing::warn!(tag = %t, "ignoring completion for unknown tag");
                }
                Ok(Response::Untagged(response)) => self.unsolicited(&response),
                Err(e) if e.is_per_message() => {
                    tracing::warn!(error = %e, "skipping unparseable response");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Reads responses until the tagged completion for `tag`.
    async fn read_completion(&mut self, tag: &Tag, command: &Command) -> Result<Completion> {
        let mut data = Vec::new();

        loop {
            let raw = self.stream.read_response().await?;
            match ResponseParser::parse(&raw) {
                Ok(Response::Tagged {
                    tag: t,
                    status,
                    code,
                    text,
                }) if t == *tag => {
                    if let Some(ResponseCode::Capability(caps)) = &code {
                        self.capabilities.clone_from(caps);
                    }
                    return match status {
                        Status::Ok | Status::PreAuth => Ok(Completion { data, code, text }),
                        other => Err(Error::from_status(other, text)),
                    };
                }
                Ok(Response::Tagged { tag: t, .. }) => {
                    tracing::warn!(tag = %t, "ignoring completion for unknown tag");
                }
                Ok(Response::Untagged(response)) => {
                    if let UntaggedResponse::Capability(caps) = &response {
                        self.capabilities.clone_from(caps);
                    }
                    if command.expects(response.kind()) {
                        if let Some(text) = alert_text(&response) {
                            self.handler.on_alert(text);
                        }
                        data.push(response);
                    } else {
                        self.unsolicited(&response);
                    }
                }
                Ok(Response::Continuation { .. }) => {
                    tracing::warn!(command = command.name(), "unexpected continuation request");
                }
                Err(e) if e.is_per_message() => {
                    tracing::warn!(error = %e, command = command.name(), "skipping unparseable response");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Hands a response nobody asked for to the handler.
    pub(crate) fn unsolicited(&mut self, response: &UntaggedResponse) {
        if let UntaggedResponse::Capability(caps) = response {
            self.capabilities.clone_from(caps);
        }
        dispatch(self.handler.as_mut(), response);
    }

    /// Consumes what is left of an abandoned FETCH.
    ///
    /// A fetch stream dropped before its completion leaves responses in the
    /// pipe; they are read and discarded before the next command goes out.
    async fn finish_in_flight(&mut self) -> Result<()> {
        let Some(tag) = self.in_flight.take() else {
            return Ok(());
        };
        tracing::debug!(tag = %tag, "draining unfinished FETCH");

        let mut discarded = 0usize;
        loop {
            let raw = self.stream.read_response().await?;
            match ResponseParser::parse(&raw) {
                Ok(Response::Tagged { tag: t, .. }) if t == tag => break,
                Ok(Response::Untagged(UntaggedResponse::Fetch { .. })) => discarded += 1,
                Ok(Response::Untagged(response)) => self.unsolicited(&response),
                Ok(_) => {}
                Err(e) if e.is_per_message() => discarded += 1,
                Err(e) => return Err(e),
            }
        }
        tracing::debug!(discarded, "unfinished FETCH drained");
        Ok(())
    }
}

/// Creates a client around a fresh stream, before the greeting is read.
pub(crate) fn new_client<S>(stream: FramedStream<S>) -> Client<S, NotAuthenticated> {
    Client {
        stream,
        tag_gen: TagGenerator::default(),
        capabilities: Vec::new(),
        handler: Box::new(LoggingHandler),
        in_flight: None,
        broken: false,
        state: NotAuthenticated,
    }
}

fn alert_text(response: &UntaggedResponse) -> Option<&str> {
    match response {
        UntaggedResponse::Ok {
            code: Some(ResponseCode::Alert),
            text,
        }
        | UntaggedResponse::No {
            code: Some(ResponseCode::Alert),
            text,
        }
        | UntaggedResponse::Bad {
            code: Some(ResponseCode::Alert),
            text,
        } => Some(text),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn alert_text_only_for_alerts() {
        let alert = UntaggedResponse::Ok {
            code: Some(ResponseCode::Alert),
            text: "maintenance at noon".into(),
        };
        assert_eq!(alert_text(&alert), Some("maintenance at noon"));
        assert_eq!(alert_text(&UntaggedResponse::Exists(1)), None);
    }

    #[test]
    fn rejected_converts_into_its_error() {
        let rejected = Rejected {
            error: Error::Auth("denied".into()),
            client: (),
        };
        assert_eq!(rejected.to_string(), "Authentication failed: denied");
        let err: Error = rejected.into();
        assert!(matches!(err, Error::Auth(_)));
    }
}
