//! Session-level sink for unsolicited server data.
//!
//! A server may send EXISTS, EXPUNGE, RECENT, FETCH, FLAGS, BYE and status
//! responses at any time (RFC 3501 section 7). Data that the in-flight
//! command asked for is returned to its caller; everything else is handed to
//! the session's [`UntaggedHandler`].
//!
//! ```
//! use mailsift_imap::handler::UntaggedHandler;
//!
//! #[derive(Default)]
//! struct Counter {
//!     exists: u32,
//! }
//!
//! impl UntaggedHandler for Counter {
//!     fn on_exists(&mut self, count: u32) {
//!         self.exists = count;
//!     }
//! }
//! ```

use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::{Flags, ResponseCode, SeqNum};

/// Receiver for untagged responses no command asked for.
///
/// Every method has an empty default, so implementors only override what
/// they care about.
pub trait UntaggedHandler: Send {
    /// EXISTS: the mailbox now holds `count` messages.
    fn on_exists(&mut self, count: u32) {
        let _ = count;
    }

    /// EXPUNGE: the message at `seq` was removed; later numbers shift down.
    fn on_expunge(&mut self, seq: SeqNum) {
        let _ = seq;
    }

    /// RECENT count changed.
    fn on_recent(&mut self, count: u32) {
        let _ = count;
    }

    /// FETCH data that arrived outside a FETCH command, usually a flag change.
    fn on_fetch(&mut self, seq: SeqNum, items: &[FetchItem]) {
        let _ = (seq, items);
    }

    /// The set of defined flags changed.
    fn on_flags(&mut self, flags: &Flags) {
        let _ = flags;
    }

    /// The server is closing the connection.
    fn on_bye(&mut self, text: &str) {
        let _ = text;
    }

    /// `[ALERT]` text. RFC 3501 requires it to reach the user.
    fn on_alert(&mut self, text: &str) {
        let _ = text;
    }

    /// Untagged OK/NO/BAD that carries only information.
    fn on_status(&mut self, code: Option<&ResponseCode>, text: &str) {
        let _ = (code, text);
    }

    /// Data this client does not interpret.
    fn on_other(&mut self, line: &str) {
        let _ = line;
    }
}

/// Ignores every unsolicited response.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl UntaggedHandler for NoopHandler {}

/// Logs unsolicited responses through `tracing`. This is the session default.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl UntaggedHandler for LoggingHandler {
    fn on_exists(&mut self, count: u32) {
        tracing::debug!(count, "EXISTS");
    }

    fn on_expunge(&mut self, seq: SeqNum) {
        tracing::debug!(seq = seq.get(), "EXPUNGE");
    }

    fn on_recent(&mut self, count: u32) {
        tracing::debug!(count, "RECENT");
    }

    fn on_fetch(&mut self, seq: SeqNum, items: &[FetchItem]) {
        tracing::debug!(seq = seq.get(), items = items.len(), "unsolicited FETCH");
    }

    fn on_flags(&mut self, flags: &Flags) {
        tracing::debug!(?flags, "FLAGS");
    }

    fn on_bye(&mut self, text: &str) {
        tracing::info!(text, "BYE");
    }

    fn on_alert(&mut self, text: &str) {
        tracing::warn!(text, "ALERT");
    }

    fn on_status(&mut self, code: Option<&ResponseCode>, text: &str) {
        tracing::trace!(?code, text, "status");
    }

    fn on_other(&mut self, line: &str) {
        tracing::trace!(line, "unhandled untagged data");
    }
}

/// Hands one response to the matching handler method.
pub fn dispatch(handler: &mut dyn UntaggedHandler, response: &UntaggedResponse) {
    match response {
        UntaggedResponse::Exists(n) => handler.on_exists(*n),
        UntaggedResponse::Recent(n) => handler.on_recent(*n),
        UntaggedResponse::Expunge(seq) => handler.on_expunge(*seq),
        UntaggedResponse::Fetch { seq, items } => handler.on_fetch(*seq, items),
        UntaggedResponse::Flags(flags) => handler.on_flags(flags),
        UntaggedResponse::Bye { text, .. } => handler.on_bye(text),
        UntaggedResponse::Ok { code, text }
        | UntaggedResponse::No { code, text }
        | UntaggedResponse::Bad { code, text }
        | UntaggedResponse::PreAuth { code, text } => {
            if code.as_ref().is_some_and(ResponseCode::is_alert) {
                handler.on_alert(text);
            } else {
                handler.on_status(code.as_ref(), text);
            }
        }
        UntaggedResponse::Capability(_) => {}
        UntaggedResponse::Search(ids) => {
            tracing::debug!(count = ids.len(), "unsolicited SEARCH ignored");
        }
        UntaggedResponse::Other(line) => handler.on_other(line),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl UntaggedHandler for Recorder {
        fn on_exists(&mut self, count: u32) {
            self.events.push(format!("exists {count}"));
        }

        fn on_expunge(&mut self, seq: SeqNum) {
            self.events.push(format!("expunge {seq}"));
        }

        fn on_alert(&mut self, text: &str) {
            self.events.push(format!("alert {text}"));
        }

        fn on_status(&mut self, _code: Option<&ResponseCode>, text: &str) {
            self.events.push(format!("status {text}"));
        }
    }

    #[test]
    fn routes_by_response_type() {
        let mut recorder = Recorder::default();
        dispatch(&mut recorder, &UntaggedResponse::Exists(4));
        dispatch(
            &mut recorder,
            &UntaggedResponse::Expunge(SeqNum::new(2).unwrap()),
        );
        dispatch(
            &mut recorder,
            &UntaggedResponse::Ok {
                code: Some(ResponseCode::Alert),
                text: "quota almost full".into(),
            },
        );
        dispatch(
            &mut recorder,
            &UntaggedResponse::No {
                code: None,
                text: "disk slow".into(),
            },
        );
        assert_eq!(
            recorder.events,
            vec![
                "exists 4",
                "expunge 2",
                "alert quota almost full",
                "status disk slow"
            ]
        );
    }

    #[test]
    fn default_methods_ignore_everything() {
        let mut handler = NoopHandler;
        dispatch(&mut handler, &UntaggedResponse::Other("XFOO".into()));
        dispatch(&mut handler, &UntaggedResponse::Recent(1));
    }
}
