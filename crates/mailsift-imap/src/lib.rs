//! # mailsift-imap
//!
//! An async IMAP4rev1 (RFC 3501) client core with IDLE (RFC 2177) and
//! UNSELECT (RFC 3691), over implicit TLS.
//!
//! ## Features
//!
//! - **Type-state connection management**: compile-time enforcement of valid
//!   IMAP state transitions (`NotAuthenticated` → `Authenticated` → `Selected`)
//! - **Runtime session**: [`Session`] wraps the type-state client behind a
//!   `&mut self` API with an explicit `LoggedOut` terminal state
//! - **Streaming FETCH**: messages are decoded and handed out one at a time;
//!   a malformed message is logged and skipped without ending the batch
//! - **TLS via rustls**: no OpenSSL dependency, webpki root certificates
//! - **Sans-I/O parser**: protocol parsing separated from network I/O
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsift_imap::{Session, SessionConfig, SearchCriteria};
//!
//! #[tokio::main]
//! async fn main() -> mailsift_imap::Result<()> {
//!     let mut session = Session::connect(SessionConfig::new("imap.example.com")).await?;
//!     session.login("user@example.com", "password").await?;
//!
//!     let info = session.select_mailbox("INBOX").await?;
//!     println!("Messages: {}", info.exists);
//!
//!     let ids = session
//!         .search(Some(SearchCriteria::Subject("invoice".into())))
//!         .await?;
//!     let set = ids.iter().copied().collect();
//!
//!     let mut messages = session.fetch_envelopes(&set).await?;
//!     while let Some(message) = messages.next().await {
//!         let message = message?;
//!         println!("{}: {:?}", message.seq, message.subject());
//!     }
//!     drop(messages);
//!
//!     session.logout().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── login() ───→ Authenticated
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    Authenticated    │ ─── select() ───→ Selected
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │      Selected       │ ─── unselect() ───→ Authenticated
//! └─────────────────────┘
//! ```
//!
//! `logout()` is available in every state. There is no automatic
//! reconnect: after a connection-level error the session is over.
//!
//! ## Modules
//!
//! - [`command`]: IMAP command builders and types
//! - [`connection`]: Connection management, type-state client and session
//! - [`handler`]: Sink for unsolicited server data
//! - [`parser`]: Sans-I/O response parser
//! - [`types`]: Core IMAP types (flags, mailboxes, sequence sets, ...)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod handler;
mod message;
pub mod parser;
mod stream_fetch;
pub mod types;

pub use command::{Command, EncodedCommand, FetchAttribute, FetchItems, SearchCriteria, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, IdleEvent, IdleHandle, ImapStream,
    NotAuthenticated, Rejected, Selected, Session, SessionConfig, SessionState,
};
pub use error::{Error, Result};
pub use handler::{LoggingHandler, NoopHandler, UntaggedHandler};
pub use message::Message;
pub use parser::{Address, Envelope, FetchItem, Response, ResponseParser, UntaggedResponse};
pub use stream_fetch::{DEFAULT_CHANNEL_CAPACITY, FetchStream, OwnedFetchStream};
pub use types::{
    Capability, Flag, Flags, Mailbox, MailboxInfo, ResponseCode, SeqNum, SequenceSet, Status, Tag,
    Uid, UidSet, UidValidity,
};

/// IMAP protocol version spoken.
pub const IMAP_VERSION: &str = "IMAP4rev1";
