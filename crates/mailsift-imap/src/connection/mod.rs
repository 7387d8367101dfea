//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, connect deadline)
//! - The TLS transport
//! - Framed I/O for the IMAP protocol
//! - The type-state client and the runtime [`Session`] wrapper
//! - IDLE support

mod client;
mod config;
mod framed;
mod idle;
mod session;
mod stream;

pub use client::{Authenticated, Client, NotAuthenticated, Rejected, Selected};
pub use config::{Config, ConfigBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
pub use framed::{FramedStream, MAX_LINE_LENGTH};
pub use idle::{IdleEvent, IdleHandle};
pub use session::{Session, SessionConfig, SessionState};
pub use stream::{ImapStream, connect_tls, create_tls_connector};
