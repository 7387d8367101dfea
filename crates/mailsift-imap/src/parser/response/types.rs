//! Response data types.

use crate::types::{Capability, Flags, ResponseCode, SeqNum, Uid};

/// Item inside a `FETCH (...)` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// Message flags.
    Flags(Flags),
    /// Internal date, as sent (`"17-Jul-1996 02:44:25 -0700"`).
    InternalDate(String),
    /// RFC822 size.
    Rfc822Size(u32),
    /// Envelope.
    Envelope(Box<Envelope>),
    /// UID.
    Uid(Uid),
    /// Body section data.
    ///
    /// `RFC822`, `RFC822.HEADER` and `RFC822.TEXT` are normalised to the
    /// `BODY[]`, `BODY[HEADER]` and `BODY[TEXT]` section names.
    Section {
        /// Section specifier inside the brackets, empty for the whole message.
        name: String,
        /// Origin octet of a partial fetch.
        origin: Option<u32>,
        /// Section bytes; `None` when the server sent NIL.
        data: Option<Vec<u8>>,
    },
}

/// Message envelope (RFC 3501 section 7.4.2).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Date header.
    pub date: Option<String>,
    /// Subject header, still RFC 2047 encoded.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// Address from an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route (obsolete).
    pub adl: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain.
    pub host: Option<String>,
}

impl Address {
    /// Returns `mailbox@host`, or `None` for group markers.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

/// Untagged response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// OK response with optional code.
    Ok {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// NO response.
    No {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// BAD response.
    Bad {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// PREAUTH greeting.
    PreAuth {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// BYE response.
    Bye {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// CAPABILITY data.
    Capability(Vec<Capability>),
    /// FLAGS data.
    Flags(Flags),
    /// EXISTS count.
    Exists(u32),
    /// RECENT count.
    Recent(u32),
    /// EXPUNGE of one message.
    Expunge(SeqNum),
    /// SEARCH result.
    Search(Vec<SeqNum>),
    /// FETCH data for one message.
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Fetched items in server order.
        items: Vec<FetchItem>,
    },
    /// Data this client does not interpret, kept as its line.
    Other(String),
}

/// Classification used to route untagged data to the command that asked
/// for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Untagged OK/NO/BAD/PREAUTH.
    Status,
    /// BYE.
    Bye,
    /// CAPABILITY.
    Capability,
    /// FLAGS.
    Flags,
    /// EXISTS.
    Exists,
    /// RECENT.
    Recent,
    /// EXPUNGE.
    Expunge,
    /// SEARCH.
    Search,
    /// FETCH.
    Fetch,
    /// Anything else.
    Other,
}

impl UntaggedResponse {
    /// Returns the routing class of this response.
    #[must_use]
    pub const fn kind(&self) -> ResponseKind {
        match self {
            Self::Ok { .. } | Self::No { .. } | Self::Bad { .. } | Self::PreAuth { .. } => {
                ResponseKind::Status
            }
            Self::Bye { .. } => ResponseKind::Bye,
            Self::Capability(_) => ResponseKind::Capability,
            Self::Flags(_) => ResponseKind::Flags,
            Self::Exists(_) => ResponseKind::Exists,
            Self::Recent(_) => ResponseKind::Recent,
            Self::Expunge(_) => ResponseKind::Expunge,
            Self::Search(_) => ResponseKind::Search,
            Self::Fetch { .. } => ResponseKind::Fetch,
            Self::Other(_) => ResponseKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(mailbox: Option<&str>, host: Option<&str>) -> Address {
        Address {
            name: None,
            adl: None,
            mailbox: mailbox.map(str::to_string),
            host: host.map(str::to_string),
        }
    }

    #[test]
    fn email_needs_both_parts() {
        assert_eq!(
            addr(Some("a"), Some("x.com")).email().as_deref(),
            Some("a@x.com")
        );
        assert!(addr(Some("group"), None).email().is_none());
        assert!(addr(None, Some("x.com")).email().is_none());
    }

    #[test]
    fn kinds() {
        assert_eq!(UntaggedResponse::Exists(3).kind(), ResponseKind::Exists);
        assert_eq!(
            UntaggedResponse::Ok {
                code: Some(ResponseCode::Alert),
                text: String::new()
            }
            .kind(),
            ResponseKind::Status
        );
        assert_eq!(
            UntaggedResponse::Other("* XLIST".into()).kind(),
            ResponseKind::Other
        );
    }
}
