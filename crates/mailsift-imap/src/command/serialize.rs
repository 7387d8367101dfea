//! Command serialization helpers.

use super::EncodedCommand;
use super::types::{FetchAttribute, FetchItems, SearchCriteria};

/// How an astring has to be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringForm {
    Atom,
    Quoted,
    Literal,
}

fn string_form(s: &str) -> StringForm {
    if s.bytes().any(|b| b >= 0x80 || b < 0x20 || b == 0x7F) {
        StringForm::Literal
    } else if s.is_empty() || s.bytes().any(is_atom_special) {
        StringForm::Quoted
    } else {
        StringForm::Atom
    }
}

const fn is_atom_special(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    )
}

/// Accumulates one command line, splitting it wherever a literal forces the
/// client to wait for a continuation.
#[derive(Debug, Default)]
pub(super) struct LineWriter {
    segments: Vec<Vec<u8>>,
    current: Vec<u8>,
}

impl LineWriter {
    pub(super) fn raw(&mut self, bytes: &[u8]) {
        self.current.extend_from_slice(bytes);
    }

    pub(super) fn push(&mut self, b: u8) {
        self.current.push(b);
    }

    /// Writes an atom, quoted string or synchronizing literal.
    pub(super) fn astring(&mut self, s: &str) {
        match string_form(s) {
            StringForm::Atom => self.raw(s.as_bytes()),
            StringForm::Quoted => {
                self.push(b'"');
                for b in s.bytes() {
                    if b == b'"' || b == b'\\' {
                        self.push(b'\\');
                    }
                    self.push(b);
                }
                self.push(b'"');
            }
            StringForm::Literal => self.literal(s.as_bytes()),
        }
    }

    /// Writes `{n}\r\n` and starts a new segment with the literal bytes.
    fn literal(&mut self, data: &[u8]) {
        self.raw(format!("{{{}}}\r\n", data.len()).as_bytes());
        self.segments.push(std::mem::take(&mut self.current));
        self.current.extend_from_slice(data);
    }

    pub(super) fn finish(mut self) -> EncodedCommand {
        self.raw(b"\r\n");
        self.segments.push(self.current);
        EncodedCommand {
            segments: self.segments,
        }
    }
}

/// Writes FETCH items.
pub(super) fn write_fetch_items(w: &mut LineWriter, items: &FetchItems) {
    match items {
        FetchItems::All => w.raw(b"ALL"),
        FetchItems::Full => w.raw(b"FULL"),
        FetchItems::Fast => w.raw(b"FAST"),
        FetchItems::Items(attrs) if attrs.len() == 1 => write_fetch_attribute(w, &attrs[0]),
        FetchItems::Items(attrs) => {
            w.push(b'(');
            for (i, attr) in attrs.iter().enumerate() {
                if i > 0 {
                    w.push(b' ');
                }
                write_fetch_attribute(w, attr);
            }
            w.push(b')');
        }
    }
}

fn write_fetch_attribute(w: &mut LineWriter, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => w.raw(b"FLAGS"),
        FetchAttribute::InternalDate => w.raw(b"INTERNALDATE"),
        FetchAttribute::Rfc822Size => w.raw(b"RFC822.SIZE"),
        FetchAttribute::Envelope => w.raw(b"ENVELOPE"),
        FetchAttribute::Uid => w.raw(b"UID"),
        FetchAttribute::Rfc822 => w.raw(b"RFC822"),
        FetchAttribute::Rfc822Header => w.raw(b"RFC822.HEADER"),
        FetchAttribute::Body {
            section,
            peek,
            partial,
        } => {
            w.raw(if *peek {
                b"BODY.PEEK[".as_slice()
            } else {
                b"BODY[".as_slice()
            });
            if let Some(s) = section {
                w.raw(s.as_bytes());
            }
            w.push(b']');
            if let Some((start, len)) = partial {
                w.raw(format!("<{start}.{len}>").as_bytes());
            }
        }
    }
}

/// Writes SEARCH criteria.
pub(super) fn write_search_criteria(w: &mut LineWriter, criteria: &SearchCriteria) {
    match criteria {
        SearchCriteria::All => w.raw(b"ALL"),
        SearchCriteria::Seen => w.raw(b"SEEN"),
        SearchCriteria::Unseen => w.raw(b"UNSEEN"),
        SearchCriteria::Flagged => w.raw(b"FLAGGED"),
        SearchCriteria::SequenceSet(set) => w.raw(set.to_string().as_bytes()),
        SearchCriteria::UidSet(set) => {
            w.raw(b"UID ");
            w.raw(set.to_string().as_bytes());
        }
        SearchCriteria::Subject(s) => keyed(w, b"SUBJECT ", s),
        SearchCriteria::From(s) => keyed(w, b"FROM ", s),
        SearchCriteria::To(s) => keyed(w, b"TO ", s),
        SearchCriteria::Body(s) => keyed(w, b"BODY ", s),
        SearchCriteria::Text(s) => keyed(w, b"TEXT ", s),
        SearchCriteria::Since(date) => keyed(w, b"SINCE ", date),
        SearchCriteria::Before(date) => keyed(w, b"BEFORE ", date),
        SearchCriteria::Header(name, value) => {
            keyed(w, b"HEADER ", name);
            w.push(b' ');
            w.astring(value);
        }
        SearchCriteria::And(list) => {
            for (i, c) in list.iter().enumerate() {
                if i > 0 {
                    w.push(b' ');
                }
                write_search_criteria(w, c);
            }
        }
        SearchCriteria::Or(a, b) => {
            w.raw(b"OR ");
            write_nested(w, a);
            w.push(b' ');
            write_nested(w, b);
        }
        SearchCriteria::Not(c) => {
            w.raw(b"NOT ");
            write_nested(w, c);
        }
    }
}

/// OR/NOT take a single key, so a conjunction has to be parenthesised.
fn write_nested(w: &mut LineWriter, criteria: &SearchCriteria) {
    if let SearchCriteria::And(list) = criteria
        && list.len() > 1
    {
        w.push(b'(');
        write_search_criteria(w, criteria);
        w.push(b')');
    } else {
        write_search_criteria(w, criteria);
    }
}

fn keyed(w: &mut LineWriter, key: &[u8], value: &str) {
    w.raw(key);
    w.astring(value);
}
