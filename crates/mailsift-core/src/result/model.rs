//! Result model types.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Layout of [`SearchResult::date_str`].
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One message found by a search, flattened for the caller.
///
/// Fields that the search did not fetch are left empty: recency searches
/// carry no `key`, `body` or `attachments`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// First From address.
    pub from: String,
    /// To addresses.
    pub to_emails: Vec<String>,
    /// Cc addresses.
    pub cc_emails: Vec<String>,
    /// Bcc addresses.
    pub bcc_emails: Vec<String>,
    /// Date as seconds since the Unix epoch, 0 if unknown.
    pub date: i64,
    /// Date in the sender's offset, formatted with [`DATE_FORMAT`].
    pub date_str: String,
    /// Date with its UTC offset.
    pub date_time: Option<DateTime<FixedOffset>>,
    /// Value of the configured key header.
    pub key: String,
    /// Decoded subject.
    pub title: String,
    /// Text of the last inline text part.
    pub body: String,
    /// Attachments in message order; duplicate names are kept.
    pub attachments: Vec<Attachment>,
    /// RFC822 size in bytes.
    pub size: u32,
    /// Flags, e.g. `\Seen`.
    pub flags: Vec<String>,
    /// Sequence number at fetch time.
    pub seq_num: u32,
}

/// An attachment's name and decoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Decoded filename, empty when the part had none.
    pub filename: String,
    /// Content with the transfer encoding removed. Base64 in JSON.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let result = SearchResult {
            from: "a@x.com".into(),
            title: "hello".into(),
            attachments: vec![Attachment {
                filename: "a.txt".into(),
                data: b"hi".to_vec(),
            }],
            seq_num: 3,
            ..SearchResult::default()
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["from"], "a@x.com");
        assert_eq!(json["to_emails"], serde_json::json!([]));
        assert_eq!(json["date_time"], serde_json::Value::Null);
        assert_eq!(json["attachments"][0]["filename"], "a.txt");
        assert_eq!(json["attachments"][0]["data"], "aGk=");
        assert_eq!(json["seq_num"], 3);

        let back: SearchResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
