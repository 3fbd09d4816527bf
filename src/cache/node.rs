//! Cache Node Module
//!
//! A node is one stored value with its label and expiration policy. It is
//! immutable once built; replacing a value builds a new node.
//!
//! Nodes serialize to a small framed binary format:
//!
//! ```text
//! "PHYN" | version u8 | label_len u32 | label | created i64
//!        | expires_tag u8 [expires i64] | content_tag u8 | content
//! ```
//!
//! Integers are little-endian, timestamps are unix milliseconds. Content is an
//! `i64` for integers and `len u32 | bytes` for text and raw bytes.

use chrono::{DateTime, Utc};

use crate::cache::{Expiration, Value};
use crate::error::{CacheError, Result};

const MAGIC: &[u8; 4] = b"PHYN";
const VERSION: u8 = 1;

const EXPIRES_NEVER: u8 = 0;
const EXPIRES_AT: u8 = 1;

const CONTENT_INT: u8 = 0;
const CONTENT_TEXT: u8 = 1;
const CONTENT_BYTES: u8 = 2;

// == Node ==
/// A single stored cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    label: String,
    created: DateTime<Utc>,
    expires: Option<DateTime<Utc>>,
    content: Value,
}

impl Node {
    // == Constructor ==
    /// Creates a node stamped with the current time.
    ///
    /// Fails only when a relative-time expression cannot be resolved.
    pub fn new(label: impl Into<String>, content: Value, expiration: &Expiration) -> Result<Self> {
        let created = now();
        let expires = expiration.resolve(created)?;
        Ok(Self {
            label: label.into(),
            created,
            expires,
            content,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Absolute expiry, `None` if the node never expires.
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn into_content(self) -> Value {
        self.content
    }

    // == Has Expired ==
    /// True once the expiry has passed. Nodes without expiry never expire.
    pub fn has_expired(&self) -> bool {
        match self.expires {
            Some(expires) => expires < Utc::now(),
            None => false,
        }
    }

    // == Encode ==
    /// Fails for labels or payloads whose length does not fit the `u32`
    /// length prefix.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(32 + self.label.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        put_bytes(&mut out, self.label.as_bytes())?;
        out.extend_from_slice(&self.created.timestamp_millis().to_le_bytes());

        match self.expires {
            Some(expires) => {
                out.push(EXPIRES_AT);
                out.extend_from_slice(&expires.timestamp_millis().to_le_bytes());
            }
            None => out.push(EXPIRES_NEVER),
        }

        match &self.content {
            Value::Int(n) => {
                out.push(CONTENT_INT);
                out.extend_from_slice(&n.to_le_bytes());
            }
            Value::Text(s) => {
                out.push(CONTENT_TEXT);
                put_bytes(&mut out, s.as_bytes())?;
            }
            Value::Bytes(b) => {
                out.push(CONTENT_BYTES);
                put_bytes(&mut out, b)?;
            }
        }
        Ok(out)
    }

    // == Decode ==
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { bytes, pos: 0 };

        if reader.take(MAGIC.len())? != MAGIC {
            return Err(CacheError::Corrupt("bad magic".to_string()));
        }
        let version = reader.u8()?;
        if version != VERSION {
            return Err(CacheError::Corrupt(format!("unsupported version {version}")));
        }

        let label = reader.string()?;
        let created = reader.timestamp()?;
        let expires = match reader.u8()? {
            EXPIRES_NEVER => None,
            EXPIRES_AT => Some(reader.timestamp()?),
            tag => return Err(CacheError::Corrupt(format!("bad expires tag {tag}"))),
        };
        let content = match reader.u8()? {
            CONTENT_INT => Value::Int(reader.i64()?),
            CONTENT_TEXT => Value::Text(reader.string()?),
            CONTENT_BYTES => Value::Bytes(reader.bytes()?.to_vec()),
            tag => return Err(CacheError::Corrupt(format!("bad content tag {tag}"))),
        };

        if reader.pos != bytes.len() {
            return Err(CacheError::Corrupt("trailing bytes".to_string()));
        }

        Ok(Self {
            label,
            created,
            expires,
            content,
        })
    }
}

// == Utility Functions ==
/// Current time truncated to the millisecond resolution nodes are stored at.
fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    out.extend_from_slice(&length_prefix(bytes.len())?);
    out.extend_from_slice(bytes);
    Ok(())
}

/// `u32` little-endian length prefix. Payloads of 4 GiB or more are rejected.
fn length_prefix(len: usize) -> Result<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| CacheError::Corrupt(format!("payload of {len} bytes is too large to store")))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| CacheError::Corrupt("truncated node".to_string()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(buf))
    }

    fn bytes(&mut self) -> Result<&'a [u8]> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        let len = u32::from_le_bytes(buf) as usize;
        self.take(len)
    }

    fn string(&mut self) -> Result<String> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| CacheError::Corrupt(e.to_string()))
    }

    fn timestamp(&mut self) -> Result<DateTime<Utc>> {
        let millis = self.i64()?;
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| CacheError::Corrupt(format!("timestamp out of range: {millis}")))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_node_creation_never_expires() {
        let node = Node::new("a", Value::Int(123), &Expiration::Never).unwrap();

        assert_eq!(node.label(), "a");
        assert_eq!(node.content(), &Value::Int(123));
        assert!(node.expires().is_none());
        assert!(!node.has_expired());
    }

    #[test]
    fn test_node_numeric_ttl() {
        let node = Node::new("a", Value::Int(1), &Expiration::Seconds(60)).unwrap();

        let expires = node.expires().unwrap();
        assert_eq!(expires - node.created(), chrono::Duration::seconds(60));
        assert!(!node.has_expired());
    }

    #[test]
    fn test_node_relative_ttl() {
        let node = Node::new("a", Value::Int(1), &Expiration::parse("+1 day")).unwrap();

        let expires = node.expires().unwrap();
        assert_eq!(expires - node.created(), chrono::Duration::days(1));
    }

    #[test]
    fn test_node_invalid_relative_ttl() {
        let result = Node::new("a", Value::Int(1), &Expiration::parse("whenever"));
        assert!(matches!(result, Err(CacheError::InvalidExpiration(_))));
    }

    #[test]
    fn test_node_expiration() {
        let node = Node::new("a", Value::from("v"), &Expiration::Seconds(1)).unwrap();
        assert!(!node.has_expired());

        sleep(Duration::from_millis(1100));

        assert!(node.has_expired());
    }

    #[test]
    fn test_node_in_the_past_is_expired() {
        let node = Node::new("a", Value::from("v"), &Expiration::parse("-1 hour")).unwrap();
        assert!(node.has_expired());
    }

    #[test]
    fn test_encoding_keeps_every_field() {
        for content in [
            Value::Int(-42),
            Value::from("hello"),
            Value::Bytes(vec![0, 1, 2, 255]),
            Value::from(""),
        ] {
            let node = Node::new("label", content, &Expiration::Seconds(30)).unwrap();
            let decoded = Node::from_bytes(&node.to_bytes().unwrap()).unwrap();
            assert_eq!(decoded, node);
        }
    }

    #[test]
    fn test_encoding_distinguishes_never_from_epoch() {
        let never = Node::new("k", Value::Int(1), &Expiration::Never).unwrap();
        let mut epoch = never.clone();
        epoch.expires = DateTime::from_timestamp_millis(0);

        let never = Node::from_bytes(&never.to_bytes().unwrap()).unwrap();
        let epoch = Node::from_bytes(&epoch.to_bytes().unwrap()).unwrap();

        assert_eq!(never.expires(), None);
        assert_eq!(epoch.expires(), DateTime::from_timestamp_millis(0));
        assert!(epoch.has_expired());
        assert!(!never.has_expired());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Node::from_bytes(b"").is_err());
        assert!(Node::from_bytes(b"XXXX\x01").is_err());

        let node = Node::new("k", Value::from("value"), &Expiration::Never).unwrap();
        let bytes = node.to_bytes().unwrap();
        assert!(Node::from_bytes(&bytes[..bytes.len() - 1]).is_err());

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(Node::from_bytes(&trailing).is_err());
    }

    #[test]
    fn test_length_prefix_rejects_oversized_payloads() {
        assert_eq!(length_prefix(5).unwrap(), 5u32.to_le_bytes());
        assert_eq!(length_prefix(u32::MAX as usize).unwrap(), u32::MAX.to_le_bytes());

        let too_long = (u32::MAX as u64 + 1) as usize;
        if too_long != 0 {
            assert!(matches!(length_prefix(too_long), Err(CacheError::Corrupt(_))));
        }
    }
}
