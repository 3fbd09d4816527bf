//! Cache Value Module
//!
//! Payload types stored inside a node and the compression flag that travels
//! with reads and writes.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};

// == Value ==
/// A stored cache payload.
///
/// Untagged so that JSON numbers map to `Int`, strings to `Text` and byte
/// arrays to `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Coerces the value for counter arithmetic.
    ///
    /// Text holding a decimal integer counts as that integer. Anything else
    /// is not a number.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Bytes(_) => None,
        }
    }

    /// Returns the text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

// == Compression ==
/// Compression applied to a serialized node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Zlib,
}

impl Compression {
    /// Legacy integer flag. `0` is uncompressed, anything else is zlib.
    pub fn from_flag(flag: i64) -> Self {
        if flag == 0 {
            Compression::None
        } else {
            Compression::Zlib
        }
    }

    pub fn from_bool(compress: bool) -> Self {
        if compress {
            Compression::Zlib
        } else {
            Compression::None
        }
    }

    pub fn is_compressed(self) -> bool {
        self == Compression::Zlib
    }

    /// Compresses `bytes` according to this flag.
    pub fn encode(self, bytes: Vec<u8>) -> std::io::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(bytes),
            Compression::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&bytes)?;
                encoder.finish()
            }
        }
    }

    /// Reverses [`Compression::encode`].
    pub fn decode(self, bytes: Vec<u8>) -> std::io::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(bytes),
            Compression::Zlib => {
                let mut decoder = ZlibDecoder::new(&bytes[..]);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out)?;
                Ok(out)
            }
        }
    }
}
