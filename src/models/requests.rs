//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::cache::{Compression, Expiration, Value, MAX_KEY_LENGTH};

/// Expiration as sent over the wire: seconds or a relative-time expression.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExpirationInput {
    Seconds(u64),
    Number(f64),
    Expression(String),
}

impl From<ExpirationInput> for Expiration {
    fn from(input: ExpirationInput) -> Self {
        match input {
            ExpirationInput::Seconds(seconds) => Expiration::seconds(seconds),
            ExpirationInput::Number(seconds) => Expiration::from_secs_f64(seconds),
            ExpirationInput::Expression(expr) => Expiration::parse(&expr),
        }
    }
}

/// Request body for the SET and REPLACE operations (PUT /set, PUT /replace)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store
/// - `expiration`: Optional ttl (uses the cache default if not specified)
/// - `compress`: Optional compression switch (uses the cache default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional ttl
    #[serde(default)]
    pub expiration: Option<ExpirationInput>,
    /// Optional compression switch
    #[serde(default)]
    pub compress: Option<bool>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }

    pub fn expiration(&self) -> Option<Expiration> {
        self.expiration.clone().map(Expiration::from)
    }

    pub fn compression(&self) -> Option<Compression> {
        self.compress.map(Compression::from_bool)
    }
}

/// Request body for the batch GET operation (POST /get)
#[derive(Debug, Clone, Deserialize)]
pub struct GetManyRequest {
    pub keys: Vec<String>,
}

impl GetManyRequest {
    pub fn validate(&self) -> Option<String> {
        self.keys.iter().find_map(|key| validate_key(key))
    }
}

/// Query string for GET /get/:key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetQuery {
    #[serde(default)]
    pub compress: Option<bool>,
}

/// Query string for DELETE /del/:key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteQuery {
    /// Seconds until the key expires, 0 deletes immediately
    #[serde(default)]
    pub timeout: u64,
}

/// Query string for POST /incr/:key and POST /decr/:key
#[derive(Debug, Clone, Deserialize)]
pub struct AmountQuery {
    #[serde(default = "default_amount")]
    pub amount: i64,
}

impl Default for AmountQuery {
    fn default() -> Self {
        Self {
            amount: default_amount(),
        }
    }
}

fn default_amount() -> i64 {
    1
}

/// Returns an error message if `key` is not a usable cache key.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}
