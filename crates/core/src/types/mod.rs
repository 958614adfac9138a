//! Shared type definitions and newtypes

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a signed-in user.
///
/// Blank strings are rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidData("user id must not be empty".to_string()));
        }
        Ok(UserId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which a client keeps this user's accrual checkpoint
    pub fn checkpoint_key(&self) -> String {
        format!("session_start_{}", self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        UserId::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runes amount (the in-platform point currency)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Runes(pub i64);

impl Runes {
    pub fn new(amount: i64) -> Self {
        Runes(amount)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Runes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} runes", self.0)
    }
}
