//! Token claims.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim name for the issuance time.
pub(crate) const ISSUED_AT: &str = "iat";
/// Claim name for the expiry time.
pub(crate) const EXPIRES_AT: &str = "exp";
const SUBJECT: &str = "sub";

/// Claims carried by a token: arbitrary JSON values keyed by name.
///
/// The encoded claims segment is canonical regardless of insertion order;
/// see [`TokenService`](super::TokenService).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenClaims(Map<String, Value>);

impl TokenClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// The `sub` claim, if it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.get(SUBJECT).and_then(Value::as_str)
    }

    /// The `iat` claim, if it is an integer.
    pub fn issued_at(&self) -> Option<i64> {
        self.get(ISSUED_AT).and_then(Value::as_i64)
    }

    /// The `exp` claim, if it is an integer.
    pub fn expires_at(&self) -> Option<i64> {
        self.get(EXPIRES_AT).and_then(Value::as_i64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for TokenClaims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TokenClaims {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
