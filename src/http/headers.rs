//! Case-insensitive header collection shared by [`Request`](crate::http::request::Request)
//! and [`Response`](crate::http::response::Response).
//!
//! Names are folded to lower-case on every write and every read, so
//! `get("Content-Type")` and `get("content-type")` always agree. The last
//! `set` for a name wins. Entries are kept in an ordered map so serialization
//! follows insertion order, although callers must not rely on it.
//!
//! Values are stored as raw strings; no HTTP semantics are enforced here.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    headers: IndexMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    /// Builds a collection by calling [`Headers::set`] for every entry, so the
    /// same folding and validation applies.
    pub fn from_map<K, V, I>(entries: I) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut headers = Self::new();
        for (name, value) in entries {
            headers.set(name.as_ref(), value)?;
        }
        Ok(headers)
    }

    pub fn get(&self, name: &str) -> Result<Option<&str>> {
        let key = fold(name)?;
        Ok(self.headers.get(&key).map(String::as_str))
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let key = fold(name)?;
        self.headers.insert(key, value.into());
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// `name: value\r\n` lines, as written on the wire.
    pub fn stringify(&self) -> String {
        let mut result = String::new();
        for (name, value) in &self.headers {
            result.push_str(&format!("{}: {}\r\n", name, value));
        }
        result
    }
}

fn fold(name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(Error::MissingHeaderName);
    }
    Ok(name.to_lowercase())
}
