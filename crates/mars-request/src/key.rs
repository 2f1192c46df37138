//! Record keys.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RequestError, Result};
use crate::types::KeywordType;

/// Complete identification of one stored record: keyword → single value.
///
/// Values are canonical. Keywords are kept sorted, so two keys with the same
/// content compare, hash and print identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(BTreeMap<String, String>);

impl Key {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `k=v,k=v,...`. Multiple values (`a/b`) are rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let mut key = Self::new();
        for clause in text.split(',').map(str::trim) {
            let (name, value) = clause.split_once('=').ok_or_else(|| {
                RequestError::syntax(text, format!("expected key=value, found '{}'", clause))
            })?;
            if value.contains('/') {
                return Err(RequestError::syntax(
                    text,
                    format!("key '{}' must have exactly one value", name.trim()),
                ));
            }
            let name = name.trim().to_lowercase();
            if key.0.contains_key(&name) {
                return Err(RequestError::DuplicateKeyword(name));
            }
            key.insert(&name, value)?;
        }
        Ok(key)
    }

    /// Build a key from (keyword, value) pairs, canonicalising every value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut key = Self::new();
        for (name, value) in pairs {
            key.insert(name.as_ref(), value.as_ref())?;
        }
        Ok(key)
    }

    pub(crate) fn from_canonical_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Set `name` to `value` (canonicalised), replacing any previous value.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<()> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(RequestError::invalid_value(name, value, "empty keyword"));
        }
        let value = KeywordType::for_keyword(&name).canonicalise(&name, value)?;
        self.0.insert(name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Key {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}
