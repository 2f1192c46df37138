//! Requests: keyword → set of values.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{RequestError, Result};
use crate::key::Key;
use crate::parser;
use crate::types::KeywordType;

/// A keyword together with its ordered list of values.
///
/// The position of a value in the list is its index along the parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    values: Vec<String>,
}

impl Parameter {
    /// Create a parameter. Values are taken as given (already canonical).
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of values.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Position of `value` in the value list.
    pub fn position(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

/// A parsed request.
///
/// Keywords keep the order in which they first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    verb: Option<String>,
    params: Vec<Parameter>,
}

impl Request {
    /// Create an empty request without a verb.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `[verb,]key=v1/v2/...,key=...`.
    pub fn parse(text: &str) -> Result<Self> {
        parser::parse_request(text)
    }

    pub fn verb(&self) -> Option<&str> {
        self.verb.as_deref()
    }

    pub fn set_verb(&mut self, verb: impl Into<String>) {
        self.verb = Some(verb.into());
    }

    /// Values of `name`, `None` if the keyword is absent.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.parameter(name).map(Parameter::values)
    }

    /// Number of values of `name` (0 when absent).
    pub fn count(&self, name: &str) -> usize {
        self.parameter(name).map_or(0, Parameter::count)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    /// Keyword names in request order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.parameter(name).is_some()
    }

    /// Replace the values of `name`, appending the keyword if it is absent.
    ///
    /// Values are canonicalised according to the keyword's type.
    pub fn set_values<I, S>(&mut self, name: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.trim().to_lowercase();
        let kind = KeywordType::for_keyword(&name);
        let values = values
            .into_iter()
            .map(|v| kind.canonicalise(&name, v.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        if values.is_empty() {
            return Err(RequestError::invalid_value(&name, "", "keyword needs at least one value"));
        }

        match self.params.iter_mut().find(|p| p.name == name) {
            Some(param) => param.values = values,
            None => self.params.push(Parameter::new(name, values)),
        }
        Ok(())
    }

    /// Set `name` to the single value `value`.
    pub fn set_value(&mut self, name: &str, value: &str) -> Result<()> {
        self.set_values(name, [value])
    }

    /// Remove a keyword, returning its parameter.
    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        let pos = self.params.iter().position(|p| p.name == name)?;
        Some(self.params.remove(pos))
    }

    /// True if every keyword of this request is present in `key` with one of
    /// the requested values. Keywords of the key absent here are unconstrained.
    pub fn matches(&self, key: &Key) -> bool {
        self.params.iter().all(|param| {
            key.get(&param.name)
                .is_some_and(|value| param.values.iter().any(|v| v == value))
        })
    }

    /// Number of distinct keys this request describes.
    pub fn cardinality(&self) -> usize {
        self.params.iter().map(Parameter::count).product()
    }

    /// Every key described by this request, last keyword varying fastest.
    pub fn expand(&self) -> Vec<Key> {
        if self.params.is_empty() {
            return Vec::new();
        }

        self.params
            .iter()
            .map(|p| p.values.iter())
            .multi_cartesian_product()
            .map(|combination| {
                let pairs = self
                    .params
                    .iter()
                    .zip(combination)
                    .map(|(p, v)| (p.name.clone(), v.clone()));
                Key::from_canonical_pairs(pairs)
            })
            .collect()
    }

    pub(crate) fn push_parameter(&mut self, param: Parameter) {
        self.params.push(param);
    }
}

impl FromStr for Request {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if let Some(verb) = &self.verb {
            write!(f, "{}", verb)?;
            first = false;
        }
        for param in &self.params {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}={}", param.name, param.values.join("/"))?;
            first = false;
        }
        Ok(())
    }
}
