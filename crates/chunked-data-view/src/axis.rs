//! Axes: output dimensions built from request keywords.

use mars_request::Request;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};

pub use mars_request::Parameter;

/// User-facing description of one axis before it is bound to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisDefinition {
    /// Keywords combined into this axis, slowest varying first.
    pub keys: Vec<String>,

    /// Retrieve every element with its own query.
    #[serde(default = "default_chunked")]
    pub chunked: bool,
}

fn default_chunked() -> bool {
    true
}

impl AxisDefinition {
    pub fn new<I, S>(keys: I, chunked: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            chunked,
        }
    }

    /// An axis whose elements are fetched one query each.
    pub fn chunked<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(keys, true)
    }

    /// An axis fetched whole in a single query.
    pub fn bulk<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(keys, false)
    }
}

/// One dimension of a part: the cartesian product of its parameters' values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    parameters: Vec<Parameter>,
    chunked: bool,
}

impl Axis {
    pub fn new(parameters: Vec<Parameter>, chunked: bool) -> Self {
        Self { parameters, chunked }
    }

    /// Bind a definition to the values `request` gives its keywords.
    pub fn from_definition(definition: &AxisDefinition, request: &Request) -> Result<Self> {
        if definition.keys.is_empty() {
            return Err(ViewError::config("axis definition names no keyword"));
        }

        let parameters = definition
            .keys
            .iter()
            .map(|key| {
                let name = key.trim().to_lowercase();
                request.parameter(&name).cloned().ok_or_else(|| {
                    ViewError::config(format!(
                        "axis keyword '{}' is not part of request {}",
                        name, request
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let axis = Self::new(parameters, definition.chunked);
        if axis.checked_size().is_none() {
            return Err(ViewError::config(format!(
                "axis {} has more elements than can be addressed",
                axis.keywords().collect::<Vec<_>>().join("*")
            )));
        }
        Ok(axis)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// Number of elements along the axis.
    pub fn size(&self) -> usize {
        self.parameters.iter().map(Parameter::count).product()
    }

    /// Number of elements, or `None` if it does not fit a `usize`.
    pub fn checked_size(&self) -> Option<usize> {
        self.parameters
            .iter()
            .try_fold(1usize, |size, p| size.checked_mul(p.count()))
    }

    /// True if `keyword` is one of this axis' parameters.
    pub fn covers(&self, keyword: &str) -> bool {
        self.parameters.iter().any(|p| p.name() == keyword)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(Parameter::name)
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.keywords().collect();
        write!(
            f,
            "{}[{}]{}",
            names.join("*"),
            self.size(),
            if self.chunked { "" } else { " (bulk)" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_is_product() {
        let request = Request::parse("date=20200101/20200102,time=0/6/12,param=t").unwrap();
        let axis =
            Axis::from_definition(&AxisDefinition::chunked(["date", "time"]), &request).unwrap();
        assert_eq!(axis.size(), 6);
        assert!(axis.is_chunked());
        assert!(axis.covers("time"));
        assert!(!axis.covers("param"));
        assert_eq!(axis.to_string(), "date*time[6]");
    }

    #[test]
    fn test_checked_size_overflow() {
        let values = |n: usize| (0..n).map(|i| i.to_string()).collect::<Vec<_>>();
        let params: Vec<Parameter> = (0..4)
            .map(|i| Parameter::new(format!("k{}", i), values(100_000)))
            .collect();
        let axis = Axis::new(params, true);
        assert_eq!(axis.checked_size(), None);

        let small = Axis::new(vec![Parameter::new("k", values(3))], false);
        assert_eq!(small.checked_size(), Some(3));
    }

    #[test]
    fn test_unknown_keyword() {
        let request = Request::parse("date=20200101").unwrap();
        let err = Axis::from_definition(&AxisDefinition::bulk(["step"]), &request).unwrap_err();
        assert!(matches!(err, ViewError::Config(_)));
    }

    #[test]
    fn test_definition_from_yaml_defaults_to_chunked() {
        let def: AxisDefinition = serde_yaml::from_str("keys: [date, time]").unwrap();
        assert_eq!(def, AxisDefinition::chunked(["date", "time"]));

        let def: AxisDefinition = serde_yaml::from_str("keys: [step]\nchunked: false").unwrap();
        assert!(!def.chunked);
    }
}
