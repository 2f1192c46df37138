//! View configuration and YAML view definitions.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::axis::AxisDefinition;
use crate::error::{Result, ViewError};
use crate::extractor::ExtractorType;

/// What a chunk access does when some expected records are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    /// Return the chunk with fill values in the missing slots.
    #[default]
    Tolerate,
    /// Fail the access.
    Strict,
}

impl MissingFieldPolicy {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tolerate" => Some(Self::Tolerate),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tolerate => "tolerate",
            Self::Strict => "strict",
        }
    }
}

impl std::fmt::Display for MissingFieldPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime behaviour of a view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Handling of chunks with missing records.
    pub missing_fields: MissingFieldPolicy,

    /// Value of slots no record was written to.
    pub fill_value: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            missing_fields: MissingFieldPolicy::Tolerate,
            fill_value: f32::NAN,
        }
    }
}

impl ViewConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CDV_MISSING_FIELDS") {
            match MissingFieldPolicy::parse(&val) {
                Some(policy) => config.missing_fields = policy,
                None => warn!(value = %val, "Ignoring invalid CDV_MISSING_FIELDS"),
            }
        }

        if let Ok(val) = std::env::var("CDV_FILL_VALUE") {
            match val.trim().parse() {
                Ok(fill) => config.fill_value = fill,
                Err(_) => warn!(value = %val, "Ignoring invalid CDV_FILL_VALUE"),
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.fill_value.is_infinite() {
            return Err("fill_value must be finite or NaN".to_string());
        }
        Ok(())
    }
}

/// One part of a YAML view definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDefinition {
    /// Base request, e.g. `class=od,date=20200101/to/20200110,param=t`.
    pub request: String,

    pub axes: Vec<AxisDefinition>,

    #[serde(default)]
    pub extractor: ExtractorType,
}

/// A complete view described in YAML.
///
/// ```yaml
/// extension_axis: 1
/// config:
///   missing_fields: strict
/// parts:
///   - request: "date=20200101/20200102,param=t/u"
///     axes:
///       - keys: [date]
///       - keys: [param]
///   - request: "date=20200101/20200102,param=v"
///     axes:
///       - keys: [date]
///       - keys: [param]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub parts: Vec<PartDefinition>,

    #[serde(default)]
    pub extension_axis: Option<usize>,

    /// Runtime configuration; taken from the environment when absent.
    #[serde(default)]
    pub config: Option<ViewConfig>,
}

impl ViewDefinition {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| ViewError::definition(e.to_string()))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ViewError::definition(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }
}
