//! Step-by-step construction of a [`ChunkedDataView`].

use std::sync::Arc;

use field_store::FieldStore;
use mars_request::Request;
use tracing::debug;

use crate::axis::AxisDefinition;
use crate::config::{ViewConfig, ViewDefinition};
use crate::error::{Result, ViewError};
use crate::extractor::Extractor;
use crate::part::ViewPart;
use crate::view::ChunkedDataView;

struct PendingPart {
    request: String,
    axes: Vec<AxisDefinition>,
    extractor: Box<dyn Extractor>,
}

/// Collects parts and produces a validated view.
///
/// ```ignore
/// let view = ChunkedDataViewBuilder::new(store)
///     .add_part("date=20200101/20200102,param=t/u", axes_tu, Box::new(GribExtractor::new()))
///     .add_part("date=20200101/20200102,param=v", axes_v, Box::new(GribExtractor::new()))
///     .extend_on_axis(1)
///     .build()?;
/// ```
pub struct ChunkedDataViewBuilder {
    store: Arc<dyn FieldStore>,
    parts: Vec<PendingPart>,
    extension_axis: Option<usize>,
    config: ViewConfig,
}

impl ChunkedDataViewBuilder {
    /// All parts read from `store`.
    pub fn new(store: Arc<dyn FieldStore>) -> Self {
        Self {
            store,
            parts: Vec::new(),
            extension_axis: None,
            config: ViewConfig::default(),
        }
    }

    /// Builder populated from a YAML view definition.
    ///
    /// Without a `config` section the configuration comes from
    /// [`ViewConfig::from_env`].
    pub fn from_definition(definition: &ViewDefinition, store: Arc<dyn FieldStore>) -> Self {
        let config = definition.config.unwrap_or_else(ViewConfig::from_env);
        let mut builder = Self::new(store).with_config(config);
        for part in &definition.parts {
            builder = builder.add_part(
                part.request.clone(),
                part.axes.clone(),
                part.extractor.create(),
            );
        }
        if let Some(axis) = definition.extension_axis {
            builder = builder.extend_on_axis(axis);
        }
        builder
    }

    /// Add a part. The request is parsed when the view is built.
    pub fn add_part(
        mut self,
        request: impl Into<String>,
        axes: Vec<AxisDefinition>,
        extractor: Box<dyn Extractor>,
    ) -> Self {
        self.parts.push(PendingPart {
            request: request.into(),
            axes,
            extractor,
        });
        self
    }

    /// Concatenate parts along `axis`. Required with more than one part.
    pub fn extend_on_axis(mut self, axis: usize) -> Self {
        self.extension_axis = Some(axis);
        self
    }

    pub fn with_config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ChunkedDataView> {
        if self.parts.is_empty() {
            return Err(ViewError::config("no parts added to the view"));
        }
        if self.parts.len() > 1 && self.extension_axis.is_none() {
            return Err(ViewError::config(format!(
                "{} parts given but no extension axis set",
                self.parts.len()
            )));
        }
        self.config.validate().map_err(ViewError::Config)?;

        let store = self.store;
        let parts = self
            .parts
            .into_iter()
            .map(|pending| {
                let request = Request::parse(&pending.request)?;
                debug!(request = %request, axes = pending.axes.len(), "Building view part");
                ViewPart::new(request, &pending.axes, pending.extractor, Arc::clone(&store))
            })
            .collect::<Result<Vec<_>>>()?;

        ChunkedDataView::new(parts, self.extension_axis.unwrap_or(0), self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::GribExtractor;
    use test_utils::seeded_memory_store;

    fn grib() -> Box<dyn Extractor> {
        Box::new(GribExtractor::new())
    }

    #[test]
    fn test_build_without_parts() {
        let (store, _) = seeded_memory_store("step=0", 1);
        assert!(matches!(
            ChunkedDataViewBuilder::new(store).build(),
            Err(ViewError::Config(_))
        ));
    }

    #[test]
    fn test_multiple_parts_need_extension_axis() {
        let (store, _) = seeded_memory_store("step=0/6,param=t/u", 2);
        let err = ChunkedDataViewBuilder::new(store)
            .add_part("step=0/6,param=t", vec![AxisDefinition::chunked(["step"])], grib())
            .add_part("step=0/6,param=u", vec![AxisDefinition::chunked(["step"])], grib())
            .build()
            .unwrap_err();
        assert!(matches!(err, ViewError::Config(msg) if msg.contains("extension axis")));
    }

    #[test]
    fn test_single_part_rejects_out_of_range_extension_axis() {
        let (store, _) = seeded_memory_store("step=0/6", 2);
        let err = ChunkedDataViewBuilder::new(store)
            .add_part("step=0/6", vec![AxisDefinition::chunked(["step"])], grib())
            .extend_on_axis(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, ViewError::Config(_)));
    }

    #[test]
    fn test_invalid_request_text() {
        let (store, _) = seeded_memory_store("step=0/6", 2);
        let err = ChunkedDataViewBuilder::new(store)
            .add_part("step=0/6,", vec![AxisDefinition::chunked(["step"])], grib())
            .build()
            .unwrap_err();
        assert!(matches!(err, ViewError::Request(_)));
    }

    #[test]
    fn test_invalid_config() {
        let (store, _) = seeded_memory_store("step=0/6", 2);
        let err = ChunkedDataViewBuilder::new(store)
            .add_part("step=0/6", vec![AxisDefinition::chunked(["step"])], grib())
            .with_config(ViewConfig {
                fill_value: f32::NEG_INFINITY,
                ..ViewConfig::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, ViewError::Config(_)));
    }
}
