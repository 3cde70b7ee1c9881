//! Process-wide classifier built once, on first use.
//!
//! Callers arriving while the model is still loading wait on the same
//! in-flight initialization; only one load ever runs.

use std::sync::Arc;

use async_trait::async_trait;
use scribble_core::DIGIT_CLASSES;
use scribble_raster::RasterImage;
use tokio::sync::OnceCell;

use crate::classifier::{ClassifierConfig, Classify, DigitClassifier};
use crate::source::ModelSource;

/// Lazily initialized, shareable [`DigitClassifier`] handle.
pub struct SharedClassifier {
    config: ClassifierConfig,
    sources: Vec<Box<dyn ModelSource>>,
    cell: OnceCell<Arc<DigitClassifier>>,
}

impl std::fmt::Debug for SharedClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedClassifier")
            .field("sources", &self.sources.len())
            .field("initialized", &self.cell.initialized())
            .finish_non_exhaustive()
    }
}

impl SharedClassifier {
    /// Handle loading from the sources `config` describes.
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        let sources = config.sources();
        Self::with_sources(config, sources)
    }

    /// Handle loading from an explicit source list.
    #[must_use]
    pub fn with_sources(config: ClassifierConfig, sources: Vec<Box<dyn ModelSource>>) -> Self {
        Self {
            config,
            sources,
            cell: OnceCell::new(),
        }
    }

    /// The classifier, loading it on first call.
    pub async fn get(&self) -> Arc<DigitClassifier> {
        self.cell
            .get_or_init(|| async {
                tracing::info!("Initializing digit classifier");
                Arc::new(DigitClassifier::from_sources(&self.sources, &self.config).await)
            })
            .await
            .clone()
    }

    /// Whether initialization has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl Classify for SharedClassifier {
    async fn classify(&self, image: &RasterImage) -> [f32; DIGIT_CLASSES] {
        self.get().await.classify(image).await
    }
}
