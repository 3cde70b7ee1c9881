//! The classifier adapter: raster image in, ten probabilities out.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use burn::prelude::*;
use scribble_core::DIGIT_CLASSES;
use scribble_raster::{RasterImage, IMAGE_SIZE, PIXEL_COUNT};
use url::Url;

use crate::error::{ClassifierError, ClassifierResult};
use crate::model::{DigitNet, DigitNetConfig};
use crate::source::{acquire_model, FileModelSource, ModelOrigin, ModelSource, RemoteModelSource};
use crate::{InferBackend, InferDevice};

/// Anything that turns a raster image into a digit distribution.
#[async_trait]
pub trait Classify: Send + Sync {
    /// Probability per digit class, in class order.
    ///
    /// Never fails: on internal error the distribution is all zeros, which
    /// the recognition policy maps to "no recognition".
    async fn classify(&self, image: &RasterImage) -> [f32; DIGIT_CLASSES];
}

/// Where to look for weights and how to build the network.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Local weights file tried first.
    pub model_path: Option<PathBuf>,
    /// Remote weights downloaded when no local copy loads.
    pub model_url: Option<Url>,
    /// Download cache location.
    pub cache_path: PathBuf,
    /// Network shape.
    pub network: DigitNetConfig,
    /// Run one inference on a blank image right after loading.
    pub warm_up: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model_url: None,
            cache_path: PathBuf::from(".scribble-cache/digits"),
            network: DigitNetConfig::new(),
            warm_up: true,
        }
    }
}

impl ClassifierConfig {
    /// Ordered source list: configured file, cached download, remote URL.
    #[must_use]
    pub fn sources(&self) -> Vec<Box<dyn ModelSource>> {
        let mut sources: Vec<Box<dyn ModelSource>> = Vec::new();
        if let Some(path) = &self.model_path {
            sources.push(Box::new(FileModelSource::new(path)));
        }
        if let Some(url) = &self.model_url {
            sources.push(Box::new(FileModelSource::new(&self.cache_path)));
            sources.push(Box::new(RemoteModelSource::new(
                url.clone(),
                &self.cache_path,
            )));
        }
        sources
    }
}

/// A loaded digit network, ready for inference.
///
/// The network is shared read-only; inference runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct DigitClassifier {
    model: Arc<Mutex<DigitNet<InferBackend>>>,
    device: InferDevice,
    origin: ModelOrigin,
    inferences: Arc<AtomicU64>,
}

impl DigitClassifier {
    /// Load from the sources `config` describes.
    pub async fn load(config: &ClassifierConfig) -> Self {
        Self::from_sources(&config.sources(), config).await
    }

    /// Load from an explicit source list, falling back to synthesized weights.
    pub async fn from_sources(sources: &[Box<dyn ModelSource>], config: &ClassifierConfig) -> Self {
        let device = InferDevice::default();
        let (model, origin) = acquire_model(sources, &config.network, &device).await;
        let classifier = Self::from_model(model, origin, device);
        if config.warm_up {
            classifier.warm_up().await;
        }
        classifier
    }

    /// Wrap an already-built network.
    #[must_use]
    pub fn from_model(model: DigitNet<InferBackend>, origin: ModelOrigin, device: InferDevice) -> Self {
        Self {
            model: Arc::new(Mutex::new(model)),
            device,
            origin,
            inferences: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Where the weights came from.
    #[must_use]
    pub const fn origin(&self) -> &ModelOrigin {
        &self.origin
    }

    /// Synchronous inference.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Inference`] if the forward pass fails.
    pub fn predict(&self, image: &RasterImage) -> ClassifierResult<[f32; DIGIT_CLASSES]> {
        let probabilities = run_inference(&self.model, image.pixels().to_vec(), &self.device)?;
        self.inferences.fetch_add(1, Ordering::Relaxed);
        Ok(probabilities)
    }

    /// Forward passes completed so far, warm-up included.
    #[must_use]
    pub fn inference_count(&self) -> u64 {
        self.inferences.load(Ordering::Relaxed)
    }

    async fn warm_up(&self) {
        let probabilities = self.classify(&RasterImage::blank()).await;
        tracing::debug!("Classifier warm-up done: {probabilities:?}");
    }
}

#[async_trait]
impl Classify for DigitClassifier {
    async fn classify(&self, image: &RasterImage) -> [f32; DIGIT_CLASSES] {
        let model = Arc::clone(&self.model);
        let device = self.device.clone();
        let pixels = image.pixels().to_vec();

        match tokio::task::spawn_blocking(move || run_inference(&model, pixels, &device)).await {
            Ok(Ok(probabilities)) => {
                self.inferences.fetch_add(1, Ordering::Relaxed);
                probabilities
            }
            Ok(Err(e)) => {
                tracing::warn!("Digit inference failed: {e}");
                [0.0; DIGIT_CLASSES]
            }
            Err(e) => {
                tracing::warn!("Digit inference task aborted: {e}");
                [0.0; DIGIT_CLASSES]
            }
        }
    }
}

fn run_inference(
    model: &Mutex<DigitNet<InferBackend>>,
    pixels: Vec<f32>,
    device: &InferDevice,
) -> ClassifierResult<[f32; DIGIT_CLASSES]> {
    if pixels.len() != PIXEL_COUNT {
        return Err(ClassifierError::Inference(format!(
            "expected {PIXEL_COUNT} pixels, got {}",
            pixels.len()
        )));
    }

    let model = model
        .lock()
        .map_err(|_| ClassifierError::Inference("model lock poisoned".to_string()))?;
    let input = Tensor::<InferBackend, 4>::from_data(
        TensorData::new(pixels, [1, 1, IMAGE_SIZE, IMAGE_SIZE]),
        device,
    );
    let values = model
        .probabilities(input)
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| ClassifierError::Inference(format!("{e:?}")))?;

    values.try_into().map_err(|v: Vec<f32>| {
        ClassifierError::Inference(format!("expected {DIGIT_CLASSES} classes, got {}", v.len()))
    })
}
