//! Model sources: where digit-network weights come from.
//!
//! Sources are tried in order and the first successful load wins. When every
//! source fails the caller synthesizes an untrained network of the same
//! shape, so acquisition never fails outright.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::{ClassifierError, ClassifierResult};
use crate::model::{weights_file, DigitNet, DigitNetConfig};
use crate::{InferBackend, InferDevice};

/// A place digit-network weights can be loaded from.
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Short description for logs.
    fn describe(&self) -> String;

    /// Load a network of shape `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights are unavailable or unreadable.
    async fn load(
        &self,
        config: &DigitNetConfig,
        device: &InferDevice,
    ) -> ClassifierResult<DigitNet<InferBackend>>;
}

/// Where the network in use came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOrigin {
    /// Loaded from the described source.
    Loaded(String),
    /// No source succeeded; weights are untrained.
    Synthesized,
}

impl ModelOrigin {
    /// Whether the weights are untrained.
    #[must_use]
    pub fn is_synthesized(&self) -> bool {
        matches!(self, Self::Synthesized)
    }
}

/// Weights stored in a local `.mpk.gz` file.
#[derive(Debug, Clone)]
pub struct FileModelSource {
    path: PathBuf,
}

impl FileModelSource {
    /// Source reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The configured path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ModelSource for FileModelSource {
    fn describe(&self) -> String {
        format!("file {}", weights_file(&self.path).display())
    }

    async fn load(
        &self,
        config: &DigitNetConfig,
        device: &InferDevice,
    ) -> ClassifierResult<DigitNet<InferBackend>> {
        let file = weights_file(&self.path);
        if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
            return Err(ClassifierError::NotFound(file));
        }

        let path = self.path.clone();
        let config = config.clone();
        let device = device.clone();
        tokio::task::spawn_blocking(move || {
            config
                .init::<InferBackend>(&device)
                .load_weights(&path, &device)
        })
        .await
        .map_err(|e| ClassifierError::Record(e.to_string()))?
    }
}

/// Weights downloaded over HTTP into a cache file, then loaded from it.
#[derive(Debug, Clone)]
pub struct RemoteModelSource {
    url: Url,
    cache_path: PathBuf,
    client: reqwest::Client,
}

impl RemoteModelSource {
    /// Default download timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Source fetching `url` into `cache_path`.
    #[must_use]
    pub fn new(url: Url, cache_path: impl Into<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            url,
            cache_path: cache_path.into(),
            client,
        }
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Download the weights into the cache file.
    async fn download(&self) -> ClassifierResult<PathBuf> {
        tracing::info!("Downloading digit model from {}", self.url);
        let bytes = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let file = weights_file(&self.cache_path);
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write beside the target and rename so a partial download is never
        // mistaken for a cached model.
        let partial = file.with_extension("partial");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &file).await?;
        tracing::debug!("Cached {} bytes of weights at {}", bytes.len(), file.display());
        Ok(file)
    }
}

#[async_trait]
impl ModelSource for RemoteModelSource {
    fn describe(&self) -> String {
        format!("url {}", self.url)
    }

    async fn load(
        &self,
        config: &DigitNetConfig,
        device: &InferDevice,
    ) -> ClassifierResult<DigitNet<InferBackend>> {
        self.download().await?;
        FileModelSource::new(&self.cache_path).load(config, device).await
    }
}

/// Try each source in order; synthesize untrained weights if all fail.
pub async fn acquire_model(
    sources: &[Box<dyn ModelSource>],
    config: &DigitNetConfig,
    device: &InferDevice,
) -> (DigitNet<InferBackend>, ModelOrigin) {
    for source in sources {
        let name = source.describe();
        match source.load(config, device).await {
            Ok(model) => {
                tracing::info!("Digit model loaded from {name}");
                return (model, ModelOrigin::Loaded(name));
            }
            Err(e) => tracing::warn!("Model source {name} unavailable, falling back: {e}"),
        }
    }

    tracing::warn!("No model source succeeded; using synthesized untrained network");
    (config.init::<InferBackend>(device), ModelOrigin::Synthesized)
}
