//! Classifier Integration Tests
//!
//! Tests model acquisition and the shared lazy handle:
//! - Ordered sources, first success wins, synthesized fallback
//! - A single in-flight initialization under concurrent callers
//! - Output is always a usable distribution

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scribble_classifier::{
    ClassifierConfig, ClassifierError, ClassifierResult, Classify, DigitClassifier, DigitNet,
    DigitNetConfig, FileModelSource, InferBackend, InferDevice, ModelOrigin, ModelSource,
    SharedClassifier,
};
use scribble_core::{CanvasSize, Path, Point};
use scribble_raster::{RasterImage, Rasterizer};

/// Source that counts how often it is asked to load and always fails.
struct CountingSource {
    loads: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl ModelSource for CountingSource {
    fn describe(&self) -> String {
        "counting".to_string()
    }

    async fn load(
        &self,
        _config: &DigitNetConfig,
        _device: &InferDevice,
    ) -> ClassifierResult<DigitNet<InferBackend>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Err(ClassifierError::Download("offline".to_string()))
    }
}

fn counting(loads: &Arc<AtomicUsize>) -> Box<dyn ModelSource> {
    Box::new(CountingSource {
        loads: Arc::clone(loads),
        delay: Duration::from_millis(50),
    })
}

fn quiet_config() -> ClassifierConfig {
    ClassifierConfig {
        warm_up: false,
        ..ClassifierConfig::default()
    }
}

fn drawn_seven() -> RasterImage {
    let path = Path::new(
        vec![
            Point::new(60.0, 60.0),
            Point::new(240.0, 60.0),
            Point::new(150.0, 250.0),
        ],
        0,
    )
    .unwrap();
    Rasterizer::new().rasterize(&[path], CanvasSize::new(300.0, 300.0))
}

// ============================================================================
// Source Fallback
// ============================================================================

#[tokio::test]
async fn test_all_sources_fail_synthesizes() {
    let loads = Arc::new(AtomicUsize::new(0));
    let sources = vec![counting(&loads), counting(&loads)];

    let classifier = DigitClassifier::from_sources(&sources, &quiet_config()).await;

    assert_eq!(loads.load(Ordering::SeqCst), 2);
    assert_eq!(classifier.origin(), &ModelOrigin::Synthesized);
}

#[tokio::test]
async fn test_first_success_wins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("digits");
    DigitNetConfig::new()
        .init::<InferBackend>(&InferDevice::default())
        .save_weights(&path)
        .unwrap();

    let loads = Arc::new(AtomicUsize::new(0));
    let sources = vec![
        counting(&loads),
        Box::new(FileModelSource::new(&path)) as Box<dyn ModelSource>,
        counting(&loads),
    ];

    let classifier = DigitClassifier::from_sources(&sources, &quiet_config()).await;

    assert_eq!(loads.load(Ordering::SeqCst), 1, "later sources must not be tried");
    assert!(!classifier.origin().is_synthesized());
}

// ============================================================================
// Lazy Shared Initialization
// ============================================================================

#[tokio::test]
async fn test_concurrent_callers_share_one_initialization() {
    let loads = Arc::new(AtomicUsize::new(0));
    let shared = Arc::new(SharedClassifier::with_sources(
        quiet_config(),
        vec![counting(&loads)],
    ));
    assert!(!shared.is_initialized());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move { shared.get().await })
        })
        .collect();
    let results: Vec<Arc<DigitClassifier>> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(shared.is_initialized());
    assert!(results.iter().all(|c| Arc::ptr_eq(c, &results[0])));
}

#[tokio::test]
async fn test_shared_classify_initializes_on_demand() {
    let loads = Arc::new(AtomicUsize::new(0));
    let shared = SharedClassifier::with_sources(ClassifierConfig::default(), vec![counting(&loads)]);

    let first = shared.classify(&drawn_seven()).await;
    let second = shared.classify(&RasterImage::blank()).await;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    // One warm-up at initialization, then the two calls above.
    assert_eq!(shared.get().await.inference_count(), 3);
    for probabilities in [first, second] {
        let total: f32 = probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-4, "sum {total}");
    }
}

// ============================================================================
// Output Shape
// ============================================================================

#[tokio::test]
async fn test_drawn_digit_yields_distribution() {
    let classifier = DigitClassifier::load(&quiet_config()).await;
    let probabilities = classifier.classify(&drawn_seven()).await;

    assert_eq!(probabilities.len(), 10);
    assert!(probabilities.iter().all(|p| p.is_finite() && *p >= 0.0));
    let total: f32 = probabilities.iter().sum();
    assert!((total - 1.0).abs() < 1e-4);
}
