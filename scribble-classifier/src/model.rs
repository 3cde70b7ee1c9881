//! The digit network.
//!
//! A small LeNet-style CNN over one 28×28 channel:
//!
//! ```text
//! [B,1,28,28] ─conv3×3─relu─pool─► [B,c1,13,13] ─conv3×3─relu─pool─► [B,c2,5,5]
//!             ─flatten─► [B,c2·25] ─linear─relu─► [B,hidden] ─linear─► [B,10]
//! ```
//!
//! Weights are stored with burn's `CompactRecorder` (`.mpk.gz`).

use std::path::{Path, PathBuf};

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;
use burn::record::{HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder};
use scribble_core::DIGIT_CLASSES;
use scribble_raster::IMAGE_SIZE;

use crate::error::ClassifierResult;

/// File extension the weights recorder writes.
pub const WEIGHTS_EXTENSION: &str = "mpk.gz";

/// Spatial side after the two conv + pool stages.
const FEATURE_SIDE: usize = ((IMAGE_SIZE - 2) / 2 - 2) / 2;

/// Network shape. Weights files only load into the shape they were saved from.
#[derive(Config, Debug)]
pub struct DigitNetConfig {
    /// Channels of the first convolution.
    #[config(default = 8)]
    pub conv1_channels: usize,
    /// Channels of the second convolution.
    #[config(default = 16)]
    pub conv2_channels: usize,
    /// Width of the hidden fully-connected layer.
    #[config(default = 64)]
    pub hidden_size: usize,
}

impl DigitNetConfig {
    /// Build a network with freshly initialized (untrained) weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> DigitNet<B> {
        let features = self.conv2_channels * FEATURE_SIDE * FEATURE_SIDE;
        DigitNet {
            conv1: Conv2dConfig::new([1, self.conv1_channels], [3, 3]).init(device),
            conv2: Conv2dConfig::new([self.conv1_channels, self.conv2_channels], [3, 3])
                .init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1: LinearConfig::new(features, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, DIGIT_CLASSES).init(device),
            activation: Relu::new(),
        }
    }
}

/// Convolutional digit classifier.
#[derive(Module, Debug)]
pub struct DigitNet<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    pool: MaxPool2d,
    fc1: Linear<B>,
    fc2: Linear<B>,
    activation: Relu,
}

impl<B: Backend> DigitNet<B> {
    /// `images: [batch, 1, 28, 28]` → logits `[batch, 10]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self
            .pool
            .forward(self.activation.forward(self.conv1.forward(images)));
        let x = self
            .pool
            .forward(self.activation.forward(self.conv2.forward(x)));
        let x = x.flatten::<2>(1, 3);
        let x = self.activation.forward(self.fc1.forward(x));
        self.fc2.forward(x)
    }

    /// Class probabilities: softmax over the logits.
    pub fn probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(images), 1)
    }

    /// Write the weights next to `path` (extension forced to `.mpk.gz`).
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub fn save_weights(self, path: &Path) -> ClassifierResult<()> {
        NamedMpkGzFileRecorder::<HalfPrecisionSettings>::new()
            .record(self.into_record(), record_stem(path))?;
        tracing::debug!(
            "Saved digit model weights to {}",
            weights_file(path).display()
        );
        Ok(())
    }

    /// Replace this network's weights with the ones stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be decoded.
    pub fn load_weights(self, path: &Path, device: &B::Device) -> ClassifierResult<Self> {
        let record = NamedMpkGzFileRecorder::<HalfPrecisionSettings>::new()
            .load(record_stem(path), device)?;
        Ok(self.load_record(record))
    }
}

/// The on-disk file a weights path refers to.
#[must_use]
pub fn weights_file(path: &Path) -> PathBuf {
    record_stem(path).with_extension(WEIGHTS_EXTENSION)
}

/// The recorder appends its own extension; strip ours if present.
fn record_stem(path: &Path) -> PathBuf {
    path.to_str()
        .and_then(|s| s.strip_suffix(".mpk.gz"))
        .map_or_else(|| path.to_path_buf(), PathBuf::from)
}
