//! # Scribble Classifier
//!
//! Handwritten-digit classifier: a small convolutional network built with
//! `burn` on the CPU `ndarray` backend.
//!
//! ## Model Acquisition
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            SharedClassifier (lazy)          │
//! ├─────────────┬─────────────┬─────────────────┤
//! │ Model file  │ Cached /    │ Synthesized     │
//! │ (local)     │ remote URL  │ (untrained)     │
//! └─────────────┴─────────────┴─────────────────┘
//! ```
//!
//! Sources are tried left to right; the first that loads wins.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classifier;
pub mod error;
pub mod lazy;
pub mod model;
pub mod source;

pub use classifier::{ClassifierConfig, Classify, DigitClassifier};
pub use error::{ClassifierError, ClassifierResult};
pub use lazy::SharedClassifier;
pub use model::{weights_file, DigitNet, DigitNetConfig, WEIGHTS_EXTENSION};
pub use source::{acquire_model, FileModelSource, ModelOrigin, ModelSource, RemoteModelSource};

/// Inference backend: CPU `ndarray`.
pub type InferBackend = burn::backend::NdArray;

/// Device of [`InferBackend`].
pub type InferDevice = burn::backend::ndarray::NdArrayDevice;
