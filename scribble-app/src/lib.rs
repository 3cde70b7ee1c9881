//! # Scribble App
//!
//! Wires the pipeline together for one level of the written-calculation
//! exercise and hosts the `scribble` command-line tool.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                Orchestrator                 │
//! │  timers · event channel · classifier calls  │
//! ├─────────────────────────────────────────────┤
//! │                  Exercise                   │
//! │ surface phase · tickets · collaborator cues │
//! ├───────────────┬─────────────────┬───────────┤
//! │ scribble-core │ scribble-raster │ classifier│
//! └───────────────┴─────────────────┴───────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! scribble validate --levels levels.json
//! scribble play --level add-1
//! scribble classify --strokes content/strokes/seven.json --model-path models/digits.mpk.gz
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod exercise;
pub mod orchestrator;
pub mod render;

pub use error::{ExerciseError, ExerciseResult};
pub use exercise::{
    Exercise, ExerciseConfig, RecognitionOutcome, RecognitionRequest, RecognitionTicket,
    SurfacePhase,
};
pub use orchestrator::{ExerciseEvent, Orchestrator};

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scribble_classifier::ClassifierConfig;
use scribble_core::{CoreResult, LevelCatalog};
use url::Url;

/// Levels bundled with the binary.
pub const DEFAULT_LEVELS: &str = include_str!("../content/levels.json");

/// Command-line arguments for `scribble`.
#[derive(Debug, Clone, Parser)]
#[command(name = "scribble")]
#[command(about = "Handwritten-digit written-calculation exercise")]
#[command(version)]
pub struct CliArgs {
    /// Local digit model weights (`.mpk.gz`)
    #[arg(long, global = true, env = "SCRIBBLE_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Remote digit model weights, downloaded into the cache
    #[arg(long, global = true, env = "SCRIBBLE_MODEL_URL")]
    pub model_url: Option<Url>,

    /// Download cache for remote weights
    #[arg(long, global = true, env = "SCRIBBLE_MODEL_CACHE")]
    pub model_cache: Option<PathBuf>,

    /// Seed for problem generation (random when omitted)
    #[arg(long, global = true, env = "SCRIBBLE_SEED")]
    pub seed: Option<u64>,

    /// Level catalogue JSON (bundled levels when omitted)
    #[arg(long, global = true)]
    pub levels: Option<PathBuf>,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// `scribble` subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print problems generated for a level
    Generate {
        /// Level id
        #[arg(long)]
        level: String,
        /// Number of problems
        #[arg(long, default_value = "5")]
        count: u32,
    },
    /// Check every level in the catalogue is well-formed and satisfiable
    Validate,
    /// Rasterize a stroke file and preview the 28x28 image
    Rasterize {
        /// Stroke set JSON (`{"canvas": .., "paths": ..}`)
        #[arg(long)]
        strokes: PathBuf,
        /// Also write the image as PNG
        #[arg(long)]
        png: Option<PathBuf>,
    },
    /// Classify a stroke file and show the recognition decision
    Classify {
        /// Stroke set JSON
        #[arg(long)]
        strokes: PathBuf,
    },
    /// Play a level in the terminal
    Play {
        /// Level id
        #[arg(long)]
        level: String,
    },
}

/// Resolved application configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Model acquisition.
    pub classifier: ClassifierConfig,
    /// Exercise tunables.
    pub exercise: ExerciseConfig,
    /// Generation seed.
    pub seed: Option<u64>,
    /// Catalogue file; bundled levels when `None`.
    pub levels_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load the configured catalogue.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn catalog(&self) -> CoreResult<LevelCatalog> {
        match &self.levels_path {
            Some(path) => LevelCatalog::from_path(path),
            None => LevelCatalog::from_json(DEFAULT_LEVELS),
        }
    }
}

impl From<&CliArgs> for AppConfig {
    fn from(args: &CliArgs) -> Self {
        let mut classifier = ClassifierConfig {
            model_path: args.model_path.clone(),
            model_url: args.model_url.clone(),
            ..ClassifierConfig::default()
        };
        if let Some(cache) = &args.model_cache {
            classifier.cache_path.clone_from(cache);
        }
        Self {
            classifier,
            exercise: ExerciseConfig::default(),
            seed: args.seed,
            levels_path: args.levels.clone(),
        }
    }
}
