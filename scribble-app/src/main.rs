//! # Scribble
//!
//! Command-line front end: level tooling, raster previews, classifier
//! checks and a terminal version of the exercise.

use std::path::Path as FsPath;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use scribble_app::render::render_grid;
use scribble_app::{AppConfig, CliArgs, Command, Exercise, ExerciseEvent, Orchestrator};
use scribble_classifier::{Classify, DigitClassifier, SharedClassifier};
use scribble_core::{
    GeneratorConfig, LevelEvent, LevelSession, MessageTrigger, Messenger, NullProgress,
    ProblemGenerator, StrokeSet,
};
use scribble_raster::Rasterizer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with optional JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scribble_app=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    // RUST_LOG_FORMAT=json for machine-readable logs
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = AppConfig::from(&args);

    match args.command {
        Command::Generate { level, count } => generate(&config, &level, count),
        Command::Validate => validate(&config),
        Command::Rasterize { strokes, png } => rasterize(&config, &strokes, png.as_deref()),
        Command::Classify { strokes } => classify(&config, &strokes).await,
        Command::Play { level } => play(&config, &level).await,
    }
}

fn rng_for(config: &AppConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn load_strokes(path: &FsPath) -> anyhow::Result<StrokeSet> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read strokes from {}", path.display()))?;
    StrokeSet::from_json(&json).with_context(|| format!("invalid stroke file {}", path.display()))
}

fn generate(config: &AppConfig, level_id: &str, count: u32) -> anyhow::Result<()> {
    let catalog = config.catalog()?;
    let level = catalog.get(level_id)?;
    let generator = ProblemGenerator::new();
    let mut rng = rng_for(config);

    for _ in 0..count {
        let problem = generator.generate(level, &mut rng)?;
        println!("{problem}");
    }
    Ok(())
}

fn validate(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = config.catalog()?;
    let issues = catalog.validate(&GeneratorConfig::default());

    if issues.is_empty() {
        println!("{} levels OK", catalog.levels.len());
        return Ok(());
    }
    for issue in &issues {
        println!("{}", serde_json::to_string(issue)?);
    }
    bail!("{} issue(s) found in the level catalogue", issues.len())
}

fn rasterize(config: &AppConfig, strokes: &FsPath, png: Option<&FsPath>) -> anyhow::Result<()> {
    let set = load_strokes(strokes)?;
    let image =
        Rasterizer::with_config(config.exercise.raster.clone()).rasterize(&set.paths, set.canvas);

    print!("{}", image.to_ascii());
    println!("ink mass {:.1}", image.ink_mass());

    if let Some(path) = png {
        image.save_png(path)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

async fn classify(config: &AppConfig, strokes: &FsPath) -> anyhow::Result<()> {
    let set = load_strokes(strokes)?;
    let image =
        Rasterizer::with_config(config.exercise.raster.clone()).rasterize(&set.paths, set.canvas);
    let classifier = DigitClassifier::load(&config.classifier).await;
    if classifier.origin().is_synthesized() {
        println!("warning: no model weights found, output is untrained");
    }

    let probabilities = classifier.classify(&image).await;
    for (digit, p) in probabilities.iter().enumerate() {
        println!("{digit}: {p:.4}");
    }

    let decision = config.exercise.policy.decide(&set.paths, &probabilities);
    println!("model: {:?}", classifier.origin());
    println!("decision: {decision:?}");
    Ok(())
}

/// Prints collaborator cues to the terminal.
struct TerminalMessenger;

impl Messenger for TerminalMessenger {
    fn cue(&self, trigger: MessageTrigger) {
        println!("[{}]", trigger.as_str());
    }
}

async fn play(config: &AppConfig, level_id: &str) -> anyhow::Result<()> {
    let catalog = config.catalog()?;
    let level = catalog.get(level_id)?.clone();
    let rng: Box<dyn RngCore + Send> = Box::new(rng_for(config));
    let session = LevelSession::new(level, ProblemGenerator::new(), rng)?;

    let exercise = Exercise::new(
        session,
        config.exercise.clone(),
        Arc::new(NullProgress),
        Arc::new(TerminalMessenger),
    );
    let classifier: Arc<dyn Classify> = Arc::new(SharedClassifier::new(config.classifier.clone()));
    let (orchestrator, mut events) = Orchestrator::new(exercise, classifier);

    println!("Type a digit, 'draw <strokes.json>', 'hint', 'clear', 'next' or 'quit'.");
    println!("{}", render_grid(orchestrator.exercise().await.state()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&orchestrator, line.trim()).await {
                    break;
                }
            }
            Some(event) = events.recv() => {
                if !handle_event(&orchestrator, &event).await {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Apply one line of input; `false` ends the session.
async fn handle_command(orchestrator: &Orchestrator, line: &str) -> bool {
    let mut words = line.split_whitespace();
    let result = match (words.next(), words.next()) {
        (None, _) => Ok(()),
        (Some("quit" | "q"), _) => return false,
        (Some("hint"), _) => {
            match orchestrator.reveal_hint().await {
                Some(digit) => println!("hint: {digit}"),
                None => println!("no hint available"),
            }
            Ok(())
        }
        (Some("next"), _) => orchestrator.advance_problem().await.map(|_| ()).map_err(Into::into),
        (Some("clear"), _) => {
            orchestrator.clear_drawing().await;
            Ok(())
        }
        (Some("draw"), Some(file)) => draw(orchestrator, FsPath::new(file)).await,
        (Some(word), None) => match word.parse::<u8>() {
            Ok(digit) => orchestrator.submit_manual(digit).await.map(|_| ()).map_err(Into::into),
            Err(_) => Err(anyhow::anyhow!("unknown command '{word}'")),
        },
        (Some(word), Some(_)) => Err(anyhow::anyhow!("unknown command '{word}'")),
    };
    if let Err(e) = result {
        println!("error: {e}");
    }
    true
}

async fn draw(orchestrator: &Orchestrator, file: &FsPath) -> anyhow::Result<()> {
    let set = load_strokes(file)?;
    for path in set.paths {
        orchestrator.add_path(path).await?;
    }
    let outcome = orchestrator.recognize().await?;
    tracing::debug!("Recognition outcome: {outcome:?}");
    Ok(())
}

/// Report an orchestrator event; `false` ends the session.
async fn handle_event(orchestrator: &Orchestrator, event: &ExerciseEvent) -> bool {
    match event {
        ExerciseEvent::Recognized(outcome) => println!("recognized: {outcome:?}"),
        ExerciseEvent::Submitted(LevelEvent::LevelWon(record)) => {
            println!(
                "Level {} won: {} moves, {} wrong, {} hints",
                record.level_id, record.moves, record.invalid_moves, record.hints_used
            );
            return false;
        }
        ExerciseEvent::Submitted(LevelEvent::ProblemSolved { solved, remaining }) => {
            println!("Solved! {solved} done, {remaining} to go");
            return true;
        }
        ExerciseEvent::Submitted(_) => {}
        ExerciseEvent::ProblemReady { index } => println!("Problem {}", index + 1),
        ExerciseEvent::ProblemFailed { reason } => {
            println!("could not start the next problem: {reason}");
            println!("type 'next' to try again");
            return true;
        }
    }
    println!("{}", render_grid(orchestrator.exercise().await.state()));
    true
}
