use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};

mod align;
mod apkg;
mod audio;
mod bind;
mod content;
mod deck;
mod model;
mod pipeline;
mod topics;

use audio::tts::DEFAULT_ENDPOINT;
use audio::{GoogleTranslateTts, SpeechSynthesizer};
use topics::{DirectoryTopics, EmbeddedTopics, TopicSource};

const ALL_TOPICS: &str = "all";

/// Generates Korean Anki decks with pronunciation audio.
///
/// Note ids and modification times come from SOURCE_DATE_EPOCH when it is
/// set, otherwise from the clock; only runs with a fixed SOURCE_DATE_EPOCH
/// produce byte-identical archives.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Comma-separated topic slugs, or "all"
    #[arg(short, long, default_value = ALL_TOPICS)]
    topics: String,
    /// List available topics and exit
    #[arg(short, long, default_value = "false")]
    list: bool,
    /// Directory the topics' output paths are relative to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
    /// Read topics from this directory instead of the built-in set
    #[arg(long)]
    source: Option<PathBuf>,
    /// Skip speech synthesis; audio fields stay empty
    #[arg(long, default_value = "false")]
    no_audio: bool,
    /// Speech synthesis endpoint (translate_tts compatible)
    #[arg(long, env = "KOREAN_DECKS_TTS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    tts_endpoint: String,
    /// Per-request speech timeout in seconds
    #[arg(long, default_value_t = 15)]
    tts_timeout: u64,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn get_source(args: &Args) -> Box<dyn TopicSource> {
    match &args.source {
        Some(dir) => Box::new(DirectoryTopics::new(dir)),
        None => Box::new(EmbeddedTopics),
    }
}

/// Largest epoch whose millisecond form still fits the collection's ids.
const MAX_EPOCH: i64 = i64::MAX / 1000;

fn parse_epoch(epoch: &str) -> Result<i64> {
    let secs: i64 = epoch
        .trim()
        .parse()
        .with_context(|| format!("SOURCE_DATE_EPOCH is not a number: {:?}", epoch))?;
    if !(0..=MAX_EPOCH).contains(&secs) {
        bail!("SOURCE_DATE_EPOCH {} is outside 0..={}", secs, MAX_EPOCH);
    }
    Ok(secs)
}

/// `SOURCE_DATE_EPOCH` when set, so repeated builds are byte-identical.
fn build_timestamp() -> Result<i64> {
    if let Ok(epoch) = std::env::var("SOURCE_DATE_EPOCH") {
        return parse_epoch(&epoch);
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before 1970")?;
    Ok(now.as_secs() as i64)
}

fn list_topics(source: &dyn TopicSource) -> Result<()> {
    println!("Available topics ({}):", source.name());
    for slug in source.slugs()? {
        match source.load(&slug) {
            Ok(topic) => println!(
                "  {:<22} {} ({} cards)",
                slug,
                topic.deck.name,
                topic.records.len()
            ),
            Err(e) => println!("  {:<22} (unreadable: {:#})", slug, e),
        }
    }
    Ok(())
}

fn resolve_topics(source: &dyn TopicSource, requested: &str) -> Result<Vec<String>> {
    let available = source.slugs()?;
    if requested.trim() == ALL_TOPICS {
        return Ok(available);
    }

    let mut resolved = Vec::new();
    for name in requested.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if available.iter().any(|a| a == name) {
            resolved.push(name.to_string());
        } else {
            log::warn!("Topic '{}' not found.", name);
        }
    }
    Ok(resolved)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let source = get_source(&args);
    if args.list {
        return list_topics(source.as_ref());
    }

    let slugs = resolve_topics(source.as_ref(), &args.topics)?;
    if slugs.is_empty() {
        bail!("No topics to generate from {}", source.name());
    }

    let synthesizer = if args.no_audio {
        None
    } else {
        Some(
            GoogleTranslateTts::new(&*args.tts_endpoint, Duration::from_secs(args.tts_timeout))
                .context("Failed to set up speech synthesis")?,
        )
    };
    let synthesizer = synthesizer.as_ref().map(|s| s as &dyn SpeechSynthesizer);
    let timestamp = build_timestamp()?;

    for slug in &slugs {
        let topic = source.load(slug)?;
        let summary = pipeline::generate(&topic, &args.out_dir, synthesizer, timestamp)?;

        println!("✓ Deck created: {}", summary.output.display());
        println!("  - {} cards", summary.cards);
        println!("  - {} audio files", summary.audio_files);
        println!();
    }
    println!("Import this file into Anki: File → Import...");

    Ok(())
}
