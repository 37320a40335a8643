use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::align::{align, AlignedMarkup};
use crate::apkg;
use crate::audio::{AudioCache, SpeechSynthesizer};
use crate::bind::bind;
use crate::deck::Deck;
use crate::topics::Topic;

/// Counts reported after a deck is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub output: PathBuf,
    pub cards: usize,
    pub audio_files: usize,
}

/// A finished package that has not been written anywhere yet.
#[derive(Debug)]
pub struct Package {
    pub bytes: Vec<u8>,
    pub cards: usize,
    pub audio_files: usize,
}

/// Runs one topic through audio, alignment and binding into package bytes.
pub fn build(
    topic: &Topic,
    synthesizer: Option<&dyn SpeechSynthesizer>,
    timestamp: i64,
) -> Result<Package> {
    build_in(&std::env::temp_dir(), topic, synthesizer, timestamp)
}

/// Like [`build`], with the scratch directory created under `scratch_root`.
///
/// The scratch directory is removed when this returns, whether or not it
/// succeeded.
pub fn build_in(
    scratch_root: &Path,
    topic: &Topic,
    synthesizer: Option<&dyn SpeechSynthesizer>,
    timestamp: i64,
) -> Result<Package> {
    let scratch = tempfile::Builder::new()
        .prefix("korean-decks-")
        .tempdir_in(scratch_root)
        .with_context(|| format!("Failed to create scratch directory in {:?}", scratch_root))?;
    let media_dir = scratch.path().join("media");
    fs::create_dir_all(&media_dir)
        .with_context(|| format!("Failed to create {:?}", media_dir))?;

    let model = &topic.model;
    let synthesizer = synthesizer.filter(|_| model.wants_audio());
    let mut cache = AudioCache::new(&media_dir, synthesizer);
    let mut deck = Deck::new(topic.deck.id, topic.deck.name.clone());

    for (i, record) in topic.records.iter().enumerate() {
        let audio = record.audio_text().and_then(|text| cache.ensure(text));
        let markup = if model.wants_alignment() {
            align(&record.pairs)
        } else {
            AlignedMarkup::default()
        };
        let card = bind(model, record, audio.as_deref(), &markup).with_context(|| {
            format!("Record {} of topic '{}' ({:?}) is malformed", i + 1, topic.slug, record.text)
        })?;
        deck.add_card(card);
    }

    let manifest = cache.into_manifest();
    log::debug!("'{}': {} audio clips in scratch", topic.slug, manifest.len());
    let bytes = deck.finalize(model, &manifest, scratch.path(), timestamp)?;
    let package = Package {
        bytes,
        cards: deck.cards().len(),
        audio_files: deck.referenced_media().len(),
    };

    scratch
        .close()
        .context("Failed to remove scratch directory")?;
    Ok(package)
}

/// Builds `topic` and writes it under `out_dir`.
pub fn generate(
    topic: &Topic,
    out_dir: &Path,
    synthesizer: Option<&dyn SpeechSynthesizer>,
    timestamp: i64,
) -> Result<Summary> {
    log::info!(
        "Generating '{}' ({} records)",
        topic.slug,
        topic.records.len()
    );
    let package = build(topic, synthesizer, timestamp)?;
    let output = out_dir.join(&topic.output);
    apkg::write_atomically(&output, &package.bytes)
        .with_context(|| format!("Failed to write deck '{}'", topic.deck.name))?;

    Ok(Summary {
        output,
        cards: package.cards,
        audio_files: package.audio_files,
    })
}
