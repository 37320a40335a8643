//! Anki package (`.apkg`) writer.
//!
//! A package is a zip holding `collection.anki2` (an SQLite collection),
//! a `media` JSON index mapping `"0"`, `"1"`, ... to filenames, and one
//! entry per media file named by its index. Entries carry a fixed
//! timestamp, so identical inputs give identical bytes.

mod collection;
mod ids;

use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub use collection::DeckMeta;

use crate::bind::BoundCard;
use crate::model::CardModel;

const COLLECTION_ENTRY: &str = "collection.anki2";
const MEDIA_INDEX_ENTRY: &str = "media";

/// A file to bundle, under the name cards reference it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub path: PathBuf,
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
}

fn media_index(media: &[MediaFile]) -> Value {
    let mut index = Map::new();
    for (i, file) in media.iter().enumerate() {
        index.insert(i.to_string(), Value::String(file.name.clone()));
    }
    Value::Object(index)
}

/// Builds the package in memory. `scratch` holds the intermediate collection file.
pub fn build(
    deck: &DeckMeta<'_>,
    model: &CardModel,
    cards: &[BoundCard],
    media: &[MediaFile],
    scratch: &Path,
    timestamp: i64,
) -> Result<Vec<u8>> {
    let collection_path = scratch.join(COLLECTION_ENTRY);
    if collection_path.exists() {
        fs::remove_file(&collection_path)
            .with_context(|| format!("Failed to clear stale {:?}", collection_path))?;
    }
    collection::write_collection(&collection_path, deck, model, cards, timestamp)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = entry_options();

    zip.start_file(COLLECTION_ENTRY, options)?;
    let collection = fs::read(&collection_path)
        .with_context(|| format!("Failed to read {:?}", collection_path))?;
    zip.write_all(&collection)?;

    zip.start_file(MEDIA_INDEX_ENTRY, options)?;
    zip.write_all(media_index(media).to_string().as_bytes())?;

    for (i, file) in media.iter().enumerate() {
        let mut bytes = Vec::new();
        File::open(&file.path)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .with_context(|| format!("Failed to read media file {:?}", file.path))?;
        zip.start_file(i.to_string(), options)?;
        zip.write_all(&bytes)?;
    }

    let cursor = zip.finish().context("Failed to finish package")?;
    Ok(cursor.into_inner())
}

/// Writes `bytes` to `path` through a temporary sibling, so a failed write leaves nothing behind.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create output directory {:?}", parent))?;

    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
    temp.write_all(bytes)
        .and_then(|_| temp.flush())
        .with_context(|| format!("Failed to write package for {:?}", path))?;
    temp.persist(path)
        .with_context(|| format!("Failed to move package into place at {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use rusqlite::Connection;
    use zip::ZipArchive;

    use super::*;
    use crate::model::{CardTemplate, FieldSource, FieldSpec};

    fn model() -> CardModel {
        CardModel {
            id: 1482931025,
            name: "Korean Word Model".into(),
            fields: vec![
                FieldSpec::new("Korean", FieldSource::Text),
                FieldSpec::new("English", FieldSource::Translation),
                FieldSpec::new("Audio", FieldSource::Audio),
            ],
            templates: vec![CardTemplate {
                name: "Korean Word Card".into(),
                front: "{{Korean}}".into(),
                back: "{{FrontSide}}<hr>{{English}}{{Audio}}".into(),
            }],
            css: String::new(),
            sort_field: 0,
        }
    }

    #[test]
    fn package_contains_collection_media_index_and_files() {
        let scratch = tempfile::tempdir().unwrap();
        let clip = scratch.path().join("audio_ef1c511c.mp3");
        fs::write(&clip, b"mp3").unwrap();
        let cards = vec![BoundCard {
            fields: vec!["안녕".into(), "Hi".into(), "[sound:audio_ef1c511c.mp3]".into()],
            media: Some("audio_ef1c511c.mp3".into()),
        }];
        let media = vec![MediaFile { name: "audio_ef1c511c.mp3".into(), path: clip }];
        let deck = DeckMeta { id: 42, name: "Test" };

        let bytes = build(&deck, &model(), &cards, &media, scratch.path(), 1_700_000_000).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert!(names.contains(&"collection.anki2".to_string()));
        assert!(names.contains(&"media".to_string()));
        assert!(names.contains(&"0".to_string()));

        let mut index = String::new();
        archive.by_name("media").unwrap().read_to_string(&mut index).unwrap();
        assert_eq!(index, r#"{"0":"audio_ef1c511c.mp3"}"#);

        let mut clip_bytes = Vec::new();
        archive.by_name("0").unwrap().read_to_end(&mut clip_bytes).unwrap();
        assert_eq!(clip_bytes, b"mp3");

        let extracted = scratch.path().join("extracted.anki2");
        let mut collection = Vec::new();
        archive.by_name("collection.anki2").unwrap().read_to_end(&mut collection).unwrap();
        fs::write(&extracted, collection).unwrap();
        let conn = Connection::open(&extracted).unwrap();
        let notes: i64 = conn.query_row("SELECT count(*) FROM notes", [], |r| r.get(0)).unwrap();
        assert_eq!(notes, 1);
    }

    #[test]
    fn atomic_write_creates_parents_and_leaves_no_temporaries() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("decks").join("out.apkg");

        write_atomically(&target, b"package").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"package");
        let entries = fs::read_dir(dir.path().join("decks")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn failed_write_produces_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("decks");
        fs::write(&blocker, b"not a directory").unwrap();

        let result = write_atomically(&blocker.join("out.apkg"), b"package");

        assert!(result.is_err());
        assert!(!blocker.join("out.apkg").exists());
    }
}
