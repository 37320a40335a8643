use std::path::Path;

use anyhow::{bail, Result};

use crate::apkg::{self, DeckMeta, MediaFile};
use crate::audio::AudioManifest;
use crate::bind::BoundCard;
use crate::model::CardModel;

/// Bound cards in authoring order, packaged together with the media they reference.
#[derive(Debug, Clone)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    cards: Vec<BoundCard>,
}

impl Deck {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cards: Vec::new(),
        }
    }

    pub fn add_card(&mut self, card: BoundCard) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[BoundCard] {
        &self.cards
    }

    /// Distinct media filenames, in order of first reference.
    pub fn referenced_media(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for name in self.cards.iter().filter_map(|c| c.media.as_deref()) {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// Serializes the deck into package bytes, bundling exactly the referenced media.
    pub fn finalize(
        &self,
        model: &CardModel,
        manifest: &AudioManifest,
        scratch: &Path,
        timestamp: i64,
    ) -> Result<Vec<u8>> {
        let mut media = Vec::new();
        for name in self.referenced_media() {
            let Some(asset) = manifest.get(name) else {
                bail!("Deck '{}' references {} but no such audio was generated", self.name, name);
            };
            media.push(MediaFile {
                name: asset.filename.clone(),
                path: asset.path.clone(),
            });
        }

        let meta = DeckMeta {
            id: self.id,
            name: &self.name,
        };
        apkg::build(&meta, model, &self.cards, &media, scratch, timestamp)
    }
}
