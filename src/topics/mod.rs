mod directory;
mod embedded;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

pub use directory::DirectoryTopics;
pub use embedded::EmbeddedTopics;

use crate::content::ContentRecord;
use crate::model::{CardModel, CardTemplate, FieldSpec};

pub const MANIFEST_FILE: &str = "topic.json";
pub const RECORDS_FILE: &str = "records.json";
pub const FRONT_FILE: &str = "front.html";
pub const BACK_FILE: &str = "back.html";
pub const STYLE_FILE: &str = "style.css";

#[derive(Debug, Clone, Deserialize)]
pub struct DeckInfo {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelManifest {
    id: i64,
    name: String,
    template: String,
    fields: Vec<FieldSpec>,
    #[serde(default)]
    sort_field: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct TopicManifest {
    slug: String,
    output: PathBuf,
    deck: DeckInfo,
    model: ModelManifest,
}

/// Everything needed to generate one deck.
#[derive(Debug, Clone)]
pub struct Topic {
    pub slug: String,
    /// Archive path, relative to the output directory.
    pub output: PathBuf,
    pub deck: DeckInfo,
    pub model: CardModel,
    pub records: Vec<ContentRecord>,
}

/// A place topics can be read from.
pub trait TopicSource {
    fn name(&self) -> String;

    /// Slugs of every topic this source offers, sorted.
    fn slugs(&self) -> Result<Vec<String>>;

    /// Contents of one file belonging to `slug`.
    fn read(&self, slug: &str, file: &str) -> Result<String>;

    fn load(&self, slug: &str) -> Result<Topic> {
        let manifest: TopicManifest = serde_json::from_str(&self.read(slug, MANIFEST_FILE)?)
            .with_context(|| format!("Invalid {} for topic '{}'", MANIFEST_FILE, slug))?;
        anyhow::ensure!(
            manifest.slug == slug,
            "Topic '{}' declares slug '{}' in its {}",
            slug,
            manifest.slug,
            MANIFEST_FILE
        );
        let records: Vec<ContentRecord> = serde_json::from_str(&self.read(slug, RECORDS_FILE)?)
            .with_context(|| format!("Invalid {} for topic '{}'", RECORDS_FILE, slug))?;

        let template = CardTemplate {
            name: manifest.model.template,
            front: self.read(slug, FRONT_FILE)?,
            back: self.read(slug, BACK_FILE)?,
        };
        let model = CardModel {
            id: manifest.model.id,
            name: manifest.model.name,
            fields: manifest.model.fields,
            templates: vec![template],
            css: self.read(slug, STYLE_FILE)?,
            sort_field: manifest.model.sort_field,
        };
        anyhow::ensure!(
            model.sort_field < model.fields.len(),
            "Topic '{}' sorts by field {} but declares only {} fields",
            slug,
            model.sort_field,
            model.fields.len()
        );

        Ok(Topic {
            slug: manifest.slug,
            output: manifest.output,
            deck: manifest.deck,
            model,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use regex::Regex;

    use super::*;
    use crate::align::align;
    use crate::bind::bind;

    #[test]
    fn embedded_topics_are_listed_sorted() {
        let slugs = EmbeddedTopics.slugs().unwrap();
        assert_eq!(slugs.len(), 19);
        let mut sorted = slugs.clone();
        sorted.sort();
        assert_eq!(slugs, sorted);
        assert!(slugs.contains(&"vocab_1".to_string()));
    }

    #[test]
    fn every_embedded_record_binds() {
        for slug in EmbeddedTopics.slugs().unwrap() {
            let topic = EmbeddedTopics.load(&slug).unwrap();
            assert_eq!(topic.slug, slug);
            assert!(!topic.records.is_empty(), "{} has no records", slug);
            for (i, record) in topic.records.iter().enumerate() {
                let card = bind(&topic.model, record, None, &align(&record.pairs))
                    .unwrap_or_else(|e| panic!("{} record {}: {}", slug, i + 1, e));
                assert_eq!(card.fields.len(), topic.model.fields.len());
            }
        }
    }

    #[test]
    fn templates_only_reference_declared_fields() {
        let re = Regex::new(r"\{\{[#^/]?([^{}]+)\}\}").unwrap();
        for slug in EmbeddedTopics.slugs().unwrap() {
            let topic = EmbeddedTopics.load(&slug).unwrap();
            for template in &topic.model.templates {
                for side in [&template.front, &template.back] {
                    for capture in re.captures_iter(side) {
                        let name = capture[1].trim();
                        assert!(
                            name == "FrontSide" || topic.model.has_field(name),
                            "{} uses undeclared field {}",
                            slug,
                            name
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn deck_ids_and_outputs_are_distinct() {
        let mut ids = HashSet::new();
        let mut outputs = HashSet::new();
        for slug in EmbeddedTopics.slugs().unwrap() {
            let topic = EmbeddedTopics.load(&slug).unwrap();
            assert!(ids.insert(topic.deck.id), "duplicate deck id in {}", slug);
            assert!(outputs.insert(topic.output.clone()), "duplicate output in {}", slug);
        }
    }

    #[test]
    fn vocabulary_topic_matches_its_authoring() {
        let topic = EmbeddedTopics.load("vocab_1").unwrap();
        assert_eq!(topic.deck.id, 1837523951);
        assert_eq!(topic.model.id, 1482931025);
        assert_eq!(topic.output, PathBuf::from("decks/04_korean_vocab_1_basic.apkg"));
        assert_eq!(topic.records[0].text, "안녕하세요");
        assert_eq!(topic.records[0].romanization, "annyeonghaseyo");
        assert_eq!(topic.records[0].pairs.len(), 3);
        assert!(topic.model.wants_audio());
    }

    #[test]
    fn unknown_slug_is_an_error() {
        let err = EmbeddedTopics.load("klingon").unwrap_err();
        assert!(err.to_string().contains("klingon"));
    }
}
