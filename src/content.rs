use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A source phrase and the phrase it corresponds to in the translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct AlignmentPair {
    pub source: String,
    pub translated: String,
}

impl AlignmentPair {
    pub fn new(source: impl Into<String>, translated: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            translated: translated.into(),
        }
    }
}

impl From<(String, String)> for AlignmentPair {
    fn from((source, translated): (String, String)) -> Self {
        Self { source, translated }
    }
}

impl From<AlignmentPair> for (String, String) {
    fn from(pair: AlignmentPair) -> Self {
        (pair.source, pair.translated)
    }
}

/// One authored row of a topic. Drives exactly one note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub text: String,
    pub translation: String,
    #[serde(default)]
    pub romanization: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub example_translation: String,
    /// Overrides the text sent to speech synthesis. `Some("")` means no audio.
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub pairs: Vec<AlignmentPair>,
    /// Topic-specific columns, keyed by model field name.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl ContentRecord {
    pub fn new(text: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            translation: translation.into(),
            ..Default::default()
        }
    }

    pub fn with_pairs<I, S, T>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        self.pairs = pairs
            .into_iter()
            .map(|(s, t)| AlignmentPair::new(s, t))
            .collect();
        self
    }

    /// The text to pronounce for this record, if any.
    pub fn audio_text(&self) -> Option<&str> {
        let text = self.audio.as_deref().unwrap_or(&self.text);
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
