pub mod tts;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub use tts::{GoogleTranslateTts, SpeechSynthesizer, SynthesisError};

/// One synthesized clip in the run's scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    pub text: String,
    pub filename: String,
    pub path: PathBuf,
}

/// Every asset written during one generation run, in creation order.
#[derive(Debug, Default)]
pub struct AudioManifest {
    assets: Vec<AudioAsset>,
}

impl AudioManifest {
    pub fn get(&self, filename: &str) -> Option<&AudioAsset> {
        self.assets.iter().find(|a| a.filename == filename)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn digest(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

/// `audio_<8 hex digits>.mp3`, stable for a given text.
pub fn asset_filename(text: &str) -> String {
    format!("audio_{}.mp3", &digest(text)[..8])
}

/// Synthesizes each distinct text at most once per run.
///
/// Failures are logged and remembered, so the text is neither retried nor
/// given a file; the card simply renders without audio.
pub struct AudioCache<'a> {
    dir: PathBuf,
    synthesizer: Option<&'a dyn SpeechSynthesizer>,
    resolved: HashMap<String, Option<String>>,
    manifest: AudioManifest,
}

impl<'a> AudioCache<'a> {
    pub fn new(dir: impl Into<PathBuf>, synthesizer: Option<&'a dyn SpeechSynthesizer>) -> Self {
        Self {
            dir: dir.into(),
            synthesizer,
            resolved: HashMap::new(),
            manifest: AudioManifest::default(),
        }
    }

    /// Returns the media filename holding `text`'s pronunciation, if any.
    pub fn ensure(&mut self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        if let Some(known) = self.resolved.get(text) {
            log::debug!("audio cache hit for {:?}", text);
            return known.clone();
        }

        let filename = self.filename_for(text);
        let produced = self.produce(text, &filename);
        self.resolved.insert(text.to_string(), produced.clone());
        produced
    }

    pub fn into_manifest(self) -> AudioManifest {
        self.manifest
    }

    fn filename_for(&self, text: &str) -> String {
        let short = asset_filename(text);
        match self.manifest.get(&short) {
            Some(existing) if existing.text != text => {
                log::debug!("{} already holds {:?}, using full digest", short, existing.text);
                format!("audio_{}.mp3", digest(text))
            }
            _ => short,
        }
    }

    fn produce(&mut self, text: &str, filename: &str) -> Option<String> {
        let path = self.dir.join(filename);
        if path.exists() {
            self.record(text, filename, path);
            return Some(filename.to_string());
        }

        let synthesizer = self.synthesizer?;
        let bytes = match synthesizer.synthesize(text, tts::LANGUAGE) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Could not generate audio for {:?}: {}", text, e);
                return None;
            }
        };
        if let Err(e) = fs::write(&path, &bytes) {
            log::warn!("Could not write audio for {:?} to {:?}: {}", text, path, e);
            return None;
        }

        log::debug!("synthesized {:?} into {}", text, filename);
        self.record(text, filename, path);
        Some(filename.to_string())
    }

    fn record(&mut self, text: &str, filename: &str, path: PathBuf) {
        if self.manifest.get(filename).is_none() {
            self.manifest.assets.push(AudioAsset {
                text: text.to_string(),
                filename: filename.to_string(),
                path,
            });
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::{SpeechSynthesizer, SynthesisError};

    /// Deterministic provider: the "audio" is the text's own bytes.
    #[derive(Default)]
    pub struct StubSynthesizer {
        pub calls: RefCell<Vec<String>>,
        pub failing: Vec<String>,
    }

    impl StubSynthesizer {
        pub fn failing_on(texts: &[&str]) -> Self {
            Self {
                failing: texts.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn call_count(&self, text: &str) -> usize {
            self.calls.borrow().iter().filter(|t| *t == text).count()
        }
    }

    impl SpeechSynthesizer for StubSynthesizer {
        fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, SynthesisError> {
            self.calls.borrow_mut().push(text.to_string());
            if self.failing.iter().any(|t| t == text) {
                return Err(SynthesisError::Provider("service unavailable".into()));
            }
            Ok(format!("{}:{}", lang, text).into_bytes())
        }
    }
}
