use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

/// Every deck in this collection is pronounced in Korean.
pub const LANGUAGE: &str = "ko";

pub const DEFAULT_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Longest text the provider accepts in a single request.
pub const MAX_CHUNK_CHARS: usize = 100;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("speech request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned no audio for {0:?}")]
    Empty(String),

    #[error("provider error: {0}")]
    Provider(String),
}

pub trait SpeechSynthesizer {
    /// Returns encoded audio (MP3) for `text` spoken in `lang`.
    fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// Google Translate's public speech endpoint, one blocking request per chunk.
pub struct GoogleTranslateTts {
    client: Client,
    endpoint: String,
}

impl GoogleTranslateTts {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn fetch_chunk(
        &self,
        chunk: &str,
        lang: &str,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>, SynthesisError> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", lang),
                ("client", "tw-ob"),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()?
            .error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

impl SpeechSynthesizer for GoogleTranslateTts {
    fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, SynthesisError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let bytes = self.fetch_chunk(chunk, lang, idx, chunks.len())?;
            audio.extend_from_slice(&bytes);
        }
        if audio.is_empty() {
            return Err(SynthesisError::Empty(text.to_string()));
        }
        Ok(audio)
    }
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | ',' | ';' | ':' | '…' | '。' | '\n')
}

/// Byte offset to cut `window` at: after the last punctuation mark, else at the
/// last whitespace.
fn boundary(window: &str) -> Option<usize> {
    let after_punct = window
        .char_indices()
        .filter(|&(_, c)| is_sentence_end(c))
        .last()
        .map(|(i, c)| i + c.len_utf8());
    after_punct
        .or_else(|| window.rfind(char::is_whitespace))
        .filter(|&i| i > 0)
}

/// Splits text into trimmed, non-empty chunks of at most `max_chars` characters.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while rest.chars().count() > max_chars {
        let window_end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..window_end];
        let cut = boundary(window).unwrap_or(window_end);

        let chunk = rest[..cut].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_text("  안녕하세요!  ", MAX_CHUNK_CHARS), vec!["안녕하세요!"]);
        assert!(split_text("   ", MAX_CHUNK_CHARS).is_empty());
    }

    #[test]
    fn prefers_punctuation_boundaries() {
        let chunks = split_text("저는 학생이에요. 만나서 반갑습니다.", 12);
        assert_eq!(chunks, vec!["저는 학생이에요.", "만나서 반갑습니다."]);
    }

    #[test]
    fn falls_back_to_whitespace_then_hard_cut() {
        assert_eq!(split_text("하나 둘 셋 넷", 5), vec!["하나 둘", "셋 넷"]);
        assert_eq!(split_text("가나다라마바사", 3), vec!["가나다", "라마바", "사"]);
    }

    #[test]
    fn chunks_respect_the_limit() {
        let text = "오늘은 날씨가 정말 좋아서 친구와 함께 공원에 가서 산책을 하고 맛있는 음식을 먹었어요 ".repeat(6);
        let chunks = split_text(&text, MAX_CHUNK_CHARS);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.chars().count() <= MAX_CHUNK_CHARS);
        }
        let rejoined: String = chunks.join(" ");
        assert_eq!(rejoined.split_whitespace().count(), text.split_whitespace().count());
    }
}
