use thiserror::Error;

use crate::align::AlignedMarkup;
use crate::content::ContentRecord;
use crate::model::{CardModel, FieldSource};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BindError {
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("record sets `{field}`, which model `{model}` does not declare")]
    UndeclaredField { field: String, model: String },
}

/// Field values in model order, plus the media file the audio field points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundCard {
    pub fields: Vec<String>,
    pub media: Option<String>,
}

pub fn sound_tag(filename: &str) -> String {
    format!("[sound:{}]", filename)
}

fn validate(model: &CardModel, record: &ContentRecord) -> Result<(), BindError> {
    if record.text.trim().is_empty() {
        return Err(BindError::MissingField("text"));
    }
    if record.translation.trim().is_empty() {
        return Err(BindError::MissingField("translation"));
    }
    for key in record.extra.keys() {
        let declared = model
            .fields
            .iter()
            .any(|f| f.source == FieldSource::Extra && &f.name == key);
        if !declared {
            return Err(BindError::UndeclaredField {
                field: key.clone(),
                model: model.name.clone(),
            });
        }
    }
    Ok(())
}

/// Maps a record onto the model's fields. Absent optional content binds as "".
pub fn bind(
    model: &CardModel,
    record: &ContentRecord,
    audio: Option<&str>,
    markup: &AlignedMarkup,
) -> Result<BoundCard, BindError> {
    validate(model, record)?;

    let fields = model
        .fields
        .iter()
        .map(|field| match field.source {
            FieldSource::Text => record.text.clone(),
            FieldSource::Translation => record.translation.clone(),
            FieldSource::Romanization => record.romanization.clone(),
            FieldSource::Notes => record.notes.clone(),
            FieldSource::Example => record.example.clone(),
            FieldSource::ExampleTranslation => record.example_translation.clone(),
            FieldSource::SourceMarkup => markup.source.clone(),
            FieldSource::TranslationMarkup => markup.translated.clone(),
            FieldSource::Audio => audio.map(sound_tag).unwrap_or_default(),
            FieldSource::Extra => record.extra.get(&field.name).cloned().unwrap_or_default(),
        })
        .collect();

    let media = if model.wants_audio() {
        audio.map(str::to_string)
    } else {
        None
    };

    Ok(BoundCard { fields, media })
}
