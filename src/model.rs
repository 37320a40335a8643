use serde::{Deserialize, Serialize};

/// Where a model field takes its value from when a record is bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Text,
    Translation,
    Romanization,
    Notes,
    Example,
    ExampleTranslation,
    SourceMarkup,
    TranslationMarkup,
    Audio,
    /// The record's `extra` value under the field's own name.
    #[default]
    Extra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub source: FieldSource,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, source: FieldSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTemplate {
    pub name: String,
    pub front: String,
    pub back: String,
}

/// Field schema plus templates and styling shared by every card of a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardModel {
    pub id: i64,
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub templates: Vec<CardTemplate>,
    pub css: String,
    pub sort_field: usize,
}

impl CardModel {
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_names().any(|n| n == name)
    }

    /// Audio is only worth synthesizing when some field can show it.
    pub fn wants_audio(&self) -> bool {
        self.fields.iter().any(|f| f.source == FieldSource::Audio)
    }

    pub fn wants_alignment(&self) -> bool {
        self.fields
            .iter()
            .any(|f| matches!(f.source, FieldSource::SourceMarkup | FieldSource::TranslationMarkup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_means_extra_column() {
        let fields: Vec<FieldSpec> = serde_json::from_str(
            r#"[{"name": "Korean", "source": "text"},
                {"name": "PoliteFormal"},
                {"name": "KoreanColored", "source": "source_markup"}]"#,
        )
        .unwrap();
        assert_eq!(fields[0].source, FieldSource::Text);
        assert_eq!(fields[1].source, FieldSource::Extra);
        assert_eq!(fields[2].source, FieldSource::SourceMarkup);
    }

    #[test]
    fn audio_detection_follows_field_sources() {
        let mut model = CardModel {
            id: 1,
            name: "m".into(),
            fields: vec![
                FieldSpec::new("Korean", FieldSource::Text),
                FieldSpec::new("English", FieldSource::Translation),
            ],
            templates: Vec::new(),
            css: String::new(),
            sort_field: 0,
        };
        assert!(!model.wants_audio());
        assert!(!model.wants_alignment());

        model.fields.push(FieldSpec::new("Audio", FieldSource::Audio));
        assert!(model.wants_audio());
        assert!(model.has_field("English"));
    }
}
