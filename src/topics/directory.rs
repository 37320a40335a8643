use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{TopicSource, MANIFEST_FILE};

/// Topics read at runtime from a directory laid out like `assets/topics`.
#[derive(Debug, Clone)]
pub struct DirectoryTopics {
    root: PathBuf,
}

impl DirectoryTopics {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TopicSource for DirectoryTopics {
    fn name(&self) -> String {
        format!("topics in {}", self.root.display())
    }

    fn slugs(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list topics in {:?}", self.root))?;
        let mut slugs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.path().join(MANIFEST_FILE).is_file() {
                slugs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    fn read(&self, slug: &str, file: &str) -> Result<String> {
        let path = self.root.join(slug).join(file);
        fs::read_to_string(&path)
            .with_context(|| format!("Topic '{}' not found: failed to read {:?}", slug, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_topic(root: &std::path::Path, slug: &str) {
        write_topic_as(root, slug, slug);
    }

    fn write_topic_as(root: &std::path::Path, dir_name: &str, slug: &str) {
        let dir = root.join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("topic.json"),
            format!(
                r#"{{"slug": "{}", "output": "decks/{}.apkg",
                    "deck": {{"id": 7, "name": "Greetings"}},
                    "model": {{"id": 8, "name": "Greeting Model", "template": "Greeting Card",
                               "fields": [{{"name": "Korean", "source": "text"}},
                                          {{"name": "English", "source": "translation"}}]}}}}"#,
                slug, slug
            ),
        )
        .unwrap();
        fs::write(
            dir.join("records.json"),
            r#"[{"text": "안녕", "translation": "Hi"}, {"text": "네", "translation": "Yes"}]"#,
        )
        .unwrap();
        fs::write(dir.join("front.html"), "{{Korean}}").unwrap();
        fs::write(dir.join("back.html"), "{{FrontSide}}<hr>{{English}}").unwrap();
        fs::write(dir.join("style.css"), ".card {}").unwrap();
    }

    #[test]
    fn loads_topics_from_disk() {
        let root = tempfile::tempdir().unwrap();
        write_topic(root.path(), "greetings");
        fs::create_dir_all(root.path().join("not_a_topic")).unwrap();

        let source = DirectoryTopics::new(root.path());
        assert_eq!(source.slugs().unwrap(), ["greetings"]);

        let topic = source.load("greetings").unwrap();
        assert_eq!(topic.records.len(), 2);
        assert_eq!(topic.model.fields.len(), 2);
        assert_eq!(topic.model.templates[0].front, "{{Korean}}");
        assert!(!topic.model.wants_audio());
    }

    #[test]
    fn manifest_slug_must_match_its_directory() {
        let root = tempfile::tempdir().unwrap();
        write_topic_as(root.path(), "greetings", "farewells");

        let source = DirectoryTopics::new(root.path());
        assert_eq!(source.slugs().unwrap(), ["greetings"]);
        let err = source.load("greetings").unwrap_err().to_string();
        assert!(err.contains("greetings"));
        assert!(err.contains("farewells"));
    }

    #[test]
    fn missing_topic_names_the_slug() {
        let root = tempfile::tempdir().unwrap();
        let err = DirectoryTopics::new(root.path()).load("numbers").unwrap_err();
        assert!(err.to_string().contains("numbers"));
    }
}
