use anyhow::{anyhow, Result};
use include_dir::{include_dir, Dir};

use super::TopicSource;

static TOPICS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets/topics");

/// Topics compiled into the binary from `assets/topics`.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedTopics;

impl TopicSource for EmbeddedTopics {
    fn name(&self) -> String {
        "embedded topics".to_string()
    }

    fn slugs(&self) -> Result<Vec<String>> {
        let mut slugs: Vec<String> = TOPICS_DIR
            .dirs()
            .filter_map(|d| d.path().file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        slugs.sort();
        Ok(slugs)
    }

    fn read(&self, slug: &str, file: &str) -> Result<String> {
        let path = format!("{}/{}", slug, file);
        let file = TOPICS_DIR
            .get_file(&path)
            .ok_or_else(|| anyhow!("Topic '{}' not found: no embedded {}", slug, path))?;
        file.contents_utf8()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Embedded {} is not valid UTF-8", path))
    }
}
