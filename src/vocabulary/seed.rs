use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::vocabulary::types::Topic;
use crate::vocabulary::VocabularyError;

fn embedded_list(topic: Topic) -> &'static str {
    match topic {
        Topic::Common => include_str!("../../words/common.txt"),
        Topic::Education => include_str!("../../words/education.txt"),
        Topic::Finance => include_str!("../../words/finance.txt"),
        Topic::Health => include_str!("../../words/health.txt"),
        Topic::Law => include_str!("../../words/law.txt"),
        Topic::Medicine => include_str!("../../words/medicine.txt"),
        Topic::Programming => include_str!("../../words/programming.txt"),
        Topic::Technology => include_str!("../../words/technology.txt"),
        Topic::Travel => include_str!("../../words/travel.txt"),
    }
}

fn file_name(topic: Topic) -> String {
    format!("{}.txt", topic.as_str().to_lowercase())
}

/// Source of the initial vocabulary: the lists compiled into the binary,
/// optionally overridden per topic by `<dir>/<topic>.txt`.
#[derive(Debug, Clone, Default)]
pub struct WordLists {
    dir: Option<PathBuf>,
}

impl WordLists {
    pub fn embedded() -> Self {
        Self { dir: None }
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    async fn read_list(&self, topic: Topic) -> Result<String, VocabularyError> {
        if let Some(dir) = &self.dir {
            let path = dir.join(file_name(topic));
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => return Ok(content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(VocabularyError::WordList {
                        topic,
                        message: format!("{}: {e}", path.display()),
                    })
                }
            }
        }
        Ok(embedded_list(topic).to_string())
    }

    /// Builds the text → topic map. Topics are read in [`Topic::ALL`] order
    /// and a word keeps the first topic that lists it.
    pub async fn load(&self) -> Result<BTreeMap<String, Topic>, VocabularyError> {
        let mut words = BTreeMap::new();
        for topic in Topic::ALL {
            let content = self.read_list(topic).await?;
            for line in content.lines() {
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                words.entry(text.to_string()).or_insert(topic);
            }
        }
        Ok(words)
    }
}
