/// # Label Table
/// Ordered class names, index == class ID. Loaded once at startup.
use crate::error::{ConfigurationError, StartupError};
use std::path::Path;

pub const DEFAULT_LABELS_URL: &str =
    "https://raw.githubusercontent.com/pytorch/hub/master/imagenet_classes.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// One class name per line; surrounding whitespace of the whole text is dropped.
    pub fn from_text(text: &str) -> Self {
        let labels = text
            .trim()
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self { labels }
    }

    /// Load from an `http(s)://` URL or a local file path.
    pub async fn load(source: &str, client: &reqwest::Client) -> Result<Self, StartupError> {
        let fail = |message: String| StartupError::Labels {
            source_name: source.to_string(),
            message,
        };

        let text = if source.starts_with("http://") || source.starts_with("https://") {
            let response = client
                .get(source)
                .send()
                .await
                .map_err(|e| fail(e.to_string()))?;
            if !response.status().is_success() {
                return Err(fail(format!("HTTP {}", response.status())));
            }
            response.text().await.map_err(|e| fail(e.to_string()))?
        } else {
            tokio::fs::read_to_string(Path::new(source))
                .await
                .map_err(|e| fail(e.to_string()))?
        };

        let table = Self::from_text(&text);
        if table.is_empty() {
            return Err(fail("label source is empty".to_string()));
        }
        tracing::info!("Loaded {} labels from {}", table.len(), source);
        Ok(table)
    }

    /// The table must cover exactly the model's output classes.
    pub fn ensure_len(&self, classes: usize) -> Result<(), ConfigurationError> {
        if self.labels.len() != classes {
            return Err(ConfigurationError {
                labels: self.labels.len(),
                classes,
            });
        }
        Ok(())
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() || (self.labels.len() == 1 && self.labels[0].is_empty())
    }
}
