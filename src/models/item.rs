use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A catalog entry. The title is the natural key, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: String,
    pub initials: Option<String>,
}

impl Item {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: String::new(),
            description: String::new(),
            tags: Vec::new(),
            status: String::new(),
            initials: None,
        }
    }

    /// Explicit initials, or the first two characters of the title.
    pub fn display_initials(&self) -> String {
        match &self.initials {
            Some(initials) if !initials.is_empty() => initials.clone(),
            _ => self.title.chars().take(2).collect(),
        }
    }
}

pub fn parse_items(values: Vec<Value>) -> Vec<Item> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<Item>(value) {
            Ok(item) if !item.title.trim().is_empty() => Some(item),
            Ok(_) => {
                warn!("Skipping untitled item at index {}", index);
                None
            }
            Err(e) => {
                warn!("Skipping malformed item at index {}: {}", index, e);
                None
            }
        })
        .collect()
}
