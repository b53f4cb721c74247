mod ids;
mod limiter;

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::PromotionConfig;

use ids::assign_ids;

pub use limiter::PromotionLimiter;

#[derive(Debug, Deserialize)]
struct PromotionsFile {
    #[serde(default)]
    promotions: Vec<Value>,
}

/// Parses a promotions document and assigns ids to entries lacking one.
pub fn parse_promotions(content: &str) -> Result<Vec<PromotionConfig>> {
    let file: PromotionsFile = serde_json::from_str(content)?;

    let configs: Vec<PromotionConfig> = file
        .promotions
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Skipping malformed promotion at index {}: {}", index, e);
                None
            }
        })
        .collect();

    Ok(assign_ids(configs))
}

pub fn load_promotions(path: &Path) -> Result<Vec<PromotionConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read promotions file {}", path.display()))?;
    let configs = parse_promotions(&content)?;
    info!("Loaded {} promotions from {:?}", configs.len(), path);
    Ok(configs)
}
