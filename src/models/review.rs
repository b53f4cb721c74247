use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSource {
    #[default]
    Server,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default, alias = "usuario", deserialize_with = "super::lenient::string")]
    pub author: String,
    #[serde(default, alias = "proyecto", deserialize_with = "super::lenient::string")]
    pub item: String,
    #[serde(default, alias = "comentario", deserialize_with = "super::lenient::string")]
    pub comment: String,
    /// 0 means unrated; anything else is within `MIN_STARS..=MAX_STARS`.
    #[serde(default, alias = "estrellas", deserialize_with = "lenient_stars")]
    pub stars: u8,
    #[serde(default, alias = "fecha", deserialize_with = "super::lenient::string")]
    pub date: String,
    #[serde(default, rename = "sourceTag", alias = "source", deserialize_with = "lenient_source")]
    pub source: ReviewSource,
}

impl Review {
    pub fn is_rated(&self) -> bool {
        self.stars >= MIN_STARS
    }

    pub fn tagged(mut self, source: ReviewSource) -> Self {
        self.source = source;
        self
    }
}

/// Clamp a raw rating into range; non-positive means unrated.
pub fn clamp_stars(raw: f64) -> u8 {
    if !raw.is_finite() || raw < 0.5 {
        return 0;
    }
    raw.round().clamp(MIN_STARS as f64, MAX_STARS as f64) as u8
}

fn lenient_stars<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let raw = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(raw.map(clamp_stars).unwrap_or(0))
}

fn lenient_source<'de, D>(deserializer: D) -> std::result::Result<ReviewSource, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some("local") => ReviewSource::Local,
        _ => ReviewSource::Server,
    })
}

/// Parses a loosely-typed review list one entry at a time. Bad fields fall
/// back to defaults; only entries that are not objects are skipped.
pub fn parse_reviews(values: Vec<Value>, source: ReviewSource) -> Vec<Review> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<Review>(value) {
            Ok(review) => Some(review.tagged(source)),
            Err(e) => {
                warn!("Skipping malformed review at index {}: {}", index, e);
                None
            }
        })
        .collect()
}
