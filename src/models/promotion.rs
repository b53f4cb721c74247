use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_PRIORITY: i64 = 999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionConfig {
    #[serde(default, deserialize_with = "super::lenient::string")]
    pub id: String,
    #[serde(alias = "projectName")]
    pub item_key: String,
    #[serde(default, alias = "promoLabel", deserialize_with = "super::lenient::string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient_day")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_day")]
    pub end_date: Option<NaiveDate>,
    /// `None` means no daily cap.
    #[serde(default, deserialize_with = "super::lenient::view_limit")]
    pub daily_view_limit: Option<u32>,
    /// Lower sorts first. Only a missing or non-numeric priority falls back
    /// to `DEFAULT_PRIORITY`; an explicit 0 is kept.
    #[serde(default, deserialize_with = "super::lenient::priority")]
    pub priority: Option<i64>,
    #[serde(default, deserialize_with = "super::lenient::flag")]
    pub active: bool,
}

impl PromotionConfig {
    pub fn effective_priority(&self) -> i64 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyViewCounter {
    pub promotion_id: String,
    pub date: NaiveDate,
    pub count: u32,
}

/// Persisted shape of the view counters blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewsData {
    #[serde(default)]
    pub daily_views: Vec<DailyViewCounter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PromotionStatus {
    Inactive,
    LimitReached,
    Active,
}

impl std::fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromotionStatus::Inactive => write!(f, "inactive"),
            PromotionStatus::LimitReached => write!(f, "limit reached"),
            PromotionStatus::Active => write!(f, "active"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionStats {
    pub id: String,
    pub item_key: String,
    pub label: String,
    pub current_views: u32,
    pub daily_view_limit: Option<u32>,
    pub is_active: bool,
    pub has_reached_limit: bool,
    pub status: PromotionStatus,
}

/// Accepts `YYYY-MM-DD` or a timestamp; the time of day is dropped.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.date());
    }
    None
}

fn lenient_day<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(parse_day))
}
