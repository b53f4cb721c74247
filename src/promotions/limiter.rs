use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::{
    DailyViewCounter, PromotionConfig, PromotionStats, PromotionStatus, ViewsData,
};

/// Active flag set and `today` inside `[start_date, end_date]`, both ends inclusive.
pub fn is_active(promotion: &PromotionConfig, today: NaiveDate) -> bool {
    if !promotion.active {
        return false;
    }
    match (promotion.start_date, promotion.end_date) {
        (Some(start), Some(end)) => start <= today && today <= end,
        _ => false,
    }
}

/// Daily view counters for promotions. Only counters dated `today` are ever
/// held; anything older is dropped on construction and whenever the day moves.
#[derive(Debug, Clone)]
pub struct PromotionLimiter {
    counters: Vec<DailyViewCounter>,
    today: NaiveDate,
}

impl PromotionLimiter {
    pub fn new(counters: Vec<DailyViewCounter>, today: NaiveDate) -> Self {
        let mut limiter = Self { counters, today };
        limiter.purge_stale();
        limiter
    }

    pub fn from_views(data: ViewsData, today: NaiveDate) -> Self {
        Self::new(data.daily_views, today)
    }

    #[cfg(test)]
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    #[cfg(test)]
    pub fn counters(&self) -> &[DailyViewCounter] {
        &self.counters
    }

    pub fn to_views(&self) -> ViewsData {
        ViewsData {
            daily_views: self.counters.clone(),
        }
    }

    fn purge_stale(&mut self) -> usize {
        let today = self.today;
        let before = self.counters.len();
        self.counters.retain(|c| c.date == today);
        let purged = before - self.counters.len();
        if purged > 0 {
            info!("Purged {} promotion view counters not dated {}", purged, today);
        }
        purged
    }

    fn roll_to(&mut self, today: NaiveDate) {
        if today != self.today {
            self.today = today;
            self.purge_stale();
        }
    }

    pub fn view_count(&self, promotion_id: &str) -> u32 {
        self.counters
            .iter()
            .find(|c| c.promotion_id == promotion_id && c.date == self.today)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    pub fn has_reached_limit(&self, promotion: &PromotionConfig) -> bool {
        match promotion.daily_view_limit {
            Some(limit) => self.view_count(&promotion.id) >= limit,
            None => false,
        }
    }

    pub fn record_view(&mut self, promotion_id: &str, today: NaiveDate) {
        self.roll_to(today);
        match self
            .counters
            .iter_mut()
            .find(|c| c.promotion_id == promotion_id && c.date == today)
        {
            Some(counter) => counter.count += 1,
            None => self.counters.push(DailyViewCounter {
                promotion_id: promotion_id.to_string(),
                date: today,
                count: 1,
            }),
        }
    }

    /// Returns the promotions that may be shown today, by ascending priority
    /// with config order breaking ties. Every returned promotion is counted
    /// as viewed once.
    pub fn select_eligible(
        &mut self,
        configs: &[PromotionConfig],
        today: NaiveDate,
    ) -> Vec<PromotionConfig> {
        self.roll_to(today);

        let mut eligible: Vec<PromotionConfig> = configs
            .iter()
            .filter(|p| is_active(p, today) && !self.has_reached_limit(p))
            .cloned()
            .collect();
        eligible.sort_by_key(|p| p.effective_priority());

        for promotion in &eligible {
            self.record_view(&promotion.id, today);
        }

        debug!(
            "Eligible promotions: {}",
            eligible
                .iter()
                .map(|p| match p.daily_view_limit {
                    Some(limit) => format!("{}: {}/{}", p.id, self.view_count(&p.id), limit),
                    None => format!("{}: {}", p.id, self.view_count(&p.id)),
                })
                .collect::<Vec<_>>()
                .join(", ")
        );

        eligible
    }

    /// Read-only snapshot for every configured promotion; no views are recorded.
    pub fn stats(&self, configs: &[PromotionConfig]) -> Vec<PromotionStats> {
        configs
            .iter()
            .map(|p| {
                let is_active = is_active(p, self.today);
                let has_reached_limit = self.has_reached_limit(p);
                let status = if !is_active {
                    PromotionStatus::Inactive
                } else if has_reached_limit {
                    PromotionStatus::LimitReached
                } else {
                    PromotionStatus::Active
                };
                PromotionStats {
                    id: p.id.clone(),
                    item_key: p.item_key.clone(),
                    label: p.label.clone(),
                    current_views: self.view_count(&p.id),
                    daily_view_limit: p.daily_view_limit,
                    is_active,
                    has_reached_limit,
                    status,
                }
            })
            .collect()
    }
}
