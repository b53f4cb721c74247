use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Item, PopularityInfo, Review};

use super::reconcile::normalize;

/// Tuning knobs for the bayesian popularity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopularityParams {
    /// Prior weight `m`: how many reviews it takes to outweigh the global mean.
    pub min_votes: f64,
    pub review_bonus: f64,
    pub quality_bonus: f64,
    pub consistency_penalty: f64,
    pub consistency_threshold: f64,
    /// A comment counts as a quality review when its trimmed length exceeds this.
    pub quality_min_chars: usize,
    pub fallback_mean: f64,
}

impl Default for PopularityParams {
    fn default() -> Self {
        Self {
            min_votes: 8.0,
            review_bonus: 0.1,
            quality_bonus: 0.05,
            consistency_penalty: 0.2,
            consistency_threshold: 1.5,
            quality_min_chars: 10,
            fallback_mean: 3.5,
        }
    }
}

/// Mean rating across every rated review in the catalog.
pub fn global_mean(reviews: &[Review], fallback: f64) -> f64 {
    let (sum, count) = reviews
        .iter()
        .filter(|r| r.is_rated())
        .fold((0.0, 0usize), |(sum, count), r| (sum + r.stars as f64, count + 1));

    if count == 0 {
        fallback
    } else {
        sum / count as f64
    }
}

pub fn score(
    item_key: &str,
    reviews: &[Review],
    global_mean: f64,
    params: &PopularityParams,
) -> PopularityInfo {
    let key = normalize(item_key);
    let for_item: Vec<&Review> = reviews
        .iter()
        .filter(|r| r.is_rated() && normalize(&r.item) == key)
        .collect();

    let n = for_item.len();
    if n == 0 {
        return PopularityInfo::default();
    }

    let nf = n as f64;
    let average = for_item.iter().map(|r| r.stars as f64).sum::<f64>() / nf;

    let m = params.min_votes;
    let bayesian = (nf / (nf + m)) * average + (m / (nf + m)) * global_mean;
    let review_bonus = params.review_bonus * (1.0 + nf).ln();

    let quality_count = for_item
        .iter()
        .filter(|r| r.comment.trim().chars().count() > params.quality_min_chars)
        .count();
    let quality_bonus = if quality_count > 0 {
        params.quality_bonus * (1.0 + quality_count as f64).ln()
    } else {
        0.0
    };

    let stddev = if n <= 1 {
        0.0
    } else {
        let variance = for_item
            .iter()
            .map(|r| (r.stars as f64 - average).powi(2))
            .sum::<f64>()
            / nf;
        variance.sqrt()
    };
    let penalty = if stddev > params.consistency_threshold {
        params.consistency_penalty * (stddev - params.consistency_threshold)
    } else {
        0.0
    };

    PopularityInfo {
        average,
        count: n,
        quality_count,
        stddev,
        score: bayesian + review_bonus + quality_bonus - penalty,
    }
}

/// Total order for ranked listings: score, average and count descending,
/// then title ascending ignoring case.
pub fn compare_ranked(
    a_title: &str,
    a: &PopularityInfo,
    b_title: &str,
    b: &PopularityInfo,
) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.average.total_cmp(&a.average))
        .then_with(|| b.count.cmp(&a.count))
        .then_with(|| a_title.to_lowercase().cmp(&b_title.to_lowercase()))
        .then_with(|| a_title.cmp(b_title))
}

/// Per-session scoring context. Rebuilt wholesale whenever the review set changes.
#[derive(Debug, Clone)]
pub struct PopularityContext {
    reviews: Vec<Review>,
    global_mean: f64,
    params: PopularityParams,
}

impl PopularityContext {
    pub fn new(reviews: Vec<Review>, params: PopularityParams) -> Self {
        let global_mean = global_mean(&reviews, params.fallback_mean);
        Self {
            reviews,
            global_mean,
            params,
        }
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn score(&self, item_key: &str) -> PopularityInfo {
        score(item_key, &self.reviews, self.global_mean, &self.params)
    }

    pub fn build_cache(&self, items: &[Item]) -> PopularityCache {
        let by_key: HashMap<String, PopularityInfo> = items
            .iter()
            .map(|item| (normalize(&item.title), self.score(&item.title)))
            .collect();

        debug!(
            "Popularity cache built: {} items, global mean {:.2}",
            by_key.len(),
            self.global_mean
        );

        PopularityCache { by_key }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PopularityCache {
    by_key: HashMap<String, PopularityInfo>,
}

impl PopularityCache {
    pub fn get(&self, title: &str) -> PopularityInfo {
        self.by_key
            .get(&normalize(title))
            .copied()
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn rank(&self, items: &mut [Item]) {
        items.sort_by(|a, b| {
            compare_ranked(&a.title, &self.get(&a.title), &b.title, &self.get(&b.title))
        });
    }
}
