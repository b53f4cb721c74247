mod item;
mod lenient;
mod popularity;
mod promotion;
mod review;

pub use item::{parse_items, Item};
pub use popularity::PopularityInfo;
pub use promotion::{
    parse_day, DailyViewCounter, PromotionConfig, PromotionStats, PromotionStatus, ViewsData,
};
pub use review::{clamp_stars, parse_reviews, Review, ReviewSource};
