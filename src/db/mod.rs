mod blob;
mod schema;
mod store;

pub use blob::{load_json, save_json};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};

pub const LOCAL_REVIEWS_KEY: &str = "local_reviews";
pub const PROMOTION_VIEWS_KEY: &str = "promotions_views";
pub const FAVORITES_KEY: &str = "favorites";
pub const SORT_POPULARITY_KEY: &str = "sort_popularity";
