mod reconcile;
mod scorer;

pub use reconcile::{normalize, reconcile, review_key};
pub use scorer::{PopularityCache, PopularityContext, PopularityParams};
