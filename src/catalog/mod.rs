mod favorites;
mod pagination;
mod search;

pub use favorites::Favorites;
pub use pagination::{paginate, Page};
pub use search::filter_items;
