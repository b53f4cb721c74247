use serde::{Deserialize, Serialize};

use crate::models::Item;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub url: String,
    pub title: String,
}

/// User favorites, keyed by item URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites {
    entries: Vec<Favorite>,
}

impl Favorites {
    pub fn entries(&self) -> &[Favorite] {
        &self.entries
    }

    pub fn is_favorite(&self, item: &Item) -> bool {
        self.entries.iter().any(|f| f.url == item.url)
    }

    /// Adds or removes the item; returns whether it is a favorite afterwards.
    pub fn toggle(&mut self, item: &Item) -> bool {
        if self.is_favorite(item) {
            self.entries.retain(|f| f.url != item.url);
            false
        } else {
            self.entries.push(Favorite {
                url: item.url.clone(),
                title: item.title.clone(),
            });
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, url: &str) -> Item {
        Item {
            url: url.into(),
            ..Item::new(title)
        }
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut favs = Favorites::default();
        let a = item("A", "https://a.dev");

        assert!(favs.toggle(&a));
        assert!(favs.is_favorite(&a));
        assert!(!favs.toggle(&a));
        assert!(favs.entries().is_empty());
    }

    #[test]
    fn identity_is_the_url() {
        let mut favs = Favorites::default();
        favs.toggle(&item("A", "https://a.dev"));
        assert!(favs.is_favorite(&item("Renamed", "https://a.dev")));
        assert!(!favs.is_favorite(&item("A", "https://other.dev")));
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut favs = Favorites::default();
        favs.toggle(&Item { url: "u".into(), ..Item::new("t") });
        assert_eq!(serde_json::to_string(&favs).unwrap(), r#"[{"url":"u","title":"t"}]"#);
    }
}
