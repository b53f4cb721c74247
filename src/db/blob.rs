use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::Result;

use super::store::KeyValueStore;

/// Reads a JSON blob. A value that no longer parses is treated as absent.
pub async fn load_json<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("Ignoring malformed blob under {}: {}", key, e);
            Ok(None)
        }
    }
}

pub async fn save_json<S, T>(store: &S, key: &str, value: &T) -> Result<()>
where
    S: KeyValueStore,
    T: Serialize,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn malformed_blob_reads_as_missing() {
        let store = MemoryStore::new();
        tokio_test::block_on(async {
            store.set("local_reviews", "{not json".to_string()).await.unwrap();
            let loaded: Option<Vec<String>> = load_json(&store, "local_reviews").await.unwrap();
            assert!(loaded.is_none());
        });
    }

    #[test]
    fn wrong_shape_reads_as_missing() {
        let store = MemoryStore::new();
        tokio_test::block_on(async {
            store.set("favorites", r#"{"a": 1}"#.to_string()).await.unwrap();
            let loaded: Option<Vec<String>> = load_json(&store, "favorites").await.unwrap();
            assert!(loaded.is_none());
        });
    }

    #[test]
    fn saved_value_loads_back() {
        let store = MemoryStore::new();
        tokio_test::block_on(async {
            save_json(&store, "k", &vec![1, 2, 3]).await.unwrap();
            let loaded: Option<Vec<i32>> = load_json(&store, "k").await.unwrap();
            assert_eq!(loaded, Some(vec![1, 2, 3]));
        });
    }
}
