use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::Serialize;

use crate::models::Table;

#[derive(Debug, Clone, Serialize)]
pub struct DatasetMetadata {
    pub filename: String,
    pub size: usize,
    #[serde(rename = "type")]
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Dataset {
    pub table: Table,
    pub metadata: DatasetMetadata,
}

#[derive(Debug, Clone)]
pub struct DatasetEntry {
    pub id: String,
    pub dataset: Arc<Dataset>,
}

/// Where uploaded datasets live between requests.
pub trait DatasetStore: Send + Sync {
    fn put(&self, id: String, dataset: Arc<Dataset>);
    /// Stores the dataset under a fresh id derived from its creation time
    /// and returns that id. Never replaces an existing dataset.
    fn insert_new(&self, dataset: Arc<Dataset>) -> String;
    fn get(&self, id: &str) -> Option<Arc<Dataset>>;
    fn remove(&self, id: &str) -> bool;
    /// Oldest first.
    fn list(&self) -> Vec<DatasetEntry>;
}

/// Bounded in-memory store; idle datasets are evicted.
pub struct MokaDatasetStore {
    cache: Cache<String, Arc<Dataset>>,
}

impl MokaDatasetStore {
    pub fn new(max_datasets: u64, idle: Duration) -> Self {
        tracing::info!("Dataset store: capacity {}, idle expiry {:?}", max_datasets, idle);
        let cache = Cache::builder()
            .max_capacity(max_datasets)
            .time_to_idle(idle)
            .build();
        Self { cache }
    }
}

impl DatasetStore for MokaDatasetStore {
    fn put(&self, id: String, dataset: Arc<Dataset>) {
        tracing::debug!("Storing dataset {} ({} rows)", id, dataset.table.row_count());
        self.cache.insert(id, dataset);
    }

    fn insert_new(&self, dataset: Arc<Dataset>) -> String {
        let millis = dataset.metadata.created_at.timestamp_millis();
        let mut seq = 0;
        loop {
            let id = dataset_id(millis, seq);
            let entry = self
                .cache
                .entry(id.clone())
                .or_insert_with(|| Arc::clone(&dataset));
            if entry.is_fresh() {
                tracing::debug!("Storing dataset {} ({} rows)", id, dataset.table.row_count());
                return id;
            }
            seq += 1;
        }
    }

    fn get(&self, id: &str) -> Option<Arc<Dataset>> {
        self.cache.get(id)
    }

    fn remove(&self, id: &str) -> bool {
        self.cache.remove(id).is_some()
    }

    fn list(&self) -> Vec<DatasetEntry> {
        let mut entries: Vec<DatasetEntry> = self
            .cache
            .iter()
            .map(|(id, dataset)| DatasetEntry {
                id: id.to_string(),
                dataset,
            })
            .collect();
        entries.sort_by(|a, b| {
            a.dataset
                .metadata
                .created_at
                .cmp(&b.dataset.metadata.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        entries
    }
}

/// `dataset_<unix millis>`, suffixed with `_<seq>` after the first.
fn dataset_id(millis: i64, seq: usize) -> String {
    if seq == 0 {
        format!("dataset_{}", millis)
    } else {
        format!("dataset_{}_{}", millis, seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, Row};
    use chrono::TimeZone;

    fn dataset(filename: &str, created_at: DateTime<Utc>) -> Arc<Dataset> {
        let row: Row = vec![("a", CellValue::from(1.0))].into_iter().collect();
        Arc::new(Dataset {
            table: Table::new(vec![row]),
            metadata: DatasetMetadata {
                filename: filename.to_string(),
                size: 4,
                content_type: "text/csv".to_string(),
                created_at,
            },
        })
    }

    #[test]
    fn put_get_remove() {
        let store = MokaDatasetStore::new(8, Duration::from_secs(60));
        let now = Utc::now();
        store.put("d1".to_string(), dataset("a.csv", now));

        let found = store.get("d1").unwrap();
        assert_eq!(found.metadata.filename, "a.csv");
        assert!(store.get("d2").is_none());

        assert!(store.remove("d1"));
        assert!(!store.remove("d1"));
        assert!(store.get("d1").is_none());
    }

    #[test]
    fn list_is_oldest_first() {
        let store = MokaDatasetStore::new(8, Duration::from_secs(60));
        let early = Utc.timestamp_millis_opt(1_000).unwrap();
        let late = Utc.timestamp_millis_opt(2_000).unwrap();
        store.put("late".to_string(), dataset("b.csv", late));
        store.put("early".to_string(), dataset("a.csv", early));

        let ids: Vec<String> = store.list().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn ids_avoid_collisions() {
        let store = MokaDatasetStore::new(8, Duration::from_secs(60));
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let first = store.insert_new(dataset("a.csv", now));
        assert_eq!(first, "dataset_1700000000000");
        let second = store.insert_new(dataset("b.csv", now));
        assert_eq!(second, "dataset_1700000000000_1");

        assert_eq!(store.get(&first).unwrap().metadata.filename, "a.csv");
        assert_eq!(store.get(&second).unwrap().metadata.filename, "b.csv");
    }

    #[test]
    fn concurrent_inserts_in_the_same_millisecond_keep_both() {
        let store = MokaDatasetStore::new(64, Duration::from_secs(60));
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let ids: Vec<(String, String)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = &store;
                    scope.spawn(move || {
                        let filename = format!("{}.csv", i);
                        let id = store.insert_new(dataset(&filename, now));
                        (id, filename)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let distinct: std::collections::HashSet<&str> = ids.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(distinct.len(), 8);
        for (id, filename) in &ids {
            assert_eq!(&store.get(id).unwrap().metadata.filename, filename);
        }
    }
}
