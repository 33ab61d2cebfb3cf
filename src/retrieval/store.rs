//! The vector datastore seam.
//!
//! The datastore is a black-box search oracle: callers hand it an
//! embedding plus a filter set and get back records ordered by ascending
//! similarity distance. [`MemoryStore`] is the in-process implementation
//! used by tests and the CLI demo seed; production deployments implement
//! [`VectorStore`] over their own backend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::filters::FilterSet;
use super::narrative::PriceRange;
use crate::domain::Domain;
use crate::error::Error;

/// An immutable record returned by a similarity search.
#[derive(Debug, Clone)]
pub struct RetrievalRecord {
    /// Catalog identifier.
    pub id: String,
    /// Free-text narrative the record was embedded from.
    pub narrative: String,
    /// Location string.
    pub city: String,
    /// Raw structured payload for the formatter.
    pub payload: serde_json::Value,
    /// Similarity distance: 0 = identical, larger = less similar.
    pub distance: f32,
}

/// A similarity-search oracle over the knowledge base.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Runs a filtered similarity search.
    ///
    /// Results are ordered by ascending distance; equal distances break
    /// ties on record id so repeated searches return a stable order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Search`] when the backend fails.
    async fn search(
        &self,
        domain: Domain,
        embedding: &[f32],
        filters: &FilterSet,
        limit: usize,
    ) -> Result<Vec<RetrievalRecord>, Error>;
}

/// A structured-query oracle over the same catalog.
///
/// Used by the `query_structured_data` path; the SQL dialect is the
/// backend's concern.
#[async_trait]
pub trait SqlOracle: Send + Sync {
    /// Executes a query and returns rows as JSON objects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuredData`] when execution fails.
    async fn execute(&self, sql: &str) -> Result<Vec<serde_json::Value>, Error>;
}

/// A catalog record held by the in-memory store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredRecord {
    /// Catalog identifier.
    pub id: String,
    /// Free-text narrative.
    pub narrative: String,
    /// Location string.
    #[serde(default)]
    pub city: String,
    /// Destination (state) name, matched by the region filter.
    #[serde(default)]
    pub destination_name: String,
    /// Price tier, matched by the price filter.
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    /// Supplier name, matched by the name filter.
    #[serde(default)]
    pub supplier_name: String,
    /// Raw structured payload.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Precomputed embedding of the narrative.
    pub embedding: Vec<f32>,
}

/// Seed file shape for [`MemoryStore::from_json`].
#[derive(Debug, Default, Deserialize)]
struct SeedFile {
    #[serde(default)]
    experiences: Vec<StoredRecord>,
    #[serde(default)]
    lodging: Vec<StoredRecord>,
    #[serde(default)]
    transport: Vec<StoredRecord>,
}

/// In-process [`VectorStore`] backed by a per-domain record list.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<Domain, Vec<StoredRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record under a domain.
    pub fn insert(&mut self, domain: Domain, record: StoredRecord) {
        self.records.entry(domain).or_default().push(record);
    }

    /// Loads a store from a JSON seed document with `experiences`,
    /// `lodging`, and `transport` arrays.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Search`] if the document does not parse.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let seed: SeedFile = serde_json::from_str(json).map_err(|e| Error::Search {
            message: format!("seed parse failed: {e}"),
        })?;
        let mut store = Self::new();
        for record in seed.experiences {
            store.insert(Domain::Experiences, record);
        }
        for record in seed.lodging {
            store.insert(Domain::Lodging, record);
        }
        for record in seed.transport {
            store.insert(Domain::Transportation, record);
        }
        Ok(store)
    }

    /// Number of records stored for a domain.
    #[must_use]
    pub fn len(&self, domain: Domain) -> usize {
        self.records.get(&domain).map_or(0, Vec::len)
    }

    /// Whether the store holds no records for a domain.
    #[must_use]
    pub fn is_empty(&self, domain: Domain) -> bool {
        self.len(domain) == 0
    }
}

/// Cosine distance between two vectors.
///
/// Embeddings arrive normalized from the embedding service, but the
/// norms are still applied so hand-written test vectors behave.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn search(
        &self,
        domain: Domain,
        embedding: &[f32],
        filters: &FilterSet,
        limit: usize,
    ) -> Result<Vec<RetrievalRecord>, Error> {
        let Some(records) = self.records.get(&domain) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<RetrievalRecord> = records
            .iter()
            .filter(|r| filters.accepts(&r.destination_name, r.price_range, &r.supplier_name))
            .map(|r| RetrievalRecord {
                id: r.id.clone(),
                narrative: r.narrative.clone(),
                city: r.city.clone(),
                payload: r.payload.clone(),
                distance: cosine_distance(embedding, &r.embedding),
            })
            .collect();

        // Ascending distance, stable id tie-break.
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, destination: &str, embedding: Vec<f32>) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            narrative: format!("narrative {id}"),
            city: destination.to_string(),
            destination_name: destination.to_string(),
            price_range: None,
            supplier_name: String::new(),
            payload: serde_json::Value::Null,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_search_orders_by_distance() {
        let mut store = MemoryStore::new();
        store.insert(Domain::Lodging, record("far", "Oaxaca", vec![0.0, 1.0]));
        store.insert(Domain::Lodging, record("near", "Oaxaca", vec![1.0, 0.0]));

        let hits = store
            .search(Domain::Lodging, &[1.0, 0.0], &FilterSet::default(), 10)
            .await
            .unwrap_or_default();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "near");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn test_equal_distance_ties_break_on_id() {
        let mut store = MemoryStore::new();
        store.insert(Domain::Lodging, record("b", "Oaxaca", vec![1.0, 0.0]));
        store.insert(Domain::Lodging, record("a", "Oaxaca", vec![1.0, 0.0]));

        let hits = store
            .search(Domain::Lodging, &[1.0, 0.0], &FilterSet::default(), 10)
            .await
            .unwrap_or_default();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        // Same query, same order.
        let again = store
            .search(Domain::Lodging, &[1.0, 0.0], &FilterSet::default(), 10)
            .await
            .unwrap_or_default();
        let ids_again: Vec<&str> = again.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ids_again);
    }

    #[tokio::test]
    async fn test_filters_restrict_results() {
        let mut store = MemoryStore::new();
        store.insert(Domain::Lodging, record("roo", "Quintana Roo", vec![1.0, 0.0]));
        store.insert(Domain::Lodging, record("oax", "Oaxaca", vec![1.0, 0.0]));

        let filters = FilterSet {
            state_name: Some("Quintana Roo".to_string()),
            ..FilterSet::default()
        };
        let hits = store
            .search(Domain::Lodging, &[1.0, 0.0], &filters, 10)
            .await
            .unwrap_or_default();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "roo");
    }

    #[tokio::test]
    async fn test_limit_truncates() {
        let mut store = MemoryStore::new();
        for i in 0..20 {
            store.insert(Domain::Experiences, record(&format!("r{i:02}"), "Oaxaca", vec![1.0, 0.0]));
        }
        let hits = store
            .search(Domain::Experiences, &[1.0, 0.0], &FilterSet::default(), 10)
            .await
            .unwrap_or_default();
        assert_eq!(hits.len(), 10);
    }

    #[test]
    fn test_seed_loading() {
        let seed = r#"{
            "lodging": [
                {"id": "l1", "narrative": "hotel", "destination_name": "Yucatan", "embedding": [1.0, 0.0]}
            ],
            "experiences": [],
            "transport": [
                {"id": "t1", "narrative": "transfer", "embedding": [0.0, 1.0]}
            ]
        }"#;
        let store = MemoryStore::from_json(seed).unwrap_or_else(|_| unreachable!());
        assert_eq!(store.len(Domain::Lodging), 1);
        assert_eq!(store.len(Domain::Transportation), 1);
        assert!(store.is_empty(Domain::Experiences));
    }

    #[test]
    fn test_cosine_distance_zero_vector_guard() {
        assert!((cosine_distance(&[0.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < f32::EPSILON);
    }
}
