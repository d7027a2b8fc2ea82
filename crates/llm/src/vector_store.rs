//! Vector index client using Qdrant
//!
//! Incident ids are not valid Qdrant point ids, so points are keyed by a
//! uuid-v5 derived from the incident id and the real id rides in the
//! payload under `incident_id`.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    condition::ConditionOneOf, r#match::MatchValue, value::Kind, Condition,
    CreateCollectionBuilder, Distance, FieldCondition, Filter, Match, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use uuid::Uuid;

use sherlock_core::{
    EmbeddingRecord, Error, IndexStats, MetadataFilter, Result, VectorIndex, VectorMatch,
};

use crate::LlmError;

const INCIDENT_ID_KEY: &str = "incident_id";

/// Qdrant connection configuration
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub endpoint: String,
    pub collection: String,
    pub dimension: usize,
    pub api_key: Option<String>,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            endpoint: sherlock_config::constants::endpoints::QDRANT_DEFAULT.to_string(),
            collection: "payment_incidents".to_string(),
            dimension: 768,
            api_key: None,
        }
    }
}

/// Vector index backed by a Qdrant collection
pub struct QdrantIndex {
    client: Qdrant,
    config: QdrantConfig,
}

impl QdrantIndex {
    pub fn new(config: QdrantConfig) -> std::result::Result<Self, LlmError> {
        let mut builder = Qdrant::from_url(&config.endpoint);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }
        let client = builder
            .build()
            .map_err(|e| LlmError::VectorStore(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Create the collection if it does not exist yet
    pub async fn ensure_collection(&self) -> std::result::Result<(), LlmError> {
        let exists = self
            .client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| LlmError::VectorStore(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.config.collection).vectors_config(
                        VectorParamsBuilder::new(self.config.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| LlmError::VectorStore(e.to_string()))?;
            tracing::info!(
                collection = %self.config.collection,
                dimension = self.config.dimension,
                "Created Qdrant collection"
            );
        }
        Ok(())
    }

    fn point_id(incident_id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, incident_id.to_uppercase().as_bytes()).to_string()
    }

    fn build_filter(filter: &MetadataFilter) -> Filter {
        let conditions: Vec<Condition> = filter
            .equals
            .iter()
            .map(|(key, value)| Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: key.clone(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(value.clone())),
                    }),
                    ..Default::default()
                })),
            })
            .collect();
        Filter {
            must: conditions,
            ..Default::default()
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>> {
        let mut builder = SearchPointsBuilder::new(
            &self.config.collection,
            vector.to_vec(),
            top_k as u64,
        )
        .with_payload(true);

        if let Some(filter) = filter {
            builder = builder.filter(Self::build_filter(filter));
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| Error::VectorIndex(e.to_string()))?;

        let matches = response
            .result
            .into_iter()
            .map(|point| {
                let mut metadata = HashMap::new();
                let mut id = String::new();

                for (key, value) in point.payload {
                    if let Some(Kind::StringValue(text)) = value.kind {
                        if key == INCIDENT_ID_KEY {
                            id = text;
                        } else {
                            metadata.insert(key, text);
                        }
                    }
                }

                VectorMatch {
                    id,
                    score: point.score.clamp(0.0, 1.0),
                    metadata,
                }
            })
            .filter(|m| !m.id.is_empty())
            .collect();

        Ok(matches)
    }

    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = records
            .iter()
            .map(|record| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert(
                    INCIDENT_ID_KEY.to_string(),
                    record.id.to_uppercase().into(),
                );
                for (key, value) in &record.metadata {
                    payload.insert(key.clone(), value.clone().into());
                }
                PointStruct::new(Self::point_id(&record.id), record.vector.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, points).wait(true))
            .await
            .map_err(|e| Error::VectorIndex(e.to_string()))?;

        tracing::info!(count = records.len(), "Upserted embedding records");
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let info = self
            .client
            .collection_info(&self.config.collection)
            .await
            .map_err(|e| Error::VectorIndex(e.to_string()))?;

        let count = info
            .result
            .map(|r| r.points_count.unwrap_or(0))
            .unwrap_or(0);

        Ok(IndexStats {
            count,
            dimension: self.config.dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_stable_and_case_insensitive() {
        let a = QdrantIndex::point_id("JSP-1046");
        let b = QdrantIndex::point_id("jsp-1046");
        assert_eq!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert_ne!(a, QdrantIndex::point_id("JSP-1047"));
    }

    #[test]
    fn test_build_filter_carries_all_conditions() {
        let filter = MetadataFilter::new().eq("domain", "upi").eq("source", "jira");
        let qdrant_filter = QdrantIndex::build_filter(&filter);
        assert_eq!(qdrant_filter.must.len(), 2);
    }
}
