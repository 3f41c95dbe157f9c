use crate::error::SearchError;
use crate::models::{IndexStats, MetadataFilter, SourceDocument, SourceSummary};
use crate::traits::SimilarityIndex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Static configuration reported alongside index statistics.
#[derive(Debug, Clone)]
pub struct IndexIdentity {
    pub embedding_model: String,
    pub reranking_enabled: bool,
    pub reranker_model: Option<String>,
}

pub struct MaintenanceOps<S> {
    index: Arc<S>,
    identity: IndexIdentity,
}

impl<S: SimilarityIndex> MaintenanceOps<S> {
    pub fn new(index: Arc<S>, identity: IndexIdentity) -> Self {
        Self { index, identity }
    }

    /// Unique sources are counted with a full scan, never cached.
    pub async fn stats(&self) -> Result<IndexStats, SearchError> {
        let total_chunks = self.index.count().await?;
        let unique_sources = if total_chunks == 0 {
            0
        } else {
            let stored = self.index.get(None).await?;
            stored
                .metadatas
                .iter()
                .map(|metadata| metadata.record.source.as_str())
                .collect::<HashSet<_>>()
                .len()
        };

        Ok(IndexStats {
            total_chunks,
            unique_sources,
            embedding_model: self.identity.embedding_model.clone(),
            reranking_enabled: self.identity.reranking_enabled,
            reranker_model: self.identity.reranker_model.clone(),
        })
    }

    /// Deletes every chunk of one source in a single batch. A source with
    /// no stored chunks is a warning, not an error.
    pub async fn delete_by_source(&self, source: &str) -> Result<usize, SearchError> {
        let stored = self
            .index
            .get(Some(&MetadataFilter::by_source(source)))
            .await?;
        if stored.ids.is_empty() {
            warn!(source, "no chunks found to delete");
            return Ok(0);
        }

        let removed = stored.ids.len();
        self.index.delete(&stored.ids).await?;
        info!(source, removed, "deleted source");
        Ok(removed)
    }

    pub async fn list_sources(&self) -> Result<Vec<SourceSummary>, SearchError> {
        let stored = self.index.get(None).await?;

        let mut by_source: BTreeMap<String, SourceSummary> = BTreeMap::new();
        for metadata in &stored.metadatas {
            let entry = by_source
                .entry(metadata.record.source.clone())
                .or_insert_with(|| SourceSummary {
                    source: metadata.record.source.clone(),
                    cv_name: metadata.record.cv_name.clone(),
                    office: metadata.record.office.clone(),
                    chunk_count: 0,
                });
            entry.chunk_count += 1;
        }

        Ok(by_source.into_values().collect())
    }

    /// All stored chunks of one source, joined in chunk-index order.
    pub async fn fetch_source(&self, source: &str) -> Result<Option<SourceDocument>, SearchError> {
        let stored = self
            .index
            .get(Some(&MetadataFilter::by_source(source)))
            .await?;
        if stored.ids.is_empty() {
            return Ok(None);
        }

        let mut chunks: Vec<(usize, &str)> = stored
            .metadatas
            .iter()
            .zip(stored.documents.iter())
            .map(|(metadata, document)| (metadata.chunk_index, document.as_str()))
            .collect();
        chunks.sort_by_key(|(chunk_index, _)| *chunk_index);

        let cv_name = stored
            .metadatas
            .first()
            .map(|metadata| metadata.record.cv_name.clone())
            .unwrap_or_default();
        let text = chunks
            .into_iter()
            .map(|(_, document)| document)
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(Some(SourceDocument {
            source: source.to_string(),
            cv_name,
            text,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkMetadata, RecordMetadata};
    use crate::testing::MemoryIndex;

    fn identity() -> IndexIdentity {
        IndexIdentity {
            embedding_model: "hashed-ngram-384".to_string(),
            reranking_enabled: true,
            reranker_model: Some("BAAI/bge-reranker-base".to_string()),
        }
    }

    fn metadata(source: &str, office: &str, chunk_index: usize, total_chunks: usize) -> ChunkMetadata {
        ChunkMetadata {
            record: RecordMetadata {
                source: source.to_string(),
                file_path: format!("/data/cvs/{source}"),
                cv_name: source.trim_end_matches(".json").to_string(),
                office: office.to_string(),
                years_of_experience: None,
            },
            chunk_index,
            total_chunks,
        }
    }

    async fn seeded_index() -> Arc<MemoryIndex> {
        let index = Arc::new(MemoryIndex::default());
        index
            .add(
                &[
                    "kari_0".to_string(),
                    "kari_1".to_string(),
                    "ola_0".to_string(),
                ],
                &[
                    "første del".to_string(),
                    "andre del".to_string(),
                    "ola sin cv".to_string(),
                ],
                &[
                    metadata("kari.json", "Oslo", 0, 2),
                    metadata("kari.json", "Oslo", 1, 2),
                    metadata("ola.json", "Trondheim", 0, 1),
                ],
            )
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn stats_count_chunks_and_distinct_sources() {
        let ops = MaintenanceOps::new(seeded_index().await, identity());
        let stats = ops.stats().await.unwrap();

        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.unique_sources, 2);
        assert_eq!(stats.embedding_model, "hashed-ngram-384");
        assert!(stats.reranking_enabled);
    }

    #[tokio::test]
    async fn stats_on_an_empty_index_are_zero() {
        let ops = MaintenanceOps::new(Arc::new(MemoryIndex::default()), identity());
        let stats = ops.stats().await.unwrap();

        assert_eq!(stats.total_chunks, 0);
        assert_eq!(stats.unique_sources, 0);
    }

    #[tokio::test]
    async fn delete_by_source_removes_only_that_source() {
        let index = seeded_index().await;
        let ops = MaintenanceOps::new(Arc::clone(&index), identity());

        let removed = ops.delete_by_source("kari.json").await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(index.count().await.unwrap(), 1);
        assert_eq!(index.ids(), vec!["ola_0".to_string()]);
    }

    #[tokio::test]
    async fn deleting_an_unknown_source_is_a_noop() {
        let index = seeded_index().await;
        let ops = MaintenanceOps::new(Arc::clone(&index), identity());

        let removed = ops.delete_by_source("ukjent.json").await.unwrap();

        assert_eq!(removed, 0);
        assert_eq!(index.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn sources_are_listed_distinct_and_sorted() {
        let ops = MaintenanceOps::new(seeded_index().await, identity());
        let sources = ops.list_sources().await.unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source, "kari.json");
        assert_eq!(sources[0].chunk_count, 2);
        assert_eq!(sources[0].office, "Oslo");
        assert_eq!(sources[1].source, "ola.json");
        assert_eq!(sources[1].chunk_count, 1);
    }

    #[tokio::test]
    async fn fetch_source_joins_chunks_in_index_order() {
        let ops = MaintenanceOps::new(seeded_index().await, identity());
        let document = ops.fetch_source("kari.json").await.unwrap().unwrap();

        assert_eq!(document.cv_name, "kari");
        assert_eq!(document.text, "første del\n\nandre del");
    }

    #[tokio::test]
    async fn fetch_source_for_an_unknown_source_is_none() {
        let ops = MaintenanceOps::new(seeded_index().await, identity());
        assert!(ops.fetch_source("ukjent.json").await.unwrap().is_none());
    }
}
