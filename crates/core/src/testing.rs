use crate::embeddings::{Embedder, HashedNgramEmbedder};
use crate::error::SearchError;
use crate::models::{ChunkMetadata, GetResponse, MetadataFilter, QueryResponse};
use crate::traits::SimilarityIndex;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

struct StoredRow {
    document: String,
    metadata: ChunkMetadata,
    embedding: Vec<f32>,
}

/// In-memory similarity index with real cosine distances, shared by the
/// indexer, search, and maintenance tests.
#[derive(Default)]
pub(crate) struct MemoryIndex {
    rows: Mutex<BTreeMap<String, StoredRow>>,
    embedder: HashedNgramEmbedder,
    pub(crate) last_query_size: Mutex<Option<usize>>,
}

impl MemoryIndex {
    pub(crate) fn ids(&self) -> Vec<String> {
        self.rows.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl SimilarityIndex for MemoryIndex {
    async fn add(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[ChunkMetadata],
    ) -> Result<(), SearchError> {
        let mut rows = self.rows.lock().unwrap();
        for ((id, document), metadata) in ids.iter().zip(documents).zip(metadatas) {
            rows.insert(
                id.clone(),
                StoredRow {
                    document: document.clone(),
                    metadata: metadata.clone(),
                    embedding: self.embedder.embed_document(document),
                },
            );
        }
        Ok(())
    }

    async fn query(
        &self,
        text: &str,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<QueryResponse, SearchError> {
        *self.last_query_size.lock().unwrap() = Some(n_results);

        let query = self.embedder.embed_query(text);
        let rows = self.rows.lock().unwrap();
        let mut scored: Vec<(&String, &StoredRow, f32)> = rows
            .iter()
            .filter(|(_, row)| filter.map_or(true, |f| f.matches(&row.metadata)))
            .map(|(id, row)| {
                let similarity: f32 = query
                    .iter()
                    .zip(&row.embedding)
                    .map(|(a, b)| a * b)
                    .sum();
                (id, row, 1.0 - similarity)
            })
            .collect();
        scored.sort_by(|a, b| a.2.total_cmp(&b.2));
        scored.truncate(n_results);

        Ok(QueryResponse {
            ids: scored.iter().map(|(id, _, _)| (*id).clone()).collect(),
            documents: scored.iter().map(|(_, row, _)| row.document.clone()).collect(),
            metadatas: scored.iter().map(|(_, row, _)| row.metadata.clone()).collect(),
            distances: scored.iter().map(|(_, _, distance)| *distance).collect(),
        })
    }

    async fn get(&self, filter: Option<&MetadataFilter>) -> Result<GetResponse, SearchError> {
        let rows = self.rows.lock().unwrap();
        let matching: Vec<(&String, &StoredRow)> = rows
            .iter()
            .filter(|(_, row)| filter.map_or(true, |f| f.matches(&row.metadata)))
            .collect();

        Ok(GetResponse {
            ids: matching.iter().map(|(id, _)| (*id).clone()).collect(),
            documents: matching.iter().map(|(_, row)| row.document.clone()).collect(),
            metadatas: matching.iter().map(|(_, row)| row.metadata.clone()).collect(),
        })
    }

    async fn delete(&self, ids: &[String]) -> Result<(), SearchError> {
        let mut rows = self.rows.lock().unwrap();
        for id in ids {
            rows.remove(id);
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, SearchError> {
        Ok(self.rows.lock().unwrap().len())
    }
}
