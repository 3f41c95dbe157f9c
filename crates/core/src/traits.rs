use crate::error::SearchError;
use crate::models::{ChunkMetadata, GetResponse, MetadataFilter, QueryResponse};
use async_trait::async_trait;

/// Similarity index collaborator. `add` has upsert semantics keyed by id;
/// `query` returns candidates in ascending cosine-distance order.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    async fn add(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[ChunkMetadata],
    ) -> Result<(), SearchError>;

    async fn query(
        &self,
        text: &str,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<QueryResponse, SearchError>;

    async fn get(&self, filter: Option<&MetadataFilter>) -> Result<GetResponse, SearchError>;

    async fn delete(&self, ids: &[String]) -> Result<(), SearchError>;

    async fn count(&self) -> Result<usize, SearchError>;
}

/// Relevance scorer for (query, document) pairs; higher is more relevant.
#[async_trait]
pub trait Reranker: Send + Sync {
    fn model_name(&self) -> &str;

    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, SearchError>;
}
