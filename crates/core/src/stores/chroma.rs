use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::{ChunkMetadata, GetResponse, MetadataFilter, QueryResponse};
use crate::traits::SimilarityIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub struct ChromaStore<E: Embedder> {
    client: Client,
    endpoint: String,
    collection: String,
    embedder: E,
}

impl<E: Embedder> ChromaStore<E> {
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>, embedder: E) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            collection: collection.into(),
            embedder,
        }
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }

    fn collection_url(&self, action: &str) -> String {
        format!(
            "{}/api/v1/collections/{}/{}",
            self.endpoint, self.collection, action
        )
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    ids: &'a [String],
    embeddings: Vec<Vec<f32>>,
    documents: &'a [String],
    metadatas: &'a [ChunkMetadata],
}

#[derive(Debug, Serialize)]
struct QueryRequest {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    where_filter: Option<Value>,
    include: [&'static str; 3],
}

#[derive(Debug, Serialize)]
struct GetRequest {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    where_filter: Option<Value>,
    include: [&'static str; 2],
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
}

// query responses are nested one row per input query; only the first row
// matters for a single-query call
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NestedQueryResponse {
    ids: Vec<Vec<String>>,
    documents: Vec<Vec<String>>,
    metadatas: Vec<Vec<ChunkMetadata>>,
    distances: Vec<Vec<f32>>,
}

impl NestedQueryResponse {
    fn into_flat(mut self) -> QueryResponse {
        QueryResponse {
            ids: pop_first(&mut self.ids),
            documents: pop_first(&mut self.documents),
            metadatas: pop_first(&mut self.metadatas),
            distances: pop_first(&mut self.distances),
        }
    }
}

fn pop_first<T>(rows: &mut Vec<Vec<T>>) -> Vec<T> {
    if rows.is_empty() {
        Vec::new()
    } else {
        rows.swap_remove(0)
    }
}

fn where_clause(filter: Option<&MetadataFilter>) -> Option<Value> {
    let filter = filter?;
    let mut terms = Vec::new();
    if let Some(source) = &filter.source {
        terms.push(json!({ "source": source }));
    }
    if let Some(office) = &filter.office {
        terms.push(json!({ "office": office }));
    }
    match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(json!({ "$and": terms })),
    }
}

#[async_trait]
impl<E: Embedder> SimilarityIndex for ChromaStore<E> {
    async fn add(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[ChunkMetadata],
    ) -> Result<(), SearchError> {
        if ids.len() != documents.len() || ids.len() != metadatas.len() {
            return Err(SearchError::Request(format!(
                "mismatched batch: {} ids, {} documents, {} metadatas",
                ids.len(),
                documents.len(),
                metadatas.len()
            )));
        }
        if ids.is_empty() {
            return Ok(());
        }

        let embeddings = documents
            .iter()
            .map(|document| self.embedder.embed_document(document))
            .collect();

        let response = self
            .client
            .post(self.collection_url("upsert"))
            .json(&UpsertRequest {
                ids,
                embeddings,
                documents,
                metadatas,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }
        Ok(())
    }

    async fn query(
        &self,
        text: &str,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<QueryResponse, SearchError> {
        let response = self
            .client
            .post(self.collection_url("query"))
            .json(&QueryRequest {
                query_embeddings: vec![self.embedder.embed_query(text)],
                n_results,
                where_filter: where_clause(filter),
                include: ["documents", "metadatas", "distances"],
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let nested: NestedQueryResponse = response.json().await?;
        Ok(nested.into_flat())
    }

    async fn get(&self, filter: Option<&MetadataFilter>) -> Result<GetResponse, SearchError> {
        let response = self
            .client
            .post(self.collection_url("get"))
            .json(&GetRequest {
                where_filter: where_clause(filter),
                include: ["documents", "metadatas"],
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(response.json().await?)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), SearchError> {
        if ids.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.collection_url("delete"))
            .json(&DeleteRequest { ids })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, SearchError> {
        let response = self
            .client
            .get(self.collection_url("count"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordMetadata, SearchHits};

    #[test]
    fn where_clause_for_a_single_field_is_a_plain_equality() {
        let filter = MetadataFilter::by_office("Oslo");
        assert_eq!(where_clause(Some(&filter)), Some(json!({"office": "Oslo"})));
    }

    #[test]
    fn where_clause_for_two_fields_uses_and() {
        let filter = MetadataFilter {
            source: Some("cv.json".to_string()),
            office: Some("Oslo".to_string()),
        };
        assert_eq!(
            where_clause(Some(&filter)),
            Some(json!({"$and": [{"source": "cv.json"}, {"office": "Oslo"}]}))
        );
    }

    #[test]
    fn empty_filter_produces_no_where_clause() {
        assert_eq!(where_clause(None), None);
        assert_eq!(where_clause(Some(&MetadataFilter::default())), None);
    }

    #[test]
    fn nested_query_response_flattens_the_first_row() {
        let metadata = ChunkMetadata {
            record: RecordMetadata {
                source: "cv.json".to_string(),
                file_path: "/data/cvs/cv.json".to_string(),
                cv_name: "Cv".to_string(),
                office: String::new(),
                years_of_experience: None,
            },
            chunk_index: 0,
            total_chunks: 1,
        };
        let nested = NestedQueryResponse {
            ids: vec![vec!["cv_0".to_string()]],
            documents: vec![vec!["tekst".to_string()]],
            metadatas: vec![vec![metadata]],
            distances: vec![vec![0.25]],
        };

        let flat = nested.into_flat();
        assert_eq!(flat.ids, vec!["cv_0".to_string()]);
        assert_eq!(flat.distances, vec![0.25]);

        let hits = SearchHits::from(flat);
        assert_eq!(hits.len(), 1);
        assert!(hits.rerank_scores.is_none());
    }

    #[test]
    fn empty_nested_response_flattens_to_empty_arrays() {
        let flat = NestedQueryResponse::default().into_flat();
        assert!(flat.ids.is_empty());
        assert!(flat.distances.is_empty());
    }
}
