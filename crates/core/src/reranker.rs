use crate::config::RerankerConfig;
use crate::error::SearchError;
use crate::traits::Reranker;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
struct RankedText {
    index: usize,
    score: f32,
}

pub struct HttpReranker {
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl HttpReranker {
    pub fn new(config: &RerankerConfig) -> Result<Self, SearchError> {
        let endpoint = Url::parse(config.endpoint.trim())?.join("rerank")?;
        Ok(Self {
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client: Client::new(),
        })
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, SearchError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&RerankRequest {
                query,
                texts: documents,
            });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "reranker".to_string(),
                details: response.status().to_string(),
            });
        }

        let ranked: Vec<RankedText> = response.json().await?;
        if ranked.len() != documents.len() {
            return Err(SearchError::BackendResponse {
                backend: "reranker".to_string(),
                details: format!("{} scores for {} documents", ranked.len(), documents.len()),
            });
        }

        let mut scores = vec![f32::NEG_INFINITY; documents.len()];
        for entry in ranked {
            if entry.index >= scores.len() {
                return Err(SearchError::BackendResponse {
                    backend: "reranker".to_string(),
                    details: format!("score index {} out of bounds", entry.index),
                });
            }
            scores[entry.index] = entry.score;
        }
        Ok(scores)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RerankerState {
    Uninitialized,
    Available,
    Disabled,
}

pub type RerankerFactory =
    Box<dyn Fn() -> Result<Arc<dyn Reranker>, SearchError> + Send + Sync>;

/// Process-wide reranker lifecycle: the factory runs at most once, behind a
/// thread-safe barrier. A failed construction permanently disables
/// reranking for this process.
pub struct RerankerSlot {
    cell: OnceLock<Option<Arc<dyn Reranker>>>,
    factory: RerankerFactory,
}

impl RerankerSlot {
    pub fn new(factory: RerankerFactory) -> Self {
        Self {
            cell: OnceLock::new(),
            factory,
        }
    }

    pub fn from_config(config: RerankerConfig) -> Self {
        Self::new(Box::new(move || {
            HttpReranker::new(&config).map(|reranker| Arc::new(reranker) as Arc<dyn Reranker>)
        }))
    }

    pub fn unconfigured() -> Self {
        Self::new(Box::new(|| {
            Err(SearchError::Request(
                "no reranker endpoint configured".to_string(),
            ))
        }))
    }

    pub fn state(&self) -> RerankerState {
        match self.cell.get() {
            None => RerankerState::Uninitialized,
            Some(Some(_)) => RerankerState::Available,
            Some(None) => RerankerState::Disabled,
        }
    }

    pub fn get(&self) -> Option<Arc<dyn Reranker>> {
        self.cell
            .get_or_init(|| match (self.factory)() {
                Ok(reranker) => {
                    info!(model = reranker.model_name(), "reranker initialized");
                    Some(reranker)
                }
                Err(error) => {
                    warn!(%error, "failed to initialize reranker, continuing without re-ranking");
                    None
                }
            })
            .clone()
    }
}
