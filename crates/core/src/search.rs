use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::models::{SearchHits, SearchOptions};
use crate::reranker::{RerankerSlot, RerankerState};
use crate::traits::SimilarityIndex;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SearchPipeline<S> {
    index: Arc<S>,
    config: SearchConfig,
    reranker: RerankerSlot,
}

impl<S: SimilarityIndex> SearchPipeline<S> {
    pub fn new(index: Arc<S>, config: SearchConfig, reranker: RerankerSlot) -> Self {
        Self {
            index,
            config,
            reranker,
        }
    }

    pub fn reranker_state(&self) -> RerankerState {
        self.reranker.state()
    }

    /// Two-phase search: one similarity query, then an optional reranking
    /// pass. An index failure propagates; a reranker failure never does.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchHits, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::Request("query is empty".to_string()));
        }

        let n_results = options
            .n_results
            .unwrap_or(self.config.default_results)
            .min(self.config.max_results);
        let use_reranking = options.use_reranking.unwrap_or(self.config.enable_reranking);
        let rerank_eligible =
            use_reranking && self.reranker.state() != RerankerState::Disabled;

        // rerank over a wider candidate pool than the caller asked for
        let fetch_count = if rerank_eligible {
            self.config.rerank_pool.max(n_results)
        } else {
            n_results
        };

        info!(query, n_results, use_reranking, "searching");

        let fetched = self
            .index
            .query(query, fetch_count, options.filter.as_ref())
            .await?;
        let mut hits = SearchHits::from(fetched);

        if rerank_eligible && !hits.is_empty() {
            if let Some(reranker) = self.reranker.get() {
                match reranker.score(query, &hits.documents).await {
                    Ok(scores) if scores.len() == hits.len() => {
                        let order = rank_order(&scores);
                        hits.reorder(&order, &scores);
                    }
                    Ok(scores) => {
                        warn!(
                            scores = scores.len(),
                            candidates = hits.len(),
                            "reranker returned a mismatched score set, keeping retrieval order"
                        );
                    }
                    Err(error) => {
                        warn!(%error, "rerank scoring failed, keeping retrieval order");
                    }
                }
            }
        }

        hits.truncate(n_results);
        Ok(hits)
    }
}

// descending by score; the sort is stable, so ties keep retrieval order
fn rank_order(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    order
}
