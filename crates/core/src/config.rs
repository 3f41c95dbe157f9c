use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            min_chunk_size: 50,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapNotBelowSize {
                size: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }
        if self.min_chunk_size > self.chunk_size {
            return Err(ConfigError::MinAboveSize {
                size: self.chunk_size,
                min: self.min_chunk_size,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_results: usize,
    pub max_results: usize,
    pub rerank_pool: usize,
    pub enable_reranking: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_results: 12,
            max_results: 20,
            rerank_pool: 50,
            enable_reranking: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalePreference {
    pub preferred: String,
    pub secondary: String,
    pub tertiary: String,
}

impl Default for LocalePreference {
    fn default() -> Self {
        Self {
            preferred: "no".to_string(),
            secondary: "en".to_string(),
            tertiary: "int".to_string(),
        }
    }
}

impl LocalePreference {
    pub fn chain(&self) -> [&str; 3] {
        [&self.preferred, &self.secondary, &self.tertiary]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            api_key: None,
            model: "BAAI/bge-reranker-base".to_string(),
        }
    }
}
