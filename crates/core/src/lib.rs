pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod enrichment;
pub mod error;
pub mod extract;
pub mod indexer;
pub mod maintenance;
pub mod models;
pub mod reranker;
pub mod search;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod testing;

pub use chunking::split_into_chunks;
pub use config::{ChunkingConfig, LocalePreference, RerankerConfig, SearchConfig};
pub use embeddings::{Embedder, HashedNgramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use enrichment::ExperienceTable;
pub use error::{ConfigError, IndexError, ParseError, SearchError};
pub use extract::{display_name_from_stem, CvExtractor, SUPPORTED_EXTENSIONS};
pub use indexer::{discover_cv_files, CvIndexer};
pub use maintenance::{IndexIdentity, MaintenanceOps};
pub use models::{
    ChunkMetadata, CvRecord, FailedSource, GetResponse, IndexReport, IndexStats, LocalizedValue,
    MetadataFilter, QueryResponse, RecordMetadata, SearchHits, SearchOptions, SourceDocument,
    SourceSummary,
};
pub use reranker::{HttpReranker, RerankerSlot, RerankerState};
pub use search::SearchPipeline;
pub use stores::ChromaStore;
pub use traits::{Reranker, SimilarityIndex};
