use crate::chunking::split_into_chunks;
use crate::config::ChunkingConfig;
use crate::error::{ConfigError, IndexError};
use crate::extract::{CvExtractor, SUPPORTED_EXTENSIONS};
use crate::models::{ChunkMetadata, FailedSource, IndexReport, MetadataFilter};
use crate::traits::SimilarityIndex;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn discover_cv_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|supported| ext.eq_ignore_ascii_case(supported))
            });

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub struct CvIndexer<S> {
    index: Arc<S>,
    extractor: CvExtractor,
    chunking: ChunkingConfig,
}

impl<S: SimilarityIndex> CvIndexer<S> {
    pub fn new(
        index: Arc<S>,
        extractor: CvExtractor,
        chunking: ChunkingConfig,
    ) -> Result<Self, ConfigError> {
        chunking.validate()?;
        Ok(Self {
            index,
            extractor,
            chunking,
        })
    }

    /// Indexes one source; a failure is logged and reported as zero chunks,
    /// never propagated.
    pub async fn index_file(&self, path: &Path) -> usize {
        match self.try_index_file(path).await {
            Ok(count) => count,
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to index source");
                0
            }
        }
    }

    async fn try_index_file(&self, path: &Path) -> Result<usize, IndexError> {
        let (text, metadata) = self.extractor.extract_file(path)?;
        if text.trim().is_empty() {
            warn!(path = %path.display(), "skipping source with no extractable text");
            return Ok(0);
        }

        let chunks = split_into_chunks(&text, &self.chunking)?;
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();

        let ids: Vec<String> = (0..chunks.len()).map(|i| format!("{stem}_{i}")).collect();
        let metadatas: Vec<ChunkMetadata> = (0..chunks.len())
            .map(|i| ChunkMetadata {
                record: metadata.clone(),
                chunk_index: i,
                total_chunks: chunks.len(),
            })
            .collect();

        // drop whatever a previous run stored for this source, so a source
        // that shrank cannot leave orphaned high-index chunks behind
        let existing = self
            .index
            .get(Some(&MetadataFilter::by_source(&metadata.source)))
            .await?;
        if !existing.ids.is_empty() {
            self.index.delete(&existing.ids).await?;
        }

        self.index.add(&ids, &chunks, &metadatas).await?;
        info!(path = %path.display(), chunks = chunks.len(), "indexed source");
        Ok(chunks.len())
    }

    /// Indexes every supported file under `folder`, continuing past
    /// individual failures.
    pub async fn index_dir(&self, folder: &Path) -> IndexReport {
        let files = discover_cv_files(folder);
        if files.is_empty() {
            warn!(folder = %folder.display(), "no cv files found");
        }

        let files_processed = files.len();
        let mut chunks_written = 0;
        let mut failed = Vec::new();

        for path in files {
            match self.try_index_file(&path).await {
                Ok(count) => chunks_written += count,
                Err(error) => {
                    warn!(path = %path.display(), %error, "failed to index source");
                    failed.push(FailedSource {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }

        let report = IndexReport {
            files_processed,
            chunks_written,
            failed,
            finished_at: Utc::now(),
        };
        info!(
            files = report.files_processed,
            chunks = report.chunks_written,
            failed = report.failed.len(),
            "indexing complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocalePreference;
    use crate::testing::MemoryIndex;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn indexer(index: Arc<MemoryIndex>) -> CvIndexer<MemoryIndex> {
        CvIndexer::new(
            index,
            CvExtractor::new(LocalePreference::default()),
            ChunkingConfig::default(),
        )
        .unwrap()
    }

    fn long_text(count: usize) -> String {
        (0..count)
            .map(|i| format!("ord{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn discovery_is_recursive_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(nested.join("a.md"), "# A").unwrap();
        fs::write(dir.path().join("notes.pdf"), "binary").unwrap();

        let files = discover_cv_files(dir.path());

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("b.json"));
        assert!(files[1].ends_with("nested/a.md"));
    }

    #[tokio::test]
    async fn chunk_ids_are_deterministic_per_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kari-nordmann.json");
        fs::write(
            &path,
            json!({"summary": {"no": "Konsulent med lang erfaring."}}).to_string(),
        )
        .unwrap();

        let index = Arc::new(MemoryIndex::default());
        let written = indexer(Arc::clone(&index)).index_file(&path).await;

        assert_eq!(written, 1);
        assert_eq!(index.ids(), vec!["kari-nordmann_0".to_string()]);
    }

    #[tokio::test]
    async fn reindexing_an_unchanged_source_does_not_grow_the_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cv.md");
        fs::write(&path, long_text(600)).unwrap();

        let index = Arc::new(MemoryIndex::default());
        let indexer = indexer(Arc::clone(&index));

        let first = indexer.index_file(&path).await;
        let second = indexer.index_file(&path).await;

        assert_eq!(first, 2);
        assert_eq!(second, 2);
        assert_eq!(index.ids(), vec!["cv_0".to_string(), "cv_1".to_string()]);
    }

    #[tokio::test]
    async fn a_shrinking_source_leaves_no_orphaned_chunks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cv.md");
        fs::write(&path, long_text(600)).unwrap();

        let index = Arc::new(MemoryIndex::default());
        let indexer = indexer(Arc::clone(&index));
        assert_eq!(indexer.index_file(&path).await, 2);

        fs::write(&path, "kort tekst").unwrap();
        assert_eq!(indexer.index_file(&path).await, 1);
        assert_eq!(index.ids(), vec!["cv_0".to_string()]);
    }

    #[tokio::test]
    async fn chunk_metadata_counts_are_consistent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cv.md");
        fs::write(&path, long_text(600)).unwrap();

        let index = Arc::new(MemoryIndex::default());
        indexer(Arc::clone(&index)).index_file(&path).await;

        let stored = index.get(None).await.unwrap();
        assert_eq!(stored.metadatas.len(), 2);
        for metadata in &stored.metadatas {
            assert_eq!(metadata.total_chunks, 2);
            assert!(metadata.chunk_index < 2);
            assert_eq!(metadata.record.source, "cv.md");
        }
    }

    #[tokio::test]
    async fn batch_indexing_continues_past_failing_sources() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("good.json"),
            json!({"summary": {"no": "Gyldig innhold."}}).to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        fs::write(dir.path().join("empty.md"), "  \n").unwrap();

        let index = Arc::new(MemoryIndex::default());
        let report = indexer(Arc::clone(&index)).index_dir(dir.path()).await;

        assert_eq!(report.files_processed, 3);
        assert_eq!(report.chunks_written, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].path.ends_with("bad.json"));
        assert_eq!(report.succeeded(), 2);
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_sources_are_skipped_without_counting_as_failures() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tom.md");
        fs::write(&path, "").unwrap();

        let index = Arc::new(MemoryIndex::default());
        let written = indexer(Arc::clone(&index)).index_file(&path).await;

        assert_eq!(written, 0);
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[test]
    fn invalid_chunking_config_fails_at_construction() {
        let index = Arc::new(MemoryIndex::default());
        let result = CvIndexer::new(
            index,
            CvExtractor::new(LocalePreference::default()),
            ChunkingConfig {
                chunk_size: 10,
                chunk_overlap: 20,
                min_chunk_size: 5,
            },
        );
        assert!(result.is_err());
    }
}
