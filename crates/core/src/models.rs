use crate::config::LocalePreference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedValue {
    Scalar(String),
    Localized(BTreeMap<String, String>),
}

impl LocalizedValue {
    /// First non-empty text along the locale fallback chain, else `""`.
    pub fn resolve(&self, locales: &LocalePreference) -> &str {
        match self {
            LocalizedValue::Scalar(text) => text.trim(),
            LocalizedValue::Localized(map) => locales
                .chain()
                .into_iter()
                .filter_map(|locale| map.get(locale))
                .map(|text| text.trim())
                .find(|text| !text.is_empty())
                .unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Text(String),
    Number(i64),
}

impl ExternalId {
    pub fn as_key(&self) -> String {
        match self {
            ExternalId::Text(text) => text.trim().to_string(),
            ExternalId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserMetadata {
    pub office_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TechnologySkill {
    pub tags: Option<LocalizedValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TechnologyCategory {
    pub disabled: bool,
    pub technology_skills: Vec<TechnologySkill>,
    pub name: Option<LocalizedValue>,
    pub category: Option<LocalizedValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkExperience {
    pub employer: Option<LocalizedValue>,
    pub role: Option<LocalizedValue>,
    pub title: Option<LocalizedValue>,
    pub description: Option<LocalizedValue>,
    pub long_description: Option<LocalizedValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Education {
    pub school: Option<LocalizedValue>,
    pub degree: Option<LocalizedValue>,
    pub title: Option<LocalizedValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Qualification {
    pub disabled: bool,
    pub label: Option<LocalizedValue>,
    pub long_description: Option<LocalizedValue>,
    pub description: Option<LocalizedValue>,
    pub text: Option<LocalizedValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QualificationEntry {
    Structured(Qualification),
    Plain(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectExperience {
    pub disabled: bool,
    pub customer: Option<LocalizedValue>,
    pub role: Option<LocalizedValue>,
    pub long_description: Option<LocalizedValue>,
    pub description: Option<LocalizedValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CvRecord {
    pub name: Option<String>,
    #[serde(rename = "_user_metadata")]
    pub user_metadata: UserMetadata,
    pub summary: Option<LocalizedValue>,
    pub profile: Option<LocalizedValue>,
    pub description: Option<LocalizedValue>,
    pub technologies: Vec<TechnologyCategory>,
    pub work_experiences: Vec<WorkExperience>,
    pub educations: Vec<Education>,
    pub key_qualifications: Vec<QualificationEntry>,
    pub project_experiences: Vec<ProjectExperience>,
    pub years_of_experience: Option<f64>,
    pub external_unique_id: Option<ExternalId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub source: String,
    pub file_path: String,
    pub cv_name: String,
    #[serde(default)]
    pub office: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(flatten)]
    pub record: RecordMetadata,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub source: Option<String>,
    pub office: Option<String>,
}

impl MetadataFilter {
    pub fn by_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            office: None,
        }
    }

    pub fn by_office(office: impl Into<String>) -> Self {
        Self {
            source: None,
            office: Some(office.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.office.is_none()
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        self.source
            .as_ref()
            .map_or(true, |source| *source == metadata.record.source)
            && self
                .office
                .as_ref()
                .map_or(true, |office| *office == metadata.record.office)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
    pub distances: Vec<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetResponse {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHits {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
    pub distances: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_scores: Option<Vec<f32>>,
}

impl SearchHits {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub(crate) fn reorder(&mut self, order: &[usize], scores: &[f32]) {
        self.ids = order.iter().map(|&i| self.ids[i].clone()).collect();
        self.documents = order.iter().map(|&i| self.documents[i].clone()).collect();
        self.metadatas = order.iter().map(|&i| self.metadatas[i].clone()).collect();
        self.distances = order.iter().map(|&i| self.distances[i]).collect();
        self.rerank_scores = Some(order.iter().map(|&i| scores[i]).collect());
    }

    pub(crate) fn truncate(&mut self, n: usize) {
        self.ids.truncate(n);
        self.documents.truncate(n);
        self.metadatas.truncate(n);
        self.distances.truncate(n);
        if let Some(scores) = &mut self.rerank_scores {
            scores.truncate(n);
        }
    }
}

impl From<QueryResponse> for SearchHits {
    fn from(response: QueryResponse) -> Self {
        Self {
            ids: response.ids,
            documents: response.documents,
            metadatas: response.metadatas,
            distances: response.distances,
            rerank_scores: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub unique_sources: usize,
    pub embedding_model: String,
    pub reranking_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reranker_model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedSource {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub files_processed: usize,
    pub chunks_written: usize,
    pub failed: Vec<FailedSource>,
    pub finished_at: DateTime<Utc>,
}

impl IndexReport {
    pub fn succeeded(&self) -> usize {
        self.files_processed - self.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: String,
    pub cv_name: String,
    pub office: String,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub source: String,
    pub cv_name: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub n_results: Option<usize>,
    pub filter: Option<MetadataFilter>,
    pub use_reranking: Option<bool>,
}
