use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file together with the embedding of its content, as handed to one clustering run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmbeddedFile {
    pub file_id: String,
    pub file_name: String,
    pub embedding: Vec<f32>,
    pub content: Option<String>,
    pub folder_path: Option<String>,
}

impl EmbeddedFile {
    pub fn new(
        file_id: impl Into<String>,
        file_name: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            file_name: file_name.into(),
            embedding,
            content: None,
            folder_path: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Persisted embedding of one file, keyed by (user, file).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub user_id: String,
    pub file_id: String,
    pub file_name: String,
    pub folder_path: Option<String>,
    pub embedding: Vec<f32>,
    pub content_preview: String,
}

impl EmbeddingRecord {
    pub fn into_embedded_file(self) -> EmbeddedFile {
        EmbeddedFile {
            file_id: self.file_id,
            file_name: self.file_name,
            embedding: self.embedding,
            content: Some(self.content_preview).filter(|c| !c.is_empty()),
            folder_path: self.folder_path,
        }
    }
}

/// Listing entry supplied by a file store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileMetadata {
    pub file_id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub modified_time: Option<DateTime<Utc>>,
    pub folder_path: Option<String>,
}

impl FileMetadata {
    pub fn new(file_id: impl Into<String>, file_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            file_id: file_id.into(),
            file_name: file_name.into(),
            mime_type: None,
            size_bytes,
            modified_time: None,
            folder_path: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_modified_time(mut self, modified_time: DateTime<Utc>) -> Self {
        self.modified_time = Some(modified_time);
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ClusterCategory {
    Work,
    Personal,
    Media,
    Documents,
    Archive,
    Mixed,
}

impl ClusterCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterCategory::Work => "work",
            ClusterCategory::Personal => "personal",
            ClusterCategory::Media => "media",
            ClusterCategory::Documents => "documents",
            ClusterCategory::Archive => "archive",
            ClusterCategory::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ClusterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Theme {
    pub name: String,
    pub description: String,
    pub suggested_folder_name: String,
    pub category: ClusterCategory,
    pub keywords: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Cluster {
    pub id: String,
    pub centroid: Vec<f32>,
    pub member_file_ids: Vec<String>,
    pub theme: Theme,
    /// Mean cosine similarity of members to the centroid, 0.0 for an empty cluster.
    pub cohesion: f32,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.member_file_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_file_ids.is_empty()
    }
}

/// Outcome of clustering one user's files.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrganizationReport {
    pub clusters: Vec<Cluster>,
    /// file id -> cluster id
    pub assignments: BTreeMap<String, String>,
    pub skipped_file_ids: Vec<String>,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CleanupCategory {
    Empty,
    Tiny,
    Small,
    Duplicate,
    Old,
    LowQuality,
    System,
}

impl CleanupCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupCategory::Empty => "empty",
            CleanupCategory::Tiny => "tiny",
            CleanupCategory::Small => "small",
            CleanupCategory::Duplicate => "duplicate",
            CleanupCategory::Old => "old",
            CleanupCategory::LowQuality => "low_quality",
            CleanupCategory::System => "system",
        }
    }
}

impl fmt::Display for CleanupCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn score(&self) -> f32 {
        match self {
            Confidence::Low => 0.3,
            Confidence::Medium => 0.6,
            Confidence::High => 0.9,
        }
    }
}

/// A file flagged by the size-tier rules.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CleanableFile {
    pub file_id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub modified_time: Option<DateTime<Utc>>,
    pub category: CleanupCategory,
    pub reason: String,
    pub confidence: Confidence,
}

/// Categories produced by the age/size/type rule set.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssistedCategory {
    OldFiles,
    LargeFiles,
    Images,
    Videos,
    Pdfs,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "category", rename_all = "snake_case")]
pub enum FindingCategory {
    Cleanup(CleanupCategory),
    Assisted(AssistedCategory),
}

/// Common shape of both rule sets, used when a caller merges them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Finding {
    pub file_id: String,
    pub file_name: String,
    pub category: FindingCategory,
    pub reason: String,
    pub confidence: f32,
}

impl From<&CleanableFile> for Finding {
    fn from(file: &CleanableFile) -> Self {
        Finding {
            file_id: file.file_id.clone(),
            file_name: file.file_name.clone(),
            category: FindingCategory::Cleanup(file.category),
            reason: file.reason.clone(),
            confidence: file.confidence.score(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CleanupReport {
    pub cleanable: Vec<CleanableFile>,
    pub findings: Vec<Finding>,
    pub total_reclaimable_bytes: u64,
}

/// What one indexing pass did.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct IndexSummary {
    pub indexed: Vec<String>,
    pub skipped: Vec<String>,
}
