//! Configuration for the organizer
//!
//! Loaded from a JSON file when one is present, otherwise every field falls
//! back to its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::classify::AssistedRules;
use crate::error::{OrganizerError, Result};
use crate::kmeans::DEFAULT_MAX_ITERATIONS;
use crate::lexical::CONTENT_SAMPLE_CHARS;
use crate::organize::{OrganizeOptions, DEFAULT_MAX_CLUSTERS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizerConfig {
    /// Iteration cap for k-means
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Fixed seed for centroid initialisation; random when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Upper bound for the automatically chosen cluster count
    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,
    /// Characters of content kept alongside each embedding
    #[serde(default = "default_content_preview_chars")]
    pub content_preview_chars: usize,
    #[serde(default = "default_stale_after_months")]
    pub stale_after_months: u32,
    #[serde(default = "default_large_file_bytes")]
    pub large_file_bytes: u64,
    /// Wall-clock bound around one clustering run
    #[serde(default)]
    pub clustering_timeout_secs: Option<u64>,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}
fn default_max_clusters() -> usize {
    DEFAULT_MAX_CLUSTERS
}
fn default_content_preview_chars() -> usize {
    CONTENT_SAMPLE_CHARS
}
fn default_stale_after_months() -> u32 {
    AssistedRules::default().stale_after_months
}
fn default_large_file_bytes() -> u64 {
    AssistedRules::default().large_file_bytes
}
fn default_db_path() -> PathBuf {
    PathBuf::from("./db")
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            seed: None,
            max_clusters: default_max_clusters(),
            content_preview_chars: default_content_preview_chars(),
            stale_after_months: default_stale_after_months(),
            large_file_bytes: default_large_file_bytes(),
            clustering_timeout_secs: None,
            db_path: default_db_path(),
        }
    }
}

impl OrganizerConfig {
    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: OrganizerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the current directory or defaults
    pub fn load() -> Result<Self> {
        let config_paths = [".organizer.json", "organizer.json"];

        for path in &config_paths {
            if Path::new(path).exists() {
                debug!(path, "loading organizer config");
                return Self::load_from_file(path);
            }
        }

        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(OrganizerError::Config("max_iterations must be at least 1".to_string()));
        }
        if self.max_clusters == 0 {
            return Err(OrganizerError::Config("max_clusters must be at least 1".to_string()));
        }
        if self.clustering_timeout_secs == Some(0) {
            return Err(OrganizerError::Config(
                "clustering_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn organize_options(&self) -> OrganizeOptions {
        OrganizeOptions {
            max_iterations: self.max_iterations,
            max_clusters: self.max_clusters,
        }
    }

    pub fn assisted_rules(&self) -> AssistedRules {
        AssistedRules {
            stale_after_months: self.stale_after_months,
            large_file_bytes: self.large_file_bytes,
        }
    }
}
