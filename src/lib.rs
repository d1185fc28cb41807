//! Groups a user's files into themed clusters from their embeddings and flags
//! files that look safe to clean up.

pub mod classify;
pub mod clock;
pub mod config;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod file_store;
pub mod kmeans;
pub mod lexical;
pub mod models;
pub mod oauth_state;
pub mod organize;
pub mod store;
pub mod theme;
pub mod vector;

pub use config::OrganizerConfig;
pub use engine::DocumentOrganizer;
pub use error::{OrganizerError, Result};
pub use models::{
    CleanableFile, CleanupCategory, Cluster, ClusterCategory, Confidence, EmbeddedFile,
    FileMetadata, OrganizationReport, Theme,
};
