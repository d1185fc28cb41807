use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::{OrganizerError, Result};

/// Turns text into fixed-length vectors.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Local embedding model backed by FastEmbed.
pub struct FastEmbedder {
    model: TextEmbedding,
}

impl FastEmbedder {
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(true)
        ).map_err(|e| OrganizerError::Embedding(e.to_string()))?;

        Ok(Self { model })
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.model
            .embed(texts, None)
            .map_err(|e| OrganizerError::Embedding(e.to_string()))
    }
}
