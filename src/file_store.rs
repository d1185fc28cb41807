use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{OrganizerError, Result};
use crate::models::FileMetadata;

pub const FOLDER_MIME_TYPE: &str = "inode/directory";

const SUPPORTED_TEXT_EXTENSIONS: &[&str] = &[
    "txt",
    "md",
    "rs",
    "py",
    "js",
    "json",
    "yaml",
    "yml",
    "toml",
    "css",
    "html",
    "htm",
    "xml",
    "csv",
    "log",
    "pdf",
];

/// Where files are listed, read and deleted.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn list_files(&self) -> Result<Vec<FileMetadata>>;
    async fn get_content(&self, file_id: &str) -> Result<String>;
    async fn delete_file(&self, file_id: &str) -> Result<()>;
}

pub fn is_supported_text_file(file_name: &str) -> bool {
    extension_of(Path::new(file_name))
        .is_some_and(|ext| SUPPORTED_TEXT_EXTENSIONS.contains(&ext.as_str()))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// A directory tree on the local disk. File ids are paths relative to the root.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_id(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Resolves an id to a path under the root, refusing anything that climbs out of it.
    fn resolve(&self, file_id: &str) -> Result<PathBuf> {
        let relative = Path::new(file_id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if file_id.is_empty() || escapes {
            return Err(OrganizerError::invalid_input(format!("invalid file id: {}", file_id)));
        }

        let path = self.root.join(relative);
        if !path.is_file() {
            return Err(OrganizerError::NotFound(file_id.to_string()));
        }
        Ok(path)
    }

    fn metadata_for(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path)?;
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let mime_type = if metadata.is_dir() {
            Some(FOLDER_MIME_TYPE.to_string())
        } else {
            mime_guess
                ::from_path(path)
                .first()
                .map(|m| m.to_string())
        };

        let folder_path = path
            .parent()
            .filter(|parent| *parent != self.root.as_path())
            .map(|parent| self.file_id(parent));

        Ok(FileMetadata {
            file_id: self.file_id(path),
            file_name,
            mime_type,
            size_bytes: if metadata.is_dir() { 0 } else { metadata.len() },
            modified_time: metadata.modified().ok().map(DateTime::<Utc>::from),
            folder_path,
        })
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn list_files(&self) -> Result<Vec<FileMetadata>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            files.push(self.metadata_for(entry.path())?);
        }

        info!(root = %self.root.display(), count = files.len(), "listed files");
        Ok(files)
    }

    async fn get_content(&self, file_id: &str) -> Result<String> {
        let path = self.resolve(file_id)?;
        let extension = extension_of(&path).unwrap_or_default();

        match extension.as_str() {
            "pdf" => {
                let bytes = fs::read(&path)?;
                pdf_extract
                    ::extract_text_from_mem(&bytes)
                    .map_err(|e| OrganizerError::PdfExtraction(e.to_string()))
            }
            _ if SUPPORTED_TEXT_EXTENSIONS.contains(&extension.as_str()) => {
                fs::read_to_string(&path).map_err(OrganizerError::Io)
            }
            _ => Err(OrganizerError::UnsupportedFileType(extension)),
        }
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let path = self.resolve(file_id)?;
        fs::remove_file(&path)?;
        debug!(file_id, "deleted file");
        Ok(())
    }
}
