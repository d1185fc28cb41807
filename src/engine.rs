use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::classify::{is_folder, scan};
use crate::clock::{Clock, SystemClock};
use crate::config::OrganizerConfig;
use crate::embedder::Embedder;
use crate::error::{OrganizerError, Result};
use crate::file_store::{is_supported_text_file, FileStore};
use crate::models::{
    CleanupReport, EmbeddedFile, EmbeddingRecord, FileMetadata, IndexSummary, OrganizationReport,
};
use crate::organize::organize;
use crate::store::RecordStore;

/// Wires the clustering and classification engines to their collaborators:
/// a file store to read from, an embedder, and a record store to persist into.
pub struct DocumentOrganizer {
    config: OrganizerConfig,
    records: Arc<dyn RecordStore>,
    files: Arc<dyn FileStore>,
    embedder: Box<dyn Embedder>,
    clock: Arc<dyn Clock>,
}

impl DocumentOrganizer {
    pub fn new(
        config: OrganizerConfig,
        records: Arc<dyn RecordStore>,
        files: Arc<dyn FileStore>,
        embedder: Box<dyn Embedder>,
    ) -> Self {
        Self {
            config,
            records,
            files,
            embedder,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    /// Reads every supported file, embeds its content and stores the result.
    /// Stored embeddings for files missing from the listing are dropped.
    pub async fn index(&self, user_id: &str) -> Result<IndexSummary> {
        let mut summary = IndexSummary::default();
        let mut pending: Vec<(FileMetadata, String)> = Vec::new();

        for file in self.files.list_files().await? {
            if is_folder(&file) {
                continue;
            }
            if !is_supported_text_file(&file.file_name) {
                debug!(file_id = %file.file_id, "skipping unsupported file");
                summary.skipped.push(file.file_id);
                continue;
            }

            match self.files.get_content(&file.file_id).await {
                Ok(content) => pending.push((file, content)),
                Err(e) => {
                    warn!(file_id = %file.file_id, error = %e, "could not read file content");
                    summary.skipped.push(file.file_id);
                }
            }
        }

        if pending.is_empty() {
            self.records.retain_embeddings(user_id, &[]).await?;
            info!(user_id, skipped = summary.skipped.len(), "nothing to index");
            return Ok(summary);
        }

        let texts: Vec<String> = pending.iter().map(|(_, content)| content.clone()).collect();
        let embeddings = self.embedder.embed(texts)?;
        if embeddings.len() != pending.len() {
            return Err(OrganizerError::Embedding(format!(
                "expected {} embeddings, got {}",
                pending.len(),
                embeddings.len()
            )));
        }

        for ((file, content), embedding) in pending.into_iter().zip(embeddings) {
            let record = EmbeddingRecord {
                user_id: user_id.to_string(),
                file_id: file.file_id.clone(),
                file_name: file.file_name,
                folder_path: file.folder_path,
                embedding,
                content_preview: content.chars().take(self.config.content_preview_chars).collect(),
            };
            self.records.put_embedding(record).await?;
            summary.indexed.push(file.file_id);
        }

        // Only files from this listing stay clustered.
        let pruned = self.records.retain_embeddings(user_id, &summary.indexed).await?;

        info!(
            user_id,
            indexed = summary.indexed.len(),
            skipped = summary.skipped.len(),
            pruned,
            "indexing complete"
        );
        Ok(summary)
    }

    /// Clusters the user's stored embeddings. `k` defaults to a size-based guess.
    pub async fn organize(&self, user_id: &str, k: Option<usize>) -> Result<OrganizationReport> {
        let files: Vec<EmbeddedFile> = self
            .records
            .embeddings(user_id).await?
            .into_iter()
            .map(EmbeddingRecord::into_embedded_file)
            .collect();

        let options = self.config.organize_options();
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let task = tokio::task::spawn_blocking(move || organize(files, k, options, &mut rng));
        let report = await_bounded(task, self.config.clustering_timeout_secs).await?;

        if !report.converged {
            warn!(user_id, iterations = report.iterations, "clustering hit the iteration cap");
        }
        info!(
            user_id,
            clusters = report.clusters.len(),
            files = report.assignments.len(),
            skipped = report.skipped_file_ids.len(),
            "organization complete"
        );
        Ok(report)
    }

    /// Classifies the current listing and stores the flagged files in place
    /// of whatever an earlier scan stored.
    pub async fn scan(&self, user_id: &str) -> Result<CleanupReport> {
        let files = self.files.list_files().await?;
        let report = scan(&files, self.clock.now(), &self.config.assisted_rules());

        self.records.replace_cleanables(user_id, report.cleanable.clone()).await?;

        info!(
            user_id,
            cleanable = report.cleanable.len(),
            findings = report.findings.len(),
            reclaimable_bytes = report.total_reclaimable_bytes,
            "scan complete"
        );
        Ok(report)
    }

    /// Deletes the given files and forgets their stored records. Files that
    /// fail to delete are logged and left out of the returned ids. A deleted
    /// file whose records cannot be removed is still reported as deleted.
    pub async fn clean(&self, user_id: &str, file_ids: &[String]) -> Result<Vec<String>> {
        let mut deleted = Vec::new();

        for file_id in file_ids {
            if let Err(e) = self.files.delete_file(file_id).await {
                warn!(file_id = %file_id, error = %e, "could not delete file");
                continue;
            }
            if let Err(e) = self.records.remove(user_id, file_id).await {
                warn!(file_id = %file_id, error = %e, "file deleted but its records remain");
            }
            deleted.push(file_id.clone());
        }

        info!(user_id, deleted = deleted.len(), requested = file_ids.len(), "clean complete");
        Ok(deleted)
    }
}

/// Waits for a blocking task, giving up after `timeout_secs` when set. The
/// task itself keeps running in the background once abandoned.
async fn await_bounded<T>(task: JoinHandle<Result<T>>, timeout_secs: Option<u64>) -> Result<T> {
    match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), task)
            .await
            .map_err(|_| OrganizerError::Timeout(secs))??,
        None => task.await?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::file_store::LocalFileStore;
    use crate::models::{CleanableFile, CleanupCategory};
    use crate::store::SurrealStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Places text on one of two axes depending on what it talks about.
    struct KeywordEmbedder;

    impl Embedder for KeywordEmbedder {
        fn embed(&self, texts: Vec<String>) -> crate::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let text = text.to_lowercase();
                    if text.contains("rust") {
                        vec![1.0, 0.05]
                    } else if text.contains("recipe") {
                        vec![0.05, 1.0]
                    } else {
                        vec![0.5, 0.5]
                    }
                })
                .collect())
        }
    }

    /// Accepts everything but refuses to forget.
    struct StickyRecords;

    #[async_trait]
    impl RecordStore for StickyRecords {
        async fn put_embedding(&self, _record: EmbeddingRecord) -> crate::Result<()> {
            Ok(())
        }

        async fn embeddings(&self, _user_id: &str) -> crate::Result<Vec<EmbeddingRecord>> {
            Ok(Vec::new())
        }

        async fn retain_embeddings(
            &self,
            _user_id: &str,
            _file_ids: &[String],
        ) -> crate::Result<usize> {
            Ok(0)
        }

        async fn put_cleanable(&self, _user_id: &str, _file: CleanableFile) -> crate::Result<()> {
            Ok(())
        }

        async fn cleanables(&self, _user_id: &str) -> crate::Result<Vec<CleanableFile>> {
            Ok(Vec::new())
        }

        async fn replace_cleanables(
            &self,
            _user_id: &str,
            _files: Vec<CleanableFile>,
        ) -> crate::Result<()> {
            Ok(())
        }

        async fn remove(&self, _user_id: &str, file_id: &str) -> crate::Result<()> {
            Err(OrganizerError::NotFound(file_id.to_string()))
        }
    }

    fn write_files(root: &Path, files: &[(&str, &str)]) -> Result<()> {
        for (path, content) in files {
            let full_path = root.join(path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&full_path, content)?;
        }
        Ok(())
    }

    fn organizer_over(records: Arc<dyn RecordStore>, root: &Path) -> DocumentOrganizer {
        let config = OrganizerConfig {
            seed: Some(7),
            clustering_timeout_secs: Some(30),
            ..OrganizerConfig::default()
        };
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        DocumentOrganizer::new(
            config,
            records,
            Arc::new(LocalFileStore::new(root)),
            Box::new(KeywordEmbedder),
        )
        .with_clock(Arc::new(FixedClock(now)))
    }

    async fn setup_test_organizer(
        files: &[(&str, &str)],
    ) -> Result<(DocumentOrganizer, TempDir, TempDir)> {
        let db_dir = TempDir::new()?;
        let files_dir = TempDir::new()?;
        write_files(files_dir.path(), files)?;

        let records = SurrealStore::open(db_dir.path().join("test_db")).await?;
        let organizer = organizer_over(Arc::new(records), files_dir.path());

        Ok((organizer, db_dir, files_dir))
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_organizer_is_send_and_sync() {
        assert_send_sync::<DocumentOrganizer>();
    }

    #[tokio::test]
    async fn test_organizer_runs_inside_spawned_tasks() -> Result<()> {
        let (organizer, _db, _files) = setup_test_organizer(&[("empty.txt", "")]).await?;
        let organizer = Arc::new(organizer);

        let shared = Arc::clone(&organizer);
        let report = tokio::spawn(async move { shared.scan("alice").await }).await??;
        assert_eq!(report.cleanable.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_index_skips_unsupported_files() -> Result<()> {
        let (organizer, _db, _files) = setup_test_organizer(&[
            ("rust_notes.txt", "Rust ownership and borrowing"),
            ("photo.jpg", "not really a jpeg"),
            ("docs/recipe.md", "Pancake recipe with eggs"),
        ])
        .await?;

        let summary = organizer.index("alice").await?;
        assert_eq!(summary.indexed, vec!["docs/recipe.md", "rust_notes.txt"]);
        assert_eq!(summary.skipped, vec!["photo.jpg"]);

        let stored = organizer.records.embeddings("alice").await?;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].folder_path.as_deref(), Some("docs"));
        Ok(())
    }

    #[tokio::test]
    async fn test_index_forgets_files_from_an_earlier_listing() -> Result<()> {
        let db_dir = TempDir::new()?;
        let first_dir = TempDir::new()?;
        let second_dir = TempDir::new()?;
        write_files(first_dir.path(), &[("only_in_a.txt", "Rust macros")])?;
        write_files(second_dir.path(), &[("only_in_b.txt", "Bread recipe")])?;

        let records = Arc::new(SurrealStore::open(db_dir.path().join("test_db")).await?);
        organizer_over(records.clone(), first_dir.path()).index("local").await?;

        let second = organizer_over(records.clone(), second_dir.path());
        second.index("local").await?;

        let report = second.organize("local", None).await?;
        let clustered: Vec<&String> = report.assignments.keys().collect();
        assert_eq!(clustered, vec!["only_in_b.txt"]);
        assert_eq!(records.embeddings("local").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_index_of_an_emptied_folder_clears_embeddings() -> Result<()> {
        let (organizer, _db, files_dir) =
            setup_test_organizer(&[("rust_notes.txt", "Rust lifetimes")]).await?;

        organizer.index("alice").await?;
        fs::remove_file(files_dir.path().join("rust_notes.txt"))?;
        organizer.index("alice").await?;

        assert!(organizer.records.embeddings("alice").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_organize_groups_by_topic() -> Result<()> {
        let (organizer, _db, _files) = setup_test_organizer(&[
            ("rust_ownership.txt", "Rust ownership rules"),
            ("rust_traits.txt", "Rust traits and generics"),
            ("rust_async.txt", "Async Rust with tokio"),
            ("pancake_recipe.txt", "Pancake recipe"),
            ("soup_recipe.txt", "Tomato soup recipe"),
        ])
        .await?;

        organizer.index("alice").await?;
        let report = organizer.organize("alice", Some(2)).await?;

        assert_eq!(report.clusters.len(), 2);
        assert_eq!(report.assignments.len(), 5);
        assert!(report.skipped_file_ids.is_empty());
        assert_eq!(report.clusters.iter().map(|c| c.len()).sum::<usize>(), 5);

        // Same seed, same answer.
        let again = organizer.organize("alice", Some(2)).await?;
        assert_eq!(report, again);

        let rust_cluster = &report.assignments["rust_ownership.txt"];
        let pancake_cluster = &report.assignments["pancake_recipe.txt"];
        if report.converged && pancake_cluster != rust_cluster {
            assert_eq!(&report.assignments["rust_traits.txt"], rust_cluster);
            assert_eq!(&report.assignments["soup_recipe.txt"], pancake_cluster);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_organize_without_embeddings_is_invalid() -> Result<()> {
        let (organizer, _db, _files) = setup_test_organizer(&[]).await?;

        let result = organizer.organize("nobody", None).await;
        assert!(matches!(result, Err(OrganizerError::InvalidInput(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_await_bounded_times_out_slow_work() {
        let task = tokio::task::spawn_blocking(|| {
            std::thread::sleep(Duration::from_secs(2));
            Ok(())
        });

        let result = await_bounded(task, Some(1)).await;
        assert!(matches!(result, Err(OrganizerError::Timeout(1))));
    }

    #[tokio::test]
    async fn test_await_bounded_passes_through_results() {
        let ok = tokio::task::spawn_blocking(|| Ok(42));
        assert_eq!(await_bounded(ok, Some(30)).await.ok(), Some(42));

        let unbounded = tokio::task::spawn_blocking(|| Ok("done"));
        assert_eq!(await_bounded(unbounded, None).await.ok(), Some("done"));

        let failed = tokio::task::spawn_blocking(|| -> crate::Result<()> {
            Err(OrganizerError::invalid_input("k out of range"))
        });
        let result = await_bounded(failed, Some(30)).await;
        assert!(matches!(result, Err(OrganizerError::InvalidInput(_))));

        let panicked = tokio::task::spawn_blocking(|| -> crate::Result<()> {
            panic!("clustering blew up")
        });
        let result = await_bounded(panicked, None).await;
        assert!(matches!(result, Err(OrganizerError::Task(_))));
    }

    #[tokio::test]
    async fn test_scan_then_clean() -> Result<()> {
        let big = "x".repeat(20_000);
        let (organizer, _db, files_dir) = setup_test_organizer(&[
            ("empty.txt", ""),
            ("report (1).txt", big.as_str()),
            ("keeper.txt", big.as_str()),
        ])
        .await?;

        let report = organizer.scan("alice").await?;
        let flagged: Vec<(&str, CleanupCategory)> = report
            .cleanable
            .iter()
            .map(|f| (f.file_id.as_str(), f.category))
            .collect();
        assert_eq!(
            flagged,
            vec![
                ("empty.txt", CleanupCategory::Empty),
                ("report (1).txt", CleanupCategory::Duplicate),
            ]
        );

        // Every file is older than a year relative to the fixed clock.
        assert_eq!(report.findings.len(), 3);

        let stored = organizer.records.cleanables("alice").await?;
        assert_eq!(stored.len(), 2);

        let deleted = organizer
            .clean("alice", &["empty.txt".to_string(), "missing.txt".to_string()])
            .await?;
        assert_eq!(deleted, vec!["empty.txt"]);
        assert!(!files_dir.path().join("empty.txt").exists());
        assert_eq!(organizer.records.cleanables("alice").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_rescan_forgets_files_that_grew() -> Result<()> {
        let (organizer, _db, files_dir) = setup_test_organizer(&[("grow.txt", "")]).await?;

        organizer.scan("alice").await?;
        assert_eq!(organizer.records.cleanables("alice").await?.len(), 1);

        fs::write(files_dir.path().join("grow.txt"), "x".repeat(50_000))?;
        let report = organizer.scan("alice").await?;

        assert!(report.cleanable.is_empty());
        assert!(organizer.records.cleanables("alice").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_reports_deleted_files_when_records_linger() -> Result<()> {
        let files_dir = TempDir::new()?;
        write_files(files_dir.path(), &[("old.txt", "stale")])?;
        let organizer = organizer_over(Arc::new(StickyRecords), files_dir.path());

        let deleted = organizer.clean("alice", &["old.txt".to_string()]).await?;
        assert_eq!(deleted, vec!["old.txt"]);
        assert!(!files_dir.path().join("old.txt").exists());
        Ok(())
    }
}
