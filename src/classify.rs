//! Heuristic cleanup classification.
//!
//! Two independent rule sets live here. [`classify`] looks at size tiers and
//! duplicate-looking names; [`assess`] looks at age, size and media type.
//! Both are pure: the same input always produces the same output.

use std::collections::BTreeMap;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    AssistedCategory, CleanableFile, CleanupCategory, CleanupReport, Confidence, FileMetadata,
    Finding,
    FindingCategory,
};

pub const EMPTY_MAX_BYTES: u64 = 50;
pub const TINY_MAX_BYTES: u64 = 2048;
pub const SMALL_MAX_BYTES: u64 = 10240;

const FOLDER_MIME_TYPES: &[&str] = &["application/vnd.google-apps.folder", "inode/directory"];
const DUPLICATE_MARKERS: &[&str] = &[" - Copy", " (1)", "_copy"];

pub fn is_folder(file: &FileMetadata) -> bool {
    file.mime_type
        .as_deref()
        .is_some_and(|mime| FOLDER_MIME_TYPES.contains(&mime))
}

pub fn looks_like_duplicate(file_name: &str) -> bool {
    DUPLICATE_MARKERS.iter().any(|marker| file_name.contains(marker))
}

fn format_kb(size_bytes: u64) -> String {
    format!("{:.1}", size_bytes as f64 / 1024.0)
}

/// Applies the size tiers, then the duplicate-name override. Folders and
/// files that match no rule return `None`.
pub fn classify(file: &FileMetadata) -> Option<CleanableFile> {
    if is_folder(file) {
        return None;
    }

    let name = file.file_name.as_str();
    let lower_name = name.to_lowercase();
    let mime = file.mime_type.as_deref().unwrap_or_default().to_lowercase();
    let size = file.size_bytes;

    let mut verdict: Option<(CleanupCategory, String, Confidence)> = if size == 0 {
        Some((CleanupCategory::Empty, "Empty file (0 bytes)".to_string(), Confidence::High))
    } else if size <= EMPTY_MAX_BYTES {
        Some((
            CleanupCategory::Empty,
            format!("Nearly empty file ({} bytes)", size),
            Confidence::High,
        ))
    } else if size <= TINY_MAX_BYTES {
        if name == ".DS_Store" || name.starts_with("._") {
            Some((CleanupCategory::Tiny, "System file".to_string(), Confidence::High))
        } else if lower_name.contains("thumb") || lower_name.contains("cache") {
            Some((CleanupCategory::Tiny, "Thumbnail or cache file".to_string(), Confidence::Medium))
        } else {
            Some((
                CleanupCategory::Tiny,
                format!("Very small file ({} KB)", format_kb(size)),
                Confidence::Medium,
            ))
        }
    } else if size <= SMALL_MAX_BYTES {
        let reason = if mime.contains("zip") || mime.contains("archive") {
            "Small archive file (possibly empty)"
        } else if mime.contains("document") || mime.contains("presentation") {
            "Small document (possibly template or empty)"
        } else {
            "Suspiciously small file"
        };
        Some((CleanupCategory::Small, reason.to_string(), Confidence::Low))
    } else {
        None
    };

    // Runs after the size tier and always wins over it.
    if looks_like_duplicate(name) {
        verdict = Some((
            CleanupCategory::Duplicate,
            "Potential duplicate file".to_string(),
            Confidence::Medium,
        ));
    }

    verdict.map(|(category, reason, confidence)| CleanableFile {
        file_id: file.file_id.clone(),
        file_name: file.file_name.clone(),
        mime_type: file.mime_type.clone(),
        size_bytes: file.size_bytes,
        modified_time: file.modified_time,
        category,
        reason,
        confidence,
    })
}

/// Thresholds for the age/size/type rule set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssistedRules {
    pub stale_after_months: u32,
    pub large_file_bytes: u64,
}

impl Default for AssistedRules {
    fn default() -> Self {
        Self {
            stale_after_months: 12,
            large_file_bytes: 100 * 1024 * 1024,
        }
    }
}

fn media_category(mime: &str) -> Option<(AssistedCategory, &'static str)> {
    if mime.starts_with("image/") {
        Some((AssistedCategory::Images, "Image file"))
    } else if mime.starts_with("video/") {
        Some((AssistedCategory::Videos, "Video file"))
    } else if mime == "application/pdf" {
        Some((AssistedCategory::Pdfs, "PDF document"))
    } else {
        None
    }
}

/// Age, size and type rules. They run in that order and the last rule that
/// fires decides the finding. A missing modification time skips the age rule.
pub fn assess(file: &FileMetadata, now: DateTime<Utc>, rules: &AssistedRules) -> Option<Finding> {
    if is_folder(file) {
        return None;
    }

    let mut verdict: Option<(AssistedCategory, String, f32)> = None;

    if let (Some(modified), Some(cutoff)) = (
        file.modified_time,
        now.checked_sub_months(Months::new(rules.stale_after_months)),
    ) {
        if modified < cutoff {
            verdict = Some((
                AssistedCategory::OldFiles,
                format!("Not modified since {}", modified.format("%Y-%m-%d")),
                0.7,
            ));
        }
    }

    if file.size_bytes > rules.large_file_bytes {
        verdict = Some((
            AssistedCategory::LargeFiles,
            format!("Large file ({:.1} MB)", file.size_bytes as f64 / (1024.0 * 1024.0)),
            0.8,
        ));
    }

    if let Some((category, reason)) = file.mime_type.as_deref().and_then(media_category) {
        verdict = Some((category, reason.to_string(), 0.9));
    }

    verdict.map(|(category, reason, confidence)| Finding {
        file_id: file.file_id.clone(),
        file_name: file.file_name.clone(),
        category: FindingCategory::Assisted(category),
        reason,
        confidence,
    })
}

/// Merges two finding sets per file id; entries in `later` replace those in
/// `earlier`. Output is ordered by file id.
pub fn merge_findings<I, J>(earlier: I, later: J) -> Vec<Finding>
where
    I: IntoIterator<Item = Finding>,
    J: IntoIterator<Item = Finding>,
{
    let mut merged: BTreeMap<String, Finding> = BTreeMap::new();
    for finding in earlier.into_iter().chain(later) {
        merged.insert(finding.file_id.clone(), finding);
    }
    merged.into_values().collect()
}

/// Runs both rule sets over a listing. `findings` holds the size-tier verdicts
/// merged with the assisted ones, the latter taking precedence.
pub fn scan(files: &[FileMetadata], now: DateTime<Utc>, rules: &AssistedRules) -> CleanupReport {
    let cleanable: Vec<CleanableFile> = files.iter().filter_map(classify).collect();
    let assisted: Vec<Finding> = files.iter().filter_map(|f| assess(f, now, rules)).collect();

    let findings = merge_findings(cleanable.iter().map(Finding::from), assisted);
    let total_reclaimable_bytes = cleanable.iter().map(|f| f.size_bytes).sum();

    CleanupReport {
        cleanable,
        findings,
        total_reclaimable_bytes,
    }
}
