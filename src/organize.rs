use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use crate::error::Result;
use crate::kmeans::{KMeans, DEFAULT_MAX_ITERATIONS};
use crate::models::{Cluster, EmbeddedFile, OrganizationReport};
use crate::theme::label_cluster;
use crate::vector::{cosine_similarity, Embedding};

pub const DEFAULT_MAX_CLUSTERS: usize = 12;

#[derive(Debug, Clone, Copy)]
pub struct OrganizeOptions {
    pub max_iterations: usize,
    pub max_clusters: usize,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_clusters: DEFAULT_MAX_CLUSTERS,
        }
    }
}

/// Cluster count used when the caller does not pick one: `sqrt(n / 2)`
/// rounded, kept within `[1, max_clusters]` and never above `n`.
pub fn suggested_k(file_count: usize, max_clusters: usize) -> usize {
    let k = ((file_count as f64) / 2.0).sqrt().round() as usize;
    k.clamp(1, max_clusters.max(1)).min(file_count.max(1))
}

/// Groups files by embedding and labels every group.
///
/// Files with an empty embedding are left out and reported in
/// `skipped_file_ids`. Every remaining file ends up in exactly one cluster;
/// all `k` clusters are returned, including ones that ended up empty.
pub fn organize<R: Rng + ?Sized>(
    files: Vec<EmbeddedFile>,
    k: Option<usize>,
    options: OrganizeOptions,
    rng: &mut R,
) -> Result<OrganizationReport> {
    let (files, skipped): (Vec<EmbeddedFile>, Vec<EmbeddedFile>) =
        files.into_iter().partition(|f| !f.embedding.is_empty());

    let skipped_file_ids: Vec<String> = skipped.into_iter().map(|f| f.file_id).collect();
    if !skipped_file_ids.is_empty() {
        debug!(count = skipped_file_ids.len(), "skipping files without embeddings");
    }

    let embeddings = files
        .iter()
        .map(|f| Embedding::new(f.embedding.clone()))
        .collect::<Result<Vec<_>>>()?;
    let vectors: Vec<&[f32]> = embeddings.iter().map(Embedding::as_slice).collect();

    let k = k.unwrap_or_else(|| suggested_k(files.len(), options.max_clusters));
    let result = KMeans::new(k)
        .with_max_iterations(options.max_iterations)
        .fit(&vectors, rng)?;

    let mut clusters = Vec::with_capacity(k);
    let mut assignments = BTreeMap::new();

    for (index, (member_indices, centroid)) in result
        .members()
        .into_iter()
        .zip(result.centroids.iter())
        .enumerate()
    {
        let id = format!("cluster-{}", index);
        let members: Vec<EmbeddedFile> = member_indices.iter().map(|&i| files[i].clone()).collect();

        let cohesion = if member_indices.is_empty() {
            0.0
        } else {
            member_indices
                .iter()
                .map(|&i| cosine_similarity(vectors[i], centroid))
                .sum::<f32>()
                / member_indices.len() as f32
        };

        for member in &members {
            assignments.insert(member.file_id.clone(), id.clone());
        }

        clusters.push(Cluster {
            id,
            centroid: centroid.clone(),
            member_file_ids: members.iter().map(|f| f.file_id.clone()).collect(),
            theme: label_cluster(&members),
            cohesion,
        });
    }

    Ok(OrganizationReport {
        clusters,
        assignments,
        skipped_file_ids,
        iterations: result.iterations,
        converged: result.converged,
    })
}
