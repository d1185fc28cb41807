use serde::{Deserialize, Serialize};

use crate::error::{OrganizerError, Result};

/// A validated embedding: non-empty and made only of finite values.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(OrganizerError::invalid_input("embedding is empty"));
        }
        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(OrganizerError::invalid_input(format!(
                "embedding has a non-finite value at index {}",
                position
            )));
        }
        Ok(Self(values))
    }

    /// Validates a loosely typed JSON value, such as an embedding taken from
    /// an external payload.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| OrganizerError::invalid_input("embedding is not an array"))?;

        let values = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_f64()
                    .map(|v| v as f32)
                    .ok_or_else(|| {
                        OrganizerError::invalid_input(format!(
                            "embedding value at index {} is not a number",
                            i
                        ))
                    })
            })
            .collect::<Result<Vec<f32>>>()?;

        Self::new(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = OrganizerError;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        embedding.0
    }
}

/// Checks that every vector has the same, non-zero dimensionality and returns it.
pub fn common_dimension<V: AsRef<[f32]>>(vectors: &[V]) -> Result<usize> {
    let first = vectors
        .first()
        .ok_or_else(|| OrganizerError::invalid_input("no embeddings supplied"))?
        .as_ref()
        .len();

    if first == 0 {
        return Err(OrganizerError::invalid_input("embedding at index 0 is empty"));
    }

    for (i, vector) in vectors.iter().enumerate().skip(1) {
        let len = vector.as_ref().len();
        if len != first {
            return Err(OrganizerError::invalid_input(format!(
                "embedding at index {} has dimension {}, expected {}",
                i, len, first
            )));
        }
    }

    Ok(first)
}

pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| x * y)
        .sum();
    let magnitude_a: f32 = a
        .iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();
    let magnitude_b: f32 = b
        .iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Coordinate-wise mean of the given vectors, `None` when there are none.
pub fn mean<'a, I>(vectors: I, dimension: usize) -> Option<Vec<f32>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut sum = vec![0.0f32; dimension];
    let mut count = 0usize;

    for vector in vectors {
        for (acc, value) in sum.iter_mut().zip(vector) {
            *acc += value;
        }
        count += 1;
    }

    if count == 0 {
        return None;
    }

    let n = count as f32;
    sum.iter_mut().for_each(|v| *v /= n);
    Some(sum)
}
