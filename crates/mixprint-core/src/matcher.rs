//! Cosine-similarity matching of query segments against references
//!
//! References are held in insertion order and a query's winner is the
//! first reference reaching the highest similarity; later ties never
//! displace an earlier winner. Segments are matched independently, so
//! batches run in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::segment::Window;

/// One reference descriptor with its identity.
#[derive(Debug, Clone)]
pub struct Reference {
    pub category: String,
    pub track_id: String,
    pub values: Vec<f64>,
}

/// A scored reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub category: String,
    pub track_id: String,
    pub similarity: f64,
}

/// Per-segment identification outcome. A segment with no usable winner
/// keeps its window coordinates and carries `None` in the match fields.
/// `candidates` holds the ranked runner-up list when the caller asked
/// for more than the single winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub segment_index: usize,
    pub start_s: f64,
    pub end_s: f64,
    pub track_id: Option<String>,
    pub category: Option<String>,
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub candidates: Vec<MatchResult>,
}

/// Cosine similarity of two equal-length vectors. Zero-norm input gives
/// 0.0 rather than NaN.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

pub struct Matcher {
    references: Vec<Reference>,
    dim: usize,
}

impl Matcher {
    /// Build a matcher over references, preserving their order. All
    /// reference vectors must share one dimension.
    pub fn new(references: Vec<Reference>) -> Result<Matcher, CoreError> {
        let dim = references.first().map(|r| r.values.len()).unwrap_or(0);
        for r in &references {
            if r.values.len() != dim {
                return Err(CoreError::DimensionMismatch {
                    expected: dim,
                    got: r.values.len(),
                });
            }
        }
        Ok(Matcher { references, dim })
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Best reference for one query, or `None` when the corpus is empty.
    /// Strictly-greater comparison: the earliest reference at the maximum
    /// similarity wins.
    pub fn best_match(&self, query: &[f64]) -> Result<Option<MatchResult>, CoreError> {
        if self.references.is_empty() {
            return Ok(None);
        }
        self.check_dim(query)?;
        Ok(self.scan_best(query))
    }

    /// The `k` best references in descending similarity. Equal scores
    /// keep reference order.
    pub fn top_k(&self, query: &[f64], k: usize) -> Result<Vec<MatchResult>, CoreError> {
        if self.references.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.check_dim(query)?;
        Ok(self.scan_top(query, k))
    }

    /// Scan for the winner. The query is already dimension-checked.
    fn scan_best(&self, query: &[f64]) -> Option<MatchResult> {
        let mut best: Option<(usize, f64)> = None;
        for (i, r) in self.references.iter().enumerate() {
            let sim = cosine_similarity(query, &r.values);
            match best {
                Some((_, s)) if sim <= s => {}
                _ => best = Some((i, sim)),
            }
        }
        best.map(|(i, sim)| MatchResult {
            category: self.references[i].category.clone(),
            track_id: self.references[i].track_id.clone(),
            similarity: sim,
        })
    }

    /// Ranked scan. The query is already dimension-checked.
    fn scan_top(&self, query: &[f64], k: usize) -> Vec<MatchResult> {
        let mut scored: Vec<(usize, f64)> = self
            .references
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine_similarity(query, &r.values)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored
            .into_iter()
            .take(k)
            .map(|(i, sim)| MatchResult {
                category: self.references[i].category.clone(),
                track_id: self.references[i].track_id.clone(),
                similarity: sim,
            })
            .collect()
    }

    /// Match a batch of segment queries in parallel. `queries[i]` is
    /// `None` when extraction failed for that window; its prediction
    /// carries no match. With `top_k > 1` each prediction also carries
    /// the ranked candidate list. Output order follows the windows.
    ///
    /// Every query is dimension-checked up front, so the parallel scan
    /// itself cannot fail.
    pub fn match_segments(
        &self,
        windows: &[Window],
        queries: &[Option<Vec<f64>>],
        top_k: usize,
    ) -> Result<Vec<Prediction>, CoreError> {
        for q in queries.iter().flatten() {
            if !self.references.is_empty() {
                self.check_dim(q)?;
            }
        }

        let predictions = windows
            .par_iter()
            .zip(queries.par_iter())
            .map(|(w, q)| {
                let mut candidates = Vec::new();
                let hit = q.as_ref().and_then(|values| {
                    if top_k > 1 {
                        candidates = self.scan_top(values, top_k);
                        candidates.first().cloned()
                    } else {
                        self.scan_best(values)
                    }
                });
                match hit {
                    Some(m) => Prediction {
                        segment_index: w.index,
                        start_s: w.start_s,
                        end_s: w.end_s,
                        track_id: Some(m.track_id),
                        category: Some(m.category),
                        similarity: Some(m.similarity),
                        candidates,
                    },
                    None => Prediction {
                        segment_index: w.index,
                        start_s: w.start_s,
                        end_s: w.end_s,
                        track_id: None,
                        category: None,
                        similarity: None,
                        candidates: Vec::new(),
                    },
                }
            })
            .collect();
        Ok(predictions)
    }

    fn check_dim(&self, query: &[f64]) -> Result<(), CoreError> {
        if query.len() != self.dim {
            return Err(CoreError::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }
        Ok(())
    }
}
