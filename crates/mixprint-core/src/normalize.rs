//! Standard scaling over a reference corpus
//!
//! The scaling is fitted exactly once per run, on the reference
//! descriptors, and then applied to references and query segments alike.
//! It is a plain value passed to whoever needs it; nothing about it is
//! global or refittable.

use crate::error::CoreError;

/// Per-dimension mean and standard deviation fitted on a corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaling {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Scaling {
    /// Fit on the reference corpus. All vectors must share one length.
    pub fn fit<V: AsRef<[f64]>>(vectors: &[V]) -> Result<Scaling, CoreError> {
        let first = vectors.first().ok_or(CoreError::EmptyCorpus)?;
        let dim = first.as_ref().len();
        for v in vectors {
            if v.as_ref().len() != dim {
                return Err(CoreError::DimensionMismatch {
                    expected: dim,
                    got: v.as_ref().len(),
                });
            }
        }

        let n = vectors.len() as f64;
        let mut means = vec![0.0f64; dim];
        for v in vectors {
            for (m, &x) in means.iter_mut().zip(v.as_ref().iter()) {
                *m += x;
            }
        }
        for m in means.iter_mut() {
            *m /= n;
        }

        let mut stds = vec![0.0f64; dim];
        for v in vectors {
            for (s, (&x, &m)) in stds.iter_mut().zip(v.as_ref().iter().zip(means.iter())) {
                let d = x - m;
                *s += d * d;
            }
        }
        for s in stds.iter_mut() {
            *s = (*s / n).sqrt();
        }

        Ok(Scaling { means, stds })
    }

    pub fn dim(&self) -> usize {
        self.means.len()
    }

    /// Apply the fitted transform to one vector.
    ///
    /// Zero-variance dimensions are shifted to zero rather than divided,
    /// so constant corpus dimensions never produce NaN or infinity.
    pub fn apply(&self, vector: &[f64]) -> Result<Vec<f64>, CoreError> {
        if vector.len() != self.dim() {
            return Err(CoreError::DimensionMismatch {
                expected: self.dim(),
                got: vector.len(),
            });
        }
        Ok(vector
            .iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(&x, (&m, &s))| if s > 0.0 { (x - m) / s } else { x - m })
            .collect())
    }
}
