//! Tonal centroid (tonnetz) projection
//!
//! Projects an L1-normalized chroma vector onto three circles of the
//! harmonic network: fifths, minor thirds and major thirds, sin/cos each,
//! giving six dimensions per frame.

use std::f32::consts::PI;

/// Per-frame 6-D tonal centroids from per-frame chroma, `[frame][6]`.
pub fn tonnetz(chroma: &[Vec<f32>]) -> Vec<Vec<f32>> {
    if chroma.is_empty() {
        return Vec::new();
    }
    let n_chroma = chroma[0].len();
    let basis = tonnetz_basis(n_chroma);

    chroma
        .iter()
        .map(|frame| {
            let norm: f32 = frame.iter().map(|v| v.abs()).sum();
            let scale = if norm > 0.0 { 1.0 / norm } else { 0.0 };
            basis
                .iter()
                .map(|row| {
                    row.iter()
                        .zip(frame.iter())
                        .map(|(&b, &c)| b * c * scale)
                        .sum()
                })
                .collect()
        })
        .collect()
}

/// Transformation matrix `[6][n_chroma]`
fn tonnetz_basis(n_chroma: usize) -> Vec<Vec<f32>> {
    // Circle radii and interval scales: fifths, minor thirds, major thirds
    const RADII: [f32; 6] = [1.0, 1.0, 1.0, 1.0, 0.5, 0.5];
    const SCALES: [f32; 6] = [7.0 / 6.0, 7.0 / 6.0, 3.0 / 2.0, 3.0 / 2.0, 2.0 / 3.0, 2.0 / 3.0];

    (0..6)
        .map(|i| {
            (0..n_chroma)
                .map(|p| {
                    let pitch = p as f32 * 12.0 / n_chroma as f32;
                    let mut v = SCALES[i] * pitch;
                    if i % 2 == 0 {
                        // sin component
                        v -= 0.5;
                    }
                    RADII[i] * (PI * v).cos()
                })
                .collect()
        })
        .collect()
}
