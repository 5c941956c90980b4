// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Fusion of text and image vectors into one joint embedding, plus the text
//! normalization applied before encoding.

/// Weight of the text modality in the joint embedding.
pub const TEXT_WEIGHT: f32 = 0.5;
/// Weight of the image modality in the joint embedding.
pub const IMAGE_WEIGHT: f32 = 0.5;

/// Build the text passed to the language encoder: title, description and
/// category label joined by single spaces, trimmed, inner whitespace runs
/// collapsed.
pub fn embedding_text(title: &str, description: &str, category: &str) -> String {
    let joined = format!("{title} {description} {category}");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// L2 norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit norm. A zero vector is returned unchanged; the
/// callers never produce one from non-empty input.
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = l2_norm(&v);
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

/// Fuse a text vector with an optional image vector.
///
/// With an image: `normalize(0.5·text + 0.5·image)`. Without: the text
/// vector as-is (already unit norm from the encoder).
pub fn joint_embedding(text: Vec<f32>, image: Option<Vec<f32>>) -> Vec<f32> {
    match image {
        Some(image) => {
            debug_assert_eq!(text.len(), image.len());
            let fused = text
                .iter()
                .zip(image.iter())
                .map(|(t, i)| TEXT_WEIGHT * t + IMAGE_WEIGHT * i)
                .collect();
            l2_normalize(fused)
        }
        None => text,
    }
}

/// Cosine similarity of two equal-length vectors.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    dot / (na * nb)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
