// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Validation of fetched photo bytes before they reach the vision encoder.
//!
//! The embedder degrades to text-only whenever the photo is unusable, so
//! rejection here is a classification, not an error path.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaRejection {
    #[error("payload is {size} bytes, over the {cap} byte cap")]
    TooLarge { size: usize, cap: usize },

    #[error("bytes are not a recognized image format")]
    UnknownFormat,

    #[error("image failed to decode: {0}")]
    Undecodable(String),
}

/// A photo that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedImage {
    /// MIME type, e.g. `"image/jpeg"`.
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// Sniff and decode `bytes`, enforcing the size cap.
///
/// Format detection is byte-based only; there is no trustworthy filename to
/// fall back to once a key has passed through legacy-URL canonicalization.
pub fn probe_image(bytes: &[u8], cap: usize) -> Result<ProbedImage, MediaRejection> {
    if bytes.len() > cap {
        return Err(MediaRejection::TooLarge {
            size: bytes.len(),
            cap,
        });
    }
    let format = image::guess_format(bytes).map_err(|_| MediaRejection::UnknownFormat)?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| MediaRejection::Undecodable(e.to_string()))?;
    Ok(ProbedImage {
        mime_type: format.to_mime_type().to_string(),
        width: img.width(),
        height: img.height(),
    })
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
