// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Multi-modal embedding support for the pipeline.
//!
//! [`Encoder`] is the seam to the external vision/language encoder service;
//! [`HttpEncoder`] is the real driver and [`MockEncoder`] a deterministic
//! double for tests. [`joint`] holds the fusion math (0.5 text / 0.5 image,
//! L2-normalized) and the text-normalization rule, and [`media`] the image
//! sniffing that decides whether fetched bytes are worth sending to the
//! vision encoder at all.

pub mod joint;
pub mod media;

mod encoder;
mod error;

pub use encoder::{Encoder, HttpEncoder, MockEncoder};
pub use error::EncoderError;
