// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod env;
mod schema;

pub use env::{from_env, from_lookup};
pub use schema::*;
