// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Deterministic DCAT-AP-style enrichment.
//!
//! Themes come from the EU data-theme authority table; tags are a fixed
//! per-category set. Both are pure lookup tables so published metadata is
//! reproducible from the item alone.

use zguby_events::Category;

const THEME_BASE: &str = "http://publications.europa.eu/resource/authority/data-theme";

/// EU data-theme URI for a category.
pub fn theme_uri(category: Category) -> String {
    let code = match category {
        Category::Dokumenty => "GOVE",
        Category::Elektronika => "TECH",
        Category::Rowery => "TRAN",
        Category::Klucze
        | Category::PortfeleITorby
        | Category::Odziez
        | Category::Bizuteria
        | Category::Okulary
        | Category::Inne => "SOCI",
    };
    format!("{THEME_BASE}/{code}")
}

/// Default keyword tags for a category. Every set carries the two portal
/// discovery tags plus category-specific keywords.
pub fn default_tags(category: Category) -> Vec<String> {
    let specific: &[&str] = match category {
        Category::Dokumenty => &["dokumenty", "dowody"],
        Category::Klucze => &["klucze"],
        Category::PortfeleITorby => &["portfele", "torby"],
        Category::Elektronika => &["elektronika", "telefony"],
        Category::Odziez => &["odzież"],
        Category::Bizuteria => &["biżuteria", "zegarki"],
        Category::Okulary => &["okulary"],
        Category::Rowery => &["rowery", "hulajnogi"],
        Category::Inne => &[],
    };
    let mut tags = vec!["zguby".to_string(), "rzeczy znalezione".to_string()];
    tags.extend(specific.iter().map(|t| t.to_string()));
    tags
}

/// Spatial label for the DCAT record: the trimmed location, when present.
pub fn spatial_label(location: &str) -> Option<String> {
    let trimmed = location.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
