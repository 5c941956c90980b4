// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fixed set of item categories used by the intake form and the portal
/// mapping. Labels are the Polish strings that travel on the wire.
///
/// Unknown labels deserialize to [`Category::Inne`] so that a free-text
/// category coming from a legacy import can never make a message
/// undecodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    #[serde(rename = "Dokumenty")]
    Dokumenty,
    #[serde(rename = "Klucze")]
    Klucze,
    #[serde(rename = "Portfele i torby")]
    PortfeleITorby,
    #[serde(rename = "Elektronika")]
    Elektronika,
    #[serde(rename = "Odzież")]
    Odziez,
    #[serde(rename = "Biżuteria i zegarki")]
    Bizuteria,
    #[serde(rename = "Okulary")]
    Okulary,
    #[serde(rename = "Rowery i hulajnogi")]
    Rowery,
    #[default]
    #[serde(other, rename = "Inne")]
    Inne,
}

/// All categories in declaration order. Used by the portal mapping tests and
/// by anything that needs to enumerate the set.
pub const CATEGORIES: [Category; 9] = [
    Category::Dokumenty,
    Category::Klucze,
    Category::PortfeleITorby,
    Category::Elektronika,
    Category::Odziez,
    Category::Bizuteria,
    Category::Okulary,
    Category::Rowery,
    Category::Inne,
];

impl Category {
    /// The wire label (also the human-facing label).
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Dokumenty => "Dokumenty",
            Category::Klucze => "Klucze",
            Category::PortfeleITorby => "Portfele i torby",
            Category::Elektronika => "Elektronika",
            Category::Odziez => "Odzież",
            Category::Bizuteria => "Biżuteria i zegarki",
            Category::Okulary => "Okulary",
            Category::Rowery => "Rowery i hulajnogi",
            Category::Inne => "Inne",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A citizen/clerk-submitted found-item report as published by the intake
/// gateway under `item.submitted`.
///
/// `item_id` is the immutable identity assigned at intake; it is preserved
/// end-to-end through every downstream event. Everything except `item_id`
/// defaults to empty/absent so that partially-filled legacy imports decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSubmitted {
    pub item_id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub location: String,
    /// Calendar date (UTC) the item was found.
    #[serde(default)]
    pub found_date: Option<NaiveDate>,
    #[serde(default)]
    pub reporting_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reporting_location: String,
    /// Opaque locator in the blob store; empty when no photo was uploaded.
    #[serde(default)]
    pub image_key: String,
    /// Public URL derived from `image_key`. Legacy producers send only this;
    /// the embedder canonicalizes it back into `image_key` at ingress.
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ItemSubmitted {
    /// Minimal constructor used by the legacy converter and by tests.
    pub fn new(item_id: Uuid) -> Self {
        Self {
            item_id,
            title: String::new(),
            description: String::new(),
            category: Category::Inne,
            location: String::new(),
            found_date: None,
            reporting_date: None,
            reporting_location: String::new(),
            image_key: String::new(),
            image_url: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            timestamp: None,
        }
    }

    /// Whether the report carries any text usable for embedding.
    pub fn has_text(&self) -> bool {
        !self.title.trim().is_empty() || !self.description.trim().is_empty()
    }

    /// Whether the report references a photo in either the canonical or the
    /// legacy form.
    pub fn has_image_reference(&self) -> bool {
        !self.image_key.trim().is_empty() || !self.image_url.trim().is_empty()
    }

    /// Contact info as a single display string for the vector payload.
    pub fn contact_info(&self) -> String {
        match (
            self.contact_email.trim().is_empty(),
            self.contact_phone.trim().is_empty(),
        ) {
            (false, false) => format!("{} / {}", self.contact_email.trim(), self.contact_phone.trim()),
            (false, true) => self.contact_email.trim().to_string(),
            (true, false) => self.contact_phone.trim().to_string(),
            (true, true) => String::new(),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_polish_labels() {
        for cat in CATEGORIES {
            let json = serde_json::to_string(&cat).unwrap();
            let back: Category = serde_json::from_str(&json).unwrap();
            assert_eq!(back, cat, "{json} should round-trip");
        }
    }

    #[test]
    fn category_unknown_label_falls_back_to_inne() {
        let cat: Category = serde_json::from_str("\"Parasole\"").unwrap();
        assert_eq!(cat, Category::Inne);
    }

    #[test]
    fn category_display_matches_wire_label() {
        assert_eq!(Category::PortfeleITorby.to_string(), "Portfele i torby");
        let json = serde_json::to_string(&Category::PortfeleITorby).unwrap();
        assert_eq!(json, "\"Portfele i torby\"");
    }

    #[test]
    fn item_decodes_with_only_item_id() {
        let id = Uuid::new_v4();
        let json = format!("{{\"item_id\":\"{id}\"}}");
        let item: ItemSubmitted = serde_json::from_str(&json).unwrap();
        assert_eq!(item.item_id, id);
        assert!(item.title.is_empty());
        assert_eq!(item.category, Category::Inne);
        assert!(item.found_date.is_none());
    }

    #[test]
    fn item_without_item_id_is_rejected() {
        let result = serde_json::from_str::<ItemSubmitted>("{\"title\":\"Portfel\"}");
        assert!(result.is_err(), "item_id is the one mandatory field");
    }

    #[test]
    fn has_text_requires_non_whitespace() {
        let mut item = ItemSubmitted::new(Uuid::new_v4());
        assert!(!item.has_text());
        item.title = "   ".into();
        assert!(!item.has_text());
        item.description = "Czarny skórzany portfel".into();
        assert!(item.has_text());
    }

    #[test]
    fn has_image_reference_accepts_either_form() {
        let mut item = ItemSubmitted::new(Uuid::new_v4());
        assert!(!item.has_image_reference());
        item.image_url = "https://blob.example/uploads/x.jpg".into();
        assert!(item.has_image_reference());
        item.image_url.clear();
        item.image_key = "uploads/x.jpg".into();
        assert!(item.has_image_reference());
    }

    #[test]
    fn contact_info_joins_both_channels() {
        let mut item = ItemSubmitted::new(Uuid::new_v4());
        assert_eq!(item.contact_info(), "");
        item.contact_email = "bok@um.example.pl".into();
        assert_eq!(item.contact_info(), "bok@um.example.pl");
        item.contact_phone = "+48 22 123 45 67".into();
        assert_eq!(item.contact_info(), "bok@um.example.pl / +48 22 123 45 67");
    }

    #[test]
    fn found_date_serializes_as_calendar_date() {
        let mut item = ItemSubmitted::new(Uuid::new_v4());
        item.found_date = Some(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["found_date"], "2025-01-15");
    }
}
