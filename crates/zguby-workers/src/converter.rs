// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `dataset.submitted` → N × `item.submitted`.
//!
//! Explodes a base64-encoded legacy file into normalized item reports, each
//! with a fresh `item_id`. Tabular formats yield one item per row, document
//! formats one item for the whole file. [`explode`] is pure; the consumer
//! runner is the single publication sink, so fan-out backpressure rides on
//! publisher confirms.
//!
//! Row-level mapping is forgiving by design: rows that cannot produce any
//! usable text are skipped with a warning, and a partially parseable file
//! still emits everything it can.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;
use zguby_broker::{EventHandler, HandlerError};
use zguby_events::{Category, DatasetSubmitted, Event, ItemSubmitted};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("file_data is not valid base64: {0}")]
    Base64(String),

    #[error("file is not valid UTF-8: {0}")]
    Utf8(String),

    #[error("CSV structure unreadable: {0}")]
    Csv(String),

    #[error("JSON unreadable: {0}")]
    Json(String),

    #[error("file contains no usable content")]
    Empty,

    #[error("unsupported file format: {0}")]
    Unsupported(String),
}

/// One legacy row in the shape both the JSON and the CSV paths normalize
/// into. Field aliases accept the Polish column names of the historical
/// exports.
#[derive(Debug, Default, Deserialize)]
struct LegacyRow {
    #[serde(default, alias = "tytuł", alias = "tytul", alias = "nazwa")]
    title: String,
    #[serde(default, alias = "opis")]
    description: String,
    #[serde(default, alias = "kategoria")]
    category: Category,
    #[serde(default, alias = "miejsce", alias = "lokalizacja")]
    location: String,
    #[serde(default, alias = "data_znalezienia", alias = "data")]
    found_date: Option<NaiveDate>,
    #[serde(default, alias = "email", alias = "e-mail")]
    contact_email: String,
    #[serde(default, alias = "telefon")]
    contact_phone: String,
    #[serde(default)]
    image_key: String,
    #[serde(default)]
    image_url: String,
}

impl LegacyRow {
    fn has_text(&self) -> bool {
        !self.title.trim().is_empty() || !self.description.trim().is_empty()
    }

    fn into_item(self) -> ItemSubmitted {
        let now = Utc::now();
        let mut item = ItemSubmitted::new(Uuid::new_v4());
        item.title = self.title;
        item.description = self.description;
        item.category = self.category;
        item.location = self.location;
        item.found_date = self.found_date;
        item.reporting_date = Some(now);
        item.contact_email = self.contact_email;
        item.contact_phone = self.contact_phone;
        item.image_key = self.image_key;
        item.image_url = self.image_url;
        item.timestamp = Some(now);
        item
    }
}

/// Decode and explode a submitted file into item reports.
pub fn explode(submitted: &DatasetSubmitted) -> Result<Vec<ItemSubmitted>, ConvertError> {
    let bytes = B64
        .decode(submitted.file_data.trim())
        .map_err(|e| ConvertError::Base64(e.to_string()))?;

    let format = submitted
        .file_format
        .trim()
        .trim_start_matches('.')
        .to_lowercase();
    match format.as_str() {
        "csv" => explode_csv(&bytes),
        "json" => explode_json(&bytes),
        "txt" | "text" | "md" => explode_document(&bytes, &submitted.file_name),
        other => Err(ConvertError::Unsupported(other.to_string())),
    }
}

fn explode_csv(bytes: &[u8]) -> Result<Vec<ItemSubmitted>, ConvertError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| ConvertError::Csv(e.to_string()))?
        .clone();

    let mut items = Vec::new();
    for (index, record) in reader.deserialize::<LegacyRow>().enumerate() {
        let row_number = index + 2; // header is line 1
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                warn!(row = row_number, error = %err, "skipping unreadable CSV row");
                continue;
            }
        };
        if row.has_text() {
            items.push(row.into_item());
            continue;
        }
        // Headerless-ish export: no recognized text column. Fall back to
        // the first column as the title.
        if let Some(first) = fallback_title(&headers, bytes, index) {
            let mut item = row.into_item();
            item.title = first;
            items.push(item);
        } else {
            warn!(row = row_number, "skipping CSV row without any text");
        }
    }
    Ok(items)
}

/// When no recognized text column exists, recover the first field of the
/// given data row to use as a title.
fn fallback_title(headers: &csv::StringRecord, bytes: &[u8], index: usize) -> Option<String> {
    let recognized = ["title", "tytuł", "tytul", "nazwa", "description", "opis"];
    if headers.iter().any(|h| recognized.contains(&h.to_lowercase().as_str())) {
        return None;
    }
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);
    let record = reader.records().nth(index)?.ok()?;
    let first = record.get(0)?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

fn explode_json(bytes: &[u8]) -> Result<Vec<ItemSubmitted>, ConvertError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| ConvertError::Json(e.to_string()))?;
    let rows = match value {
        serde_json::Value::Array(rows) => rows,
        object @ serde_json::Value::Object(_) => vec![object],
        _ => {
            return Err(ConvertError::Json(
                "top-level value must be an array or object".into(),
            ))
        }
    };

    let mut items = Vec::new();
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<LegacyRow>(row) {
            Ok(row) if row.has_text() => items.push(row.into_item()),
            Ok(_) => warn!(index, "skipping JSON element without any text"),
            Err(err) => warn!(index, error = %err, "skipping unreadable JSON element"),
        }
    }
    Ok(items)
}

fn explode_document(bytes: &[u8], file_name: &str) -> Result<Vec<ItemSubmitted>, ConvertError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ConvertError::Utf8(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(ConvertError::Empty);
    }
    let title = file_name
        .rsplit('/')
        .next()
        .and_then(|name| name.split('.').next())
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or("Import")
        .to_string();

    let row = LegacyRow {
        title,
        description: text.trim().to_string(),
        ..LegacyRow::default()
    };
    Ok(vec![row.into_item()])
}

pub struct LegacyConverter;

impl LegacyConverter {
    pub fn new() -> Self {
        Self
    }

    fn classify(err: ConvertError) -> HandlerError {
        match err {
            ConvertError::Unsupported(_) => HandlerError::permanent(err),
            other => HandlerError::malformed(other),
        }
    }
}

impl Default for LegacyConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for LegacyConverter {
    fn name(&self) -> &str {
        "legacy-converter"
    }

    async fn handle(&self, event: Event) -> Result<Vec<Event>, HandlerError> {
        let Event::DatasetSubmitted(submitted) = event else {
            return Err(HandlerError::malformed(
                "converter consumes dataset.submitted only",
            ));
        };
        let items = explode(&submitted).map_err(Self::classify)?;
        debug!(
            dataset_id = %submitted.dataset_id,
            file = %submitted.file_name,
            count = items.len(),
            "exploded legacy file"
        );
        Ok(items.into_iter().map(Event::ItemSubmitted).collect())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
