//! Data models for the crop statistics pipeline.
//!
//! This module contains the record shapes read from the dataset, the
//! ingested form the aggregator works on, and the derived table rows
//! handed to the report generator.

use crate::analysis::{extract_year, parse_numeric};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// One row of the source dataset, exactly as published.
///
/// Every field is text. Missing keys and `null` become the empty string,
/// JSON numbers become their textual form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Country", default, deserialize_with = "lenient_text")]
    pub country: String,
    #[serde(rename = "Year", default, deserialize_with = "lenient_text")]
    pub year_text: String,
    #[serde(rename = "Crop Name", default, deserialize_with = "lenient_text")]
    pub crop_name: String,
    #[serde(
        rename = "Crop Production (UOM:t(Tonnes))",
        default,
        deserialize_with = "lenient_text"
    )]
    pub production_text: String,
    #[serde(
        rename = "Yield Of Crops (UOM:Kg/Ha(KilogramperHectare))",
        default,
        deserialize_with = "lenient_text"
    )]
    pub yield_text: String,
    #[serde(
        rename = "Area Under Cultivation (UOM:Ha(Hectares))",
        default,
        deserialize_with = "lenient_text"
    )]
    pub area_text: String,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    })
}

/// Which numeric columns of a record fell back to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFallbacks {
    pub production: bool,
    pub yield_value: bool,
    pub area: bool,
}

impl FieldFallbacks {
    /// Returns true if any numeric column fell back.
    pub fn any(&self) -> bool {
        self.production || self.yield_value || self.area
    }
}

/// A record after ingestion: year key extracted and numbers parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CropRecord {
    pub country: String,
    /// First 4-digit run of the year text, or empty.
    pub year: String,
    pub crop: String,
    /// Tonnes.
    pub production: f64,
    /// Kilograms per hectare.
    pub yield_kg_per_ha: f64,
    /// Hectares.
    pub area_ha: f64,
}

impl CropRecord {
    /// Ingest a raw record, reporting which numeric fields fell back to zero.
    pub fn from_raw(raw: &RawRecord) -> (Self, FieldFallbacks) {
        let production = parse_numeric(&raw.production_text);
        let yield_value = parse_numeric(&raw.yield_text);
        let area = parse_numeric(&raw.area_text);

        let fallbacks = FieldFallbacks {
            production: production.is_none(),
            yield_value: yield_value.is_none(),
            area: area.is_none(),
        };

        let record = Self {
            country: raw.country.clone(),
            year: extract_year(&raw.year_text).to_string(),
            crop: raw.crop_name.clone(),
            production: production.unwrap_or(0.0),
            yield_kg_per_ha: yield_value.unwrap_or(0.0),
            area_ha: area.unwrap_or(0.0),
        };

        (record, fallbacks)
    }
}

impl From<&RawRecord> for CropRecord {
    fn from(raw: &RawRecord) -> Self {
        Self::from_raw(raw).0
    }
}

/// Counts of lenient-input substitutions made during ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Records ingested.
    pub records: usize,
    /// Records whose production text was not a finite number.
    pub production_fallbacks: usize,
    /// Records whose yield text was not a finite number.
    pub yield_fallbacks: usize,
    /// Records whose area text was not a finite number.
    pub area_fallbacks: usize,
    /// Records whose year text had no 4-digit run.
    pub missing_years: usize,
}

impl ParseStats {
    /// Account for one ingested record.
    pub fn record(&mut self, record: &CropRecord, fallbacks: FieldFallbacks) {
        self.records += 1;
        self.production_fallbacks += usize::from(fallbacks.production);
        self.yield_fallbacks += usize::from(fallbacks.yield_value);
        self.area_fallbacks += usize::from(fallbacks.area);
        self.missing_years += usize::from(record.year.is_empty());
    }

    /// Total numeric fields substituted with zero.
    pub fn total_fallbacks(&self) -> usize {
        self.production_fallbacks + self.yield_fallbacks + self.area_fallbacks
    }
}

/// Crops with the largest and smallest production in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearExtremeRow {
    /// Year key, empty when the source text carried no year.
    pub year: String,
    pub max_production_crop: String,
    pub min_production_crop: String,
}

/// Long-run averages for one crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropAverageRow {
    pub crop: String,
    /// Kilograms per hectare.
    pub average_yield: f64,
    /// Hectares.
    pub average_area: f64,
}

/// Order in which derived rows are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowOrder {
    /// Order in which each key was first encountered in the dataset.
    #[default]
    FirstSeen,
    /// Ascending by year key / crop name; the empty year key goes last.
    Sorted,
}

impl fmt::Display for RowOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOrder::FirstSeen => write!(f, "first-seen"),
            RowOrder::Sorted => write!(f, "sorted"),
        }
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the dataset was loaded from.
    pub source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of records aggregated.
    pub record_count: usize,
    /// Number of distinct year keys.
    pub year_count: usize,
    /// Number of distinct crop names.
    pub crop_count: usize,
    /// Number of distinct countries.
    pub country_count: usize,
    /// Row ordering used for both tables.
    pub order: RowOrder,
    /// Lenient-input substitutions made while ingesting.
    pub parse_stats: ParseStats,
}

/// The complete crop statistics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Table 1: production extremes per year.
    pub year_rows: Vec<YearExtremeRow>,
    /// Table 2: averages per crop.
    pub crop_rows: Vec<CropAverageRow>,
}
