//! Year and crop aggregation.
//!
//! This module turns the raw dataset into the two derived tables: the
//! crops with the largest and smallest production in each year, and the
//! average yield and cultivation area of each crop.

use crate::models::{CropAverageRow, CropRecord, ParseStats, RawRecord, RowOrder, YearExtremeRow};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// One row per distinct year key.
    pub year_rows: Vec<YearExtremeRow>,
    /// One row per distinct crop name.
    pub crop_rows: Vec<CropAverageRow>,
    /// Number of distinct countries seen.
    pub country_count: usize,
    /// Lenient-input substitutions made while ingesting.
    pub parse_stats: ParseStats,
}

#[cfg(test)]
impl Aggregation {
    /// Look up the extremes row for a year key.
    pub fn year(&self, year: &str) -> Option<&YearExtremeRow> {
        self.year_rows.iter().find(|row| row.year == year)
    }

    /// Look up the averages row for a crop name.
    pub fn crop(&self, crop: &str) -> Option<&CropAverageRow> {
        self.crop_rows.iter().find(|row| row.crop == crop)
    }
}

/// Map keyed by string that remembers the order keys were first inserted.
struct OrderedGroups<A> {
    index: HashMap<String, usize>,
    entries: Vec<(String, A)>,
}

impl<A> OrderedGroups<A> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry_or_insert_with(&mut self, key: &str, init: impl FnOnce() -> A) -> &mut A {
        let position = match self.index.get(key) {
            Some(&position) => position,
            None => {
                self.entries.push((key.to_string(), init()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        &mut self.entries[position].1
    }

    fn into_entries(self) -> Vec<(String, A)> {
        self.entries
    }
}

/// Running max/min production holders for one year.
///
/// Holders move only on a strictly larger or smaller value, so the
/// earliest record wins ties.
struct ProductionExtremes {
    max_crop: String,
    max_production: f64,
    min_crop: String,
    min_production: f64,
}

impl ProductionExtremes {
    fn new(record: &CropRecord) -> Self {
        Self {
            max_crop: record.crop.clone(),
            max_production: record.production,
            min_crop: record.crop.clone(),
            min_production: record.production,
        }
    }

    fn observe(&mut self, record: &CropRecord) {
        if record.production > self.max_production {
            self.max_production = record.production;
            self.max_crop.clone_from(&record.crop);
        }
        if record.production < self.min_production {
            self.min_production = record.production;
            self.min_crop.clone_from(&record.crop);
        }
    }
}

#[derive(Default)]
struct CropTotals {
    sum_yield: f64,
    sum_area: f64,
    count: usize,
}

impl CropTotals {
    fn add(&mut self, record: &CropRecord) {
        self.sum_yield += record.yield_kg_per_ha;
        self.sum_area += record.area_ha;
        self.count += 1;
    }

    // count is at least 1: totals are only created for a record being added.
    fn averages(&self) -> (f64, f64) {
        let count = self.count as f64;
        (self.sum_yield / count, self.sum_area / count)
    }
}

/// Aggregate the dataset into per-year extremes and per-crop averages.
///
/// Never fails: unparseable numbers count as zero and records without a
/// 4-digit year are grouped under the empty year key.
pub fn aggregate(records: &[RawRecord], order: RowOrder) -> Aggregation {
    let mut years: OrderedGroups<ProductionExtremes> = OrderedGroups::new();
    let mut crops: OrderedGroups<CropTotals> = OrderedGroups::new();
    let mut countries: HashSet<String> = HashSet::new();
    let mut parse_stats = ParseStats::default();

    for raw in records {
        let (record, fallbacks) = CropRecord::from_raw(raw);
        if fallbacks.any() {
            trace!(
                "Numeric fallback for {} ({}): {:?}",
                record.crop,
                raw.year_text,
                fallbacks
            );
        }
        parse_stats.record(&record, fallbacks);
        if !countries.contains(&record.country) {
            countries.insert(record.country.clone());
        }

        years
            .entry_or_insert_with(&record.year, || ProductionExtremes::new(&record))
            .observe(&record);
        crops
            .entry_or_insert_with(&record.crop, CropTotals::default)
            .add(&record);
    }

    let mut year_rows: Vec<YearExtremeRow> = years
        .into_entries()
        .into_iter()
        .map(|(year, extremes)| YearExtremeRow {
            year,
            max_production_crop: extremes.max_crop,
            min_production_crop: extremes.min_crop,
        })
        .collect();

    let mut crop_rows: Vec<CropAverageRow> = crops
        .into_entries()
        .into_iter()
        .map(|(crop, totals)| {
            let (average_yield, average_area) = totals.averages();
            CropAverageRow {
                crop,
                average_yield,
                average_area,
            }
        })
        .collect();

    if order == RowOrder::Sorted {
        // Records without a year sort after every dated group.
        year_rows.sort_by(|a, b| {
            a.year
                .is_empty()
                .cmp(&b.year.is_empty())
                .then_with(|| a.year.cmp(&b.year))
        });
        crop_rows.sort_by(|a, b| a.crop.cmp(&b.crop));
    }

    debug!(
        "Aggregated {} records into {} years and {} crops ({} numeric fallbacks)",
        parse_stats.records,
        year_rows.len(),
        crop_rows.len(),
        parse_stats.total_fallbacks()
    );

    Aggregation {
        year_rows,
        crop_rows,
        country_count: countries.len(),
        parse_stats,
    }
}
