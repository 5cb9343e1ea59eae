//! Report generation.
//!
//! This module renders the two derived tables as Markdown, aligned plain
//! text, or JSON.

use crate::analysis::Aggregation;
use crate::cli::OutputFormat;
use crate::models::{CropAverageRow, ParseStats, Report, ReportMetadata, RowOrder, YearExtremeRow};
use anyhow::Result;
use chrono::Utc;

const TABLE1_TITLE: &str = "Table 1: Crop with Maximum and Minimum Production by Year";
const TABLE2_TITLE: &str = "Table 2: Average Yield and Cultivation Area of Crops";
const TABLE1_HEADERS: [&str; 3] = [
    "Year",
    "Crop with Maximum Production",
    "Crop with Minimum Production",
];
const TABLE2_HEADERS: [&str; 3] = [
    "Crop",
    "Average Yield (Kg/Ha)",
    "Average Cultivation Area (Ha)",
];

/// Assemble a report from an aggregation pass.
pub fn build_report(source: &str, aggregation: Aggregation, order: RowOrder) -> Report {
    let metadata = ReportMetadata {
        source: source.to_string(),
        generated_at: Utc::now(),
        record_count: aggregation.parse_stats.records,
        year_count: aggregation.year_rows.len(),
        crop_count: aggregation.crop_rows.len(),
        country_count: aggregation.country_count,
        order,
        parse_stats: aggregation.parse_stats,
    };

    Report {
        metadata,
        year_rows: aggregation.year_rows,
        crop_rows: aggregation.crop_rows,
    }
}

/// Render a report in the requested format.
pub fn render(report: &Report, format: OutputFormat, decimals: usize) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_markdown_report(report, decimals)),
        OutputFormat::Text => Ok(generate_text_report(report, decimals)),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Format an average with a fixed number of decimal places.
pub fn format_average(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

/// Earliest and latest non-empty year keys.
fn year_span(rows: &[YearExtremeRow]) -> Option<(&str, &str)> {
    let mut years = rows
        .iter()
        .map(|row| row.year.as_str())
        .filter(|year| !year.is_empty());
    let first = years.next()?;

    Some(years.fold((first, first), |(lo, hi), year| {
        (lo.min(year), hi.max(year))
    }))
}

fn table2_title(report: &Report) -> String {
    match year_span(&report.year_rows) {
        Some((first, last)) => format!("{} ({}-{})", TABLE2_TITLE, first, last),
        None => TABLE2_TITLE.to_string(),
    }
}

fn year_cells(row: &YearExtremeRow) -> Vec<String> {
    vec![
        row.year.clone(),
        row.max_production_crop.clone(),
        row.min_production_crop.clone(),
    ]
}

fn crop_cells(row: &CropAverageRow, decimals: usize) -> Vec<String> {
    vec![
        row.crop.clone(),
        format_average(row.average_yield, decimals),
        format_average(row.average_area, decimals),
    ]
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, decimals: usize) -> String {
    let mut output = String::new();

    output.push_str("# Crop Statistics Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str(&format!("## {}\n\n", TABLE1_TITLE));
    let year_rows: Vec<Vec<String>> = report.year_rows.iter().map(year_cells).collect();
    output.push_str(&markdown_table(&TABLE1_HEADERS, &year_rows, &[false, false, false]));

    output.push_str(&format!("## {}\n\n", table2_title(report)));
    let crop_rows: Vec<Vec<String>> = report
        .crop_rows
        .iter()
        .map(|row| crop_cells(row, decimals))
        .collect();
    output.push_str(&markdown_table(&TABLE2_HEADERS, &crop_rows, &[false, true, true]));

    output.push_str("---\n\n");
    output.push_str(&format!(
        "*Report generated by cropstats v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Records:** {}\n", metadata.record_count));
    section.push_str(&format!("- **Countries:** {}\n", metadata.country_count));
    section.push_str(&format!("- **Years:** {}\n", metadata.year_count));
    section.push_str(&format!("- **Crops:** {}\n", metadata.crop_count));
    section.push_str(&format!("- **Row Order:** {}\n", metadata.order));
    if let Some(line) = fallback_summary(&metadata.parse_stats) {
        section.push_str(&format!("- **Numeric Fallbacks:** {}\n", line));
    }
    if metadata.parse_stats.missing_years > 0 {
        section.push_str(&format!(
            "- **Records Without Year:** {}\n",
            metadata.parse_stats.missing_years
        ));
    }
    section.push('\n');

    section
}

/// Describe zero-substituted fields, or `None` when there were none.
pub fn fallback_summary(stats: &ParseStats) -> Option<String> {
    if stats.total_fallbacks() == 0 {
        return None;
    }

    Some(format!(
        "{} (production {}, yield {}, area {})",
        stats.total_fallbacks(),
        stats.production_fallbacks,
        stats.yield_fallbacks,
        stats.area_fallbacks
    ))
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn markdown_table(headers: &[&str], rows: &[Vec<String>], right_align: &[bool]) -> String {
    if rows.is_empty() {
        return "*No records.*\n\n".to_string();
    }

    let mut table = String::new();

    table.push_str(&format!("| {} |\n", headers.join(" | ")));
    let separators: Vec<&str> = right_align
        .iter()
        .map(|&right| if right { "---:" } else { ":---" })
        .collect();
    table.push_str(&format!("|{}|\n", separators.join("|")));

    for row in rows {
        let cells: Vec<String> = row.iter().map(|cell| escape_cell(cell)).collect();
        table.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    table.push('\n');

    table
}

/// Generate a plain-text report with aligned columns.
pub fn generate_text_report(report: &Report, decimals: usize) -> String {
    let mut output = String::new();

    output.push_str(TABLE1_TITLE);
    output.push_str("\n\n");
    let year_rows: Vec<Vec<String>> = report.year_rows.iter().map(year_cells).collect();
    output.push_str(&text_table(&TABLE1_HEADERS, &year_rows, &[false, false, false]));

    output.push('\n');
    output.push_str(&table2_title(report));
    output.push_str("\n\n");
    let crop_rows: Vec<Vec<String>> = report
        .crop_rows
        .iter()
        .map(|row| crop_cells(row, decimals))
        .collect();
    output.push_str(&text_table(&TABLE2_HEADERS, &crop_rows, &[false, true, true]));

    output
}

fn text_table(headers: &[&str], rows: &[Vec<String>], right_align: &[bool]) -> String {
    if rows.is_empty() {
        return "(no records)\n".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .zip(right_align)
            .map(|((cell, &width), &right)| {
                if right {
                    format!("{:>width$}", cell, width = width)
                } else {
                    format!("{:<width$}", cell, width = width)
                }
            })
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();

    let mut table = String::new();
    table.push_str(&format_line(header_cells.as_slice()));
    table.push_str(&format_line(rule.as_slice()));
    for row in rows {
        table.push_str(&format_line(row.as_slice()));
    }

    table
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::models::RawRecord;

    fn raw(year: &str, crop: &str, production: &str, yield_text: &str, area: &str) -> RawRecord {
        RawRecord {
            country: "India".to_string(),
            year_text: year.to_string(),
            crop_name: crop.to_string(),
            production_text: production.to_string(),
            yield_text: yield_text.to_string(),
            area_text: area.to_string(),
        }
    }

    fn create_test_report() -> Report {
        let records = vec![
            raw("Financial Year (Apr - Mar), 1950", "Wheat", "10", "100", "10"),
            raw("Financial Year (Apr - Mar), 1950", "Rice", "20", "200", "30"),
            raw("Financial Year (Apr - Mar), 2020", "Wheat", "5", "300", "20"),
            raw("N/A", "Oilseeds | total", "abc", "", ""),
        ];
        build_report("test.json", aggregate(&records, RowOrder::FirstSeen), RowOrder::FirstSeen)
    }

    #[test]
    fn test_build_report_metadata() {
        let report = create_test_report();

        assert_eq!(report.metadata.source, "test.json");
        assert_eq!(report.metadata.record_count, 4);
        assert_eq!(report.metadata.year_count, 3);
        assert_eq!(report.metadata.crop_count, 3);
        assert_eq!(report.metadata.country_count, 1);
        assert_eq!(report.metadata.parse_stats.production_fallbacks, 1);
    }

    #[test]
    fn test_format_average() {
        assert_eq!(format_average(150.0, 2), "150.00");
        assert_eq!(format_average(20.0 / 3.0, 2), "6.67");
        assert_eq!(format_average(1.5, 0), "2");
        assert_eq!(format_average(0.125, 3), "0.125");
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, 2);

        assert!(markdown.contains("# Crop Statistics Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains(&format!("## {}", TABLE1_TITLE)));
        assert!(markdown.contains(
            "| Year | Crop with Maximum Production | Crop with Minimum Production |"
        ));
        assert!(markdown.contains("| 1950 | Rice | Wheat |"));
        assert!(markdown.contains("| 2020 | Wheat | Wheat |"));
        assert!(markdown.contains("|  | Oilseeds \\| total | Oilseeds \\| total |"));
        assert!(markdown.contains(
            "## Table 2: Average Yield and Cultivation Area of Crops (1950-2020)"
        ));
        assert!(markdown.contains("| Wheat | 200.00 | 15.00 |"));
        assert!(markdown.contains("| Rice | 200.00 | 30.00 |"));
        assert!(markdown.contains("- **Numeric Fallbacks:** 3 (production 1, yield 1, area 1)"));
        assert!(markdown.contains("- **Records Without Year:** 1"));
    }

    #[test]
    fn test_markdown_empty_tables() {
        let report = build_report("empty.json", aggregate(&[], RowOrder::Sorted), RowOrder::Sorted);
        let markdown = generate_markdown_report(&report, 2);

        assert!(markdown.contains("*No records.*"));
        assert!(markdown.contains(&format!("## {}\n", TABLE2_TITLE)));
        assert!(!markdown.contains("Numeric Fallbacks"));
        assert!(markdown.contains("- **Row Order:** sorted"));
    }

    #[test]
    fn test_generate_text_report_aligns_columns() {
        let report = create_test_report();
        let text = generate_text_report(&report, 1);
        let lines: Vec<&str> = text.lines().collect();

        let header = lines
            .iter()
            .find(|l| l.starts_with("Crop  "))
            .expect("crop table header");
        let wheat = lines
            .iter()
            .find(|l| l.starts_with("Wheat "))
            .expect("wheat row");

        assert_eq!(header.len(), wheat.len());
        assert!(wheat.ends_with("15.0"));
        assert!(text.contains("(1950-2020)"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metadata"]["record_count"], 4);
        assert_eq!(value["year_rows"][0]["year"], "1950");
        assert_eq!(value["year_rows"][0]["max_production_crop"], "Rice");
        assert_eq!(value["crop_rows"][0]["crop"], "Wheat");
        assert_eq!(value["crop_rows"][0]["average_yield"], 200.0);
    }

    #[test]
    fn test_render_dispatches_on_format() {
        let report = create_test_report();

        let markdown = render(&report, OutputFormat::Markdown, 2).unwrap();
        assert!(markdown.starts_with("# Crop Statistics Report"));

        let text = render(&report, OutputFormat::Text, 2).unwrap();
        assert!(text.starts_with(TABLE1_TITLE));

        let json = render(&report, OutputFormat::Json, 2).unwrap();
        assert!(json.trim_start().starts_with('{'));
    }
}
