//! Generic sheet → chart shaping for `/analyze-sheet`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::analysis::color::random_color;
use crate::error::AnalysisError;

pub const DEFAULT_CHART_TYPE: &str = "bar";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartAnalysis {
    pub title: String,
    pub chart_type: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
    /// Filled by the handler once the model answers; empty when disabled.
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
    pub color: String,
    pub border_color: String,
}

/// Shape a values grid into one dataset per header column.
///
/// Row 0 holds the headers; column 0 of every later row is its label. Rows
/// with no cells at all are skipped. Cells that are not plain non-negative
/// decimals count as 0.
pub fn analyze_sheet<R: Rng + ?Sized>(
    values: &[Vec<String>],
    range: &str,
    rng: &mut R,
) -> Result<ChartAnalysis, AnalysisError> {
    let Some((header_row, rows)) = values.split_first() else {
        return Err(AnalysisError::NoData);
    };
    let rows: Vec<&Vec<String>> = rows.iter().filter(|row| !row.is_empty()).collect();
    if rows.is_empty() {
        return Err(AnalysisError::NoData);
    }

    let headers = header_row.get(1..).unwrap_or_default();
    let labels = rows.iter().map(|row| row[0].clone()).collect();

    let datasets = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let color = random_color(rng);
            ChartDataset {
                label: header.clone(),
                data: rows
                    .iter()
                    .map(|row| row.get(i + 1).map_or(0.0, |cell| parse_cell(cell)))
                    .collect(),
                color: color.fill,
                border_color: color.border,
            }
        })
        .collect();

    Ok(ChartAnalysis {
        title: format!("Analysis of {range}"),
        chart_type: DEFAULT_CHART_TYPE.to_string(),
        labels,
        datasets,
        summary: String::new(),
    })
}

/// ASCII digits with at most one dot parse as a number; anything else is 0.
pub fn parse_cell(cell: &str) -> f64 {
    let digits = cell.chars().filter(char::is_ascii_digit).count();
    let dots = cell.chars().filter(|&c| c == '.').count();
    if digits == 0 || dots > 1 || digits + dots != cell.chars().count() {
        return 0.0;
    }
    cell.parse().unwrap_or(0.0)
}
