//! Spreadsheet analysis records and the tagged union the assistant consumes.

pub mod chart;
pub mod color;
pub mod failures;

pub use chart::{ChartAnalysis, ChartDataset, analyze_sheet, parse_cell};
pub use failures::{CategoryChart, FailureAnalysis, GroupedChart, GroupedDataset, analyze_failures};

use serde::{Deserialize, Serialize};

/// A mail thread report, as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailReport {
    pub subject: String,
    pub content: String,
}

/// Any analysis the front-end can hand back to `/assistant-query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisData {
    EmailReport(EmailReport),
    SheetAnalysis(ChartAnalysis),
    FailureAnalysis(FailureAnalysis),
}
