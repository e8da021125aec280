//! Failure-log ranking for `/analyze-fixed-dataset`.
//!
//! Counts rows by family, test code and process, keeps the top five of each,
//! and cross-tabulates test codes for the top families.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::analysis::color::random_color;
use crate::error::AnalysisError;

const TOP_N: usize = 5;

const NO_FAMILY: &str = "No Family";
const NO_TEST_CODE: &str = "No TestCode";
const NO_PROCESS: &str = "No Process";

/// Required columns, in the order they are checked.
const TRACK_ID: &str = "TrackID";
const FAMILY: &str = "Family";
const TEST_CODE: &str = "TestCode";
const PROCESS: &str = "Process";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FailureAnalysis {
    /// Data rows, header excluded.
    pub total_records: usize,
    pub top_families: CategoryChart,
    pub top_test_codes: CategoryChart,
    pub top_processes: CategoryChart,
    pub test_codes_by_family: GroupedChart,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryChart {
    pub title: String,
    pub chart_type: String,
    pub labels: Vec<String>,
    pub data: Vec<u64>,
}

/// Grouped bars: one dataset per test code, one value per top family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupedChart {
    pub families: Vec<String>,
    pub datasets: Vec<GroupedDataset>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupedDataset {
    pub label: String,
    pub data: Vec<u64>,
    pub color: String,
    pub border_color: String,
}

/// Counts in first-seen order.
#[derive(Debug, Default)]
struct Tally {
    index: HashMap<String, usize>,
    counts: Vec<(String, u64)>,
}

impl Tally {
    fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.counts.len());
                self.counts.push((key.to_string(), 1));
            }
        }
    }

    /// Highest counts first; equal counts keep first-seen order.
    fn top(mut self, n: usize) -> Vec<(String, u64)> {
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        self.counts.truncate(n);
        self.counts
    }
}

struct Columns {
    family: usize,
    test_code: usize,
    process: usize,
}

fn find_column(headers: &[String], name: &'static str) -> Result<usize, AnalysisError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or(AnalysisError::MissingColumn(name))
}

fn locate_columns(headers: &[String]) -> Result<Columns, AnalysisError> {
    find_column(headers, TRACK_ID)?;
    Ok(Columns {
        family: find_column(headers, FAMILY)?,
        test_code: find_column(headers, TEST_CODE)?,
        process: find_column(headers, PROCESS)?,
    })
}

/// Value at `index`, the placeholder when blank, `None` when the row is too short.
fn bucket<'a>(row: &'a [String], index: usize, blank: &'a str) -> Option<&'a str> {
    row.get(index)
        .map(|v| if v.is_empty() { blank } else { v.as_str() })
}

fn category_chart(title: &str, chart_type: &str, top: Vec<(String, u64)>) -> CategoryChart {
    let (labels, data) = top.into_iter().unzip();
    CategoryChart {
        title: title.to_string(),
        chart_type: chart_type.to_string(),
        labels,
        data,
    }
}

pub fn analyze_failures<R: Rng + ?Sized>(
    values: &[Vec<String>],
    rng: &mut R,
) -> Result<FailureAnalysis, AnalysisError> {
    let Some((headers, rows)) = values.split_first().filter(|(_, rows)| !rows.is_empty()) else {
        return Err(AnalysisError::InsufficientRows);
    };
    let cols = locate_columns(headers)?;
    tracing::debug!(
        family = cols.family,
        test_code = cols.test_code,
        process = cols.process,
        "Located failure columns"
    );

    let mut families = Tally::default();
    let mut test_codes = Tally::default();
    let mut processes = Tally::default();
    for row in rows {
        if let Some(family) = bucket(row, cols.family, NO_FAMILY) {
            families.add(family);
        }
        if let Some(code) = bucket(row, cols.test_code, NO_TEST_CODE) {
            test_codes.add(code);
        }
        if let Some(process) = bucket(row, cols.process, NO_PROCESS) {
            processes.add(process);
        }
    }

    let top_families = families.top(TOP_N);

    // Test-code tallies for each top family.
    let mut per_family: Vec<(String, Tally)> = top_families
        .iter()
        .map(|(family, _)| (family.clone(), Tally::default()))
        .collect();
    for row in rows {
        let (Some(family), Some(code)) = (
            bucket(row, cols.family, NO_FAMILY),
            bucket(row, cols.test_code, NO_TEST_CODE),
        ) else {
            continue;
        };
        if let Some((_, tally)) = per_family.iter_mut().find(|(f, _)| f == family) {
            tally.add(code);
        }
    }
    let per_family: Vec<(String, Vec<(String, u64)>)> = per_family
        .into_iter()
        .map(|(family, tally)| (family, tally.top(TOP_N)))
        .collect();

    let mut grouped_codes: Vec<&str> = Vec::new();
    for (_, top_codes) in &per_family {
        for (code, _) in top_codes {
            if !grouped_codes.contains(&code.as_str()) {
                grouped_codes.push(code);
            }
        }
    }

    let datasets = grouped_codes
        .iter()
        .map(|code| {
            let color = random_color(rng);
            GroupedDataset {
                label: code.to_string(),
                data: per_family
                    .iter()
                    .map(|(_, top_codes)| {
                        top_codes
                            .iter()
                            .find(|(c, _)| c == code)
                            .map_or(0, |(_, n)| *n)
                    })
                    .collect(),
                color: color.fill,
                border_color: color.border,
            }
        })
        .collect();

    Ok(FailureAnalysis {
        total_records: rows.len(),
        top_families: category_chart("Top 5 Families by Failure Count", "bar", top_families),
        top_test_codes: category_chart(
            "Top 5 Most Frequent TestCodes",
            "pie",
            test_codes.top(TOP_N),
        ),
        top_processes: category_chart(
            "Top 5 Processes by Failure Count",
            "line",
            processes.top(TOP_N),
        ),
        test_codes_by_family: GroupedChart {
            families: per_family.iter().map(|(family, _)| family.clone()).collect(),
            datasets,
        },
    })
}
