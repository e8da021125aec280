//! Query planner: subject + optional date range → IMAP search criteria.

use std::fmt;

use chrono::{Days, NaiveDate};

use crate::error::ParseError;

/// Date format IMAP uses for SINCE/BEFORE (`01-Jan-2024`).
pub const IMAP_DATE_FORMAT: &str = "%d-%b-%Y";

/// Request-side date format (`2024-01-31`).
pub const INPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// What to search for. At least one field is always set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub subject: Option<String>,
    /// Inclusive lower bound.
    pub since: Option<NaiveDate>,
    /// Exclusive upper bound: the day after the requested end date.
    pub before: Option<NaiveDate>,
}

/// Criteria plus any non-fatal problems found while building them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSearch {
    pub criteria: SearchCriteria,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("no search criteria")]
    NoCriteria,
}

/// Build search criteria from raw request values.
///
/// Malformed dates are dropped with a warning. The search is rejected only
/// when nothing usable remains. `date_to` is shifted one day forward since
/// IMAP `BEFORE` excludes the day it names.
pub fn build_criteria(
    subject: Option<&str>,
    date_from: Option<&str>,
    date_to: Option<&str>,
) -> Result<PlannedSearch, Rejected> {
    let mut warnings = Vec::new();

    let subject = subject
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let since = accept_bound(parse_bound("from", date_from), &mut warnings);
    let before = accept_bound(parse_bound("to", date_to), &mut warnings)
        .and_then(|d| d.checked_add_days(Days::new(1)));

    if subject.is_none() && since.is_none() && before.is_none() {
        return Err(Rejected::NoCriteria);
    }

    Ok(PlannedSearch {
        criteria: SearchCriteria {
            subject,
            since,
            before,
        },
        warnings,
    })
}

/// Parse an optional `YYYY-MM-DD` bound. Blank input counts as absent.
pub fn parse_bound(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ParseError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, INPUT_DATE_FORMAT)
        .map(Some)
        .map_err(|_| ParseError::InvalidCalendarDate {
            field: field.to_string(),
            input: raw.to_string(),
        })
}

fn accept_bound(
    parsed: Result<Option<NaiveDate>, ParseError>,
    warnings: &mut Vec<String>,
) -> Option<NaiveDate> {
    match parsed {
        Ok(date) => date,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed date bound");
            warnings.push(format!("{e}; the bound was ignored"));
            None
        }
    }
}

/// Quote a string as an IMAP quoted-string.
pub(crate) fn quote_imap_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

impl SearchCriteria {
    /// Date keys in IMAP syntax, e.g. `["SINCE 01-Jan-2024", "BEFORE 02-Feb-2024"]`.
    pub(crate) fn date_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(since) = self.since {
            keys.push(format!("SINCE {}", since.format(IMAP_DATE_FORMAT)));
        }
        if let Some(before) = self.before {
            keys.push(format!("BEFORE {}", before.format(IMAP_DATE_FORMAT)));
        }
        keys
    }
}

/// Renders the search in IMAP syntax: `SUBJECT "x" SINCE 01-Jan-2024 BEFORE 02-Jan-2024`.
impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = Vec::new();
        if let Some(subject) = &self.subject {
            keys.push(format!("SUBJECT {}", quote_imap_string(subject)));
        }
        keys.extend(self.date_keys());
        f.write_str(&keys.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn subject_only() {
        let planned = build_criteria(Some("Invoice"), None, None).unwrap();
        assert_eq!(planned.criteria.subject.as_deref(), Some("Invoice"));
        assert_eq!(planned.criteria.since, None);
        assert_eq!(planned.criteria.before, None);
        assert!(planned.warnings.is_empty());
        assert_eq!(planned.criteria.to_string(), "SUBJECT \"Invoice\"");
    }

    #[test]
    fn rejected_without_subject_or_dates() {
        assert_eq!(build_criteria(None, None, None), Err(Rejected::NoCriteria));
        assert_eq!(build_criteria(Some("   "), None, None), Err(Rejected::NoCriteria));
        assert_eq!(build_criteria(Some(""), Some(""), Some("")), Err(Rejected::NoCriteria));
    }

    #[test]
    fn dates_alone_are_enough() {
        let planned = build_criteria(None, Some("2024-03-01"), None).unwrap();
        assert_eq!(planned.criteria.since, Some(date(2024, 3, 1)));

        let planned = build_criteria(None, None, Some("2024-03-01")).unwrap();
        assert_eq!(planned.criteria.before, Some(date(2024, 3, 2)));
    }

    #[test]
    fn upper_bound_is_one_day_past_requested_date() {
        let planned = build_criteria(Some("Report"), Some("2024-01-31"), Some("2024-02-29")).unwrap();
        assert_eq!(planned.criteria.since, Some(date(2024, 1, 31)));
        assert_eq!(planned.criteria.before, Some(date(2024, 3, 1)));
        assert_eq!(
            planned.criteria.to_string(),
            "SUBJECT \"Report\" SINCE 31-Jan-2024 BEFORE 01-Mar-2024"
        );
    }

    #[test]
    fn upper_bound_crosses_year_end() {
        let planned = build_criteria(Some("x"), None, Some("2023-12-31")).unwrap();
        assert_eq!(planned.criteria.before, Some(date(2024, 1, 1)));
    }

    #[test]
    fn malformed_dates_are_dropped_with_warnings() {
        let planned = build_criteria(Some("Invoice"), Some("31/01/2024"), Some("2024-13-01")).unwrap();
        assert_eq!(planned.criteria.since, None);
        assert_eq!(planned.criteria.before, None);
        assert_eq!(planned.warnings.len(), 2);
        assert!(planned.warnings[0].contains("31/01/2024"));
    }

    #[test]
    fn malformed_date_keeps_the_other_bound() {
        let planned = build_criteria(None, Some("yesterday"), Some("2024-05-10")).unwrap();
        assert_eq!(planned.criteria.since, None);
        assert_eq!(planned.criteria.before, Some(date(2024, 5, 11)));
        assert_eq!(planned.warnings.len(), 1);
    }

    #[test]
    fn only_malformed_dates_is_rejected() {
        assert_eq!(
            build_criteria(None, Some("nope"), Some("2024-02-30")),
            Err(Rejected::NoCriteria)
        );
    }

    #[test]
    fn subject_quotes_are_escaped() {
        let planned = build_criteria(Some(r#"Re: "Q3" \ plan"#), None, None).unwrap();
        assert_eq!(
            planned.criteria.to_string(),
            r#"SUBJECT "Re: \"Q3\" \\ plan""#
        );
    }

    #[test]
    fn subject_is_trimmed() {
        let planned = build_criteria(Some("  Invoice  "), None, None).unwrap();
        assert_eq!(planned.criteria.subject.as_deref(), Some("Invoice"));
    }

    #[test]
    fn parse_bound_reports_field() {
        let err = parse_bound("from", Some("2024/01/01")).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidCalendarDate {
                field: "from".into(),
                input: "2024/01/01".into()
            }
        );
        assert_eq!(parse_bound("from", Some("  ")), Ok(None));
    }
}
