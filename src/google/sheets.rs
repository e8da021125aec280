//! Sheets values reader.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GoogleApiError;

/// Reads a rectangular range as rows of display strings.
#[async_trait]
pub trait SheetReader: Send + Sync {
    /// Rows in sheet order. Trailing empty cells are absent, so rows may be ragged.
    async fn read_range(
        &self,
        sheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, GoogleApiError>;
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl ValueRange {
    pub(crate) fn into_rows(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect()
    }
}

fn cell_text(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn values_become_strings() {
        let range: ValueRange = serde_json::from_value(json!({
            "range": "Import!A1:C3",
            "majorDimension": "ROWS",
            "values": [["TrackID", "Family"], ["1", 2.5, true], [null]]
        }))
        .unwrap();
        assert_eq!(
            range.into_rows(),
            vec![
                vec!["TrackID".to_string(), "Family".to_string()],
                vec!["1".to_string(), "2.5".to_string(), "true".to_string()],
                vec![String::new()],
            ]
        );
    }

    #[test]
    fn empty_range_has_no_values_key() {
        let range: ValueRange =
            serde_json::from_value(json!({"range": "A1:B2", "majorDimension": "ROWS"})).unwrap();
        assert!(range.into_rows().is_empty());
    }
}
