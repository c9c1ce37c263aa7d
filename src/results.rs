//! Paginated result retrieval and conversion into the host's row format.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;

use crate::client::AthenaApi;
use crate::error::ConnectorError;
use crate::execution::QueryExecutionId;
use crate::options::DateHandling;
use crate::types::{ColumnType, EvidenceType, TypeFidelity, map_athena_type_to_evidence_type};

/// Column metadata as reported by Athena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub native_type: String,
}

/// One page of results from GetQueryResults.
#[derive(Debug, Clone, Default)]
pub struct ResultsPage {
    /// Raw rows; every value arrives as an optional string.
    pub rows: Vec<Vec<Option<String>>>,
    /// Column metadata. Athena sends it on every page but only the first
    /// page's copy is kept.
    pub columns: Option<Vec<RawColumn>>,
    /// Continuation token for the next page, if any remain.
    pub next_token: Option<String>,
}

/// All pages of a completed execution, header row still included.
#[derive(Debug, Clone, Default)]
pub struct RawResultSet {
    pub rows: Vec<Vec<Option<String>>>,
    pub columns: Vec<RawColumn>,
}

/// A single cell in a formatted row. Athena delivers every value as a
/// string; values in DATE-typed columns are reified into real timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Text(String),
    Date(NaiveDateTime),
}

/// The contract returned to the host framework for one query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedOutput {
    pub rows: Vec<HashMap<String, CellValue>>,
    pub column_types: Vec<ColumnType>,
    pub expected_row_count: usize,
}

/// Fetch every page of results for a completed execution.
///
/// Rows accumulate in memory; this connector exposes the simple non-streaming
/// interface, so memory use grows linearly with result size.
pub async fn fetch_all_pages(api: &dyn AthenaApi, id: &QueryExecutionId) -> Result<RawResultSet> {
    let mut accumulated = RawResultSet::default();
    let mut next_token = None;
    let mut first_page = true;

    loop {
        let page = api.results_page(id, next_token).await?;

        if first_page {
            // Metadata is invariant across pages; capture it once and
            // never re-derive it.
            accumulated.columns = page.columns.unwrap_or_default();
            first_page = false;
        }
        accumulated.rows.extend(page.rows);

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    tracing::debug!(
        execution_id = %id,
        raw_rows = accumulated.rows.len(),
        columns = accumulated.columns.len(),
        "fetched all result pages"
    );
    Ok(accumulated)
}

/// Convert a raw result set into the host's mapping-per-row representation.
///
/// The first raw row echoes the column headers and is dropped. Each
/// remaining row becomes a column-name-to-value mapping by position, with
/// DATE-typed values parsed into timestamps. Column ordering in the output
/// descriptors matches the positional ordering of values in each raw row.
pub fn format_results(raw: RawResultSet, date_handling: DateHandling) -> Result<MappedOutput> {
    let column_types: Vec<ColumnType> = raw
        .columns
        .iter()
        .map(|column| ColumnType {
            name: column.name.clone(),
            evidence_type: map_athena_type_to_evidence_type(&column.native_type),
            type_fidelity: TypeFidelity::Precise,
        })
        .collect();

    let mut rows = Vec::with_capacity(raw.rows.len().saturating_sub(1));
    for raw_row in raw.rows.into_iter().skip(1) {
        let mut row = HashMap::with_capacity(column_types.len());
        for (column, value) in column_types.iter().zip(raw_row) {
            let cell = match value {
                None => CellValue::Null,
                Some(text) if column.evidence_type == EvidenceType::Date => {
                    reify_date(&column.name, text, date_handling)?
                }
                Some(text) => CellValue::Text(text),
            };
            row.insert(column.name.clone(), cell);
        }
        rows.push(row);
    }

    let expected_row_count = rows.len();
    Ok(MappedOutput {
        rows,
        column_types,
        expected_row_count,
    })
}

/// Parse the two value shapes Athena emits for date/timestamp columns.
fn parse_athena_date(text: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(parsed);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn reify_date(column: &str, text: String, date_handling: DateHandling) -> Result<CellValue> {
    match parse_athena_date(&text) {
        Some(parsed) => Ok(CellValue::Date(parsed)),
        None => match date_handling {
            DateHandling::Lenient => {
                tracing::warn!(
                    column,
                    value = %text,
                    "value in DATE-typed column is not a valid date; passing it through unparsed"
                );
                Ok(CellValue::Text(text))
            }
            DateHandling::Strict => Err(ConnectorError::InvalidDate {
                column: column.to_string(),
                value: text,
            }
            .into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::stub::StubAthena;

    fn raw_set(columns: Vec<(&str, &str)>, rows: Vec<Vec<Option<&str>>>) -> RawResultSet {
        RawResultSet {
            columns: columns
                .into_iter()
                .map(|(name, native_type)| RawColumn {
                    name: name.to_string(),
                    native_type: native_type.to_string(),
                })
                .collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|v| v.map(str::to_string)).collect())
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_two_page_fetch_accumulates_all_rows() {
        let api = StubAthena::with_pages(vec![
            ResultsPage {
                rows: vec![
                    vec![Some("id".to_string())],
                    vec![Some("1".to_string())],
                    vec![Some("2".to_string())],
                ],
                columns: Some(vec![RawColumn {
                    name: "id".to_string(),
                    native_type: "bigint".to_string(),
                }]),
                next_token: Some("t2".to_string()),
            },
            ResultsPage {
                rows: vec![vec![Some("3".to_string())], vec![Some("4".to_string())]],
                columns: Some(vec![RawColumn {
                    name: "id".to_string(),
                    native_type: "varchar".to_string(),
                }]),
                next_token: None,
            },
        ]);

        let id = QueryExecutionId::new("exec-1");
        let raw = fetch_all_pages(&api, &id).await.unwrap();

        assert_eq!(raw.rows.len(), 5);
        // Only the first page's metadata counts; the second page's
        // (deliberately different) copy is ignored.
        assert_eq!(raw.columns.len(), 1);
        assert_eq!(raw.columns[0].native_type, "bigint");
        // The second request carried the first page's continuation token.
        assert_eq!(api.seen_tokens(), vec![None, Some("t2".to_string())]);
    }

    #[test]
    fn test_header_row_is_dropped_and_count_reported() {
        let raw = raw_set(
            vec![("id", "int"), ("name", "varchar")],
            vec![
                vec![Some("id"), Some("name")],
                vec![Some("1"), Some("alpha")],
                vec![Some("2"), Some("beta")],
                vec![Some("3"), None],
            ],
        );

        let output = format_results(raw, DateHandling::Lenient).unwrap();
        assert_eq!(output.rows.len(), 3);
        assert_eq!(output.expected_row_count, 3);
        assert_eq!(
            output.rows[0].get("name"),
            Some(&CellValue::Text("alpha".to_string()))
        );
        assert_eq!(output.rows[2].get("name"), Some(&CellValue::Null));
    }

    #[test]
    fn test_column_types_follow_metadata_order() {
        let raw = raw_set(
            vec![("b", "boolean"), ("a", "bigint"), ("c", "timestamp")],
            vec![vec![Some("b"), Some("a"), Some("c")]],
        );

        let output = format_results(raw, DateHandling::Lenient).unwrap();
        let names: Vec<&str> = output
            .column_types
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(output.column_types[0].evidence_type, EvidenceType::Boolean);
        assert_eq!(output.column_types[1].evidence_type, EvidenceType::Number);
        assert_eq!(output.column_types[2].evidence_type, EvidenceType::Date);
        assert!(
            output
                .column_types
                .iter()
                .all(|c| c.type_fidelity == TypeFidelity::Precise)
        );
    }

    #[test]
    fn test_date_values_are_reified() {
        let raw = raw_set(
            vec![("day", "date"), ("label", "varchar")],
            vec![
                vec![Some("day"), Some("label")],
                vec![Some("2024-01-15"), Some("mid-january")],
            ],
        );

        let output = format_results(raw, DateHandling::Lenient).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(output.rows[0].get("day"), Some(&CellValue::Date(expected)));
        // Non-date columns keep their original string values.
        assert_eq!(
            output.rows[0].get("label"),
            Some(&CellValue::Text("mid-january".to_string()))
        );
    }

    #[test]
    fn test_timestamp_values_parse_with_fraction() {
        let raw = raw_set(
            vec![("at", "timestamp")],
            vec![vec![Some("at")], vec![Some("2024-01-15 08:30:00.123")]],
        );

        let output = format_results(raw, DateHandling::Lenient).unwrap();
        match output.rows[0].get("at") {
            Some(CellValue::Date(at)) => {
                assert_eq!(at.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
            }
            other => panic!("expected reified timestamp, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_date_lenient_keeps_string() {
        let raw = raw_set(
            vec![("day", "date")],
            vec![vec![Some("day")], vec![Some("not-a-date")]],
        );

        let output = format_results(raw, DateHandling::Lenient).unwrap();
        assert_eq!(
            output.rows[0].get("day"),
            Some(&CellValue::Text("not-a-date".to_string()))
        );
    }

    #[test]
    fn test_malformed_date_strict_fails_query() {
        let raw = raw_set(
            vec![("day", "date")],
            vec![vec![Some("day")], vec![Some("not-a-date")]],
        );

        let err = format_results(raw, DateHandling::Strict).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConnectorError>(),
            Some(ConnectorError::InvalidDate { column, .. }) if column == "day"
        ));
    }

    #[test]
    fn test_empty_result_set() {
        let raw = raw_set(vec![("id", "int")], vec![vec![Some("id")]]);
        let output = format_results(raw, DateHandling::Lenient).unwrap();
        assert!(output.rows.is_empty());
        assert_eq!(output.expected_row_count, 0);
        assert_eq!(output.column_types.len(), 1);
    }
}
