//! Lenient parsing of uploaded backlogs.
//!
//! Accepted shapes:
//! - `["Login page", "Checkout", ...]`
//! - `[{"problem": "Login page", "result": 5}, ...]`
//! - a results document `{"results": [...]}` as produced by `save_resultats`
//!   (older files use `resultats` / `probleme` / `difficulte`)
//! - any of the above as a JSON-encoded string
//!
//! Bad entries are skipped and counted; only an unreadable top level fails.

use super::export::RESULTS_SCHEMA_VERSION;
use crate::error::RoomError;
use crate::types::{ConcludedResult, VoteValue};
use serde_json::Value;

const LABEL_KEYS: &[&str] = &["problem", "probleme", "label", "title"];
const RESULT_KEYS: &[&str] = &["result", "difficulte"];
const LIST_KEYS: &[&str] = &["results", "resultats", "problems", "backlog"];

#[derive(Debug, Clone, PartialEq)]
pub struct BacklogEntry {
    pub label: String,
    /// Result carried over from a previous session, if any
    pub result: Option<ConcludedResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBacklog {
    pub entries: Vec<BacklogEntry>,
    pub skipped: usize,
}

pub fn parse_backlog(value: &Value) -> Result<ParsedBacklog, RoomError> {
    match value {
        Value::Array(items) => Ok(parse_entries(items)),
        Value::Object(map) => {
            if let Some(version) = map.get("schema_version").and_then(Value::as_u64) {
                if version > u64::from(RESULTS_SCHEMA_VERSION) {
                    return Err(RoomError::Validation(format!(
                        "Results schema version {} is newer than supported version {}",
                        version, RESULTS_SCHEMA_VERSION
                    )));
                }
            }
            LIST_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))
                .map(|items| parse_entries(items))
                .ok_or_else(|| {
                    RoomError::Validation("Backlog document has no list of problems".to_string())
                })
        }
        Value::String(raw) => {
            let inner: Value = serde_json::from_str(raw)
                .map_err(|e| RoomError::Validation(format!("Backlog is not valid JSON: {}", e)))?;
            if inner.is_string() {
                return Err(RoomError::Validation(
                    "Backlog must be a list of problems".to_string(),
                ));
            }
            parse_backlog(&inner)
        }
        _ => Err(RoomError::Validation(
            "Backlog must be a list of problems or a results document".to_string(),
        )),
    }
}

fn parse_entries(items: &[Value]) -> ParsedBacklog {
    let mut parsed = ParsedBacklog::default();
    for item in items {
        match parse_entry(item) {
            Some(entry) => parsed.entries.push(entry),
            None => {
                tracing::debug!("Skipping malformed backlog entry: {}", item);
                parsed.skipped += 1;
            }
        }
    }
    parsed
}

fn parse_entry(item: &Value) -> Option<BacklogEntry> {
    match item {
        Value::String(label) => non_empty(label).map(|label| BacklogEntry {
            label,
            result: None,
        }),
        Value::Object(map) => {
            let label = LABEL_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .and_then(non_empty)?;
            let result = RESULT_KEYS
                .iter()
                .find_map(|key| map.get(*key))
                .and_then(parse_result);
            Some(BacklogEntry { label, result })
        }
        _ => None,
    }
}

fn non_empty(label: &str) -> Option<String> {
    let label = label.trim();
    (!label.is_empty()).then(|| label.to_string())
}

fn parse_result(value: &Value) -> Option<ConcludedResult> {
    let value = match value {
        Value::Number(n) => VoteValue::Number(n.as_f64()?),
        Value::String(s) if !s.trim().is_empty() => VoteValue::Token(s.trim().to_string()),
        Value::Object(_) => return serde_json::from_value(value.clone()).ok(),
        _ => return None,
    };
    Some(ConcludedResult::Value { value, excluded: 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_label_list() {
        let parsed = parse_backlog(&json!(["Login", "  Checkout  ", "", 42, null])).unwrap();
        let labels: Vec<_> = parsed.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Login", "Checkout"]);
        assert_eq!(parsed.skipped, 3);
    }

    #[test]
    fn test_entries_with_results() {
        let parsed = parse_backlog(&json!([
            {"problem": "Login", "result": 5},
            {"probleme": "Search", "difficulte": "?"},
            {"label": "Cart", "result": null},
            {"result": 3},
        ]))
        .unwrap();

        assert_eq!(parsed.entries.len(), 3);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(
            parsed.entries[0].result,
            Some(ConcludedResult::Value {
                value: VoteValue::Number(5.0),
                excluded: 0
            })
        );
        assert_eq!(
            parsed.entries[1].result.as_ref().and_then(|r| r.value()),
            Some(&VoteValue::from("?"))
        );
        assert_eq!(parsed.entries[2].result, None);
    }

    #[test]
    fn test_legacy_results_document() {
        let doc = json!({
            "partie_id": "1234",
            "mode_de_jeu": "moyenne",
            "number_player": "4",
            "resultats": [
                {"probleme": "Login", "difficulte": 3.5},
                {"probleme": "Logout", "difficulte": null}
            ]
        });
        let parsed = parse_backlog(&doc).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[1].label, "Logout");
    }

    #[test]
    fn test_exported_result_objects() {
        let doc = json!({
            "results": [
                {"problem": "Login", "result": {"kind": "value", "value": 8, "excluded": 1}},
                {"problem": "Search", "result": {"kind": "no_consensus"}}
            ]
        });
        let parsed = parse_backlog(&doc).unwrap();
        assert_eq!(
            parsed.entries[0].result,
            Some(ConcludedResult::Value {
                value: VoteValue::Number(8.0),
                excluded: 1
            })
        );
        assert_eq!(parsed.entries[1].result, Some(ConcludedResult::NoConsensus));
    }

    #[test]
    fn test_json_string_payload() {
        let parsed = parse_backlog(&json!(r#"["A", "B"]"#)).unwrap();
        assert_eq!(parsed.entries.len(), 2);
    }

    #[test]
    fn test_unreadable_backlog() {
        assert!(matches!(
            parse_backlog(&json!(12)),
            Err(RoomError::Validation(_))
        ));
        assert!(matches!(
            parse_backlog(&json!({"nothing": true})),
            Err(RoomError::Validation(_))
        ));
        assert!(matches!(
            parse_backlog(&json!("not json")),
            Err(RoomError::Validation(_))
        ));
    }

    #[test]
    fn test_future_schema_rejected() {
        let doc = json!({
            "schema_version": RESULTS_SCHEMA_VERSION + 1,
            "results": [{"problem": "Login"}]
        });
        let err = parse_backlog(&doc).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }
}
