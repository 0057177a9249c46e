//! Best-effort mapping of an arbitrary station JSON document to a status
//! label and a connector summary.
//!
//! The upstream schema is not fixed, so each piece of information is looked
//! up through an ordered table of candidate keys. The first key that is
//! present (missing and `null` both count as absent) wins, even when its value
//! is falsy such as `0` or `""`.

use crate::core::ExtractedStatus;
use serde_json::{Map, Value};

/// Station-level status keys, highest priority first.
pub const STATUS_KEYS: &[&str] = &[
    "status",
    "state",
    "stationStatus",
    "availability",
    "currentStatus",
    "operationalStatus",
];

/// Keys that may hold the connector list.
pub const CONNECTOR_LIST_KEYS: &[&str] = &["connectors", "connector", "evses", "ports", "outlets"];

/// Per-connector status keys.
pub const CONNECTOR_STATUS_KEYS: &[&str] = &["status", "state", "availability", "currentStatus"];

/// Per-connector name keys.
pub const CONNECTOR_NAME_KEYS: &[&str] = &["name", "id", "connectorId"];

/// Placeholder shown when no connector information exists.
pub const PLACEHOLDER: &str = "—";

/// Returns the value of the first candidate key present in `object`.
pub fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// Extracts the status label and connector summary from a station document.
///
/// Never fails; anything unrecognised degrades to placeholder text.
pub fn extract(payload: &Value) -> ExtractedStatus {
    let Some(object) = payload.as_object() else {
        return ExtractedStatus {
            status_label: None,
            connectors_summary: PLACEHOLDER.to_string(),
        };
    };

    let status_label = first_present(object, STATUS_KEYS).map(render_scalar);
    let connectors_summary = match first_present(object, CONNECTOR_LIST_KEYS) {
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| render_connector(index, entry))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other @ Value::Object(_)) => other.to_string(),
        Some(other) => render_scalar(other),
        None => PLACEHOLDER.to_string(),
    };

    ExtractedStatus {
        status_label,
        connectors_summary,
    }
}

fn render_connector(index: usize, entry: &Value) -> String {
    let positional = || format!("Connector {}", index + 1);
    match entry {
        Value::String(s) => s.clone(),
        Value::Object(fields) => {
            let name = first_present(fields, CONNECTOR_NAME_KEYS)
                .map(render_scalar)
                .unwrap_or_else(positional);
            let status = first_present(fields, CONNECTOR_STATUS_KEYS)
                .map(render_scalar)
                .unwrap_or_else(|| "unknown".to_string());
            format!("{}: {}", name, status)
        }
        Value::Array(_) => format!("{}: unknown", positional()),
        _ => positional(),
    }
}

/// Strings render bare; everything else renders as compact JSON.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_field_wins_over_state() {
        let extracted = extract(&json!({ "status": "Occupied", "state": "Available" }));
        assert_eq!(extracted.status_label.as_deref(), Some("Occupied"));
    }

    #[test]
    fn test_state_used_when_status_absent() {
        let extracted = extract(&json!({ "state": "Available" }));
        assert_eq!(extracted.status_label.as_deref(), Some("Available"));
    }

    #[test]
    fn test_falsy_value_still_wins() {
        let extracted = extract(&json!({ "status": 0, "state": "Available" }));
        assert_eq!(extracted.status_label.as_deref(), Some("0"));

        let extracted = extract(&json!({ "status": "", "state": "Available" }));
        assert_eq!(extracted.status_label.as_deref(), Some(""));
    }

    #[test]
    fn test_null_counts_as_absent() {
        let extracted = extract(&json!({ "status": null, "availability": "Free" }));
        assert_eq!(extracted.status_label.as_deref(), Some("Free"));
    }

    #[test]
    fn test_connector_rendering_mixes_names_and_fallbacks() {
        let extracted = extract(&json!({
            "connectors": [
                { "name": "A", "status": "Free" },
                { "id": "B2" }
            ]
        }));
        assert_eq!(extracted.connectors_summary, "A: Free, B2: unknown");
    }

    #[test]
    fn test_connector_positional_labels() {
        let extracted = extract(&json!({
            "evses": ["CCS", { "state": "Charging" }, 42]
        }));
        assert_eq!(
            extracted.connectors_summary,
            "CCS, Connector 2: Charging, Connector 3"
        );
    }

    #[test]
    fn test_connector_object_falls_back_to_json() {
        let extracted = extract(&json!({ "ports": { "left": "Free" } }));
        assert_eq!(extracted.connectors_summary, r#"{"left":"Free"}"#);
    }

    #[test]
    fn test_unrecognised_object_yields_placeholders() {
        let extracted = extract(&json!({ "foo": 1 }));
        assert_eq!(extracted.status_label, None);
        assert_eq!(extracted.display_status(), "unknown");
        assert_eq!(extracted.connectors_summary, "—");
    }

    #[test]
    fn test_non_object_input_yields_placeholders() {
        for payload in [json!(null), json!("Available"), json!(3)] {
            let extracted = extract(&payload);
            assert_eq!(extracted.display_status(), "unknown");
            assert_eq!(extracted.connectors_summary, "—");
        }
    }

    #[test]
    fn test_empty_connector_list_renders_empty() {
        let extracted = extract(&json!({ "connectors": [] }));
        assert_eq!(extracted.connectors_summary, "");
    }
}
