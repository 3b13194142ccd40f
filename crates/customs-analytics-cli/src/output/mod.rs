pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Result keys that hold the main list of a command, in lookup order.
const PRIMARY_LISTS: [&str; 8] = [
    "ranked",
    "kpis",
    "groups",
    "pairs",
    "buckets",
    "series",
    "findings",
    "definitions",
];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The first non-empty primary list in a result object, with its key.
pub fn primary_list(result: &Map<String, Value>) -> Option<(&str, &[Value])> {
    PRIMARY_LISTS.iter().find_map(|key| match result.get(*key) {
        Some(Value::Array(items)) if !items.is_empty() => Some((*key, items.as_slice())),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primary_list_skips_empty_arrays() {
        let value = json!({ "ranked": [], "groups": [{ "a": 1 }], "findings": [{ "b": 2 }] });
        let (key, items) = primary_list(value.as_object().unwrap()).unwrap();
        assert_eq!(key, "groups");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_primary_list_none_for_scalars() {
        let value = json!({ "hhi": "1234", "total_groups": 3 });
        assert!(primary_list(value.as_object().unwrap()).is_none());
    }
}
