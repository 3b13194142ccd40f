use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::primary_list;

/// Format output as a table using the tabled crate.
///
/// A result carrying a ranked list (risk groups, KPIs, buckets, findings)
/// prints that list as rows followed by the remaining scalar fields.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => match primary_list(res_map) {
            Some((key, items)) => {
                print_array_table(items);
                let rest: Map<String, Value> = res_map
                    .iter()
                    .filter(|(k, v)| k.as_str() != key && !v.is_array())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if !rest.is_empty() {
                    println!();
                    print_flat_object(&rest);
                }
            }
            None => print_flat_object(res_map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => print_flat_object(envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        // Group keys serialize as arrays of optional parts
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(" / "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
