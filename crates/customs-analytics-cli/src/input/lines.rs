use serde_json::{Map, Value};

use customs_analytics_core::DeclarationLine;

use super::{file, stdin};

/// Load declaration lines from a JSON array or CSV file, or JSON on stdin.
pub fn read_lines(path: Option<&str>) -> Result<Vec<DeclarationLine>, Box<dyn std::error::Error>> {
    let lines: Vec<DeclarationLine> = match path {
        Some(p) if file::has_extension(p, &["csv"]) => read_csv(p)?,
        Some(p) => file::read_json(p)?,
        None => match stdin::read_stdin()? {
            Some(value) => serde_json::from_value(value)?,
            None => return Err("--input file is required (or pipe a JSON array on stdin)".into()),
        },
    };
    log::debug!("loaded {} declaration line(s)", lines.len());
    Ok(lines)
}

/// CSV with one column per `DeclarationLine` field. Empty cells are nulls.
fn read_csv(path: &str) -> Result<Vec<DeclarationLine>, Box<dyn std::error::Error>> {
    let text = file::read_text(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = rdr.headers()?.clone();

    let mut lines = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), csv_cell(h, v)))
            .collect();
        let line: DeclarationLine = serde_json::from_value(Value::Object(row))
            .map_err(|e| format!("Failed to parse '{}' row {}: {}", path, i + 2, e))?;
        lines.push(line);
    }
    Ok(lines)
}

fn csv_cell(header: &str, cell: &str) -> Value {
    if header == "is_deleted" {
        return Value::Bool(matches!(
            cell.to_ascii_lowercase().as_str(),
            "true" | "1" | "y" | "yes"
        ));
    }
    if cell.is_empty() {
        Value::Null
    } else {
        Value::String(cell.to_string())
    }
}
