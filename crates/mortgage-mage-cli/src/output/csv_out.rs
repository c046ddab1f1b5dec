use serde_json::{Map, Value};
use std::io::{self, Write};

/// Write a result as CSV to stdout. Trajectories and LTV sweeps come out
/// one row per record, anything else as dotted field/value pairs.
pub fn print_csv(value: &Value) {
    if let Err(e) = write_csv(io::stdout().lock(), value) {
        eprintln!("Failed to write CSV output: {e}");
    }
}

fn write_csv<W: Write>(out: W, value: &Value) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    let body = value.get("result").unwrap_or(value);

    match record_list(body) {
        Some(rows) => write_records(&mut wtr, rows)?,
        None => {
            wtr.write_record(["field", "value"])?;
            let mut pairs = Vec::new();
            flatten("", body, &mut pairs);
            for (key, val) in pairs {
                wtr.write_record([key, val])?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Top-level record array, or the periods of a (nested) trajectory.
fn record_list(body: &Value) -> Option<&[Value]> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(map) => periods(map).or_else(|| {
            map.get("trajectory")
                .and_then(Value::as_object)
                .and_then(periods)
        })?,
        _ => return None,
    };
    Some(rows.as_slice())
}

fn periods(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    map.get("periods").and_then(Value::as_array)
}

fn write_records<W: Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        for row in rows {
            wtr.write_record([field(row)])?;
        }
        return Ok(());
    };

    let columns: Vec<&str> = first.keys().map(String::as_str).collect();
    wtr.write_record(&columns)?;
    for row in rows.iter().filter_map(Value::as_object) {
        wtr.write_record(
            columns
                .iter()
                .map(|c| row.get(*c).map(field).unwrap_or_default()),
        )?;
    }
    Ok(())
}

/// Flatten nested objects to dotted keys. Arrays of objects (histograms,
/// per-draw records) are left out.
fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, val, out);
            }
        }
        Value::Array(items) if items.iter().any(Value::is_object) => {}
        other => out.push((prefix.to_owned(), field(other))),
    }
}

fn field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(field).collect::<Vec<_>>().join(";"),
        other => other.to_string(),
    }
}
