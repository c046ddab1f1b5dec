use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Distribution summary columns, looked up on the summary or its
/// `percentiles` object.
const SUMMARY_COLUMNS: [&str; 7] = ["mean", "std_dev", "p5", "p25", "p50", "p75", "p95"];

/// Render a result as tables: scalar fields, then Monte Carlo metric
/// summaries, then record lists such as trajectory periods.
pub fn print_table(value: &Value) {
    let envelope = value.as_object().filter(|map| map.contains_key("result"));
    let body = envelope.and_then(|map| map.get("result")).unwrap_or(value);

    match body {
        Value::Object(fields) => print_sections(fields),
        Value::Array(rows) => print_records(rows),
        other => println!("{}", cell(other)),
    }

    if let Some(envelope) = envelope {
        print_notes(envelope);
    }
}

fn print_sections(fields: &Map<String, Value>) {
    let mut scalars = Builder::default();
    scalars.push_record(["Field", "Value"]);
    let mut summaries = Vec::new();
    let mut records = Vec::new();

    for (key, val) in fields {
        if let Some(rows) = record_rows(val) {
            records.push((key, rows));
            continue;
        }
        match val {
            Value::Object(inner) if is_summary(inner) => summaries.push((key, inner)),
            Value::Object(inner) => {
                for (sub, v) in inner {
                    if record_rows(v).is_none() {
                        scalars.push_record([format!("{key}.{sub}"), cell(v)]);
                    }
                }
            }
            other => scalars.push_record([key.clone(), cell(other)]),
        }
    }

    println!("{}", Table::from(scalars));
    if !summaries.is_empty() {
        print_summaries(&summaries);
    }
    for (key, rows) in records {
        println!("\n{key}:");
        print_records(rows);
    }
}

fn is_summary(map: &Map<String, Value>) -> bool {
    map.contains_key("mean") && map.contains_key("percentiles")
}

fn print_summaries(summaries: &[(&String, &Map<String, Value>)]) {
    let mut builder = Builder::default();
    let header: Vec<String> = std::iter::once("metric")
        .chain(SUMMARY_COLUMNS)
        .map(str::to_owned)
        .collect();
    builder.push_record(header);

    for (name, summary) in summaries {
        let stats = SUMMARY_COLUMNS.iter().map(|col| {
            summary
                .get(*col)
                .or_else(|| summary.get("percentiles").and_then(|p| p.get(*col)))
                .map(cell)
                .unwrap_or_default()
        });
        let row: Vec<String> = std::iter::once(name.to_string()).chain(stats).collect();
        builder.push_record(row);
    }
    println!("\n{}", Table::from(builder));
}

/// An array of objects, or an object holding one under "periods".
fn record_rows(value: &Value) -> Option<&[Value]> {
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(map) => map.get("periods")?.as_array()?,
        _ => return None,
    };
    rows.first()
        .filter(|first| first.is_object())
        .map(|_| rows.as_slice())
}

fn print_records(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        rows.iter().for_each(|row| println!("{}", cell(row)));
        return;
    };

    let columns: Vec<&String> = first.keys().collect();
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for row in rows.iter().filter_map(Value::as_object) {
        builder.push_record(
            columns
                .iter()
                .map(|c| row.get(c.as_str()).map(cell).unwrap_or_default()),
        );
    }
    println!("{}", Table::from(builder));
}

fn print_notes(envelope: &Map<String, Value>) {
    let warnings: Vec<&str> = envelope
        .get("warnings")
        .and_then(Value::as_array)
        .map(|w| w.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }
    if let Some(methodology) = envelope.get("methodology").and_then(Value::as_str) {
        println!("\nMethodology: {methodology}");
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_owned(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
        other => other.to_string(),
    }
}
