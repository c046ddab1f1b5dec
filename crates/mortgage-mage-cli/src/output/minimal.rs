use serde_json::Value;

/// Key answer fields in order of priority. Deal analyses nest their numbers
/// under "metrics".
const PRIORITY_KEYS: [&str; 6] = [
    "irr",
    "median_rate",
    "acceptance_probability",
    "cash_on_cash",
    "net_cash_flow",
    "terms",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    let metrics_obj = result_obj.get("metrics").unwrap_or(result_obj);

    for candidate in [metrics_obj, result_obj] {
        if let Value::Object(map) = candidate {
            for key in PRIORITY_KEYS {
                if let Some(val) = map.get(key) {
                    if !val.is_null() {
                        println!("{}", format_minimal(val));
                        return;
                    }
                }
            }
        }
    }

    match result_obj {
        Value::Object(map) => {
            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, format_minimal(val));
            }
        }
        // One line per period for simulations
        Value::Array(rows) => {
            for row in rows {
                let period = row.get("period").map(format_minimal).unwrap_or_default();
                let net = row.get("net_cash_flow").map(format_minimal).unwrap_or_default();
                println!("{period}\t{net}");
            }
        }
        other => println!("{}", format_minimal(other)),
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // Monte Carlo summaries: report the mean
        Value::Object(map) if map.contains_key("mean") => {
            map.get("mean").map(format_minimal).unwrap_or_default()
        }
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
