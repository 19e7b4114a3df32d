//! Turning result rows into charts, tables and answer hints

use super::types::{SeriesChart, TableData, VisualizationData};
use serde_json::{Map, Value};

type Row = Map<String, Value>;

const TITLE_CHARS: usize = 100;

const CALCULATION_TERMS: &[&str] = &[
    "sum",
    "total",
    "avg",
    "average",
    "count",
    "max",
    "min",
    "percentage",
];

const SINGLE_VALUE_MARKERS: &[&str] = &["sum(", "avg(", "count(", "max(", "min("];

/// `challan_amount` → `Challan Amount`
///
/// Letters following a non-letter are capitalized, all others lowercased.
pub fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_alpha = false;
    for c in key.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Numeric reading of a result cell
///
/// Strings may carry thousands separators, currency signs and spaces.
/// Anything unreadable or non-finite counts as zero.
pub fn numeric_value(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, ',' | '₹' | '$') && !c.is_whitespace())
                .collect();
            cleaned.parse().unwrap_or(0.0)
        }
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn label_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn truncate_title(question: &str) -> String {
    question.chars().take(TITLE_CHARS).collect()
}

fn series(rows: &[Row], category_key: &str, value_key: &str, question: &str) -> SeriesChart {
    SeriesChart {
        labels: rows.iter().map(|r| label_text(r.get(category_key))).collect(),
        values: rows
            .iter()
            .map(|r| r.get(value_key).map(numeric_value).unwrap_or(0.0))
            .collect(),
        category_label: title_case(category_key),
        value_label: title_case(value_key),
        title: truncate_title(question),
    }
}

/// First column other than `category_key` holding a positive number
fn positive_numeric_column<'a>(rows: &[Row], keys: &'a [String], category_key: &str) -> Option<&'a str> {
    keys.iter()
        .filter(|k| k.as_str() != category_key)
        .find(|k| {
            rows.iter()
                .filter_map(|r| r.get(k.as_str()).and_then(Value::as_f64))
                .any(|v| v > 0.0)
        })
        .map(String::as_str)
}

/// Chart for graph mode, if the rows support one
pub fn visualization_data(rows: &[Row], question: &str, sql: &str) -> Option<VisualizationData> {
    let first = rows.first()?;
    let keys: Vec<String> = first.keys().cloned().collect();
    let sql_lower = sql.to_lowercase();

    if sql_lower.contains("group by") {
        if keys.len() >= 2 {
            let category_key = keys[0].as_str();
            let mut chart = series(rows, category_key, &keys[1], question);

            if chart.values.iter().all(|v| *v == 0.0) {
                if let Some(alternative) = positive_numeric_column(rows, &keys, category_key) {
                    chart = series(rows, category_key, alternative, question);
                }
            }

            if !chart.values.iter().any(|v| *v > 0.0) {
                tracing::warn!(
                    labels = chart.labels.len(),
                    "Grouped results carry no positive values, skipping chart"
                );
                return None;
            }

            let category_lower = category_key.to_lowercase();
            return Some(
                if sql_lower.contains("percentage") || question.contains('%') {
                    VisualizationData::PieChart(chart)
                } else if category_lower.contains("time") || category_lower.contains("date") {
                    VisualizationData::LineChart(chart)
                } else {
                    VisualizationData::BarChart(chart)
                },
            );
        }
    } else if SINGLE_VALUE_MARKERS.iter().any(|m| sql_lower.contains(m)) {
        let key = keys.first()?;
        return Some(VisualizationData::SingleValue {
            value: first.get(key).map(numeric_value).unwrap_or(0.0),
            label: title_case(key),
            title: truncate_title(question),
        });
    }

    if keys.len() >= 2 {
        return Some(VisualizationData::BarChart(series(
            rows, &keys[0], &keys[1], question,
        )));
    }
    None
}

/// Result grid for table mode; cells are stringified and nulls blank
pub fn table_data(rows: &[Row]) -> Option<TableData> {
    let headers: Vec<String> = rows.first()?.keys().cloned().collect();
    let grid: Vec<Vec<String>> = rows
        .iter()
        .map(|row| headers.iter().map(|h| label_text(row.get(h))).collect())
        .collect();

    Some(TableData {
        headers,
        row_count: grid.len(),
        rows: grid,
    })
}

/// Aggregate-looking values to point the answer writer at
pub fn calculations(rows: &[Row], question: &str) -> Option<Map<String, Value>> {
    let mut found = Map::new();

    for row in rows {
        for (key, value) in row {
            let key_lower = key.to_lowercase();
            if !value.is_null() && CALCULATION_TERMS.iter().any(|t| key_lower.contains(t)) {
                found.insert(key.clone(), value.clone());
            }
        }
    }

    let question_lower = question.to_lowercase();
    if question_lower.contains("percentage") || question_lower.contains('%') {
        for row in rows {
            for (key, value) in row {
                let key_lower = key.to_lowercase();
                if key_lower.contains("count") || key_lower.contains("total") {
                    found.insert(key.clone(), value.clone());
                }
            }
        }
    }

    if found.is_empty() {
        None
    } else {
        Some(found)
    }
}
