//! Generic decoding of result rows into JSON objects

use serde_json::{Map, Number, Value};
use sqlx::any::AnyRow;
use sqlx::{Column, Row};

/// Decodes one row into a JSON object keyed by column name.
///
/// Integers, floats, text and booleans are carried over. Binary values are
/// read as UTF-8 text, since MySQL reports `TEXT` columns as blobs; NULL and
/// non-UTF-8 bytes become `null`.
///
/// The `Any` driver refuses whole rows that contain MySQL `DECIMAL`, `DATE`,
/// `DATETIME`, `TINYINT` or `ENUM` columns, so such columns must be cast in
/// the statement before they reach this decoder.
pub fn row_to_json(row: &AnyRow) -> Map<String, Value> {
    let mut object = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let index = column.ordinal();
        object.insert(column.name().to_string(), decode_value(row, index));
    }
    object
}

pub fn rows_to_json(rows: &[AnyRow]) -> Vec<Map<String, Value>> {
    rows.iter().map(row_to_json).collect()
}

fn decode_value(row: &AnyRow, index: usize) -> Value {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(Some(bytes)) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return String::from_utf8(bytes)
            .map(Value::String)
            .unwrap_or(Value::Null);
    }
    Value::Null
}
