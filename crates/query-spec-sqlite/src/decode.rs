//! SQLite values to JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteRow, SqliteValueRef};
use sqlx::{Column, Row, TypeInfo, Value, ValueRef};

use crate::Error;

/// A decoded row, keyed by column name in select order.
pub type JsonRow = IndexMap<String, JsonValue>;

/// Convert a single SQLite value by its runtime storage class.
///
/// BLOBs become standard base64 strings.
pub(crate) fn to_json(value: SqliteValueRef<'_>) -> Result<JsonValue, Error> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let type_name = value.type_info().name().to_string();
   let owned = value.to_owned();

   let json = match type_name.as_str() {
      "TEXT" => JsonValue::String(owned.try_decode::<String>()?),
      "INTEGER" | "NUMERIC" | "BOOLEAN" => JsonValue::from(owned.try_decode::<i64>()?),
      "REAL" => {
         let number = owned.try_decode::<f64>()?;
         serde_json::Number::from_f64(number).map_or(JsonValue::Null, JsonValue::Number)
      }
      "BLOB" => JsonValue::String(STANDARD.encode(owned.try_decode::<Vec<u8>>()?)),
      "NULL" => JsonValue::Null,
      _ => return Err(Error::UnsupportedDatatype(type_name)),
   };

   Ok(json)
}

/// Decode rows, parsing JSON text in the named columns.
///
/// Include columns hold `json_object(...)`/`json_group_array(...)` output,
/// which arrives as TEXT.
pub(crate) fn decode_rows(rows: Vec<SqliteRow>, json_columns: &[String]) -> Result<Vec<JsonRow>, Error> {
   let mut decoded = Vec::with_capacity(rows.len());
   for row in rows {
      let mut value = IndexMap::with_capacity(row.columns().len());
      for (i, column) in row.columns().iter().enumerate() {
         let mut v = to_json(row.try_get_raw(i)?)?;
         if json_columns.iter().any(|name| name == column.name())
            && let JsonValue::String(text) = &v
            && let Ok(parsed) = serde_json::from_str::<JsonValue>(text)
         {
            v = parsed;
         }
         value.insert(column.name().to_string(), v);
      }
      decoded.push(value);
   }
   Ok(decoded)
}
