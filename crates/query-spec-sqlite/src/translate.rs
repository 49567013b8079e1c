//! Predicate push-down to SQLite `WHERE` clauses.
//!
//! The generated SQL follows the same rules as in-memory evaluation: any
//! comparison involving NULL is false, and `NOT` is two-valued. SQLite's
//! three-valued logic agrees with that under `AND`/`OR` at the top level of a
//! `WHERE`; only negation needs help, so `NOT x` becomes
//! `NOT COALESCE((x), 0)`.
//!
//! Values are never interpolated. Each bound value gets its own `$N`
//! placeholder, numbered from `param_offset + 1`.

use query_spec::{CompareOp, FieldTest, Predicate};
use serde_json::Value as JsonValue;

use crate::Error;
use crate::sql::column;

/// Translate a predicate into a SQL condition and its bind values.
pub fn translate(
   predicate: &Predicate,
   param_offset: usize,
) -> Result<(String, Vec<JsonValue>), Error> {
   let mut translator = Translator {
      param_offset,
      values: Vec::new(),
   };
   let sql = translator.predicate(predicate)?;
   Ok((sql, translator.values))
}

struct Translator {
   param_offset: usize,
   values: Vec<JsonValue>,
}

impl Translator {
   fn bind(&mut self, value: JsonValue) -> String {
      self.values.push(value);
      format!("${}", self.param_offset + self.values.len())
   }

   fn bind_list(&mut self, values: &[&JsonValue]) -> String {
      values
         .iter()
         .map(|value| self.bind((*value).clone()))
         .collect::<Vec<_>>()
         .join(", ")
   }

   fn predicate(&mut self, predicate: &Predicate) -> Result<String, Error> {
      Ok(match predicate {
         Predicate::True => "1".to_string(),
         Predicate::Leaf(test) => self.leaf(test)?,
         Predicate::And(left, right) => {
            format!("({} AND {})", self.predicate(left)?, self.predicate(right)?)
         }
         Predicate::Or(left, right) => {
            format!("({} OR {})", self.predicate(left)?, self.predicate(right)?)
         }
         Predicate::Not(inner) => format!("NOT COALESCE(({}), 0)", self.predicate(inner)?),
      })
   }

   fn leaf(&mut self, test: &FieldTest) -> Result<String, Error> {
      let col = column(&test.field)?;

      Ok(match test.op {
         CompareOp::IsNull => format!("{col} IS NULL"),
         CompareOp::IsNotNull => format!("{col} IS NOT NULL"),
         CompareOp::Eq
         | CompareOp::Ne
         | CompareOp::Lt
         | CompareOp::Lte
         | CompareOp::Gt
         | CompareOp::Gte => self.comparison(&col, test.op, &test.value),
         CompareOp::In => match &test.value {
            JsonValue::Array(items) => {
               let members: Vec<&JsonValue> = items.iter().filter(|v| !v.is_null()).collect();
               if members.is_empty() {
                  "0".to_string()
               } else {
                  format!("{col} IN ({})", self.bind_list(&members))
               }
            }
            _ => "0".to_string(),
         },
         CompareOp::NotIn => match &test.value {
            JsonValue::Array(items) if items.is_empty() => "1".to_string(),
            JsonValue::Array(items) if items.iter().any(JsonValue::is_null) => "0".to_string(),
            JsonValue::Array(items) => {
               let members: Vec<&JsonValue> = items.iter().collect();
               format!("{col} NOT IN ({})", self.bind_list(&members))
            }
            _ => "0".to_string(),
         },
         CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith => {
            match &test.value {
               JsonValue::String(needle) => {
                  let escaped = escape_glob(needle);
                  let pattern = match test.op {
                     CompareOp::Contains => format!("*{escaped}*"),
                     CompareOp::StartsWith => format!("{escaped}*"),
                     _ => format!("*{escaped}"),
                  };
                  let placeholder = self.bind(JsonValue::String(pattern));
                  format!("(typeof({col}) = 'text' AND {col} GLOB {placeholder})")
               }
               _ => "0".to_string(),
            }
         }
      })
   }

   fn comparison(&mut self, col: &str, op: CompareOp, value: &JsonValue) -> String {
      match value {
         JsonValue::Null => "0".to_string(),
         // Column values are scalars and always sort before arrays and objects
         JsonValue::Array(_) | JsonValue::Object(_) => match op {
            CompareOp::Ne | CompareOp::Lt | CompareOp::Lte => format!("{col} IS NOT NULL"),
            _ => "0".to_string(),
         },
         _ => {
            let symbol = match op {
               CompareOp::Eq => "=",
               CompareOp::Ne => "<>",
               CompareOp::Lt => "<",
               CompareOp::Lte => "<=",
               CompareOp::Gt => ">",
               _ => ">=",
            };
            let placeholder = self.bind(value.clone());
            format!("{col} {symbol} {placeholder}")
         }
      }
   }
}

/// Escape GLOB metacharacters so the needle matches literally.
fn escape_glob(needle: &str) -> String {
   let mut escaped = String::with_capacity(needle.len());
   for ch in needle.chars() {
      match ch {
         '*' => escaped.push_str("[*]"),
         '?' => escaped.push_str("[?]"),
         '[' => escaped.push_str("[[]"),
         _ => escaped.push(ch),
      }
   }
   escaped
}
