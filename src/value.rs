//! Field access and value ordering shared by every backend.
//!
//! Values are plain [`serde_json::Value`]s. The ordering defined here follows
//! SQLite's storage-class order so in-memory evaluation and pushed-down SQL
//! agree on which rows match and in what order they come back.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as JsonValue};

/// Read access to named fields of an entity.
///
/// Row types decoded from a backend (`IndexMap<String, JsonValue>`) implement
/// this already. Entity structs implement it by hand:
///
/// ```
/// use query_spec::FieldAccess;
/// use serde_json::{Value, json};
///
/// struct Post {
///     id: i64,
///     title: String,
/// }
///
/// impl FieldAccess for Post {
///     fn field_value(&self, field: &str) -> Option<Value> {
///         match field {
///             "id" => Some(json!(self.id)),
///             "title" => Some(json!(self.title)),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait FieldAccess {
   /// Return the value of `field`, or `None` if the entity has no such field.
   fn field_value(&self, field: &str) -> Option<JsonValue>;
}

impl FieldAccess for IndexMap<String, JsonValue> {
   fn field_value(&self, field: &str) -> Option<JsonValue> {
      self.get(field).cloned()
   }
}

impl FieldAccess for Map<String, JsonValue> {
   fn field_value(&self, field: &str) -> Option<JsonValue> {
      self.get(field).cloned()
   }
}

impl FieldAccess for JsonValue {
   fn field_value(&self, field: &str) -> Option<JsonValue> {
      self.get(field).cloned()
   }
}

impl<T: FieldAccess + ?Sized> FieldAccess for &T {
   fn field_value(&self, field: &str) -> Option<JsonValue> {
      (**self).field_value(field)
   }
}

/// Storage-class rank: NULL < numeric < text < array < object.
fn rank(value: &JsonValue) -> u8 {
   match value {
      JsonValue::Null => 0,
      JsonValue::Bool(_) | JsonValue::Number(_) => 1,
      JsonValue::String(_) => 2,
      JsonValue::Array(_) => 3,
      JsonValue::Object(_) => 4,
   }
}

fn as_integer(number: &Number) -> Option<i128> {
   number
      .as_i64()
      .map(i128::from)
      .or_else(|| number.as_u64().map(i128::from))
}

/// Numeric view of a value; booleans count as 0 and 1 like in SQLite.
enum Numeric {
   Int(i128),
   Float(f64),
}

fn numeric(value: &JsonValue) -> Option<Numeric> {
   match value {
      JsonValue::Bool(b) => Some(Numeric::Int(i128::from(*b))),
      JsonValue::Number(n) => match as_integer(n) {
         Some(i) => Some(Numeric::Int(i)),
         // -0.0 + 0.0 is 0.0, so negative zero equals zero
         None => n.as_f64().map(|f| Numeric::Float(f + 0.0)),
      },
      _ => None,
   }
}

fn compare_numeric(a: Numeric, b: Numeric) -> Ordering {
   match (a, b) {
      (Numeric::Int(a), Numeric::Int(b)) => a.cmp(&b),
      (Numeric::Int(a), Numeric::Float(b)) => (a as f64).total_cmp(&b),
      (Numeric::Float(a), Numeric::Int(b)) => a.total_cmp(&(b as f64)),
      (Numeric::Float(a), Numeric::Float(b)) => a.total_cmp(&b),
   }
}

/// Total order over JSON values.
///
/// Values of different storage classes order by class. Within a class,
/// integers compare exactly, floats with [`f64::total_cmp`], text byte-wise,
/// and arrays/objects element by element.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
   let by_rank = rank(a).cmp(&rank(b));
   if by_rank != Ordering::Equal {
      return by_rank;
   }

   match (a, b) {
      (JsonValue::String(a), JsonValue::String(b)) => a.as_bytes().cmp(b.as_bytes()),
      (JsonValue::Array(a), JsonValue::Array(b)) => {
         for (x, y) in a.iter().zip(b.iter()) {
            let ord = compare_values(x, y);
            if ord != Ordering::Equal {
               return ord;
            }
         }
         a.len().cmp(&b.len())
      }
      (JsonValue::Object(a), JsonValue::Object(b)) => {
         for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
            let ord = ka.cmp(kb).then_with(|| compare_values(va, vb));
            if ord != Ordering::Equal {
               return ord;
            }
         }
         a.len().cmp(&b.len())
      }
      _ => match (numeric(a), numeric(b)) {
         (Some(a), Some(b)) => compare_numeric(a, b),
         // Both null
         _ => Ordering::Equal,
      },
   }
}

/// Equality under [`compare_values`], so `1`, `1.0` and `true` are equal.
pub fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
   compare_values(a, b) == Ordering::Equal
}
