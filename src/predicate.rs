//! Predicate expression tree.
//!
//! A [`Predicate`] is an inspectable boolean test over an entity. Combinators
//! build new trees out of existing ones instead of capturing closures, so a
//! backend adapter can walk the tree and push the filter down to its own
//! query language. The same tree is evaluated in memory by
//! [`Predicate::evaluate`] and compiled by
//! [`Specification`](crate::Specification).
//!
//! # Semantics
//!
//! Leaves follow SQL comparison rules with NULL collapsed to `false`:
//! any comparison involving a null or missing field, or a null operand, does
//! not match. `Not` is two-valued on top of that, so `x.not()` matches
//! exactly the entities `x` rejects.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

use crate::value::{FieldAccess, compare_values, values_equal};

/// Comparison applied by a [`FieldTest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
   Eq,
   Ne,
   Lt,
   Lte,
   Gt,
   Gte,
   /// Operand is an array; matches when the field equals any member.
   In,
   /// Operand is an array; matches when the field equals no member.
   NotIn,
   /// Case-sensitive substring match on text fields.
   Contains,
   StartsWith,
   EndsWith,
   /// Operand is ignored.
   IsNull,
   /// Operand is ignored.
   IsNotNull,
}

impl CompareOp {
   /// Operator symbol used in diagnostics.
   pub fn as_str(self) -> &'static str {
      match self {
         CompareOp::Eq => "=",
         CompareOp::Ne => "!=",
         CompareOp::Lt => "<",
         CompareOp::Lte => "<=",
         CompareOp::Gt => ">",
         CompareOp::Gte => ">=",
         CompareOp::In => "in",
         CompareOp::NotIn => "not in",
         CompareOp::Contains => "contains",
         CompareOp::StartsWith => "starts with",
         CompareOp::EndsWith => "ends with",
         CompareOp::IsNull => "is null",
         CompareOp::IsNotNull => "is not null",
      }
   }
}

/// A single test of one field against an operand; the leaf of every tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTest {
   pub field: String,
   pub op: CompareOp,
   #[serde(default)]
   pub value: JsonValue,
}

impl FieldTest {
   pub fn new(field: impl Into<String>, op: CompareOp, value: impl Into<JsonValue>) -> Self {
      Self {
         field: field.into(),
         op,
         value: value.into(),
      }
   }

   /// Apply the test to a field value (`None` when the field is missing).
   pub fn matches(&self, actual: Option<&JsonValue>) -> bool {
      let actual = actual.unwrap_or(&JsonValue::Null);

      match self.op {
         CompareOp::IsNull => return actual.is_null(),
         CompareOp::IsNotNull => return !actual.is_null(),
         // `x NOT IN ()` holds for every row, NULL included
         CompareOp::NotIn if list_is_empty(&self.value) => return true,
         _ => {}
      }

      if actual.is_null() {
         return false;
      }

      match self.op {
         CompareOp::In => match &self.value {
            JsonValue::Array(items) => items
               .iter()
               .any(|item| !item.is_null() && values_equal(actual, item)),
            _ => false,
         },
         CompareOp::NotIn => match &self.value {
            JsonValue::Array(items) => {
               if items.iter().any(JsonValue::is_null) {
                  return false;
               }
               !items.iter().any(|item| values_equal(actual, item))
            }
            _ => false,
         },
         CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith => {
            match (actual, &self.value) {
               (JsonValue::String(text), JsonValue::String(needle)) => match self.op {
                  CompareOp::Contains => text.contains(needle.as_str()),
                  CompareOp::StartsWith => text.starts_with(needle.as_str()),
                  _ => text.ends_with(needle.as_str()),
               },
               _ => false,
            }
         }
         _ => {
            if self.value.is_null() {
               return false;
            }
            let ord = compare_values(actual, &self.value);
            match self.op {
               CompareOp::Eq => ord == Ordering::Equal,
               CompareOp::Ne => ord != Ordering::Equal,
               CompareOp::Lt => ord == Ordering::Less,
               CompareOp::Lte => ord != Ordering::Greater,
               CompareOp::Gt => ord == Ordering::Greater,
               CompareOp::Gte => ord != Ordering::Less,
               _ => false,
            }
         }
      }
   }
}

fn list_is_empty(value: &JsonValue) -> bool {
   matches!(value, JsonValue::Array(items) if items.is_empty())
}

/// Boolean expression tree over entity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
   /// Matches every entity.
   True,
   Leaf(FieldTest),
   And(Box<Predicate>, Box<Predicate>),
   Or(Box<Predicate>, Box<Predicate>),
   Not(Box<Predicate>),
}

#[allow(clippy::should_implement_trait)]
impl Predicate {
   pub fn test(field: impl Into<String>, op: CompareOp, value: impl Into<JsonValue>) -> Self {
      Predicate::Leaf(FieldTest::new(field, op, value))
   }

   pub fn eq(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
      Self::test(field, CompareOp::Eq, value)
   }

   pub fn ne(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
      Self::test(field, CompareOp::Ne, value)
   }

   pub fn lt(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
      Self::test(field, CompareOp::Lt, value)
   }

   pub fn lte(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
      Self::test(field, CompareOp::Lte, value)
   }

   pub fn gt(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
      Self::test(field, CompareOp::Gt, value)
   }

   pub fn gte(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
      Self::test(field, CompareOp::Gte, value)
   }

   pub fn in_<V: Into<JsonValue>>(
      field: impl Into<String>,
      values: impl IntoIterator<Item = V>,
   ) -> Self {
      let values: Vec<JsonValue> = values.into_iter().map(Into::into).collect();
      Self::test(field, CompareOp::In, values)
   }

   pub fn not_in<V: Into<JsonValue>>(
      field: impl Into<String>,
      values: impl IntoIterator<Item = V>,
   ) -> Self {
      let values: Vec<JsonValue> = values.into_iter().map(Into::into).collect();
      Self::test(field, CompareOp::NotIn, values)
   }

   pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
      Self::test(field, CompareOp::Contains, needle.into())
   }

   pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
      Self::test(field, CompareOp::StartsWith, prefix.into())
   }

   pub fn ends_with(field: impl Into<String>, suffix: impl Into<String>) -> Self {
      Self::test(field, CompareOp::EndsWith, suffix.into())
   }

   pub fn is_null(field: impl Into<String>) -> Self {
      Self::test(field, CompareOp::IsNull, JsonValue::Null)
   }

   pub fn is_not_null(field: impl Into<String>) -> Self {
      Self::test(field, CompareOp::IsNotNull, JsonValue::Null)
   }

   /// `AND(self, other)`.
   #[must_use]
   pub fn and(self, other: Predicate) -> Self {
      Predicate::And(Box::new(self), Box::new(other))
   }

   /// `OR(self, other)`.
   #[must_use]
   pub fn or(self, other: Predicate) -> Self {
      Predicate::Or(Box::new(self), Box::new(other))
   }

   /// `NOT(self)`. Double negation is kept as built.
   #[must_use]
   pub fn not(self) -> Self {
      Predicate::Not(Box::new(self))
   }

   /// Left-fold predicates with AND, or `None` when there are none.
   pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Self> {
      predicates.into_iter().reduce(Predicate::and)
   }

   /// Left-fold predicates with OR, or `None` when there are none.
   pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Option<Self> {
      predicates.into_iter().reduce(Predicate::or)
   }

   /// Evaluate the tree against an entity by walking it.
   pub fn evaluate<T: FieldAccess + ?Sized>(&self, entity: &T) -> bool {
      match self {
         Predicate::True => true,
         Predicate::Leaf(test) => test.matches(entity.field_value(&test.field).as_ref()),
         Predicate::And(left, right) => left.evaluate(entity) && right.evaluate(entity),
         Predicate::Or(left, right) => left.evaluate(entity) || right.evaluate(entity),
         Predicate::Not(inner) => !inner.evaluate(entity),
      }
   }

   /// Leaves in left-to-right order.
   pub fn leaves(&self) -> Vec<&FieldTest> {
      let mut out = Vec::new();
      self.collect_leaves(&mut out);
      out
   }

   fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a FieldTest>) {
      match self {
         Predicate::True => {}
         Predicate::Leaf(test) => out.push(test),
         Predicate::And(left, right) | Predicate::Or(left, right) => {
            left.collect_leaves(out);
            right.collect_leaves(out);
         }
         Predicate::Not(inner) => inner.collect_leaves(out),
      }
   }

   /// Distinct field names referenced by the tree, in first-use order.
   pub fn fields(&self) -> Vec<&str> {
      let mut fields: Vec<&str> = Vec::new();
      for leaf in self.leaves() {
         if !fields.contains(&leaf.field.as_str()) {
            fields.push(&leaf.field);
         }
      }
      fields
   }

   /// Height of the tree; a single leaf has depth 1.
   pub fn depth(&self) -> usize {
      match self {
         Predicate::True | Predicate::Leaf(_) => 1,
         Predicate::And(left, right) | Predicate::Or(left, right) => {
            1 + left.depth().max(right.depth())
         }
         Predicate::Not(inner) => 1 + inner.depth(),
      }
   }

   /// Equivalent tree with double negations removed and `True` absorbed.
   ///
   /// Construction never simplifies; backends call this before translating.
   #[must_use]
   pub fn simplified(&self) -> Predicate {
      match self {
         Predicate::True | Predicate::Leaf(_) => self.clone(),
         Predicate::Not(inner) => match inner.as_ref() {
            Predicate::Not(x) => x.simplified(),
            other => Predicate::Not(Box::new(other.simplified())),
         },
         Predicate::And(left, right) => match (left.simplified(), right.simplified()) {
            (Predicate::True, other) | (other, Predicate::True) => other,
            (l, r) => l.and(r),
         },
         Predicate::Or(left, right) => match (left.simplified(), right.simplified()) {
            (Predicate::True, _) | (_, Predicate::True) => Predicate::True,
            (l, r) => l.or(r),
         },
      }
   }
}

impl std::fmt::Display for Predicate {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      match self {
         Predicate::True => write!(f, "true"),
         Predicate::Leaf(test) => match test.op {
            CompareOp::IsNull | CompareOp::IsNotNull => {
               write!(f, "{} {}", test.field, test.op.as_str())
            }
            _ => write!(f, "{} {} {}", test.field, test.op.as_str(), test.value),
         },
         Predicate::And(left, right) => write!(f, "({left} AND {right})"),
         Predicate::Or(left, right) => write!(f, "({left} OR {right})"),
         Predicate::Not(inner) => write!(f, "NOT {inner}"),
      }
   }
}
