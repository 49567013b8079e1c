//! In-memory [`QuerySource`] over a vector of entities.
//!
//! Steps are recorded as they are applied and replayed by
//! [`MemoryQuery::to_vec`], mirroring how a database backend builds its query
//! before executing it.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use crate::cursor::CursorCodec;
use crate::evaluator::{Projected, QuerySource, SpecificationEvaluator};
use crate::page::{CursorPage, assemble_page};
use crate::predicate::Predicate;
use crate::query::{QuerySpecification, SortKey};
use crate::value::{FieldAccess, compare_values};
use crate::Result;

#[derive(Debug, Clone)]
enum Step {
   Filter(Predicate),
   Include(String),
   OrderBy(SortKey),
   ThenBy(SortKey),
   Skip(usize),
   Take(usize),
}

/// A lazily evaluated query over owned entities.
///
/// ```
/// use query_spec::{MemoryQuery, Predicate, QuerySpecification, SpecificationEvaluator};
/// use serde_json::json;
///
/// let rows = vec![json!({"id": 2}), json!({"id": 1}), json!({"id": 3})];
/// let spec = QuerySpecification::builder()
///     .criteria(Predicate::lt("id", 3))
///     .order_by("id")
///     .build()
///     .unwrap();
///
/// let result = SpecificationEvaluator::evaluate(MemoryQuery::new(rows), &spec).to_vec();
/// assert_eq!(result, vec![json!({"id": 1}), json!({"id": 2})]);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryQuery<T> {
   items: Vec<T>,
   steps: Vec<Step>,
}

impl<T> MemoryQuery<T> {
   pub fn new(items: impl IntoIterator<Item = T>) -> Self {
      Self {
         items: items.into_iter().collect(),
         steps: Vec::new(),
      }
   }

   /// Eager-load hints recorded so far.
   pub fn includes(&self) -> impl Iterator<Item = &str> {
      self.steps.iter().filter_map(|step| match step {
         Step::Include(path) => Some(path.as_str()),
         _ => None,
      })
   }
}

impl<T: FieldAccess> MemoryQuery<T> {
   /// Run the recorded steps.
   ///
   /// Consecutive `order_by`/`then_by` steps form one composite stable sort.
   pub fn to_vec(self) -> Vec<T> {
      let mut rows = self.items;
      let mut sort: Vec<SortKey> = Vec::new();

      for step in self.steps {
         match step {
            Step::Include(_) => {}
            Step::OrderBy(key) => {
               flush_sort(&mut rows, &mut sort);
               sort.push(key);
            }
            Step::ThenBy(key) => sort.push(key),
            Step::Filter(predicate) => {
               flush_sort(&mut rows, &mut sort);
               rows.retain(|row| predicate.evaluate(row));
            }
            Step::Skip(count) => {
               flush_sort(&mut rows, &mut sort);
               rows.drain(..count.min(rows.len()));
            }
            Step::Take(count) => {
               flush_sort(&mut rows, &mut sort);
               rows.truncate(count);
            }
         }
      }

      flush_sort(&mut rows, &mut sort);
      rows
   }

   pub fn count(self) -> usize {
      self.to_vec().len()
   }
}

impl<T: FieldAccess + Clone> MemoryQuery<T> {
   /// Evaluate `spec` and assemble the resulting page.
   ///
   /// The total count is computed from the criteria alone when requested.
   pub fn fetch_page(
      self,
      spec: &QuerySpecification<T>,
      codec: &CursorCodec,
      with_total_count: bool,
   ) -> Result<CursorPage<T>> {
      let total_count = with_total_count
         .then(|| SpecificationEvaluator::evaluate_criteria(self.clone(), spec).count() as u64);
      let rows = SpecificationEvaluator::evaluate(self, spec).to_vec();
      assemble_page(spec, rows, total_count, codec)
   }
}

impl<T, F, U> Projected<MemoryQuery<T>, F>
where
   T: FieldAccess,
   F: Fn(T) -> U,
{
   /// Run the query and project every returned row.
   pub fn to_vec(self) -> Vec<U> {
      let (source, selector) = self.into_parts();
      source.to_vec().into_iter().map(selector).collect()
   }
}

impl<T> QuerySource for MemoryQuery<T> {
   type Item = T;

   fn filter(mut self, predicate: &Predicate) -> Self {
      self.steps.push(Step::Filter(predicate.clone()));
      self
   }

   fn include(mut self, path: &str) -> Self {
      self.steps.push(Step::Include(path.to_string()));
      self
   }

   fn order_by(mut self, key: &SortKey) -> Self {
      self.steps.push(Step::OrderBy(key.clone()));
      self
   }

   fn then_by(mut self, key: &SortKey) -> Self {
      self.steps.push(Step::ThenBy(key.clone()));
      self
   }

   fn skip(mut self, count: usize) -> Self {
      self.steps.push(Step::Skip(count));
      self
   }

   fn take(mut self, count: usize) -> Self {
      self.steps.push(Step::Take(count));
      self
   }
}

fn flush_sort<T: FieldAccess>(rows: &mut [T], sort: &mut Vec<SortKey>) {
   if sort.is_empty() {
      return;
   }
   rows.sort_by(|a, b| compare_rows(a, b, sort));
   sort.clear();
}

fn compare_rows<T: FieldAccess>(a: &T, b: &T, keys: &[SortKey]) -> Ordering {
   for key in keys {
      let left = a.field_value(&key.field).unwrap_or(JsonValue::Null);
      let right = b.field_value(&key.field).unwrap_or(JsonValue::Null);
      let ord = key.direction.apply(compare_values(&left, &right));
      if ord != Ordering::Equal {
         return ord;
      }
   }
   Ordering::Equal
}
