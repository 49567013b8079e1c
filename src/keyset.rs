//! Keyset (cursor-based) pagination.
//!
//! Instead of skipping rows, keyset paging remembers the sort-key values of
//! the last row seen and asks for rows strictly past them. For a keyset
//! `(a ASC, b DESC)` and a cursor `(x, y)` the boundary is the expanded form
//!
//! ```text
//! (a > x) OR (a = x AND b < y)
//! ```
//!
//! which every backend can evaluate. Paging backward (`before`) flips each
//! comparison and reverses the sort, and the page is reversed again after
//! fetching so rows always come back in the requested order.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::cursor::CursorCodec;
use crate::page::{CursorItem, CursorPage};
use crate::predicate::Predicate;
use crate::query::{SortDirection, SortKey};
use crate::value::FieldAccess;
use crate::{Error, Result};

/// Which side of the cursor the next page lies on.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorPosition {
   /// Rows sorting after the given position
   After(JsonValue),
   /// Rows sorting before the given position
   Before(JsonValue),
}

impl CursorPosition {
   pub fn value(&self) -> &JsonValue {
      match self {
         CursorPosition::After(value) | CursorPosition::Before(value) => value,
      }
   }

   pub fn is_backward(&self) -> bool {
      matches!(self, CursorPosition::Before(_))
   }
}

/// Keyset paging request.
///
/// The cursor value is either a scalar (single-column keyset), an object
/// keyed by column name, or an array in keyset order. A `null` cursor is
/// the same as no cursor and starts from the first page.
#[derive(Debug, Clone, PartialEq)]
pub struct KeysetPaging {
   /// Keyset property and its sort direction
   pub property: SortKey,
   /// Maximum rows per page
   pub take: usize,
   /// Position to resume from, if any
   pub cursor: Option<CursorPosition>,
}

impl KeysetPaging {
   pub fn new(property: impl Into<String>, direction: SortDirection, take: usize) -> Self {
      Self {
         property: SortKey::new(property, direction),
         take,
         cursor: None,
      }
   }

   /// Resume after the given position (forward paging).
   #[must_use]
   pub fn after(mut self, last_value: impl Into<JsonValue>) -> Self {
      let value = last_value.into();
      self.cursor = (!value.is_null()).then_some(CursorPosition::After(value));
      self
   }

   /// Resume before the given position (backward paging).
   #[must_use]
   pub fn before(mut self, first_value: impl Into<JsonValue>) -> Self {
      let value = first_value.into();
      self.cursor = (!value.is_null()).then_some(CursorPosition::Before(value));
      self
   }

   /// Resume after an opaque token; absent or empty tokens start from the beginning.
   pub fn after_token(self, token: Option<&str>, codec: &CursorCodec) -> Result<Self> {
      let value: Option<JsonValue> = codec.decode(token)?;
      Ok(match value {
         Some(value) => self.after(value),
         None => self,
      })
   }

   /// Resume before an opaque token; absent or empty tokens start from the beginning.
   pub fn before_token(self, token: Option<&str>, codec: &CursorCodec) -> Result<Self> {
      let value: Option<JsonValue> = codec.decode(token)?;
      Ok(match value {
         Some(value) => self.before(value),
         None => self,
      })
   }
}

/// Keyset paging resolved against the full ordering of a specification.
#[derive(Debug, Clone, PartialEq)]
pub struct KeysetPlan {
   paging: KeysetPaging,
   keyset: Vec<SortKey>,
   boundary: Option<Predicate>,
}

impl KeysetPlan {
   /// Resolve a request against the ordering, which must already contain the
   /// keyset property.
   pub(crate) fn resolve(paging: KeysetPaging, keyset: Vec<SortKey>) -> Result<Self> {
      let boundary = match &paging.cursor {
         Some(position) => {
            let values = cursor_values(&keyset, position.value())?;
            boundary_predicate(&keyset, &values, position.is_backward())
         }
         None => None,
      };

      Ok(Self {
         paging,
         keyset,
         boundary,
      })
   }

   pub fn paging(&self) -> &KeysetPaging {
      &self.paging
   }

   pub fn property(&self) -> &SortKey {
      &self.paging.property
   }

   pub fn take(&self) -> usize {
      self.paging.take
   }

   /// Every ordering key, primary first. This is the effective keyset.
   pub fn keyset(&self) -> &[SortKey] {
      &self.keyset
   }

   /// Filter selecting rows past the cursor, `None` on the first page.
   pub fn boundary(&self) -> Option<&Predicate> {
      self.boundary.as_ref()
   }

   pub fn has_cursor(&self) -> bool {
      self.paging.cursor.is_some()
   }

   pub fn is_backward(&self) -> bool {
      self.paging.cursor.as_ref().is_some_and(CursorPosition::is_backward)
   }

   /// Ordering to fetch with; reversed when paging backward.
   pub fn fetch_ordering(&self) -> Vec<SortKey> {
      if self.is_backward() {
         self.keyset.iter().map(SortKey::reversed).collect()
      } else {
         self.keyset.clone()
      }
   }

   /// Rows to request: one more than the page to detect further pages.
   pub fn fetch_size(&self) -> usize {
      self.paging.take.saturating_add(1)
   }
}

/// Read cursor values in keyset order.
pub fn cursor_values(keyset: &[SortKey], cursor: &JsonValue) -> Result<Vec<JsonValue>> {
   match cursor {
      JsonValue::Object(map) => keyset
         .iter()
         .map(|key| {
            map.get(&key.field)
               .cloned()
               .ok_or_else(|| Error::CursorColumnNotFound {
                  column: key.field.clone(),
               })
         })
         .collect(),
      JsonValue::Array(values) => {
         if values.len() != keyset.len() {
            return Err(Error::CursorLengthMismatch {
               cursor_len: values.len(),
               keyset_len: keyset.len(),
            });
         }
         Ok(values.clone())
      }
      scalar => {
         if keyset.len() != 1 {
            return Err(Error::CursorLengthMismatch {
               cursor_len: 1,
               keyset_len: keyset.len(),
            });
         }
         Ok(vec![scalar.clone()])
      }
   }
}

/// Build the expanded keyset boundary.
///
/// Level `i` holds equality on the first `i` columns and a strict
/// comparison on column `i`. NULL sorts before every value, so a null
/// cursor value seeks with `IS NOT NULL`/`IS NULL` and a descending seek
/// past a value also admits nulls. Returns `None` for an empty keyset.
pub fn boundary_predicate(
   keyset: &[SortKey],
   values: &[JsonValue],
   backward: bool,
) -> Option<Predicate> {
   if keyset.is_empty() {
      return None;
   }

   let levels = keyset
      .iter()
      .zip(values)
      .enumerate()
      .filter_map(|(level, (key, value))| {
         let direction = if backward {
            key.direction.reversed()
         } else {
            key.direction
         };
         let seek = seek_past(&key.field, direction, value)?;

         let equalities = keyset[..level]
            .iter()
            .zip(values)
            .map(|(prior, v)| same_position(&prior.field, v));

         Some(match Predicate::all(equalities) {
            Some(prefix) => prefix.and(seek),
            None => seek,
         })
      })
      .collect::<Vec<_>>();

   // Nothing sorts past a null under a descending key
   Some(Predicate::any(levels).unwrap_or_else(|| Predicate::True.not()))
}

/// Rows strictly past `value` in `direction`, or `None` when no row can be.
fn seek_past(field: &str, direction: SortDirection, value: &JsonValue) -> Option<Predicate> {
   match (direction, value.is_null()) {
      (SortDirection::Asc, true) => Some(Predicate::is_not_null(field)),
      (SortDirection::Asc, false) => Some(Predicate::gt(field, value.clone())),
      (SortDirection::Desc, true) => None,
      (SortDirection::Desc, false) => {
         Some(Predicate::lt(field, value.clone()).or(Predicate::is_null(field)))
      }
   }
}

fn same_position(field: &str, value: &JsonValue) -> Predicate {
   if value.is_null() {
      Predicate::is_null(field)
   } else {
      Predicate::eq(field, value.clone())
   }
}

/// Turns an over-fetched keyset result into a page with cursors.
pub struct KeysetPaginator<'a> {
   plan: &'a KeysetPlan,
   codec: &'a CursorCodec,
}

impl<'a> KeysetPaginator<'a> {
   pub fn new(plan: &'a KeysetPlan, codec: &'a CursorCodec) -> Self {
      Self { plan, codec }
   }

   pub fn fetch_size(&self) -> usize {
      self.plan.fetch_size()
   }

   /// Encode the cursor for one row.
   ///
   /// Single-column keysets encode the bare value, unless it is null; wider
   /// keysets and null positions encode an object with one entry per column
   /// in keyset order.
   pub fn row_cursor<T: FieldAccess>(&self, row: &T) -> Result<String> {
      let keyset = self.plan.keyset();
      if let [key] = keyset {
         let value = field(row, &key.field);
         // A bare null would read back as "no cursor"
         if !value.is_null() {
            return self.codec.encode_value(&value);
         }
      }

      let position: IndexMap<String, JsonValue> = keyset
         .iter()
         .map(|key| (key.field.clone(), field(row, &key.field)))
         .collect();
      self.codec.encode_value(&position)
   }

   /// Assemble a page from rows fetched with [`KeysetPlan::fetch_ordering`],
   /// the boundary filter and a limit of [`fetch_size`](Self::fetch_size).
   pub fn assemble<T: FieldAccess>(
      &self,
      mut rows: Vec<T>,
      total_count: Option<u64>,
   ) -> Result<CursorPage<T>> {
      let take = self.plan.take();
      let has_more = rows.len() > take;
      if has_more {
         rows.truncate(take);
      }

      let backward = self.plan.is_backward();
      if backward {
         rows.reverse();
      }

      let (has_previous_page, has_next_page) = if backward {
         (has_more, self.plan.has_cursor())
      } else {
         (self.plan.has_cursor(), has_more)
      };

      trace!(
         rows = rows.len(),
         has_more,
         backward,
         "assembled keyset page"
      );

      let edges = rows
         .into_iter()
         .map(|item| {
            let cursor = self.row_cursor(&item)?;
            Ok(CursorItem { item, cursor })
         })
         .collect::<Result<Vec<_>>>()?;

      Ok(CursorPage::from_edges(
         edges,
         has_previous_page,
         has_next_page,
         total_count,
      ))
   }
}

/// Missing fields read as null, matching how rows are sorted.
fn field<T: FieldAccess>(row: &T, column: &str) -> JsonValue {
   row.field_value(column).unwrap_or(JsonValue::Null)
}
