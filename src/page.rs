//! Page results and page metadata.

use serde::{Deserialize, Serialize};

use crate::cursor::CursorCodec;
use crate::keyset::KeysetPaginator;
use crate::query::{PagingMode, QuerySpecification};
use crate::value::FieldAccess;
use crate::Result;

/// Navigation metadata for a page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
   pub has_previous_page: bool,
   pub has_next_page: bool,
   /// Cursor of the first item, `None` on an empty page
   pub start_cursor: Option<String>,
   /// Cursor of the last item, `None` on an empty page
   pub end_cursor: Option<String>,
}

/// An item together with the cursor that resumes right after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CursorItem<T> {
   pub item: T,
   pub cursor: String,
}

/// A page in which every item carries its own cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
   pub edges: Vec<CursorItem<T>>,
   pub page_info: PageInfo,
   /// Rows matching the criteria across all pages, when requested
   #[serde(skip_serializing_if = "Option::is_none")]
   pub total_count: Option<u64>,
}

impl<T> CursorPage<T> {
   pub(crate) fn from_edges(
      edges: Vec<CursorItem<T>>,
      has_previous_page: bool,
      has_next_page: bool,
      total_count: Option<u64>,
   ) -> Self {
      let page_info = PageInfo {
         has_previous_page,
         has_next_page,
         start_cursor: edges.first().map(|edge| edge.cursor.clone()),
         end_cursor: edges.last().map(|edge| edge.cursor.clone()),
      };
      Self {
         edges,
         page_info,
         total_count,
      }
   }

   pub fn items(&self) -> impl Iterator<Item = &T> {
      self.edges.iter().map(|edge| &edge.item)
   }

   pub fn len(&self) -> usize {
      self.edges.len()
   }

   pub fn is_empty(&self) -> bool {
      self.edges.is_empty()
   }

   /// Drop per-item cursors.
   pub fn into_page(self) -> Page<T> {
      Page {
         items: self.edges.into_iter().map(|edge| edge.item).collect(),
         page_info: self.page_info,
         total_count: self.total_count,
      }
   }
}

/// A page of items with navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
   pub items: Vec<T>,
   pub page_info: PageInfo,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub total_count: Option<u64>,
}

/// Build a page from rows returned by evaluating `spec`.
///
/// For keyset paging `rows` must be the over-fetched result (up to
/// `take + 1` rows, see [`KeysetPlan::fetch_size`](crate::KeysetPlan::fetch_size)).
/// For offset paging they are the page itself and each cursor encodes the
/// absolute row offset. Without `total_count`, offset paging reports a next
/// page whenever a full page came back.
pub fn assemble_page<T: FieldAccess>(
   spec: &QuerySpecification<T>,
   rows: Vec<T>,
   total_count: Option<u64>,
   codec: &CursorCodec,
) -> Result<CursorPage<T>> {
   match spec.paging() {
      PagingMode::Keyset(plan) => KeysetPaginator::new(plan, codec).assemble(rows, total_count),
      PagingMode::Offset { skip, take } => {
         let end = skip.saturating_add(rows.len());
         let has_next_page = match total_count {
            Some(total) => (end as u64) < total,
            None => rows.len() >= *take,
         };
         offset_page(rows, *skip, *skip > 0, has_next_page, total_count, codec)
      }
      PagingMode::None => offset_page(rows, 0, false, false, total_count, codec),
   }
}

fn offset_page<T>(
   rows: Vec<T>,
   skip: usize,
   has_previous_page: bool,
   has_next_page: bool,
   total_count: Option<u64>,
   codec: &CursorCodec,
) -> Result<CursorPage<T>> {
   let edges = rows
      .into_iter()
      .enumerate()
      .map(|(i, item)| {
         let cursor = codec.encode_value(&(skip + i))?;
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
