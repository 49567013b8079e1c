//! # query-spec
//!
//! Composable, backend-agnostic query specifications with offset and keyset
//! pagination and opaque cursors.
//!
//! ## Core Types
//!
//! - **[`Predicate`]**: Inspectable boolean expression tree over entity fields
//! - **[`Specification`]**: Predicate bound to an entity type, with a cached compiled form
//! - **[`QuerySpecification`]**: Criteria plus ordering, eager-load hints and paging
//! - **[`SpecificationEvaluator`]**: Applies a query specification to a [`QuerySource`]
//! - **[`CursorCodec`]**: Encodes and decodes opaque base64url cursor tokens
//! - **[`KeysetPaginator`]**: Turns an over-fetched keyset result into a [`CursorPage`]
//! - **[`Error`]**: Error type for specification building and cursor handling
//!
//! ## Pipeline
//!
//! - **Criteria**: Every criterion is AND-ed onto the query
//! - **Includes**: Eager-load hints are passed through and never filter
//! - **Ordering**: Primary key first, then tie-breakers in insertion order
//! - **Paging**: Offset (`skip`/`take`) or keyset (seek past a cursor), never both
//!
//! Backends implement [`QuerySource`]; [`MemoryQuery`] is the in-memory one.

mod config;
mod cursor;
mod error;
mod evaluator;
mod keyset;
mod memory;
mod page;
mod predicate;
mod query;
mod specification;
mod value;

// Re-export public types
pub use config::PaginationConfig;
pub use cursor::{CursorCodec, decode_cursor, encode_cursor};
pub use error::{Error, Result};
pub use evaluator::{Projected, QuerySource, SpecificationEvaluator};
pub use keyset::{
   CursorPosition, KeysetPaginator, KeysetPaging, KeysetPlan, boundary_predicate, cursor_values,
};
pub use memory::MemoryQuery;
pub use page::{CursorItem, CursorPage, Page, PageInfo, assemble_page};
pub use predicate::{CompareOp, FieldTest, Predicate};
pub use query::{PagingMode, QuerySpecification, QuerySpecificationBuilder, SortDirection, SortKey};
pub use specification::Specification;
pub use value::{FieldAccess, compare_values, values_equal};
