//! # query-spec-sqlite
//!
//! SQLite backend for `query-spec`: query specifications are pushed down to
//! SQL and executed through a SQLx connection pool.
//!
//! ## Core Types
//!
//! - **[`SqliteSource`]**: Connection pool plus registered include expressions
//! - **[`SqliteQuery`]**: Lazy `SELECT` over one table, implementing `QuerySource`
//! - **[`FetchPageBuilder`]**: Evaluates a specification and assembles a cursor page
//! - **[`SqliteSourceConfig`]**: Configuration for connection pool settings
//! - **[`Error`]**: Error type for backend operations
//!
//! ## Translation
//!
//! - **Placeholders**: Every value is bound as `$N`, never interpolated
//! - **Identifiers**: Field and table names are validated, then double-quoted
//! - **Nulls**: Comparisons against NULL never match, and `NOT` stays two-valued
//! - **Includes**: Each hint adds a select expression; JSON text is parsed back

mod config;
mod decode;
mod error;
mod source;
mod sql;
mod translate;

// Re-export public types
pub use config::SqliteSourceConfig;
pub use decode::JsonRow;
pub use error::{Error, Result};
pub use source::{Fetch, FetchPageBuilder, SqliteQuery, SqliteSource, WriteQueryResult};
pub use translate::translate;
