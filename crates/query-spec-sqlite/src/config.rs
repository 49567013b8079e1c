//! Configuration for the SQLite connection pool

use std::time::Duration;

/// Configuration for a [`SqliteSource`](crate::SqliteSource) connection pool
///
/// # Examples
///
/// ```
/// use query_spec_sqlite::SqliteSourceConfig;
/// use std::time::Duration;
///
/// // Use defaults
/// let config = SqliteSourceConfig::default();
///
/// // Override just one field
/// let config = SqliteSourceConfig {
///     idle_timeout: Duration::from_secs(60),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SqliteSourceConfig {
   /// Maximum number of pooled connections
   ///
   /// Default: 6
   pub max_connections: u32,

   /// Connections idle for this long are closed
   ///
   /// Default: 30 seconds
   pub idle_timeout: Duration,
}

impl Default for SqliteSourceConfig {
   fn default() -> Self {
      Self {
         max_connections: 6,
         idle_timeout: Duration::from_secs(30),
      }
   }
}
