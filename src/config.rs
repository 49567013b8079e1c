//! Configuration for specification building and cursor handling

/// Limits applied while building specifications and decoding cursors
///
/// # Examples
///
/// ```
/// use query_spec::PaginationConfig;
///
/// // Use defaults
/// let config = PaginationConfig::default();
///
/// // Override just one field
/// let config = PaginationConfig {
///     max_page_size: 250,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct PaginationConfig {
   /// Largest `take` accepted by offset or keyset paging
   ///
   /// Default: 1000
   pub max_page_size: usize,

   /// Longest cursor token accepted for decoding, in characters
   ///
   /// Cursors arrive from untrusted callers (query strings, request bodies),
   /// so oversized tokens are rejected before any decoding work.
   ///
   /// Default: 4096
   pub max_cursor_len: usize,
}

impl Default for PaginationConfig {
   fn default() -> Self {
      Self {
         max_page_size: 1000,
         max_cursor_len: 4096,
      }
   }
}
