/// Result type alias for query specification operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for building specifications and handling cursors.
///
/// Construction errors are programming mistakes surfaced by
/// [`QuerySpecificationBuilder::build`](crate::QuerySpecificationBuilder::build).
/// Cursor errors come from caller-supplied tokens and should be reported as
/// bad input, never as a server fault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Offset and keyset paging were both applied to the same specification.
   #[error("offset paging and keyset paging cannot be combined on one specification")]
   ConflictingPagingModes,

   /// A secondary ordering was applied before any primary ordering.
   #[error("then_by requires a primary order_by or order_by_descending")]
   ThenByWithoutOrderBy,

   /// Page size must be greater than zero.
   #[error("page size must be greater than zero")]
   InvalidPageSize,

   /// Page size exceeds the configured maximum.
   #[error("page size {requested} exceeds the maximum of {max}")]
   PageSizeExceeded { requested: usize, max: usize },

   /// Keyset property is already ordered in the opposite direction.
   #[error("keyset property '{field}' conflicts with the direction of an existing ordering")]
   KeysetOrderConflict { field: String },

   /// Cursor is not valid base64url or exceeds the allowed shape.
   #[error("malformed cursor '{cursor}': {reason}")]
   MalformedCursor { cursor: String, reason: String },

   /// Cursor token is longer than the configured maximum.
   #[error("cursor exceeds max length: {len} chars (max {max})")]
   CursorTooLong { len: usize, max: usize },

   /// Cursor decoded cleanly but does not hold the requested type.
   #[error("cursor payload does not match expected type {expected}: {reason}")]
   CursorPayloadMismatch {
      expected: &'static str,
      reason: String,
   },

   /// Cursor value could not be serialized.
   #[error("failed to encode cursor: {0}")]
   CursorEncoding(#[source] serde_json::Error),

   /// Cursor length does not match keyset column count.
   #[error("cursor has {cursor_len} values but keyset has {keyset_len} columns")]
   CursorLengthMismatch {
      cursor_len: usize,
      keyset_len: usize,
   },

   /// Keyset column missing from a cursor object.
   #[error("keyset column '{column}' not found")]
   CursorColumnNotFound { column: String },
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::ConflictingPagingModes => "CONFLICTING_PAGING_MODES".to_string(),
         Error::ThenByWithoutOrderBy => "THEN_BY_WITHOUT_ORDER_BY".to_string(),
         Error::InvalidPageSize => "INVALID_PAGE_SIZE".to_string(),
         Error::PageSizeExceeded { .. } => "PAGE_SIZE_EXCEEDED".to_string(),
         Error::KeysetOrderConflict { .. } => "KEYSET_ORDER_CONFLICT".to_string(),
         Error::MalformedCursor { .. } => "MALFORMED_CURSOR".to_string(),
         Error::CursorTooLong { .. } => "CURSOR_TOO_LONG".to_string(),
         Error::CursorPayloadMismatch { .. } => "CURSOR_PAYLOAD_MISMATCH".to_string(),
         Error::CursorEncoding(_) => "CURSOR_ENCODING".to_string(),
         Error::CursorLengthMismatch { .. } => "CURSOR_LENGTH_MISMATCH".to_string(),
         Error::CursorColumnNotFound { .. } => "CURSOR_COLUMN_NOT_FOUND".to_string(),
      }
   }

   /// Whether the error was caused by caller-supplied input.
   ///
   /// These map to a "bad request" style response at an API boundary.
   pub fn is_client_error(&self) -> bool {
      matches!(
         self,
         Error::MalformedCursor { .. }
            | Error::CursorTooLong { .. }
            | Error::CursorPayloadMismatch { .. }
            | Error::CursorLengthMismatch { .. }
            | Error::CursorColumnNotFound { .. }
            | Error::PageSizeExceeded { .. }
      )
   }
}
