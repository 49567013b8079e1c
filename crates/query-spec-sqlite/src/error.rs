/// Result type alias for SQLite backend operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the SQLite backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error from building a specification or handling a cursor.
   #[error(transparent)]
   Spec(#[from] query_spec::Error),

   /// Row could not be converted into the entity type.
   #[error("failed to convert row: {0}")]
   Json(#[from] serde_json::Error),

   /// I/O error when accessing database files.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),

   /// SQLite type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// Column or table name contains invalid characters.
   ///
   /// Names must match `[a-zA-Z_][a-zA-Z0-9_.]*` (letters, digits,
   /// underscores, and dots for qualified names like `table.column`).
   #[error("invalid column name '{name}': must match [a-zA-Z_][a-zA-Z0-9_.]*")]
   InvalidColumnName { name: String },

   /// Include hint with no registered select expression.
   #[error("no include registered for '{0}'")]
   UnknownInclude(String),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::Spec(e) => e.error_code(),
         Error::Json(_) => "ROW_CONVERSION_ERROR".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::InvalidColumnName { .. } => "INVALID_COLUMN_NAME".to_string(),
         Error::UnknownInclude(_) => "UNKNOWN_INCLUDE".to_string(),
      }
   }

   /// Whether the error was caused by caller-supplied input.
   pub fn is_client_error(&self) -> bool {
      match self {
         Error::Spec(e) => e.is_client_error(),
         _ => false,
      }
   }
}
