//! Identifier validation and ORDER BY rendering.

use query_spec::{SortDirection, SortKey};

use crate::Error;

/// Validate that a column or table name is safe for SQL interpolation.
///
/// Accepts names matching `[a-zA-Z_][a-zA-Z0-9_.]*`, which covers plain column
/// names, qualified names (e.g., `table.column`), and underscored identifiers.
pub(crate) fn validate_column_name(name: &str) -> Result<(), Error> {
   let invalid = || Error::InvalidColumnName {
      name: name.to_string(),
   };

   let mut chars = name.chars();
   match chars.next() {
      Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
      _ => return Err(invalid()),
   }

   if chars.any(|ch| !ch.is_ascii_alphanumeric() && ch != '_' && ch != '.') {
      return Err(invalid());
   }

   Ok(())
}

/// Quote a column name with double-quote identifiers.
///
/// Any embedded double quotes are doubled per SQL standard (`"` → `""`).
pub(crate) fn quote_identifier(name: &str) -> String {
   format!("\"{}\"", name.replace('"', "\"\""))
}

/// Validate then quote.
pub(crate) fn column(name: &str) -> Result<String, Error> {
   validate_column_name(name)?;
   Ok(quote_identifier(name))
}

/// Build the ORDER BY clause from the ordering keys.
pub(crate) fn build_order_by(ordering: &[SortKey]) -> Result<String, Error> {
   let parts = ordering
      .iter()
      .map(|key| {
         let dir = match key.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
         };
         Ok(format!("{} {}", column(&key.field)?, dir))
      })
      .collect::<Result<Vec<String>, Error>>()?;

   Ok(format!("ORDER BY {}", parts.join(", ")))
}
