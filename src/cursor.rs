//! Opaque cursor tokens.
//!
//! A cursor is `base64url(json(value))` without padding, so it is safe to
//! pass through URLs and query strings unescaped. Clients must treat the
//! token as opaque and hand it back unchanged; only [`CursorCodec`] reads
//! it.
//!
//! # Example
//!
//! ```
//! use query_spec::CursorCodec;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//! struct Position {
//!     created_at: i64,
//!     id: u64,
//! }
//!
//! let codec = CursorCodec::default();
//! let token = codec.encode_value(&Position { created_at: 1700000000, id: 42 }).unwrap();
//! assert!(!token.contains('='));
//!
//! let back: Position = codec.decode(Some(&token)).unwrap();
//! assert_eq!(back, Position { created_at: 1700000000, id: 42 });
//! ```

use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use tracing::debug;

use crate::{Error, PaginationConfig, Result};

/// RFC 4648 §5 alphabet; never emits padding, accepts input with or without it.
const CURSOR_ENGINE: GeneralPurpose = GeneralPurpose::new(
   &alphabet::URL_SAFE,
   GeneralPurposeConfig::new()
      .with_encode_padding(false)
      .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Longest slice of an offending token echoed back in errors.
const ERROR_ECHO_LEN: usize = 64;

/// Encodes and decodes opaque cursor tokens.
#[derive(Debug, Clone)]
pub struct CursorCodec {
   max_len: usize,
}

impl Default for CursorCodec {
   fn default() -> Self {
      Self::new(&PaginationConfig::default())
   }
}

impl CursorCodec {
   pub fn new(config: &PaginationConfig) -> Self {
      Self {
         max_len: config.max_cursor_len,
      }
   }

   /// Encode an optional value; `None` means "no cursor" and encodes to `None`.
   pub fn encode<V: Serialize + ?Sized>(&self, value: Option<&V>) -> Result<Option<String>> {
      value.map(|v| self.encode_value(v)).transpose()
   }

   /// Encode a value into a cursor token.
   pub fn encode_value<V: Serialize + ?Sized>(&self, value: &V) -> Result<String> {
      let bytes = serde_json::to_vec(value).map_err(Error::CursorEncoding)?;
      Ok(CURSOR_ENGINE.encode(bytes))
   }

   /// Decode an optional token; absent or empty input yields `V::default()`.
   pub fn decode<V: DeserializeOwned + Default>(&self, cursor: Option<&str>) -> Result<V> {
      match cursor {
         None | Some("") => Ok(V::default()),
         Some(token) => self.decode_value(token),
      }
   }

   /// Decode a token that must be present.
   pub fn decode_value<V: DeserializeOwned>(&self, cursor: &str) -> Result<V> {
      if cursor.is_empty() {
         return Err(malformed(cursor, "cursor is empty"));
      }

      if cursor.len() > self.max_len {
         debug!(len = cursor.len(), max = self.max_len, "rejected oversized cursor");
         return Err(Error::CursorTooLong {
            len: cursor.len(),
            max: self.max_len,
         });
      }

      let bytes = CURSOR_ENGINE.decode(cursor).map_err(|e| {
         debug!(error = %e, "rejected cursor with invalid base64url");
         malformed(cursor, &e.to_string())
      })?;

      serde_json::from_slice(&bytes).map_err(|e| match e.classify() {
         Category::Data => {
            debug!(expected = std::any::type_name::<V>(), error = %e, "cursor payload mismatch");
            Error::CursorPayloadMismatch {
               expected: std::any::type_name::<V>(),
               reason: e.to_string(),
            }
         }
         Category::Io | Category::Syntax | Category::Eof => {
            debug!(error = %e, "rejected cursor with invalid payload");
            malformed(cursor, &e.to_string())
         }
      })
   }
}

fn malformed(cursor: &str, reason: &str) -> Error {
   Error::MalformedCursor {
      cursor: cursor.chars().take(ERROR_ECHO_LEN).collect(),
      reason: reason.to_string(),
   }
}

/// Encode with the default codec.
pub fn encode_cursor<V: Serialize + ?Sized>(value: Option<&V>) -> Result<Option<String>> {
   CursorCodec::default().encode(value)
}

/// Decode with the default codec.
pub fn decode_cursor<V: DeserializeOwned + Default>(cursor: Option<&str>) -> Result<V> {
   CursorCodec::default().decode(cursor)
}
