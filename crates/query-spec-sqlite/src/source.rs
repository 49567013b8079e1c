//! SQLite-backed query sources.

use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use query_spec::{
   CursorCodec, CursorPage, FieldAccess, Predicate, Projected, QuerySource, QuerySpecification,
   SortKey, SpecificationEvaluator, assemble_page,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::Row;
use sqlx::sqlite::{
   SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use tracing::debug;

use crate::decode::{JsonRow, decode_rows};
use crate::sql::{build_order_by, column, quote_identifier, validate_column_name};
use crate::translate::translate;
use crate::{Error, SqliteSourceConfig};

type SqliteQueryArgs<'a> = sqlx::query::Query<'a, sqlx::Sqlite, SqliteArguments<'a>>;

/// Result returned from write operations (e.g. INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID (SQLite ROWID).
   pub last_insert_id: i64,
}

/// A SQLite database that hands out lazily built [`SqliteQuery`]s.
///
/// Cloning is cheap; clones share the pool and the include registrations
/// made before the clone.
#[derive(Debug, Clone)]
pub struct SqliteSource {
   pool: SqlitePool,
   path: Option<PathBuf>,
   includes: Arc<IndexMap<String, String>>,
}

impl SqliteSource {
   /// Open (creating if missing) a database file in WAL mode.
   pub async fn connect(
      path: impl AsRef<Path>,
      custom_config: Option<SqliteSourceConfig>,
   ) -> Result<Self, Error> {
      let path = path.as_ref();
      let config = custom_config.unwrap_or_default();

      let options = SqliteConnectOptions::new()
         .filename(path)
         .create_if_missing(true)
         .journal_mode(SqliteJournalMode::Wal);

      let pool = SqlitePoolOptions::new()
         .max_connections(config.max_connections)
         .idle_timeout(config.idle_timeout)
         .connect_with(options)
         .await?;

      debug!(path = %path.display(), max_connections = config.max_connections, "connected");

      Ok(Self {
         pool,
         path: Some(path.to_path_buf()),
         includes: Arc::new(IndexMap::new()),
      })
   }

   /// Wrap an existing pool. [`remove`](Self::remove) then only closes it.
   pub fn from_pool(pool: SqlitePool) -> Self {
      Self {
         pool,
         path: None,
         includes: Arc::new(IndexMap::new()),
      }
   }

   pub fn pool(&self) -> &SqlitePool {
      &self.pool
   }

   /// Map an include hint to a scalar select expression.
   ///
   /// The expression is added to the select list as a column named after
   /// the hint, typically a correlated subquery producing JSON:
   ///
   /// ```text
   /// (SELECT json_object('id', u.id, 'name', u.name) FROM users u WHERE u.id = posts.author_id)
   /// ```
   ///
   /// JSON text in that column is parsed back into a JSON value.
   pub fn register_include(
      &mut self,
      name: impl Into<String>,
      select_expr: impl Into<String>,
   ) -> Result<(), Error> {
      let name = name.into();
      validate_column_name(&name)?;
      Arc::make_mut(&mut self.includes).insert(name, select_expr.into());
      Ok(())
   }

   /// Start a query over `table`, decoding rows into `T`.
   pub fn table<T>(&self, table: impl Into<String>) -> SqliteQuery<T> {
      SqliteQuery {
         pool: self.pool.clone(),
         table: table.into(),
         registered: Arc::clone(&self.includes),
         filters: Vec::new(),
         includes: Vec::new(),
         ordering: Vec::new(),
         offset: 0,
         limit: None,
         _entity: PhantomData,
      }
   }

   /// Execute a write or DDL statement.
   pub async fn execute(
      &self,
      query: String,
      values: Vec<JsonValue>,
   ) -> Result<WriteQueryResult, Error> {
      let mut q = sqlx::query(&query);
      for value in values {
         q = bind_value(q, value);
      }

      let result = q.execute(&self.pool).await?;
      Ok(WriteQueryResult {
         rows_affected: result.rows_affected(),
         last_insert_id: result.last_insert_rowid(),
      })
   }

   /// Close the connection pool
   pub async fn close(self) {
      self.pool.close().await;
   }

   /// Close the connection pool and remove all database files
   pub async fn remove(self) -> Result<(), Error> {
      self.pool.close().await;

      if let Some(path) = self.path {
         for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            match std::fs::remove_file(&file) {
               Ok(()) => {}
               Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
               Err(e) => return Err(e.into()),
            }
         }
      }

      Ok(())
   }
}

/// A lazily built `SELECT` over one table.
///
/// Filters always apply to the table before ordering and paging, whatever
/// order the steps are added in. Successive `skip`/`take` calls compose like
/// iterator adapters.
pub struct SqliteQuery<T> {
   pool: SqlitePool,
   table: String,
   registered: Arc<IndexMap<String, String>>,
   filters: Vec<Predicate>,
   includes: Vec<String>,
   ordering: Vec<SortKey>,
   offset: usize,
   limit: Option<usize>,
   _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for SqliteQuery<T> {
   fn clone(&self) -> Self {
      Self {
         pool: self.pool.clone(),
         table: self.table.clone(),
         registered: Arc::clone(&self.registered),
         filters: self.filters.clone(),
         includes: self.includes.clone(),
         ordering: self.ordering.clone(),
         offset: self.offset,
         limit: self.limit,
         _entity: PhantomData,
      }
   }
}

impl<T> std::fmt::Debug for SqliteQuery<T> {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("SqliteQuery")
         .field("table", &self.table)
         .field("filters", &self.filters)
         .field("includes", &self.includes)
         .field("ordering", &self.ordering)
         .field("offset", &self.offset)
         .field("limit", &self.limit)
         .finish()
   }
}

impl<T> SqliteQuery<T> {
   fn where_clause(&self, param_offset: usize) -> Result<(String, Vec<JsonValue>), Error> {
      match Predicate::all(self.filters.iter().cloned()) {
         Some(predicate) => {
            let (condition, values) = translate(&predicate.simplified(), param_offset)?;
            Ok((format!(" WHERE {condition}"), values))
         }
         None => Ok((String::new(), Vec::new())),
      }
   }

   /// Render the query and its bind values.
   pub fn to_sql(&self) -> Result<(String, Vec<JsonValue>), Error> {
      let table = column(&self.table)?;
      let mut sql = format!("SELECT {table}.*");

      for include in &self.includes {
         let expr = self
            .registered
            .get(include)
            .ok_or_else(|| Error::UnknownInclude(include.clone()))?;
         sql.push_str(&format!(", ({expr}) AS {}", quote_identifier(include)));
      }

      sql.push_str(&format!(" FROM {table}"));

      let (where_clause, values) = self.where_clause(0)?;
      sql.push_str(&where_clause);

      if !self.ordering.is_empty() {
         sql.push(' ');
         sql.push_str(&build_order_by(&self.ordering)?);
      }

      match (self.limit, self.offset) {
         (Some(limit), 0) => sql.push_str(&format!(" LIMIT {limit}")),
         (Some(limit), offset) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
         (None, 0) => {}
         (None, offset) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
      }

      Ok((sql, values))
   }

   /// Render a `COUNT(*)` over the filtered table, ignoring ordering and paging.
   pub fn count_sql(&self) -> Result<(String, Vec<JsonValue>), Error> {
      let table = column(&self.table)?;
      let (where_clause, values) = self.where_clause(0)?;
      Ok((format!("SELECT COUNT(*) FROM {table}{where_clause}"), values))
   }

   async fn fetch_rows(&self) -> Result<Vec<JsonRow>, Error> {
      let (sql, values) = self.to_sql()?;
      debug!(sql = %sql, params = values.len(), "fetching rows");

      let mut q = sqlx::query(&sql);
      for value in values {
         q = bind_value(q, value);
      }
      let rows = q.fetch_all(&self.pool).await?;
      decode_rows(rows, &self.includes)
   }

   /// Number of rows matching the filters.
   pub async fn count(self) -> Result<u64, Error> {
      let (sql, values) = self.count_sql()?;
      debug!(sql = %sql, params = values.len(), "counting rows");

      let mut q = sqlx::query(&sql);
      for value in values {
         q = bind_value(q, value);
      }
      let row = q.fetch_one(&self.pool).await?;
      let count: i64 = row.try_get(0)?;
      Ok(u64::try_from(count).unwrap_or_default())
   }
}

impl<T: DeserializeOwned> SqliteQuery<T> {
   /// Execute the query and decode every row into `T`.
   pub async fn fetch_all(self) -> Result<Vec<T>, Error> {
      self.fetch_rows().await?.into_iter().map(row_into).collect()
   }
}

impl<T> SqliteQuery<T>
where
   T: DeserializeOwned + FieldAccess + Send + 'static,
{
   /// Evaluate `spec` against this query and fetch one page.
   pub fn paginate(self, spec: &QuerySpecification<T>) -> FetchPageBuilder<T> {
      FetchPageBuilder {
         query: self,
         spec: spec.clone(),
         codec: CursorCodec::default(),
         with_total_count: false,
      }
   }
}

impl<T> QuerySource for SqliteQuery<T> {
   type Item = T;

   fn filter(mut self, predicate: &Predicate) -> Self {
      self.filters.push(predicate.clone());
      self
   }

   fn include(mut self, path: &str) -> Self {
      if !self.includes.iter().any(|existing| existing == path) {
         self.includes.push(path.to_string());
      }
      self
   }

   fn order_by(mut self, key: &SortKey) -> Self {
      self.ordering = vec![key.clone()];
      self
   }

   fn then_by(mut self, key: &SortKey) -> Self {
      self.ordering.push(key.clone());
      self
   }

   fn skip(mut self, count: usize) -> Self {
      self.offset = self.offset.saturating_add(count);
      self.limit = self.limit.map(|limit| limit.saturating_sub(count));
      self
   }

   fn take(mut self, count: usize) -> Self {
      self.limit = Some(self.limit.map_or(count, |limit| limit.min(count)));
      self
   }
}

/// Materialise an evaluated query.
pub trait Fetch {
   type Output;

   fn fetch(self) -> impl Future<Output = Result<Vec<Self::Output>, Error>> + Send;
}

impl<T> Fetch for SqliteQuery<T>
where
   T: DeserializeOwned + Send + 'static,
{
   type Output = T;

   fn fetch(self) -> impl Future<Output = Result<Vec<T>, Error>> + Send {
      self.fetch_all()
   }
}

impl<T, F, U> Fetch for Projected<SqliteQuery<T>, F>
where
   T: DeserializeOwned + Send + 'static,
   F: Fn(T) -> U + Send + 'static,
{
   type Output = U;

   fn fetch(self) -> impl Future<Output = Result<Vec<U>, Error>> + Send {
      let (source, selector) = self.into_parts();
      async move {
         let rows = source.fetch_all().await?;
         Ok(rows.into_iter().map(selector).collect())
      }
   }
}

/// Builder for one page of a specification evaluated against SQLite.
pub struct FetchPageBuilder<T> {
   query: SqliteQuery<T>,
   spec: QuerySpecification<T>,
   codec: CursorCodec,
   with_total_count: bool,
}

impl<T> FetchPageBuilder<T>
where
   T: DeserializeOwned + FieldAccess + Send + 'static,
{
   /// Also count every row matching the criteria (one extra query).
   pub fn with_total_count(mut self) -> Self {
      self.with_total_count = true;
      self
   }

   /// Use a codec with custom limits for the page cursors.
   pub fn codec(mut self, codec: CursorCodec) -> Self {
      self.codec = codec;
      self
   }

   /// Execute and assemble the page.
   pub async fn execute(self) -> Result<CursorPage<T>, Error> {
      let total_count = if self.with_total_count {
         Some(
            SpecificationEvaluator::evaluate_criteria(self.query.clone(), &self.spec)
               .count()
               .await?,
         )
      } else {
         None
      };

      let rows = SpecificationEvaluator::evaluate(self.query, &self.spec)
         .fetch_all()
         .await?;

      Ok(assemble_page(&self.spec, rows, total_count, &self.codec)?)
   }
}

impl<T> IntoFuture for FetchPageBuilder<T>
where
   T: DeserializeOwned + FieldAccess + Send + 'static,
{
   type Output = Result<CursorPage<T>, Error>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.execute())
   }
}

fn row_into<T: DeserializeOwned>(row: JsonRow) -> Result<T, Error> {
   let object: serde_json::Map<String, JsonValue> = row.into_iter().collect();
   Ok(serde_json::from_value(JsonValue::Object(object))?)
}

/// Helper function to bind a JSON value to a SQLx query
pub(crate) fn bind_value(query: SqliteQueryArgs<'_>, value: JsonValue) -> SqliteQueryArgs<'_> {
   match value {
      JsonValue::Null => query.bind(None::<String>),
      // SQLite has no boolean storage class; TRUE is 1
      JsonValue::Bool(flag) => query.bind(i64::from(flag)),
      JsonValue::String(text) => query.bind(text),
      JsonValue::Number(number) => {
         // Preserve integer precision by binding as i64 when possible
         if let Some(int_val) = number.as_i64() {
            query.bind(int_val)
         } else if let Some(uint_val) = number.as_u64() {
            // Value too large for i64, use f64 (will lose precision)
            query.bind(uint_val as f64)
         } else {
            query.bind(number.as_f64().unwrap_or_default())
         }
      }
      other => query.bind(other),
   }
}
