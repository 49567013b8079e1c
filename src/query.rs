//! Query specifications: filters plus ordering, eager-load hints and paging.
//!
//! A [`QuerySpecification`] is assembled once through a
//! [`QuerySpecificationBuilder`] and is read-only afterwards. Contract
//! violations (mixing paging modes, secondary ordering without a primary)
//! are caught by [`QuerySpecificationBuilder::build`], so an evaluator only
//! ever sees a consistent specification.
//!
//! # Example
//!
//! ```
//! use query_spec::{KeysetPaging, Predicate, QuerySpecification, SortDirection};
//! use serde_json::Value;
//!
//! let spec = QuerySpecification::<Value>::builder()
//!     .criteria(Predicate::eq("category", "tech"))
//!     .order_by("createdAt")
//!     .then_by("id")
//!     .include("author")
//!     .keyset_paging(KeysetPaging::new("id", SortDirection::Asc, 20))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(spec.ordering().count(), 2);
//! ```

use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::keyset::{KeysetPaging, KeysetPlan};
use crate::predicate::Predicate;
use crate::specification::Specification;
use crate::value::FieldAccess;
use crate::{Error, PaginationConfig, Result};

/// Sort direction for an ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
   /// Ascending order (smallest first)
   Asc,
   /// Descending order (largest first)
   Desc,
}

impl SortDirection {
   /// Return the opposite sort direction.
   pub fn reversed(self) -> Self {
      match self {
         SortDirection::Asc => SortDirection::Desc,
         SortDirection::Desc => SortDirection::Asc,
      }
   }

   /// Apply this direction to an ascending comparison result.
   pub fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
      match self {
         SortDirection::Asc => ordering,
         SortDirection::Desc => ordering.reverse(),
      }
   }
}

/// A field and the direction it is sorted in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
   /// Field name as exposed by the entity or result set
   pub field: String,
   /// Sort direction for this field
   pub direction: SortDirection,
}

impl SortKey {
   pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
      Self {
         field: field.into(),
         direction,
      }
   }

   /// Create a sort key with ascending sort direction.
   pub fn asc(field: impl Into<String>) -> Self {
      Self::new(field, SortDirection::Asc)
   }

   /// Create a sort key with descending sort direction.
   pub fn desc(field: impl Into<String>) -> Self {
      Self::new(field, SortDirection::Desc)
   }

   /// Same field, opposite direction.
   #[must_use]
   pub fn reversed(&self) -> Self {
      Self::new(self.field.clone(), self.direction.reversed())
   }
}

/// Active pagination mode. Exactly one is set per specification.
#[derive(Debug, Clone, PartialEq)]
pub enum PagingMode {
   None,
   Offset { skip: usize, take: usize },
   Keyset(KeysetPlan),
}

impl PagingMode {
   /// Short name used in logs.
   pub fn kind(&self) -> &'static str {
      match self {
         PagingMode::None => "none",
         PagingMode::Offset { .. } => "offset",
         PagingMode::Keyset(_) => "keyset",
      }
   }
}

/// Paging requested on the builder, before validation.
enum RequestedPaging {
   Offset { skip: usize, take: usize },
   Keyset(KeysetPaging),
}

/// Immutable query description: filters, includes, ordering and paging.
pub struct QuerySpecification<T> {
   criteria: Vec<Predicate>,
   filter: Specification<T>,
   order_by: Option<SortKey>,
   then_by: Vec<SortKey>,
   includes: IndexSet<String>,
   paging: PagingMode,
   _entity: PhantomData<fn(&T) -> bool>,
}

impl<T> QuerySpecification<T> {
   /// Start building a specification with default limits.
   pub fn builder() -> QuerySpecificationBuilder<T> {
      QuerySpecificationBuilder::new(PaginationConfig::default())
   }

   /// Start building a specification with custom limits.
   pub fn builder_with_config(config: PaginationConfig) -> QuerySpecificationBuilder<T> {
      QuerySpecificationBuilder::new(config)
   }

   /// Filter criteria in insertion order; all of them must hold.
   pub fn criteria(&self) -> &[Predicate] {
      &self.criteria
   }

   /// The criteria folded into one predicate, or `None` when unfiltered.
   pub fn filter_predicate(&self) -> Option<Predicate> {
      Predicate::all(self.criteria.iter().cloned())
   }

   /// The criteria as a single specification.
   pub fn as_specification(&self) -> Specification<T> {
      self.filter.clone()
   }

   pub fn order_by(&self) -> Option<&SortKey> {
      self.order_by.as_ref()
   }

   pub fn then_by(&self) -> &[SortKey] {
      &self.then_by
   }

   /// Primary key followed by every secondary key.
   pub fn ordering(&self) -> impl Iterator<Item = &SortKey> {
      self.order_by.iter().chain(self.then_by.iter())
   }

   /// Eager-load hints in the order they were added.
   pub fn includes(&self) -> &IndexSet<String> {
      &self.includes
   }

   pub fn paging(&self) -> &PagingMode {
      &self.paging
   }

   /// The keyset plan when keyset paging is active.
   pub fn keyset(&self) -> Option<&KeysetPlan> {
      match &self.paging {
         PagingMode::Keyset(plan) => Some(plan),
         _ => None,
      }
   }
}

impl<T: FieldAccess + 'static> QuerySpecification<T> {
   /// Check an entity against the criteria only (ordering and paging ignored).
   pub fn is_satisfied_by(&self, entity: &T) -> bool {
      self.filter.is_satisfied_by(entity)
   }
}

impl<T> Clone for QuerySpecification<T> {
   fn clone(&self) -> Self {
      Self {
         criteria: self.criteria.clone(),
         filter: self.filter.clone(),
         order_by: self.order_by.clone(),
         then_by: self.then_by.clone(),
         includes: self.includes.clone(),
         paging: self.paging.clone(),
         _entity: PhantomData,
      }
   }
}

impl<T> fmt::Debug for QuerySpecification<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("QuerySpecification")
         .field("criteria", &self.criteria)
         .field("order_by", &self.order_by)
         .field("then_by", &self.then_by)
         .field("includes", &self.includes)
         .field("paging", &self.paging)
         .finish()
   }
}

/// Mutable builder for a [`QuerySpecification`].
///
/// Methods chain by value. The first contract violation is remembered and
/// returned from [`build`](Self::build); later calls cannot clear it.
pub struct QuerySpecificationBuilder<T> {
   config: PaginationConfig,
   criteria: Vec<Predicate>,
   order_by: Option<SortKey>,
   then_by: Vec<SortKey>,
   includes: IndexSet<String>,
   paging: Option<RequestedPaging>,
   violation: Option<Error>,
   _entity: PhantomData<fn(&T) -> bool>,
}

impl<T> QuerySpecificationBuilder<T> {
   fn new(config: PaginationConfig) -> Self {
      Self {
         config,
         criteria: Vec::new(),
         order_by: None,
         then_by: Vec::new(),
         includes: IndexSet::new(),
         paging: None,
         violation: None,
         _entity: PhantomData,
      }
   }

   fn violate(mut self, error: Error) -> Self {
      if self.violation.is_none() {
         self.violation = Some(error);
      }
      self
   }

   /// Add a filter criterion, AND-ed with the others.
   pub fn criteria(mut self, predicate: impl Into<Predicate>) -> Self {
      self.criteria.push(predicate.into());
      self
   }

   /// Set the primary ordering (ascending), replacing any previous primary.
   pub fn order_by(mut self, field: impl Into<String>) -> Self {
      self.order_by = Some(SortKey::asc(field));
      self
   }

   /// Set the primary ordering (descending), replacing any previous primary.
   pub fn order_by_descending(mut self, field: impl Into<String>) -> Self {
      self.order_by = Some(SortKey::desc(field));
      self
   }

   /// Append an ascending secondary ordering.
   pub fn then_by(self, field: impl Into<String>) -> Self {
      self.push_then_by(SortKey::asc(field))
   }

   /// Append a descending secondary ordering.
   pub fn then_by_descending(self, field: impl Into<String>) -> Self {
      self.push_then_by(SortKey::desc(field))
   }

   fn push_then_by(mut self, key: SortKey) -> Self {
      if self.order_by.is_none() {
         return self.violate(Error::ThenByWithoutOrderBy);
      }
      self.then_by.push(key);
      self
   }

   /// Add an eager-load hint, passed through to the backend untouched.
   pub fn include(mut self, path: impl Into<String>) -> Self {
      self.includes.insert(path.into());
      self
   }

   /// Use offset paging.
   pub fn paging(mut self, skip: usize, take: usize) -> Self {
      if matches!(self.paging, Some(RequestedPaging::Keyset(_))) {
         return self.violate(Error::ConflictingPagingModes);
      }
      self.paging = Some(RequestedPaging::Offset { skip, take });
      self
   }

   /// Use keyset paging.
   pub fn keyset_paging(mut self, paging: KeysetPaging) -> Self {
      if matches!(self.paging, Some(RequestedPaging::Offset { .. })) {
         return self.violate(Error::ConflictingPagingModes);
      }
      self.paging = Some(RequestedPaging::Keyset(paging));
      self
   }

   fn check_take(&self, take: usize) -> Result<()> {
      if take == 0 {
         return Err(Error::InvalidPageSize);
      }
      if take > self.config.max_page_size {
         return Err(Error::PageSizeExceeded {
            requested: take,
            max: self.config.max_page_size,
         });
      }
      Ok(())
   }

   /// Validate and freeze the specification.
   pub fn build(mut self) -> Result<QuerySpecification<T>> {
      if let Some(violation) = self.violation.take() {
         return Err(violation);
      }

      let paging = match self.paging.take() {
         None => PagingMode::None,
         Some(RequestedPaging::Offset { skip, take }) => {
            self.check_take(take)?;
            PagingMode::Offset { skip, take }
         }
         Some(RequestedPaging::Keyset(keyset)) => {
            self.check_take(keyset.take)?;
            self.supplement_ordering(&keyset.property)?;
            let ordering: Vec<SortKey> =
               self.order_by.iter().chain(self.then_by.iter()).cloned().collect();
            PagingMode::Keyset(KeysetPlan::resolve(keyset, ordering)?)
         }
      };

      let filter = match Predicate::all(self.criteria.iter().cloned()) {
         Some(predicate) => Specification::new(predicate),
         None => Specification::all(),
      };

      Ok(QuerySpecification {
         criteria: self.criteria,
         filter,
         order_by: self.order_by,
         then_by: self.then_by,
         includes: self.includes,
         paging,
         _entity: PhantomData,
      })
   }

   /// Make the keyset property part of the ordering.
   ///
   /// It becomes the primary key when nothing is ordered yet, otherwise the
   /// last tie-breaker unless it is already ordered.
   fn supplement_ordering(&mut self, property: &SortKey) -> Result<()> {
      let existing = self
         .order_by
         .iter()
         .chain(self.then_by.iter())
         .find(|key| key.field == property.field);

      match existing {
         Some(key) if key.direction != property.direction => Err(Error::KeysetOrderConflict {
            field: property.field.clone(),
         }),
         Some(_) => Ok(()),
         None => {
            if self.order_by.is_none() {
               self.order_by = Some(property.clone());
            } else {
               self.then_by.push(property.clone());
            }
            Ok(())
         }
      }
   }
}
