//! Applies a [`QuerySpecification`] to a backend query.

use tracing::debug;

use crate::predicate::Predicate;
use crate::query::{PagingMode, QuerySpecification, SortKey};

/// A lazily composed query a specification can be applied to.
///
/// Every step consumes the query and returns the extended one; nothing is
/// executed until the backend's own fetch method runs.
pub trait QuerySource: Sized {
   /// Entity type produced by the query.
   type Item;

   fn filter(self, predicate: &Predicate) -> Self;

   /// Record an eager-load hint. Never changes which rows match.
   fn include(self, path: &str) -> Self;

   /// Start a new ordering with `key` as the primary sort key.
   fn order_by(self, key: &SortKey) -> Self;

   /// Add a tie-breaker to the current ordering.
   fn then_by(self, key: &SortKey) -> Self;

   fn skip(self, count: usize) -> Self;

   fn take(self, count: usize) -> Self;
}

/// Query paired with a projection applied to each fetched row.
#[derive(Debug, Clone)]
pub struct Projected<S, F> {
   source: S,
   selector: F,
}

impl<S, F> Projected<S, F> {
   pub fn new(source: S, selector: F) -> Self {
      Self { source, selector }
   }

   pub fn source(&self) -> &S {
      &self.source
   }

   pub fn into_parts(self) -> (S, F) {
      (self.source, self.selector)
   }
}

/// Applies specifications in a fixed order: criteria, includes, ordering,
/// then paging.
pub struct SpecificationEvaluator;

impl SpecificationEvaluator {
   /// Apply every part of `spec`.
   ///
   /// With keyset paging the ordering is the resolved keyset (reversed when
   /// paging backward) and the query takes one extra row so the page
   /// assembler can tell whether more rows follow.
   pub fn evaluate<S: QuerySource>(source: S, spec: &QuerySpecification<S::Item>) -> S {
      debug!(
         criteria = spec.criteria().len(),
         includes = spec.includes().len(),
         ordering = spec.ordering().count(),
         paging = spec.paging().kind(),
         "evaluating query specification"
      );

      let source = Self::evaluate_criteria(source, spec);
      let source = Self::apply_ordering(source, spec);
      Self::apply_paging(source, spec)
   }

   /// Apply criteria and includes only. Suitable for counting matches.
   pub fn evaluate_criteria<S: QuerySource>(source: S, spec: &QuerySpecification<S::Item>) -> S {
      let source = spec
         .criteria()
         .iter()
         .fold(source, |source, predicate| source.filter(predicate));

      spec
         .includes()
         .iter()
         .fold(source, |source, path| source.include(path))
   }

   /// Apply `spec`, then project each row with `selector`.
   ///
   /// The projection runs after paging, so it only ever sees rows on the page.
   pub fn evaluate_with_projection<S, F, U>(
      source: S,
      spec: &QuerySpecification<S::Item>,
      selector: F,
   ) -> Projected<S, F>
   where
      S: QuerySource,
      F: Fn(S::Item) -> U,
   {
      Projected::new(Self::evaluate(source, spec), selector)
   }

   fn apply_ordering<S: QuerySource>(source: S, spec: &QuerySpecification<S::Item>) -> S {
      let ordering = match spec.keyset() {
         Some(plan) => plan.fetch_ordering(),
         None => spec.ordering().cloned().collect(),
      };

      let mut keys = ordering.iter();
      match keys.next() {
         Some(primary) => keys.fold(source.order_by(primary), |source, key| source.then_by(key)),
         None => source,
      }
   }

   fn apply_paging<S: QuerySource>(source: S, spec: &QuerySpecification<S::Item>) -> S {
      match spec.paging() {
         PagingMode::None => source,
         PagingMode::Offset { skip, take } => source.skip(*skip).take(*take),
         PagingMode::Keyset(plan) => {
            let source = match plan.boundary() {
               Some(boundary) => source.filter(boundary),
               None => source,
            };
            source.take(plan.fetch_size())
         }
      }
   }
}
