//! Composable specifications over an entity type.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use crate::predicate::{FieldTest, Predicate};
use crate::value::FieldAccess;

type Compiled<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// A boolean test over `T` backed by an inspectable [`Predicate`] tree.
///
/// Combinators return new specifications and never modify their operands.
/// [`is_satisfied_by`](Self::is_satisfied_by) compiles the tree on first use
/// and reuses the compiled form afterwards, including from clones.
///
/// ```
/// use query_spec::{Predicate, Specification};
/// use serde_json::json;
///
/// let published = Specification::<serde_json::Value>::new(Predicate::eq("published", true));
/// let popular = Specification::new(Predicate::gte("score", 100));
/// let spec = published.and(&popular);
///
/// assert!(spec.is_satisfied_by(&json!({"published": true, "score": 150})));
/// assert!(!spec.is_satisfied_by(&json!({"published": true, "score": 10})));
/// ```
pub struct Specification<T> {
   predicate: Arc<Predicate>,
   compiled: Arc<OnceLock<Compiled<T>>>,
   _entity: PhantomData<fn(&T) -> bool>,
}

impl<T> Specification<T> {
   pub fn new(predicate: Predicate) -> Self {
      Self {
         predicate: Arc::new(predicate),
         compiled: Arc::new(OnceLock::new()),
         _entity: PhantomData,
      }
   }

   /// Specification satisfied by every entity.
   pub fn all() -> Self {
      Self::new(Predicate::True)
   }

   /// The underlying expression tree.
   pub fn predicate(&self) -> &Predicate {
      &self.predicate
   }

   #[must_use]
   pub fn and(&self, other: &Specification<T>) -> Self {
      Self::new(Predicate::And(
         Box::new(self.predicate().clone()),
         Box::new(other.predicate().clone()),
      ))
   }

   #[must_use]
   pub fn or(&self, other: &Specification<T>) -> Self {
      Self::new(Predicate::Or(
         Box::new(self.predicate().clone()),
         Box::new(other.predicate().clone()),
      ))
   }

   #[must_use]
   #[allow(clippy::should_implement_trait)]
   pub fn not(&self) -> Self {
      Self::new(Predicate::Not(Box::new(self.predicate().clone())))
   }
}

impl<T: FieldAccess + 'static> Specification<T> {
   /// Check an entity against the specification.
   pub fn is_satisfied_by(&self, entity: &T) -> bool {
      let compiled = self.compiled.get_or_init(|| compile(&self.predicate));
      compiled(entity)
   }

   /// Whether the compiled form has been built yet.
   pub fn is_compiled(&self) -> bool {
      self.compiled.get().is_some()
   }
}

/// Turn a tree into nested closures, resolving each node once.
fn compile<T: FieldAccess + 'static>(predicate: &Predicate) -> Compiled<T> {
   match predicate {
      Predicate::True => Box::new(|_: &T| true),
      Predicate::Leaf(test) => compile_leaf(test.clone()),
      Predicate::And(left, right) => {
         let left = compile::<T>(left);
         let right = compile::<T>(right);
         Box::new(move |entity: &T| left(entity) && right(entity))
      }
      Predicate::Or(left, right) => {
         let left = compile::<T>(left);
         let right = compile::<T>(right);
         Box::new(move |entity: &T| left(entity) || right(entity))
      }
      Predicate::Not(inner) => {
         let inner = compile::<T>(inner);
         Box::new(move |entity: &T| !inner(entity))
      }
   }
}

fn compile_leaf<T: FieldAccess + 'static>(test: FieldTest) -> Compiled<T> {
   Box::new(move |entity: &T| test.matches(entity.field_value(&test.field).as_ref()))
}

impl<T> Clone for Specification<T> {
   fn clone(&self) -> Self {
      Self {
         predicate: Arc::clone(&self.predicate),
         compiled: Arc::clone(&self.compiled),
         _entity: PhantomData,
      }
   }
}

impl<T> fmt::Debug for Specification<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Specification")
         .field("predicate", &self.predicate)
         .finish()
   }
}

impl<T> PartialEq for Specification<T> {
   fn eq(&self, other: &Self) -> bool {
      self.predicate == other.predicate
   }
}

impl<T> From<Predicate> for Specification<T> {
   fn from(predicate: Predicate) -> Self {
      Self::new(predicate)
   }
}

impl<T> From<Specification<T>> for Predicate {
   fn from(spec: Specification<T>) -> Self {
      Arc::unwrap_or_clone(spec.predicate)
   }
}

impl<T> From<&Specification<T>> for Predicate {
   fn from(spec: &Specification<T>) -> Self {
      spec.predicate().clone()
   }
}
