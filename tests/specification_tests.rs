use query_spec::{
   Error, KeysetPaging, MemoryQuery, PagingMode, Predicate, QuerySpecification, SortDirection,
   Specification, SpecificationEvaluator,
};
use serde_json::{Value as JsonValue, json};

/// ```text
/// id | title   | category | score | published
/// ---|---------|----------|-------|----------
///  1 | Alpha   | science  | 95    | true
///  2 | Beta    | science  | null  | false
///  3 | Gamma   | tech     | 90    | true
///  4 | Delta   | tech     | 85    | true
///  5 | Epsilon | art      | 60    | false
/// ```
fn posts() -> Vec<JsonValue> {
   vec![
      json!({"id": 1, "title": "Alpha", "category": "science", "score": 95, "published": true}),
      json!({"id": 2, "title": "Beta", "category": "science", "score": null, "published": false}),
      json!({"id": 3, "title": "Gamma", "category": "tech", "score": 90, "published": true}),
      json!({"id": 4, "title": "Delta", "category": "tech", "score": 85, "published": true}),
      json!({"id": 5, "title": "Epsilon", "category": "art", "score": 60, "published": false}),
   ]
}

fn ids(rows: &[JsonValue]) -> Vec<i64> {
   rows.iter().filter_map(|row| row["id"].as_i64()).collect()
}

// ─── Composition ───

#[test]
fn composed_specification_filters_rows() {
   let published = Specification::<JsonValue>::new(Predicate::eq("published", true));
   let high_score = Specification::new(Predicate::gte("score", 90));
   let art = Specification::new(Predicate::eq("category", "art"));

   let spec = published.and(&high_score).or(&art);
   let matching: Vec<JsonValue> = posts()
      .into_iter()
      .filter(|post| spec.is_satisfied_by(post))
      .collect();

   assert_eq!(ids(&matching), vec![1, 3, 5]);
}

#[test]
fn negation_is_two_valued_over_nulls() {
   let spec = Specification::<JsonValue>::new(Predicate::gt("score", 80));
   let negated = spec.not();

   for post in posts() {
      assert_ne!(spec.is_satisfied_by(&post), negated.is_satisfied_by(&post));
   }
   // Null score fails `score > 80` so its negation holds
   assert!(negated.is_satisfied_by(&posts()[1]));
}

#[test]
fn predicate_tree_serializes_for_transport() {
   let predicate = Predicate::eq("category", "tech").and(Predicate::is_null("score").not());
   let wire = serde_json::to_value(&predicate).unwrap();
   let back: Predicate = serde_json::from_value(wire).unwrap();
   assert_eq!(back, predicate);
}

// ─── Construction Contract ───

#[test]
fn paging_modes_are_mutually_exclusive() {
   let err = QuerySpecification::<JsonValue>::builder()
      .order_by("id")
      .paging(0, 2)
      .keyset_paging(KeysetPaging::new("id", SortDirection::Asc, 2))
      .build()
      .unwrap_err();
   assert_eq!(err.error_code(), "CONFLICTING_PAGING_MODES");

   let spec = QuerySpecification::<JsonValue>::builder()
      .order_by("id")
      .paging(0, 2)
      .build()
      .unwrap();
   assert!(matches!(spec.paging(), PagingMode::Offset { skip: 0, take: 2 }));
   assert!(spec.keyset().is_none());
}

#[test]
fn then_by_requires_order_by() {
   let err = QuerySpecification::<JsonValue>::builder()
      .then_by("id")
      .build()
      .unwrap_err();
   assert!(matches!(err, Error::ThenByWithoutOrderBy));
}

// ─── Evaluation ───

#[test]
fn includes_never_filter() {
   let with_includes = QuerySpecification::builder()
      .criteria(Predicate::eq("published", true))
      .include("author")
      .include("comments.author")
      .order_by("id")
      .build()
      .unwrap();
   let without_includes = QuerySpecification::builder()
      .criteria(Predicate::eq("published", true))
      .order_by("id")
      .build()
      .unwrap();

   let a = SpecificationEvaluator::evaluate(MemoryQuery::new(posts()), &with_includes);
   assert_eq!(a.includes().collect::<Vec<_>>(), vec!["author", "comments.author"]);

   let b = SpecificationEvaluator::evaluate(MemoryQuery::new(posts()), &without_includes);
   assert_eq!(a.to_vec(), b.to_vec());
}

#[test]
fn ordering_with_tie_breaker() {
   let spec = QuerySpecification::builder()
      .order_by("category")
      .then_by_descending("score")
      .build()
      .unwrap();

   let rows = SpecificationEvaluator::evaluate(MemoryQuery::new(posts()), &spec).to_vec();
   assert_eq!(ids(&rows), vec![5, 1, 2, 3, 4]);
}

#[test]
fn offset_paging_applies_after_ordering() {
   let spec = QuerySpecification::builder()
      .order_by_descending("id")
      .paging(1, 2)
      .build()
      .unwrap();

   let rows = SpecificationEvaluator::evaluate(MemoryQuery::new(posts()), &spec).to_vec();
   assert_eq!(ids(&rows), vec![4, 3]);
}

#[test]
fn projection_applies_after_paging() {
   let spec = QuerySpecification::builder()
      .criteria(Predicate::is_not_null("score"))
      .order_by("score")
      .paging(0, 2)
      .build()
      .unwrap();

   let titles = SpecificationEvaluator::evaluate_with_projection(
      MemoryQuery::new(posts()),
      &spec,
      |post: JsonValue| post["title"].as_str().unwrap_or_default().to_string(),
   )
   .to_vec();

   assert_eq!(titles, vec!["Epsilon".to_string(), "Delta".to_string()]);
}

#[test]
fn text_operators_filter_case_sensitively() {
   let spec = QuerySpecification::builder()
      .criteria(Predicate::contains("title", "l"))
      .criteria(Predicate::not_in("category", ["art"]))
      .order_by("id")
      .build()
      .unwrap();

   let rows = SpecificationEvaluator::evaluate(MemoryQuery::new(posts()), &spec).to_vec();
   assert_eq!(ids(&rows), vec![1, 4]);
}
