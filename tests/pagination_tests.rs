use proptest::prelude::*;
use query_spec::{
   CursorCodec, CursorPage, Error, FieldAccess, KeysetPaging, MemoryQuery, Predicate,
   QuerySpecification, SortDirection, SpecificationEvaluator,
};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

#[derive(Debug, Clone, PartialEq)]
struct Event {
   id: i64,
   created_at: Option<i64>,
   kind: &'static str,
}

impl FieldAccess for Event {
   fn field_value(&self, field: &str) -> Option<JsonValue> {
      match field {
         "id" => Some(json!(self.id)),
         "createdAt" => Some(json!(self.created_at)),
         "kind" => Some(json!(self.kind)),
         _ => None,
      }
   }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Position {
   created_at: i64,
   id: i64,
}

/// Five events, two of which share a timestamp.
///
/// ```text
/// id | createdAt | kind
/// ---|-----------|------
///  1 | 100       | open
///  2 | 200       | push
///  3 | 200       | open
///  4 | 300       | close
///  5 | 400       | push
/// ```
fn events() -> Vec<Event> {
   vec![
      Event { id: 4, created_at: Some(300), kind: "close" },
      Event { id: 1, created_at: Some(100), kind: "open" },
      Event { id: 5, created_at: Some(400), kind: "push" },
      Event { id: 3, created_at: Some(200), kind: "open" },
      Event { id: 2, created_at: Some(200), kind: "push" },
   ]
}

fn ids(page: &CursorPage<Event>) -> Vec<i64> {
   page.items().map(|event| event.id).collect()
}

fn fetch(
   rows: Vec<Event>,
   paging: KeysetPaging,
   codec: &CursorCodec,
) -> Result<CursorPage<Event>, Error> {
   let spec = QuerySpecification::builder()
      .order_by("createdAt")
      .keyset_paging(paging)
      .build()?;
   MemoryQuery::new(rows).fetch_page(&spec, codec, false)
}

// ─── Forward Pagination ───

#[test]
fn five_rows_in_pages_of_two() {
   let codec = CursorCodec::default();
   let paging = || KeysetPaging::new("id", SortDirection::Asc, 2);

   // ── Page 1 (no cursor) ──
   let page1 = fetch(events(), paging(), &codec).unwrap();
   assert_eq!(ids(&page1), vec![1, 2]);
   assert!(page1.page_info.has_next_page);
   assert!(!page1.page_info.has_previous_page);
   assert_eq!(
      page1.page_info.end_cursor,
      Some(codec.encode_value(&Position { created_at: 200, id: 2 }).unwrap())
   );

   // ── Page 2 (cursor = row 2) ──
   let page2 = fetch(
      events(),
      paging()
         .after_token(page1.page_info.end_cursor.as_deref(), &codec)
         .unwrap(),
      &codec,
   )
   .unwrap();
   assert_eq!(ids(&page2), vec![3, 4]);
   assert!(page2.page_info.has_next_page);
   assert!(page2.page_info.has_previous_page);

   // ── Page 3 (cursor = row 4) ──
   let page3 = fetch(
      events(),
      paging()
         .after_token(page2.page_info.end_cursor.as_deref(), &codec)
         .unwrap(),
      &codec,
   )
   .unwrap();
   assert_eq!(ids(&page3), vec![5]);
   assert!(!page3.page_info.has_next_page);
   assert_eq!(page3.page_info.start_cursor, page3.page_info.end_cursor);
}

#[test]
fn every_row_cursor_resumes_after_that_row() {
   let codec = CursorCodec::default();
   let page = fetch(events(), KeysetPaging::new("id", SortDirection::Asc, 5), &codec).unwrap();
   assert_eq!(ids(&page), vec![1, 2, 3, 4, 5]);

   for (i, edge) in page.edges.iter().enumerate() {
      let next = fetch(
         events(),
         KeysetPaging::new("id", SortDirection::Asc, 5)
            .after_token(Some(&edge.cursor), &codec)
            .unwrap(),
         &codec,
      )
      .unwrap();
      assert_eq!(ids(&next), ids(&page)[i + 1..].to_vec());
   }
}

#[test]
fn descending_keyset() {
   let codec = CursorCodec::default();
   let spec = QuerySpecification::builder()
      .keyset_paging(KeysetPaging::new("id", SortDirection::Desc, 3).after(json!(4)))
      .build()
      .unwrap();

   let page = MemoryQuery::new(events()).fetch_page(&spec, &codec, false).unwrap();
   assert_eq!(ids(&page), vec![3, 2, 1]);
   assert!(!page.page_info.has_next_page);
   assert!(page.page_info.has_previous_page);
}

#[test]
fn criteria_combine_with_keyset_boundary() {
   let codec = CursorCodec::default();
   let spec = QuerySpecification::builder()
      .criteria(Predicate::ne("kind", "push"))
      .order_by("createdAt")
      .keyset_paging(
         KeysetPaging::new("id", SortDirection::Asc, 10).after(json!({"createdAt": 100, "id": 1})),
      )
      .build()
      .unwrap();

   let page = MemoryQuery::new(events()).fetch_page(&spec, &codec, true).unwrap();
   assert_eq!(ids(&page), vec![3, 4]);
   // Total ignores the cursor
   assert_eq!(page.total_count, Some(3));
}

// ─── Backward Pagination ───

#[test]
fn backward_walk_from_the_end() {
   let codec = CursorCodec::default();
   let paging = || KeysetPaging::new("id", SortDirection::Asc, 2);

   let last = fetch(
      events(),
      paging().before(json!({"createdAt": 500, "id": 6})),
      &codec,
   )
   .unwrap();
   assert_eq!(ids(&last), vec![4, 5]);
   assert!(last.page_info.has_previous_page);
   assert!(last.page_info.has_next_page);

   let middle = fetch(
      events(),
      paging()
         .before_token(last.page_info.start_cursor.as_deref(), &codec)
         .unwrap(),
      &codec,
   )
   .unwrap();
   assert_eq!(ids(&middle), vec![2, 3]);
   assert!(middle.page_info.has_previous_page);

   let first = fetch(
      events(),
      paging()
         .before_token(middle.page_info.start_cursor.as_deref(), &codec)
         .unwrap(),
      &codec,
   )
   .unwrap();
   assert_eq!(ids(&first), vec![1]);
   assert!(!first.page_info.has_previous_page);
   assert!(first.page_info.has_next_page);
}

// ─── Cursor Errors ───

#[test]
fn tampered_token_is_rejected() {
   let codec = CursorCodec::default();
   let err = KeysetPaging::new("id", SortDirection::Asc, 2)
      .after_token(Some("not*a*cursor"), &codec)
      .unwrap_err();
   assert_eq!(err.error_code(), "MALFORMED_CURSOR");
   assert!(err.is_client_error());
}

#[test]
fn cursor_for_other_keyset_is_rejected() {
   let codec = CursorCodec::default();
   let err = fetch(
      events(),
      KeysetPaging::new("id", SortDirection::Asc, 2).after(json!({"score": 1, "id": 2})),
      &codec,
   )
   .unwrap_err();
   assert!(matches!(err, Error::CursorColumnNotFound { ref column } if column == "createdAt"));

   let err = fetch(
      events(),
      KeysetPaging::new("id", SortDirection::Asc, 2).after(json!(2)),
      &codec,
   )
   .unwrap_err();
   assert!(matches!(err, Error::CursorLengthMismatch { .. }));
}

// ─── Offset Pagination ───

#[test]
fn offset_pages_cover_all_rows() {
   let codec = CursorCodec::default();
   let mut seen = Vec::new();

   for skip in (0..5).step_by(2) {
      let spec = QuerySpecification::builder()
         .order_by("createdAt")
         .then_by("id")
         .paging(skip, 2)
         .build()
         .unwrap();
      let page = MemoryQuery::new(events()).fetch_page(&spec, &codec, true).unwrap();
      assert_eq!(page.page_info.has_previous_page, skip > 0);
      assert_eq!(page.page_info.has_next_page, skip + 2 < 5);
      seen.extend(ids(&page));
   }

   assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}

// ─── No Skips, No Duplicates ───

fn walk(rows: &[Event], take: usize) -> Vec<i64> {
   let codec = CursorCodec::default();
   let mut cursor: Option<String> = None;
   let mut seen = Vec::new();

   loop {
      let paging = KeysetPaging::new("id", SortDirection::Asc, take)
         .after_token(cursor.as_deref(), &codec)
         .unwrap();
      let page = fetch(rows.to_vec(), paging, &codec).unwrap();
      seen.extend(ids(&page));

      if !page.page_info.has_next_page {
         return seen;
      }
      cursor = page.page_info.end_cursor;
   }
}

fn expected_order(rows: &[Event]) -> Vec<i64> {
   let spec = QuerySpecification::builder()
      .order_by("createdAt")
      .then_by("id")
      .build()
      .unwrap();
   SpecificationEvaluator::evaluate(MemoryQuery::new(rows.to_vec()), &spec)
      .to_vec()
      .into_iter()
      .map(|event| event.id)
      .collect()
}

#[test]
fn every_page_size_sees_each_row_once() {
   let rows = events();
   for take in 1..=6 {
      assert_eq!(walk(&rows, take), expected_order(&rows), "take = {take}");
   }
}

/// Events with missing timestamps, which sort first.
///
/// ```text
/// id | createdAt
/// ---|----------
///  1 | NULL
///  2 | NULL
///  3 | 100
///  4 | 200
/// ```
fn events_with_gaps() -> Vec<Event> {
   vec![
      Event { id: 3, created_at: Some(100), kind: "open" },
      Event { id: 1, created_at: None, kind: "open" },
      Event { id: 4, created_at: Some(200), kind: "push" },
      Event { id: 2, created_at: None, kind: "close" },
   ]
}

#[test]
fn null_sort_keys_are_paged_past() {
   let codec = CursorCodec::default();
   let paging = || KeysetPaging::new("id", SortDirection::Asc, 1);

   // ── Page 1 (no cursor) ──
   let page1 = fetch(events_with_gaps(), paging(), &codec).unwrap();
   assert_eq!(ids(&page1), vec![1]);
   assert!(page1.page_info.has_next_page);

   // ── Page 2 (cursor = {createdAt: null, id: 1}) ──
   // Boundary: createdAt IS NOT NULL OR (createdAt IS NULL AND id > 1)
   let page2 = fetch(
      events_with_gaps(),
      paging()
         .after_token(page1.page_info.end_cursor.as_deref(), &codec)
         .unwrap(),
      &codec,
   )
   .unwrap();
   assert_eq!(ids(&page2), vec![2]);
   assert!(page2.page_info.has_next_page);

   for take in 1..=5 {
      assert_eq!(walk(&events_with_gaps(), take), vec![1, 2, 3, 4], "take = {take}");
   }
}

#[test]
fn descending_walk_puts_nulls_last() {
   let codec = CursorCodec::default();
   let mut cursor: Option<String> = None;
   let mut seen = Vec::new();

   loop {
      let spec = QuerySpecification::builder()
         .order_by_descending("createdAt")
         .keyset_paging(
            KeysetPaging::new("id", SortDirection::Asc, 1)
               .after_token(cursor.as_deref(), &codec)
               .unwrap(),
         )
         .build()
         .unwrap();
      let page = MemoryQuery::new(events_with_gaps())
         .fetch_page(&spec, &codec, false)
         .unwrap();
      seen.extend(ids(&page));

      if !page.page_info.has_next_page {
         break;
      }
      cursor = page.page_info.end_cursor;
   }

   assert_eq!(seen, vec![4, 3, 1, 2]);
}

#[test]
fn rows_missing_the_sort_field_are_paged() {
   let codec = CursorCodec::default();
   let rows = vec![json!({"id": 1}), json!({"id": 2, "createdAt": 5})];
   let spec = |paging: KeysetPaging| {
      QuerySpecification::<JsonValue>::builder()
         .order_by("createdAt")
         .keyset_paging(paging)
         .build()
         .unwrap()
   };

   let page1 = MemoryQuery::new(rows.clone())
      .fetch_page(&spec(KeysetPaging::new("id", SortDirection::Asc, 1)), &codec, false)
      .unwrap();
   assert_eq!(page1.edges[0].item, json!({"id": 1}));
   assert!(page1.page_info.has_next_page);

   let page2 = MemoryQuery::new(rows)
      .fetch_page(
         &spec(
            KeysetPaging::new("id", SortDirection::Asc, 1)
               .after_token(page1.page_info.end_cursor.as_deref(), &codec)
               .unwrap(),
         ),
         &codec,
         false,
      )
      .unwrap();
   assert_eq!(page2.edges[0].item, json!({"id": 2, "createdAt": 5}));
   assert!(!page2.page_info.has_next_page);
}

proptest! {
   #[test]
   fn keyset_walk_matches_full_ordering(
      timestamps in prop::collection::vec(prop::option::of(0i64..4), 0..20),
      take in 1usize..6,
   ) {
      let rows: Vec<Event> = timestamps
         .iter()
         .enumerate()
         .map(|(i, &created_at)| Event { id: i as i64 + 1, created_at, kind: "open" })
         .collect();

      prop_assert_eq!(walk(&rows, take), expected_order(&rows));
   }
}
