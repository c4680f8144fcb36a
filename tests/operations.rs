//! Operations Tests
//!
//! Exercises `SearchOperations` end to end against a `ScriptedTransport`:
//! the exact requests sent (method, path, params, body) and how engine
//! responses come back as entities, hits and errors.
//!
//! Run with: `cargo test --test operations`

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use search_odm::operations::{AliasAction, AliasActionParameters, AliasActions};
use search_odm::query::{
    Conflicts, Criteria, DeleteQuery, IndexQuery, Query, QueryOptions, SearchTemplateQuery, UpdateQuery, UpdateScript,
};
use search_odm::transport::{EngineResponse, Method, RequestBody, ScriptedTransport, TransportError};
use search_odm::{
    Entity, EntityMetadata, FieldNamingStrategy, IndexCoordinates, OdmError, RefreshPolicy, SearchOdmConfig,
    SearchOperations, SeqNoPrimaryTerm,
};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Book {
    id: Option<String>,
    title: String,
    year: i32,
    seq: Option<SeqNoPrimaryTerm>,
}

impl Book {
    fn new(title: &str, year: i32) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            year,
            seq: None,
        }
    }
}

impl Entity for Book {
    fn metadata() -> EntityMetadata {
        EntityMetadata::builder("Book", "books")
            .id("id")
            .seq_no_primary_term("seq")
            .text("title")
            .integer("year")
            .build()
            .expect("valid metadata")
    }
}

/// Routed by its book, camelCase in Rust and snake_case in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Chapter {
    id: Option<String>,
    book_id: String,
    chapter_title: String,
    /// Not declared in the mapping
    word_count: u32,
    seq: Option<SeqNoPrimaryTerm>,
}

impl Entity for Chapter {
    fn metadata() -> EntityMetadata {
        EntityMetadata::builder("Chapter", "chapters")
            .id("id")
            .routing("bookId")
            .seq_no_primary_term("seq")
            .keyword("bookId")
            .text("chapterTitle")
            .build()
            .expect("valid metadata")
    }
}

fn snake_case_setup() -> (Arc<ScriptedTransport>, SearchOperations) {
    setup(SearchOdmConfig {
        field_naming: FieldNamingStrategy::SnakeCase,
        ..Default::default()
    })
}

fn setup(config: SearchOdmConfig) -> (Arc<ScriptedTransport>, SearchOperations) {
    let transport = Arc::new(ScriptedTransport::new());
    let ops = SearchOperations::new(transport.clone(), config);
    (transport, ops)
}

fn default_setup() -> (Arc<ScriptedTransport>, SearchOperations) {
    setup(SearchOdmConfig::default())
}

fn hit(id: &str, title: &str, year: i32) -> Value {
    json!({
        "_index": "books", "_id": id, "_score": 1.0,
        "_seq_no": 1, "_primary_term": 1,
        "_source": {"title": title, "year": year}
    })
}

fn search_body(scroll_id: Option<&str>, hits: Vec<Value>) -> Value {
    let mut body = json!({
        "took": 1,
        "hits": {"total": {"value": hits.len(), "relation": "eq"}, "max_score": 1.0, "hits": hits}
    });
    if let Some(id) = scroll_id {
        body["_scroll_id"] = json!(id);
    }
    body
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

// =============================================================================
// Document API
// =============================================================================

#[tokio::test]
async fn save_without_id_posts_and_populates_ids() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::new(
        201,
        Some(json!({"_index": "books", "_id": "abc", "_version": 1, "_seq_no": 0, "_primary_term": 1, "result": "created"})),
    ));

    let saved = ops.save(Book::new("Dune", 1965)).await.unwrap();

    assert_eq!(saved.id.as_deref(), Some("abc"));
    assert_eq!(saved.seq, Some(SeqNoPrimaryTerm { seq_no: 0, primary_term: 1 }));

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "/books/_doc");
    assert!(request.params.is_empty());
    assert_eq!(request.json_body().unwrap()["title"], "Dune");
}

#[tokio::test]
async fn save_with_seq_no_uses_optimistic_locking_and_refresh_policy() {
    let (transport, ops) = setup(SearchOdmConfig {
        refresh_policy: RefreshPolicy::Immediate,
        ..Default::default()
    });
    transport.push(EngineResponse::ok(
        json!({"_id": "1", "_version": 2, "_seq_no": 4, "_primary_term": 1, "result": "updated"}),
    ));

    let book = Book {
        id: Some("1".into()),
        seq: Some(SeqNoPrimaryTerm { seq_no: 3, primary_term: 1 }),
        ..Book::new("Dune", 1965)
    };
    let saved = ops.save(book).await.unwrap();
    assert_eq!(saved.seq, Some(SeqNoPrimaryTerm { seq_no: 4, primary_term: 1 }));

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.path, "/books/_doc/1");
    assert_eq!(param(&request.params, "if_seq_no"), Some("3"));
    assert_eq!(param(&request.params, "if_primary_term"), Some("1"));
    assert_eq!(param(&request.params, "refresh"), Some("true"));
}

#[tokio::test]
async fn save_version_conflict_is_typed() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::new(
        409,
        Some(json!({
            "error": {"type": "version_conflict_engine_exception", "reason": "[1]: version conflict"},
            "status": 409
        })),
    ));

    let book = Book {
        id: Some("1".into()),
        ..Book::new("Dune", 1965)
    };
    let err = ops.save(book).await.unwrap_err();
    assert!(err.is_version_conflict());
}

#[tokio::test]
async fn index_prefix_applies_to_paths() {
    let (transport, ops) = setup(SearchOdmConfig {
        index_prefix: Some("test-".into()),
        ..Default::default()
    });
    transport.push(EngineResponse::ok(json!({"_id": "1", "result": "created"})));

    ops.save(Book {
        id: Some("1".into()),
        ..Book::new("Dune", 1965)
    })
    .await
    .unwrap();

    assert_eq!(transport.last_request().unwrap().path, "/test-books/_doc/1");
}

#[tokio::test]
async fn get_reads_entity_with_counters() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({
        "_index": "books", "_id": "7", "_version": 1, "_seq_no": 2, "_primary_term": 1,
        "found": true, "_source": {"title": "Dune", "year": 1965}
    })));

    let book: Book = ops.get("7").await.unwrap().unwrap();
    assert_eq!(book.id.as_deref(), Some("7"));
    assert_eq!(book.title, "Dune");
    assert_eq!(book.seq, Some(SeqNoPrimaryTerm { seq_no: 2, primary_term: 1 }));

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.path, "/books/_doc/7");
}

#[tokio::test]
async fn get_missing_document_or_index_is_none() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::new(404, Some(json!({"_id": "x", "found": false}))));
    transport.push(EngineResponse::new(
        404,
        Some(json!({"error": {"type": "index_not_found_exception", "reason": "no such index"}, "status": 404})),
    ));

    assert!(ops.get::<Book>("x").await.unwrap().is_none());
    assert!(ops.get::<Book>("x").await.unwrap().is_none());
}

#[tokio::test]
async fn get_encodes_id_segment() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::new(404, None));

    ops.get::<Book>("a/b c").await.unwrap();
    assert_eq!(transport.last_request().unwrap().path, "/books/_doc/a%2Fb%20c");
}

#[tokio::test]
async fn multi_get_skips_missing() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({"docs": [
        {"_index": "books", "_id": "1", "found": true, "_source": {"title": "Dune", "year": 1965}},
        {"_index": "books", "_id": "2", "found": false}
    ]})));

    let books: Vec<Book> = ops.multi_get(&["1", "2"]).await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id.as_deref(), Some("1"));

    let request = transport.last_request().unwrap();
    assert_eq!(request.path, "/books/_mget");
    assert_eq!(request.json_body().unwrap(), &json!({"ids": ["1", "2"]}));
}

#[tokio::test]
async fn exists_uses_head() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::status_only(200));
    transport.push(EngineResponse::status_only(404));

    assert!(ops.exists::<Book>("1").await.unwrap());
    assert!(!ops.exists::<Book>("2").await.unwrap());
    assert!(transport.requests().iter().all(|r| r.method == Method::Head));
}

#[tokio::test]
async fn delete_missing_is_none() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({"_id": "1", "result": "deleted"})));
    transport.push(EngineResponse::new(404, Some(json!({"_id": "2", "result": "not_found"}))));

    assert_eq!(ops.delete::<Book>("1").await.unwrap().as_deref(), Some("1"));
    assert_eq!(ops.delete::<Book>("2").await.unwrap(), None);
}

#[tokio::test]
async fn update_entity_sends_partial_document() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(
        json!({"_index": "books", "_id": "1", "_version": 3, "_seq_no": 5, "_primary_term": 1, "result": "updated"}),
    ));

    let book = Book {
        id: Some("1".into()),
        ..Book::new("Dune Messiah", 1969)
    };
    let response = ops.update_entity(&book).await.unwrap();
    assert_eq!(response.seq_no, Some(5));

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "/books/_update/1");
    assert_eq!(request.json_body().unwrap()["doc"]["title"], "Dune Messiah");
}

#[tokio::test]
async fn update_entity_sends_routing_and_seq_no() {
    let (transport, ops) = snake_case_setup();
    transport.push(EngineResponse::ok(
        json!({"_index": "chapters", "_id": "c1", "_version": 2, "_seq_no": 4, "_primary_term": 1, "result": "updated"}),
    ));

    let chapter = Chapter {
        id: Some("c1".into()),
        book_id: "b1".into(),
        chapter_title: "Arrakis".into(),
        word_count: 5000,
        seq: Some(SeqNoPrimaryTerm { seq_no: 3, primary_term: 1 }),
    };
    ops.update_entity(&chapter).await.unwrap();

    let request = transport.last_request().unwrap();
    assert_eq!(request.path, "/chapters/_update/c1");
    assert_eq!(param(&request.params, "routing"), Some("b1"));
    assert_eq!(param(&request.params, "if_seq_no"), Some("3"));
    assert_eq!(param(&request.params, "if_primary_term"), Some("1"));
    let doc = &request.json_body().unwrap()["doc"];
    assert_eq!(doc["chapter_title"], "Arrakis");
    assert!(doc.get("id").is_none());
}

#[tokio::test]
async fn undeclared_fields_round_trip_under_snake_case() {
    let (transport, ops) = snake_case_setup();
    transport.push(EngineResponse::new(
        201,
        Some(json!({"_index": "chapters", "_id": "c9", "_version": 1, "_seq_no": 0, "_primary_term": 1, "result": "created"})),
    ));

    let chapter = Chapter {
        id: None,
        book_id: "b1".into(),
        chapter_title: "Arrakis".into(),
        word_count: 5000,
        seq: None,
    };
    let saved = ops.save(chapter.clone()).await.unwrap();

    let body = transport.last_request().unwrap().json_body().unwrap().clone();
    assert_eq!(body, json!({"book_id": "b1", "chapter_title": "Arrakis", "word_count": 5000}));

    transport.push(EngineResponse::ok(json!({
        "_index": "chapters", "_id": "c9", "_version": 1, "_seq_no": 0, "_primary_term": 1,
        "found": true, "_source": body
    })));
    let read: Chapter = ops.get("c9").await.unwrap().unwrap();
    assert_eq!(read, saved);
    assert_eq!(read.word_count, 5000);
}

#[tokio::test]
async fn refresh_policy_can_be_overridden_per_instance_and_request() {
    let (transport, ops) = setup(SearchOdmConfig {
        refresh_policy: RefreshPolicy::Immediate,
        ..Default::default()
    });
    let created = || {
        EngineResponse::new(
            201,
            Some(json!({"_id": "1", "_version": 1, "_seq_no": 0, "_primary_term": 1, "result": "created"})),
        )
    };
    let deleted = || EngineResponse::ok(json!({"took": 1, "total": 0, "deleted": 0, "failures": []}));

    // Instance override drops the configured refresh
    let quiet = ops.with_refresh_policy(RefreshPolicy::None);
    transport.push(created());
    quiet.save(Book::new("Dune", 1965)).await.unwrap();
    assert_eq!(param(&transport.last_request().unwrap().params, "refresh"), None);

    transport.push(deleted());
    quiet.delete_by_query::<Book>(&Query::match_all()).await.unwrap();
    assert_eq!(param(&transport.last_request().unwrap().params, "refresh"), None);

    // The original keeps its policy, by-query deletes included
    transport.push(deleted());
    ops.delete_by_query::<Book>(&Query::match_all()).await.unwrap();
    assert_eq!(param(&transport.last_request().unwrap().params, "refresh"), Some("true"));

    // Request settings win over both
    let books = IndexCoordinates::of("books");
    transport.push(created());
    let query = IndexQuery::new(serde_json::Map::new()).refresh(RefreshPolicy::WaitUntil);
    quiet.index(query, &books).await.unwrap();
    assert_eq!(param(&transport.last_request().unwrap().params, "refresh"), Some("wait_for"));

    transport.push(deleted());
    let delete = DeleteQuery::new(Query::match_all()).refresh(RefreshPolicy::None);
    ops.delete_by_query_in(delete, &books).await.unwrap();
    assert_eq!(param(&transport.last_request().unwrap().params, "refresh"), None);
}

#[tokio::test]
async fn update_by_query_sends_script_and_conflicts() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(
        json!({"took": 4, "total": 3, "updated": 2, "version_conflicts": 1, "failures": []}),
    ));

    let update = UpdateQuery::for_query(Criteria::field("year").less_than(1900))
        .script(UpdateScript::inline("ctx._source.year += 1"))
        .conflicts(Conflicts::Proceed);
    let response = ops.update_by_query(update, &IndexCoordinates::of("books")).await.unwrap();
    assert_eq!(response.updated, 2);
    assert_eq!(response.version_conflicts, 1);

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "/books/_update_by_query");
    assert_eq!(param(&request.params, "conflicts"), Some("proceed"));
    let body = request.json_body().unwrap();
    assert_eq!(body["script"]["source"], "ctx._source.year += 1");
    assert_eq!(body["query"]["range"]["year"]["lt"], 1900);
}

#[tokio::test]
async fn delete_by_query_posts_translated_query() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({"took": 3, "total": 2, "deleted": 2, "failures": []})));

    let query = Query::from(Criteria::field("year").less_than(1900));
    let response = ops.delete_by_query::<Book>(&query).await.unwrap();
    assert_eq!(response.deleted, 2);

    let request = transport.last_request().unwrap();
    assert_eq!(request.path, "/books/_delete_by_query");
    assert!(request.json_body().unwrap().get("query").is_some());
}

#[tokio::test]
async fn save_all_reports_bulk_failures() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({
        "took": 5, "errors": true,
        "items": [
            {"index": {"_index": "books", "_id": "a", "_seq_no": 0, "_primary_term": 1, "status": 201}},
            {"index": {"_index": "books", "_id": "b", "status": 400,
                       "error": {"type": "mapper_parsing_exception", "reason": "failed to parse field [year]"}}}
        ]
    })));

    let err = ops
        .save_all(vec![Book::new("Dune", 1965), Book::new("Emma", 1815)])
        .await
        .unwrap_err();
    match err {
        OdmError::BulkFailure { failed, .. } => {
            assert_eq!(failed.len(), 1);
            assert!(failed["b"].contains("mapper_parsing_exception"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let request = transport.last_request().unwrap();
    assert_eq!(request.path, "/_bulk");
    match request.body {
        Some(RequestBody::NdJson(lines)) => assert_eq!(lines.len(), 4),
        other => panic!("expected ndjson body, got {other:?}"),
    }
}

#[tokio::test]
async fn save_all_populates_ids_from_items() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({
        "took": 5, "errors": false,
        "items": [
            {"index": {"_id": "a", "_seq_no": 0, "_primary_term": 1, "status": 201}},
            {"index": {"_id": "b", "_seq_no": 1, "_primary_term": 1, "status": 201}}
        ]
    })));

    let saved = ops
        .save_all(vec![Book::new("Dune", 1965), Book::new("Emma", 1815)])
        .await
        .unwrap();
    assert_eq!(saved[0].id.as_deref(), Some("a"));
    assert_eq!(saved[1].seq, Some(SeqNoPrimaryTerm { seq_no: 1, primary_term: 1 }));
}

#[tokio::test]
async fn count_returns_engine_count() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({"count": 3})));

    assert_eq!(ops.count::<Book>(&Query::match_all()).await.unwrap(), 3);
    assert_eq!(transport.last_request().unwrap().path, "/books/_count");
}

// =============================================================================
// Search API
// =============================================================================

#[tokio::test]
async fn search_reads_hits() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(search_body(
        None,
        vec![hit("1", "Dune", 1965), hit("2", "Dune Messiah", 1969)],
    )));

    let query = Query::from(Criteria::field("title").is("dune"));
    let hits = ops.search::<Book>(&query).await.unwrap();

    assert_eq!(hits.total_hits, 2);
    let titles: Vec<&str> = hits.contents().iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Dune", "Dune Messiah"]);
    assert_eq!(hits.hits[0].content.id.as_deref(), Some("1"));

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "/books/_search");
    assert!(request.json_body().unwrap().get("query").is_some());
}

#[tokio::test]
async fn search_missing_index_is_typed_error() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::new(
        404,
        Some(json!({
            "error": {"type": "index_not_found_exception", "reason": "no such index [books]", "index": "books"},
            "status": 404
        })),
    ));

    let err = ops.search::<Book>(&Query::match_all()).await.unwrap_err();
    assert!(matches!(err, OdmError::NoSuchIndex(ref index) if index == "books"));
}

#[tokio::test]
async fn transport_errors_propagate() {
    let (transport, ops) = default_setup();
    transport.push_error(TransportError::Timeout("read".into()));

    let err = ops.search::<Book>(&Query::match_all()).await.unwrap_err();
    assert!(matches!(err, OdmError::Transport(_)));
}

#[tokio::test]
async fn search_one_requests_single_hit() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(search_body(None, vec![hit("1", "Dune", 1965)])));

    let first = ops.search_one::<Book>(&Query::match_all()).await.unwrap().unwrap();
    assert_eq!(first.content.title, "Dune");
    assert_eq!(transport.last_request().unwrap().json_body().unwrap()["size"], 1);
}

#[tokio::test]
async fn search_for_page_keeps_pageable() {
    let (transport, ops) = default_setup();
    let mut body = search_body(None, vec![hit("1", "Dune", 1965)]);
    body["hits"]["total"]["value"] = json!(25);
    transport.push(EngineResponse::ok(body));

    let page = ops.search_for_page::<Book>(&Query::match_all()).await.unwrap();
    assert_eq!(page.total_pages(), 3);
    assert!(page.has_next());
    assert!(!page.has_previous());
}

#[tokio::test]
async fn highlights_are_keyed_by_property() {
    let (transport, ops) = snake_case_setup();
    transport.push(EngineResponse::ok(json!({
        "took": 1,
        "hits": {"total": {"value": 1, "relation": "eq"}, "hits": [{
            "_index": "chapters", "_id": "c1", "_score": 2.0, "_routing": "b1",
            "_source": {"book_id": "b1", "chapter_title": "Arrakis", "word_count": 10},
            "highlight": {"chapter_title": ["<em>Arrakis</em>"], "chapter_title.keyword": ["Arrakis"]}
        }]}
    })));

    let hits = ops.search::<Chapter>(&Query::match_all()).await.unwrap();
    let hit = &hits.hits[0];
    assert_eq!(hit.content.chapter_title, "Arrakis");
    assert_eq!(hit.highlight_field("chapterTitle"), ["<em>Arrakis</em>".to_string()]);
    assert_eq!(hit.highlight_field("chapterTitle.keyword"), ["Arrakis".to_string()]);
    assert!(hit.highlight_field("chapter_title").is_empty());
}

#[tokio::test]
async fn render_template_returns_template_output() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({
        "template_output": {"query": {"match": {"title": "dune"}}}
    })));

    let query = SearchTemplateQuery::stored("by-title").param("title", "dune");
    let rendered = ops.render_template(&query).await.unwrap();
    assert_eq!(rendered, json!({"query": {"match": {"title": "dune"}}}));

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "/_render/template");
    assert_eq!(request.json_body().unwrap()["id"], "by-title");

    transport.push(EngineResponse::ok(json!({})));
    assert!(matches!(ops.render_template(&query).await, Err(OdmError::Conversion(_))));
}

#[tokio::test]
async fn template_queries_use_template_endpoint() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(search_body(None, vec![hit("1", "Dune", 1965)])));

    let query = Query::from(SearchTemplateQuery::stored("by-title").param("title", "dune"));
    let hits = ops.search::<Book>(&query).await.unwrap();
    assert_eq!(hits.len(), 1);

    let request = transport.last_request().unwrap();
    assert_eq!(request.path, "/books/_search/template");
    assert_eq!(
        request.json_body().unwrap(),
        &json!({"id": "by-title", "params": {"title": "dune"}})
    );
}

#[tokio::test]
async fn multi_search_sends_ndjson_pairs() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({"responses": [
        search_body(None, vec![hit("1", "Dune", 1965)]),
        search_body(None, vec![])
    ]})));

    let queries = vec![
        Query::from(Criteria::field("title").is("dune")),
        Query::from(Criteria::field("year").greater_than(2000)),
    ];
    let results = ops.multi_search::<Book>(&queries).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].len(), 1);
    assert!(results[1].is_empty());

    let request = transport.last_request().unwrap();
    assert_eq!(request.path, "/_msearch");
    match request.body {
        Some(RequestBody::NdJson(lines)) => {
            assert_eq!(lines.len(), 4);
            assert_eq!(lines[0]["index"], "books");
        }
        other => panic!("expected ndjson body, got {other:?}"),
    }
}

// =============================================================================
// Scroll / streaming
// =============================================================================

#[tokio::test]
async fn stream_scrolls_until_empty_then_clears() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(search_body(
        Some("s1"),
        vec![hit("1", "A", 1), hit("2", "B", 2)],
    )));
    transport.push(EngineResponse::ok(search_body(Some("s1"), vec![hit("3", "C", 3)])));
    transport.push(EngineResponse::ok(search_body(Some("s1"), vec![])));
    transport.push(EngineResponse::ok(json!({"succeeded": true, "num_freed": 1})));

    let hits: Vec<_> = ops.search_for_stream::<Book>(&Query::match_all()).collect().await;
    let ids: Vec<String> = hits
        .into_iter()
        .map(|h| h.unwrap().content.id.unwrap_or_default())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0].path, "/books/_search");
    assert_eq!(param(&requests[0].params, "scroll"), Some("1m"));
    assert_eq!(requests[1].path, "/_search/scroll");
    assert_eq!(requests[3].method, Method::Delete);
    assert_eq!(requests[3].json_body().unwrap(), &json!({"scroll_id": ["s1"]}));
    assert_eq!(ops.open_scroll_count(), 0);
}

#[tokio::test]
async fn stream_stops_at_max_results() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(search_body(
        Some("s1"),
        vec![hit("1", "A", 1), hit("2", "B", 2), hit("3", "C", 3)],
    )));
    transport.push(EngineResponse::ok(json!({"succeeded": true})));

    let query = Query::match_all().with_options(QueryOptions::new().max_results(2));
    let hits: Vec<_> = ops.search_for_stream::<Book>(&query).collect().await;

    assert_eq!(hits.len(), 2);
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].method, Method::Delete);
}

#[tokio::test]
async fn dropped_stream_clears_its_scroll() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(search_body(
        Some("s1"),
        vec![hit("1", "A", 1), hit("2", "B", 2)],
    )));
    transport.route(
        Method::Delete,
        "/_search/scroll",
        EngineResponse::ok(json!({"succeeded": true, "num_freed": 1})),
    );

    let mut stream = Box::pin(ops.search_for_stream::<Book>(&Query::match_all()));
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.id.as_deref(), Some("1"));
    assert_eq!(ops.open_scroll_count(), 1);
    drop(stream);

    assert_eq!(ops.open_scroll_count(), 0);
    for _ in 0..100 {
        if transport.requests().iter().any(|r| r.method == Method::Delete) {
            break;
        }
        tokio::task::yield_now().await;
    }
    let clear = transport
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Delete)
        .expect("scroll cleared after drop");
    assert_eq!(clear.path, "/_search/scroll");
    assert_eq!(clear.json_body().unwrap(), &json!({"scroll_id": ["s1"]}));
}

#[tokio::test]
async fn expired_scrolls_are_not_counted() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(search_body(Some("short"), vec![hit("1", "A", 1)])));

    ops.search_scroll_start::<Book>(Duration::from_millis(20), &Query::match_all())
        .await
        .unwrap();
    assert_eq!(ops.open_scroll_count(), 1);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(ops.open_scroll_count(), 0);
}

#[tokio::test]
async fn clearing_expired_scroll_is_not_an_error() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::new(404, Some(json!({"succeeded": true, "num_freed": 0}))));

    ops.search_scroll_clear(&["gone".to_string()]).await.unwrap();
}

// =============================================================================
// Index API
// =============================================================================

#[tokio::test]
async fn ensure_creates_missing_index_with_mapping() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::status_only(404));
    transport.push(EngineResponse::ok(json!({"acknowledged": true, "index": "books"})));

    assert!(ops.index_ops::<Book>().unwrap().ensure().await.unwrap());

    let requests = transport.requests();
    assert_eq!(requests[0].method, Method::Head);
    assert_eq!(requests[1].method, Method::Put);
    assert_eq!(requests[1].path, "/books");
    let body = requests[1].json_body().unwrap();
    assert_eq!(body["settings"]["index"]["number_of_shards"], 1);
    assert_eq!(body["mappings"]["properties"]["title"]["type"], "text");
}

#[tokio::test]
async fn ensure_skips_existing_index() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::status_only(200));

    assert!(!ops.index_ops::<Book>().unwrap().ensure().await.unwrap());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn delete_absent_index_is_false() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::new(
        404,
        Some(json!({"error": {"type": "index_not_found_exception", "reason": "no such index"}, "status": 404})),
    ));

    assert!(!ops.index_ops::<Book>().unwrap().delete().await.unwrap());
}

#[tokio::test]
async fn alias_actions_and_lookup() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({"acknowledged": true})));
    transport.push(EngineResponse::ok(json!({
        "books-v2": {"aliases": {"books-current": {"is_write_index": true, "search_routing": "eu"}}}
    })));
    transport.push(EngineResponse::new(404, Some(json!({"error": "alias [gone] missing", "status": 404}))));

    let index_ops = ops.index_ops::<Book>().unwrap();
    let actions = AliasActions::new()
        .add(AliasAction::Remove(AliasActionParameters::new(["books-v1"], ["books-current"])))
        .add(AliasAction::Add(
            AliasActionParameters::new(["books-v2"], ["books-current"]).write_index(true),
        ));
    assert!(index_ops.alter_aliases(actions).await.unwrap());

    let request = transport.last_request().unwrap();
    assert_eq!(request.path, "/_aliases");
    assert_eq!(
        request.json_body().unwrap(),
        &json!({"actions": [
            {"remove": {"indices": ["books-v1"], "aliases": ["books-current"]}},
            {"add": {"indices": ["books-v2"], "aliases": ["books-current"], "is_write_index": true}}
        ]})
    );

    let aliases = index_ops.get_aliases(&["books-current"]).await.unwrap();
    assert_eq!(transport.last_request().unwrap().path, "/_alias/books-current");
    let found = &aliases["books-v2"];
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].alias, "books-current");
    assert_eq!(found[0].is_write_index, Some(true));
    assert_eq!(found[0].search_routing.as_deref(), Some("eu"));

    assert!(index_ops.get_aliases(&["gone"]).await.unwrap().is_empty());
    assert!(matches!(
        index_ops.alter_aliases(AliasActions::new()).await,
        Err(OdmError::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn missing_templates_are_none() {
    let (transport, ops) = default_setup();
    let missing = || {
        EngineResponse::new(
            404,
            Some(json!({"error": {"type": "resource_not_found_exception", "reason": "missing"}, "status": 404})),
        )
    };
    transport.push(missing());
    transport.push(missing());
    transport.push(missing());
    transport.push(EngineResponse::ok(json!({"index_templates": [{
        "name": "logs",
        "index_template": {
            "index_patterns": ["logs-*"],
            "template": {"settings": {"index": {"number_of_shards": "2"}}},
            "composed_of": ["base"],
            "priority": 5
        }
    }]})));

    let index_ops = ops.index_ops::<Book>().unwrap();
    assert!(index_ops.get_template("nope").await.unwrap().is_none());
    assert!(index_ops.get_index_template("nope").await.unwrap().is_none());
    assert!(index_ops.get_component_template("nope").await.unwrap().is_none());

    let paths: Vec<String> = transport.requests().iter().map(|r| r.path.clone()).collect();
    assert_eq!(
        paths,
        vec!["/_template/nope", "/_index_template/nope", "/_component_template/nope"]
    );

    let logs = index_ops.get_index_template("logs").await.unwrap().unwrap();
    assert_eq!(logs.index_patterns, vec!["logs-*"]);
    assert_eq!(logs.composed_of, vec!["base"]);
    assert_eq!(logs.priority, Some(5));
}

#[tokio::test]
async fn stored_script_round_trip() {
    let (transport, ops) = default_setup();
    transport.push(EngineResponse::ok(json!({
        "_id": "by-title", "found": true,
        "script": {"lang": "mustache", "source": "{\"query\":{\"match\":{\"title\":\"{{title}}\"}}}"}
    })));
    transport.push(EngineResponse::new(404, Some(json!({"_id": "nope", "found": false}))));

    let script = ops.get_script("by-title").await.unwrap().unwrap();
    assert_eq!(script.language, "mustache");
    assert!(ops.get_script("nope").await.unwrap().is_none());
}
