mod common;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::app::{
    create_user, initialize, spawn_initialized, spawn_test_app, spawn_test_app_with_translator,
    TEST_LEARNED_PAGE_SIZE,
};
use common::http::{assert_json_error, assert_status_ok_json, call};
use vocabulary_backend::vocabulary::{Language, RemoteTranslator, TranslatorError};

fn ids_of(words: &Value) -> Vec<String> {
    words
        .as_array()
        .expect("word array")
        .iter()
        .map(|w| w["id"].as_str().expect("word id").to_string())
        .collect()
}

fn count_topic(words: &Value, topic: &str) -> usize {
    words
        .as_array()
        .expect("word array")
        .iter()
        .filter(|w| w["topic"] == topic)
        .count()
}

#[tokio::test]
async fn it_initialize_seeds_empty_store_and_balances_topics() {
    let (app, words) = spawn_initialized("uk-UA", "Finance").await;

    let ids = ids_of(&words);
    assert_eq!(ids.len(), app.config.vocabulary.working_set_size);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
    assert_eq!(count_topic(&words, "Common"), 5);
    assert_eq!(count_topic(&words, "Finance"), 5);
    assert!(words
        .as_array()
        .unwrap()
        .iter()
        .all(|w| w["learned"]["status"] == "notLearned"));
}

#[tokio::test]
async fn it_initialize_twice_keeps_the_working_set() {
    let (app, words) = spawn_initialized("uk-UA", "Common").await;

    let (status, body) = call(&app.app, Method::POST, "/api/vocabulary/initialize", None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["outcome"]["status"], "alreadyPopulated");
    assert_eq!(ids_of(&body["data"]["words"]), ids_of(&words));
}

#[tokio::test]
async fn it_initialize_without_user_is_not_found() {
    let app = spawn_test_app().await;

    let (status, body) = call(&app.app, Method::POST, "/api/vocabulary/initialize", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");
}

#[tokio::test]
async fn it_refill_on_empty_store_is_conflict() {
    let app = spawn_test_app().await;
    create_user(&app.app, "uk-UA", "Law").await;

    for path in ["/api/vocabulary/add-random", "/api/vocabulary/update"] {
        let (status, body) = call(&app.app, Method::POST, path, None).await;
        assert_eq!(status, StatusCode::CONFLICT, "{path}");
        assert_json_error(&body, "VOCABULARY_EMPTY");
    }
}

#[tokio::test]
async fn it_mark_learned_and_refused_remove_from_working_set() {
    let (app, words) = spawn_initialized("uk-UA", "Health").await;
    let ids = ids_of(&words);

    let (status, body) = call(
        &app.app,
        Method::POST,
        &format!("/api/vocabulary/words/{}/learned", ids[0]),
        None,
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["learned"], true);

    let (status, body) = call(
        &app.app,
        Method::POST,
        &format!("/api/vocabulary/words/{}/refused", ids[1]),
        None,
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["refused"], true);

    let (_, body) = call(&app.app, Method::GET, "/api/vocabulary/words", None).await;
    let remaining = ids_of(&body["data"]);
    assert_eq!(remaining.len(), ids.len() - 2);
    assert!(!remaining.contains(&ids[0]));
    assert!(!remaining.contains(&ids[1]));

    // 放弃的单词不计入已学
    let (_, body) = call(&app.app, Method::GET, "/api/vocabulary/stats", None).await;
    assert_eq!(body["data"]["learned"], 1);
    assert_eq!(body["data"]["learnedRecently"], 1);
    assert_eq!(body["data"]["workingSet"], ids.len() - 2);
    assert_eq!(body["data"]["initializing"], false);
}

#[tokio::test]
async fn it_mark_word_outside_working_set_is_not_found() {
    let (app, words) = spawn_initialized("uk-UA", "Travel").await;
    let ids = ids_of(&words);

    let path = format!("/api/vocabulary/words/{}/learned", ids[0]);
    let (status, _) = call(&app.app, Method::POST, &path, None).await;
    assert_eq!(status, StatusCode::OK);

    // 已移出工作集
    let (status, body) = call(&app.app, Method::POST, &path, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");

    let unknown = format!("/api/vocabulary/words/{}/refused", uuid::Uuid::new_v4());
    let (status, _) = call(&app.app, Method::POST, &unknown, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/vocabulary/words/not-a-uuid/learned",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_WORD_ID");
}

#[tokio::test]
async fn it_mark_many_learned_is_all_or_nothing() {
    let (app, words) = spawn_initialized("uk-UA", "Technology").await;
    let ids = ids_of(&words);

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/vocabulary/words/learned",
        Some(json!({ "ids": [ids[0], uuid::Uuid::new_v4()] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");

    let (_, body) = call(&app.app, Method::GET, "/api/vocabulary/stats", None).await;
    assert_eq!(body["data"]["learned"], 0);
    assert_eq!(body["data"]["workingSet"], ids.len());

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/vocabulary/words/learned",
        Some(json!({ "ids": [ids[0], ids[1], ids[2]] })),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["learned"], 3);

    let (_, body) = call(&app.app, Method::GET, "/api/vocabulary/stats", None).await;
    assert_eq!(body["data"]["learned"], 3);
    assert_eq!(body["data"]["workingSet"], ids.len() - 3);

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/vocabulary/words/learned",
        Some(json!({ "ids": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_ARGUMENT");
}

#[tokio::test]
async fn it_add_random_tops_up_and_update_replaces() {
    let (app, words) = spawn_initialized("uk-UA", "Programming").await;
    let ids = ids_of(&words);
    let size = ids.len();

    for id in &ids[..3] {
        let path = format!("/api/vocabulary/words/{id}/learned");
        let (status, _) = call(&app.app, Method::POST, &path, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app.app, Method::POST, "/api/vocabulary/add-random", None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["outcome"]["status"], "populated");
    assert_eq!(body["data"]["outcome"]["added"], 3);
    let topped_up = ids_of(&body["data"]["words"]);
    assert_eq!(topped_up.len(), size);
    assert_eq!(topped_up.iter().collect::<HashSet<_>>().len(), size);
    // 已学单词不会再次出现
    assert!(ids[..3].iter().all(|id| !topped_up.contains(id)));

    let (status, body) = call(&app.app, Method::POST, "/api/vocabulary/update", None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["outcome"]["added"], size);
    assert_eq!(ids_of(&body["data"]["words"]).len(), size);
}

#[tokio::test]
async fn it_learned_words_are_paged() {
    let (app, words) = spawn_initialized("uk-UA", "Medicine").await;
    let ids = ids_of(&words);
    let learned = TEST_LEARNED_PAGE_SIZE + 1;

    for id in &ids[..learned] {
        let path = format!("/api/vocabulary/words/{id}/learned");
        let (status, _) = call(&app.app, Method::POST, &path, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app.app, Method::GET, "/api/vocabulary/learned", None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["perPage"], TEST_LEARNED_PAGE_SIZE);
    assert_eq!(body["data"]["total"], learned);
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(
        body["data"]["items"].as_array().unwrap().len(),
        TEST_LEARNED_PAGE_SIZE
    );

    let (_, body) = call(&app.app, Method::GET, "/api/vocabulary/learned?page=2", None).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let (_, body) = call(&app.app, Method::GET, "/api/vocabulary/learned?page=3", None).await;
    assert!(body["data"]["items"].as_array().unwrap().is_empty());

    let (status, body) = call(&app.app, Method::GET, "/api/vocabulary/learned?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_PAGE");

    let (status, body) =
        call(&app.app, Method::GET, "/api/vocabulary/learned?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_QUERY");
}

#[tokio::test]
async fn it_translated_words_use_mock_translator() {
    let (app, words) = spawn_initialized("uk-UA", "Education").await;

    let (status, body) =
        call(&app.app, Method::GET, "/api/vocabulary/words/translated", None).await;
    assert_status_ok_json(status, &body);

    let translated = body["data"].as_array().unwrap();
    assert_eq!(translated.len(), words.as_array().unwrap().len());
    // mock 模式原样返回
    for word in translated {
        assert_eq!(word["translation"], word["text"]);
    }
    assert!(app.state.memoizer().len() > 0);
}

#[tokio::test]
async fn it_repetition_lists_learned_words_with_translation() {
    let (app, words) = spawn_initialized("en-US", "Law").await;
    let ids = ids_of(&words);

    for id in &ids[..2] {
        let path = format!("/api/vocabulary/words/{id}/learned");
        call(&app.app, Method::POST, &path, None).await;
    }

    let (status, body) = call(&app.app, Method::GET, "/api/vocabulary/repetition", None).await;
    assert_status_ok_json(status, &body);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|w| w["translation"] == w["text"]));
}

struct FailingTranslator;

#[async_trait]
impl RemoteTranslator for FailingTranslator {
    async fn translate_batch(
        &self,
        _source: Language,
        _target: Language,
        _text: &str,
    ) -> Result<String, TranslatorError> {
        Err(TranslatorError::Network("connection refused".to_string()))
    }
}

#[tokio::test]
async fn it_translator_failure_is_bad_gateway() {
    let app = spawn_test_app_with_translator(Arc::new(FailingTranslator)).await;
    create_user(&app.app, "de-DE", "Common").await;
    initialize(&app.app).await;

    let (status, body) =
        call(&app.app, Method::GET, "/api/vocabulary/words/translated", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_json_error(&body, "TRANSLATOR_ERROR");
    assert!(app.state.memoizer().is_empty());

    // 工作集不受翻译失败影响
    let (status, body) = call(&app.app, Method::GET, "/api/vocabulary/words", None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(
        body["data"].as_array().unwrap().len(),
        app.config.vocabulary.working_set_size
    );
}

#[tokio::test]
async fn it_unknown_route_is_not_found() {
    let app = spawn_test_app().await;
    let (status, body) = call(&app.app, Method::GET, "/api/vocabulary/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "NOT_FOUND");
}

#[tokio::test]
async fn it_out_of_range_learned_page_is_rejected_and_marks_still_work() {
    let (app, words) = spawn_initialized("uk-UA", "Finance").await;
    let ids = ids_of(&words);

    for page in [
        "10001".to_string(),
        "1000000000000".to_string(),
        usize::MAX.to_string(),
    ] {
        let path = format!("/api/vocabulary/learned?page={page}");
        let (status, body) = call(&app.app, Method::GET, &path, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{page}");
        assert_json_error(&body, "INVALID_PAGE");
    }

    // 合法但无数据的页码返回空列表
    let (status, body) =
        call(&app.app, Method::GET, "/api/vocabulary/learned?page=10000", None).await;
    assert_status_ok_json(status, &body);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());

    let path = format!("/api/vocabulary/words/{}/learned", ids[0]);
    let (status, _) = call(&app.app, Method::POST, &path, None).await;
    assert_eq!(status, StatusCode::OK);
    let path = format!("/api/vocabulary/words/{}/refused", ids[1]);
    let (status, _) = call(&app.app, Method::POST, &path, None).await;
    assert_eq!(status, StatusCode::OK);
}
