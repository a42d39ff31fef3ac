use std::collections::HashMap;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extractors::{JsonBody, QueryParams, WordId};
use crate::response::{ok, paged, AppError};
use crate::routes::realtime;
use crate::state::AppState;
use crate::validation::validate_page;
use crate::vocabulary::{Language, RefillOutcome, Topic, UserPreferences, Word, WordStore};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/words", get(list_words))
        .route("/words/translated", get(translated_words))
        .route("/words/learned", post(mark_many_learned))
        .route("/words/:id/learned", post(mark_learned))
        .route("/words/:id/refused", post(mark_refused))
        .route("/initialize", post(initialize))
        .route("/add-random", post(add_random))
        .route("/update", post(update))
        .route("/learned", get(learned_page))
        .route("/repetition", get(repetition))
        .route("/stats", get(stats))
        .route("/events", get(realtime::initializing_events))
}

/// 带译文的单词视图；对齐失败的单词 `translation` 为空
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedWord {
    id: Uuid,
    text: String,
    topic: Topic,
    translation: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefillResponse {
    outcome: RefillOutcome,
    words: Vec<Word>,
}

async fn list_words(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.selector().words().await)
}

async fn native_language(state: &AppState) -> Result<Language, AppError> {
    let code = state.store().native_language().await?;
    Ok(Language::parse_or_english(&code))
}

async fn translate_all(state: &AppState, words: &[Word]) -> Result<Vec<TranslatedWord>, AppError> {
    let language = native_language(state).await?;
    let mut translations: HashMap<Word, String> =
        state.memoizer().translate(language, words).await?;

    Ok(words
        .iter()
        .map(|word| TranslatedWord {
            id: word.id,
            text: word.text.clone(),
            topic: word.topic,
            translation: translations.remove(word),
        })
        .collect())
}

async fn translated_words(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let words = state.selector().words().await;
    Ok(ok(translate_all(&state, &words).await?))
}

async fn refill_response(
    state: &AppState,
    action: &str,
    outcome: RefillOutcome,
) -> Result<impl IntoResponse, AppError> {
    match outcome {
        RefillOutcome::Busy => {
            tracing::info!(action, "Working set refill rejected, another refill is running");
            Err(AppError::conflict("VOCABULARY_BUSY", "单词列表正在初始化，请稍后重试"))
        }
        RefillOutcome::StoreEmpty => Err(AppError::conflict(
            "VOCABULARY_EMPTY",
            "词库为空，请先初始化",
        )),
        outcome => {
            let words = state.selector().words().await;
            tracing::info!(action, ?outcome, size = words.len(), "Working set refilled");
            Ok(ok(RefillResponse { outcome, words }))
        }
    }
}

async fn initialize(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let outcome = state.selector().initialize().await?;
    refill_response(&state, "initialize", outcome).await
}

async fn add_random(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let outcome = state.selector().add_random_words().await?;
    refill_response(&state, "add_random", outcome).await
}

async fn update(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let outcome = state.selector().update().await?;
    refill_response(&state, "update", outcome).await
}

fn not_in_working_set() -> AppError {
    AppError::not_found("单词不在当前学习列表中")
}

async fn mark_learned(
    State(state): State<AppState>,
    WordId(id): WordId,
) -> Result<impl IntoResponse, AppError> {
    if !state.selector().mark_learned(id).await? {
        return Err(not_in_working_set());
    }
    Ok(ok(serde_json::json!({ "id": id, "learned": true })))
}

async fn mark_refused(
    State(state): State<AppState>,
    WordId(id): WordId,
) -> Result<impl IntoResponse, AppError> {
    if !state.selector().mark_refused(id).await? {
        return Err(not_in_working_set());
    }
    Ok(ok(serde_json::json!({ "id": id, "refused": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkManyRequest {
    ids: Vec<Uuid>,
}

async fn mark_many_learned(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<MarkManyRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.ids.is_empty() {
        return Err(AppError::bad_request("INVALID_ARGUMENT", "ids 不能为空"));
    }
    if !state.selector().mark_many_learned(&req.ids).await? {
        return Err(not_in_working_set());
    }
    Ok(ok(serde_json::json!({ "learned": req.ids.len() })))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

async fn learned_page(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = validate_page(query.page.unwrap_or(1))
        .map_err(|msg| AppError::bad_request("INVALID_PAGE", msg))?;

    let words = state.selector().learned_page(page).await?;
    let total = state.selector().count_learned().await?;
    let per_page = state.words().learned_page_size();
    Ok(paged(words.to_vec(), total, page, per_page))
}

async fn repetition(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let words = state.selector().repetition_words().await?;
    Ok(ok(translate_all(&state, &words).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    learned: usize,
    learned_recently: usize,
    recent_days: i64,
    working_set: usize,
    initializing: bool,
}

async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let selector = state.selector();
    Ok(ok(StatsResponse {
        learned: selector.count_learned().await?,
        learned_recently: selector.count_learned_recently().await?,
        recent_days: state.config().vocabulary.recent_days,
        working_set: selector.words().await.len(),
        initializing: selector.is_initializing(),
    }))
}
