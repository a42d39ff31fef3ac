use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;

use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::state::AppState;
use crate::store::operations::users::NewUser;
use crate::validation::{validate_culture, validate_native_language, validate_topic};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_user).post(create_user).delete(delete_user))
        .route("/culture", put(update_culture))
        .route("/native-language", put(update_native_language))
        .route("/favorite-topic", put(update_favorite_topic))
        .route("/voice-dialog", put(update_voice_dialog))
        .route("/factory-reset", post(factory_reset))
}

fn validation_error(msg: &str) -> AppError {
    AppError::bad_request("VALIDATION_ERROR", msg)
}

async fn get_user(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store()
        .get_user()?
        .ok_or_else(|| AppError::not_found("用户不存在"))?;
    Ok(ok(user))
}

async fn create_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<NewUser>,
) -> Result<impl IntoResponse, AppError> {
    validate_native_language(&req.translation_language).map_err(validation_error)?;
    validate_topic(&req.favorite_topic).map_err(validation_error)?;

    if !state.store().save_user(&req)? {
        return Err(AppError::conflict("USER_EXISTS", "用户已存在"));
    }
    let user = state
        .store()
        .get_user()?
        .ok_or_else(|| AppError::internal("user missing right after insert"))?;

    tracing::info!(favorite_topic = %user.favorite_topic, "User created");
    Ok(created(user))
}

async fn delete_user(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.store().remove_user()?;
    Ok(ok(serde_json::json!({ "removed": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CultureRequest {
    culture: String,
}

async fn update_culture(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CultureRequest>,
) -> Result<impl IntoResponse, AppError> {
    let language = validate_culture(&req.culture).map_err(validation_error)?;
    Ok(ok(state.store().set_user_culture(language.culture_code())?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeLanguageRequest {
    native_language: String,
}

async fn update_native_language(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<NativeLanguageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let language = validate_native_language(&req.native_language).map_err(validation_error)?;
    Ok(ok(state.store().set_user_native_language(language.culture_code())?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteTopicRequest {
    favorite_topic: String,
}

async fn update_favorite_topic(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<FavoriteTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    let topic = validate_topic(&req.favorite_topic).map_err(validation_error)?;
    Ok(ok(state.store().set_user_favorite_topic(topic.as_str())?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoiceDialogRequest {
    shown: bool,
}

async fn update_voice_dialog(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VoiceDialogRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.store().set_user_voice_dialog_shown(req.shown)?))
}

/// 清空词库、用户与所有缓存
async fn factory_reset(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    if state.selector().is_initializing() {
        return Err(AppError::conflict(
            "VOCABULARY_BUSY",
            "单词列表正在初始化，请稍后重试",
        ));
    }

    state.store().factory_reset()?;
    state.selector().reset().await;
    state.words().invalidate_all().await;
    state.query_cache().clear();
    state.memoizer().clear();

    tracing::warn!("Factory reset completed");
    Ok(ok(serde_json::json!({ "reset": true })))
}
