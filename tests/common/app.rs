use std::sync::Arc;

use axum::http::Method;
use axum::Router;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::broadcast;

use vocabulary_backend::config::{Config, TranslatorConfig, VocabularyConfig, WorkerConfig};
use vocabulary_backend::routes::build_router;
use vocabulary_backend::state::AppState;
use vocabulary_backend::store::Store;
use vocabulary_backend::vocabulary::RemoteTranslator;

use super::http::{call, assert_status_ok_json};

pub const TEST_LEARNED_PAGE_SIZE: usize = 4;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    _temp_dir: TempDir,
}

fn test_config(temp_dir: &TempDir) -> Config {
    let sled_path = temp_dir.path().join("vocabulary-test.sled");

    // 直接构造 Config，避免使用 set_var 造成多线程测试环境变量竞态
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string_lossy().to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        words_dir: None,
        vocabulary: VocabularyConfig {
            learned_page_size: TEST_LEARNED_PAGE_SIZE,
            ..VocabularyConfig::default()
        },
        translator: TranslatorConfig {
            enabled: true,
            mock: true,
            ..TranslatorConfig::default()
        },
        worker: WorkerConfig { is_leader: false },
    }
}

async fn spawn(remote: Option<Arc<dyn RemoteTranslator>>) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&temp_dir);

    let store = Arc::new(
        Store::open(&config.sled_path)
            .expect("open store")
            .with_learned_page_size(config.vocabulary.learned_page_size),
    );
    store.run_migrations().expect("run migrations");

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = match remote {
        Some(remote) => AppState::with_remote_translator(store, &config, shutdown_tx, remote),
        None => AppState::new(store, &config, shutdown_tx),
    };

    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn(None).await
}

pub async fn spawn_test_app_with_translator(remote: Arc<dyn RemoteTranslator>) -> TestApp {
    spawn(Some(remote)).await
}

/// 创建用户并初始化工作集，返回工作集 JSON
pub async fn spawn_initialized(language: &str, topic: &str) -> (TestApp, serde_json::Value) {
    let app = spawn_test_app().await;
    create_user(&app.app, language, topic).await;
    let words = initialize(&app.app).await;
    (app, words)
}

pub async fn create_user(app: &Router, language: &str, topic: &str) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/user",
        Some(json!({ "translationLanguage": language, "favoriteTopic": topic })),
    )
    .await;
    assert_status_ok_json(status, &body);
}

pub async fn initialize(app: &Router) -> serde_json::Value {
    let (status, body) = call(app, Method::POST, "/api/vocabulary/initialize", None).await;
    assert_status_ok_json(status, &body);
    body["data"]["words"].clone()
}
