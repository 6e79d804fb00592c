//! # Redline 서버 진입점
//!
//! 계약서 버전 관리(메인/서브 버전, 브랜치), 단어 단위 비교,
//! 레드라인 PDF 내보내기를 제공하는 HTTP API 서버입니다.
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 데이터베이스 연결 풀 생성
//! 4. 데이터베이스 마이그레이션 실행
//! 5. 블롭 저장 디렉토리 생성
//! 6. API 라우터 설정
//! 7. HTTP 서버 시작

mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use config::Config;
use routes::documents::AppState;
use services::{redline::fonts::RedlineFonts, versioning::DiffLimits};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::{path::Path, str::FromStr, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // RUST_LOG가 없으면 이 크레이트와 tower_http, axum을 debug 레벨로 출력합니다.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redline_server=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting redline server on {}:{}", config.host, config.port);

    // 버전 저장은 BEGIN IMMEDIATE로 쓰기 잠금을 먼저 잡고, 잠금이 풀릴 때까지 여기 지정한 시간만큼 기다립니다.
    // 그래도 SQLITE_BUSY가 나면 VersionStore가 재시도합니다.
    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    let blobs_path = Path::new(&config.blobs_path);
    if !blobs_path.exists() {
        tokio::fs::create_dir_all(blobs_path).await?;
        tracing::info!("Created blobs directory: {}", config.blobs_path);
    }

    // 폰트 파일은 시작할 때 한 번 검사합니다.
    let redline_font = match config.redline_font_path.as_deref() {
        Some(path) => {
            let data = tokio::fs::read(path).await?;
            RedlineFonts::with_truetype(&data)?;
            tracing::info!("Loaded redline font: {} ({} bytes)", path, data.len());
            Some(Arc::new(data))
        }
        None => None,
    };

    let state = AppState {
        pool: pool.clone(),
        blobs_path: config.blobs_path.clone(),
        jwt_secret: config.jwt_secret.clone(),
        diff_limits: DiffLimits {
            max_chars: config.max_diff_chars,
            max_cells: config.max_diff_cells,
        },
        redline_font,
        save_retry_limit: config.save_retry_limit,
    };

    let api_routes = Router::new()
        // 문서 / 버전 이력 / 복원
        .route("/documents", get(routes::list_documents))
        .route("/documents/{id}/history", get(routes::get_document_history))
        .route("/documents/{id}/restore", post(routes::restore_document_version))
        // 블롭과 버전
        .route("/blobs", post(routes::upload_blob))
        .route("/versions", post(routes::save_version))
        .route("/versions/{id}", get(routes::get_version))
        .route("/versions/{id}/blob", get(routes::download_version_blob))
        // 비교와 레드라인 내보내기
        .route("/compare", get(routes::compare))
        .route("/compare/export", get(routes::export_redline))
        // 브랜치
        .route(
            "/documents/{id}/branches",
            get(routes::list_document_branches).post(routes::create_document_branch),
        )
        .route("/documents/{id}/merge", post(routes::merge_document_branch))
        .route("/documents/{id}/graph", get(routes::get_document_graph))
        // 리뷰 요청
        .route("/reviews", post(routes::create_review_request))
        .route("/reviews/{id}", get(routes::get_review_request))
        .route("/reviews/{id}/decision", post(routes::decide_review_request))
        .route("/health", get(routes::health_check))
        .with_state(state);

    // 개발 환경 기준으로 모든 출처를 허용합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
