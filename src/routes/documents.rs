//! # 문서(Document) 라우트 핸들러
//!
//! 문서 목록, 버전 이력, 과거 버전 복원을 처리합니다.
//! 문서 생성은 별도 엔드포인트 없이 첫 번째 버전 저장(`POST /versions`)에서 일어납니다.
//!
//! ## 엔드포인트
//! - `GET  /api/v1/documents`              → 내 문서 목록
//! - `GET  /api/v1/documents/{id}/history` → 메인 버전(최신순) + 각 서브 버전(문자순)
//! - `POST /api/v1/documents/{id}/restore` → 과거 버전 내용으로 새 버전 생성
//!
//! ## 접근 제어
//! 모든 핸들러는 `AuthUser`를 받고, 문서 소유자가 아니면 403을 반환합니다.
//! VersionStore 자체는 소유권을 모르므로 확인은 항상 이 계층에서 합니다.

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    services::versioning::{self, DiffLimits},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// `SqlitePool`은 내부적으로 Arc이므로 clone해도 같은 풀을 가리킵니다.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// 바이너리 블롭 저장 디렉토리 경로
    pub blobs_path: String,
    /// Bearer 토큰 검증용 비밀키
    pub jwt_secret: String,
    pub diff_limits: DiffLimits,
    /// 레드라인 PDF에 임베드할 트루타입 폰트. 없으면 뷰어 내장 CID 폰트를 씁니다.
    pub redline_font: Option<Arc<Vec<u8>>>,
    pub save_retry_limit: u32,
}

/// 문서를 읽고 요청자가 소유자인지 확인합니다.
pub(crate) async fn load_owned_document(
    state: &AppState,
    auth_user: &AuthUser,
    id: &str,
) -> Result<Document, AppError> {
    let document = db::get_document(&state.pool, id)
        .await?
        .ok_or(AppError::DocumentNotFound)?;
    auth_user.ensure_owner(&document)?;
    Ok(document)
}

/// `GET /documents`: 요청자가 소유한 문서 목록
///
/// 응답: `{ "documents": [...] }`
pub async fn list_documents(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let documents = db::list_documents(&state.pool, &auth_user.user_id).await?;
    Ok(Json(json!({ "documents": documents })))
}

/// `GET /documents/{id}/history`: 문서의 전체 버전 이력
pub async fn get_document_history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<VersionHistory>, AppError> {
    load_owned_document(&state, &auth_user, &id).await?;
    let history = db::get_version_history(&state.pool, &id).await?;
    Ok(Json(history))
}

/// `POST /documents/{id}/restore`: 과거 버전을 복원합니다.
///
/// 메인 버전을 복원하면 서브 버전이, 서브 버전을 복원하면 메인 버전이 새로 생깁니다.
/// 요청: `{ "version_id": "...", "is_sub": false, "description": "..." }`
pub async fn restore_document_version(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<RestoreVersionRequest>,
) -> Result<(StatusCode, Json<SavedVersion>), AppError> {
    load_owned_document(&state, &auth_user, &id).await?;

    let saved = versioning::restore_version(
        &state.pool,
        state.save_retry_limit,
        &auth_user.user_id,
        auth_user.editor(),
        &id,
        &req,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(saved)))
}
