//! # 버전 라우트 핸들러
//!
//! ## 엔드포인트
//! - `POST /api/v1/blobs`                    → 원본 바이너리 업로드 (요청 본문 = 바이트 그대로)
//! - `POST /api/v1/versions`                 → 버전 저장 (문서가 없으면 생성)
//! - `GET  /api/v1/versions/{id}?sub=bool`   → 버전 하나 조회
//! - `GET  /api/v1/versions/{id}/blob?sub=bool` → 버전에 딸린 바이너리 다운로드

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    services::blobs,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use super::documents::{load_owned_document, AppState};

/// `POST /blobs`: 바이트를 저장하고 `{ "blob_key", "size" }`를 반환합니다.
/// 반환된 키를 버전 저장 요청의 `blob_key`에 넣습니다.
pub async fn upload_blob(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("blob body is empty".to_string()));
    }

    let blob = blobs::write_blob(&state.blobs_path, &body).await?;
    tracing::info!(user = %auth_user.user_id, blob_key = %blob.key, size = blob.size, "Uploaded blob");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "blob_key": blob.key, "size": blob.size })),
    ))
}

/// `POST /versions`: 새 메인 버전 또는 서브 버전을 저장합니다.
///
/// `document_id`가 없으면 `document_name`으로 새 문서를 만들고 요청자를 소유자로 기록합니다.
/// 편집자 정보는 요청 본문이 아니라 인증 토큰에서 가져옵니다.
pub async fn save_version(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<SaveVersionRequest>,
) -> Result<(StatusCode, Json<SavedVersion>), AppError> {
    if let Some(document_id) = req.document_id.as_deref() {
        load_owned_document(&state, &auth_user, document_id).await?;
    }

    let blob = match req.blob_key.as_deref() {
        Some(key) => Some(blobs::resolve_blob(&state.blobs_path, key).await?),
        None => None,
    };

    let params = SaveVersionParams {
        document_id: req.document_id,
        document_name: req.document_name,
        content: req.content,
        blob,
        description: req.description.unwrap_or_default(),
        editor: auth_user.editor(),
        is_main_version: req.is_main_version,
        status: req.status,
        branch: req.branch,
        merged_from: None,
        new_branch: false,
    };

    let saved = db::save_version(
        &state.pool,
        &auth_user.user_id,
        &params,
        state.save_retry_limit,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(saved)))
}

/// 버전을 읽고, 버전이 속한 문서의 소유자인지 확인합니다.
async fn load_owned_version(
    state: &AppState,
    auth_user: &AuthUser,
    id: &str,
    is_sub: bool,
) -> Result<VersionRecord, AppError> {
    let version = db::get_version(&state.pool, id, is_sub)
        .await?
        .ok_or(AppError::VersionNotFound)?;
    load_owned_document(state, auth_user, version.document_id()).await?;
    Ok(version)
}

/// `GET /versions/{id}?sub=true|false`
pub async fn get_version(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<VersionKindQuery>,
) -> Result<Json<VersionRecord>, AppError> {
    let version = load_owned_version(&state, &auth_user, &id, query.sub).await?;
    Ok(Json(version))
}

/// `GET /versions/{id}/blob?sub=true|false`: 저장된 바이트를 그대로 내려줍니다.
pub async fn download_version_blob(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<VersionKindQuery>,
) -> Result<Response, AppError> {
    let version = load_owned_version(&state, &auth_user, &id, query.sub).await?;
    let blob = version
        .blob()
        .ok_or_else(|| AppError::BadRequest(format!("{} has no binary content", version.label())))?;

    let bytes = blobs::read_blob(&state.blobs_path, &blob.key)
        .await?
        .ok_or_else(|| AppError::Internal(format!("blob {} is missing from storage", blob.key)))?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}
