//! # 브랜치 라우트 핸들러
//!
//! - `GET  /api/v1/documents/{id}/branches` → 브랜치 이름 목록 (`main`이 맨 앞)
//! - `POST /api/v1/documents/{id}/branches` → 브랜치 생성 (최신 버전 복사)
//! - `POST /api/v1/documents/{id}/merge`    → 브랜치 병합 (복사 전용)
//! - `GET  /api/v1/documents/{id}/graph`    → 브랜치별 버전 목록 + 타임라인

use crate::{error::AppError, middleware::auth::AuthUser, models::*, services::branches};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::documents::{load_owned_document, AppState};

pub async fn list_document_branches(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    load_owned_document(&state, &auth_user, &id).await?;
    let names = branches::list_branches(&state.pool, &id).await?;
    Ok(Json(json!({ "branches": names })))
}

pub async fn create_document_branch(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<CreateBranchRequest>,
) -> Result<(StatusCode, Json<SavedVersion>), AppError> {
    load_owned_document(&state, &auth_user, &id).await?;
    let saved = branches::create_branch(
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

pub async fn merge_document_branch(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<MergeBranchRequest>,
) -> Result<(StatusCode, Json<SavedVersion>), AppError> {
    load_owned_document(&state, &auth_user, &id).await?;
    let saved = branches::merge_branch(
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

pub async fn get_document_graph(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<VersionGraph>, AppError> {
    load_owned_document(&state, &auth_user, &id).await?;
    let graph = branches::get_version_graph(&state.pool, &id).await?;
    Ok(Json(graph))
}
