//! # 리뷰 요청 라우트 핸들러
//!
//! - `POST /api/v1/reviews`               → 문서 소유자가 특정 버전에 대한 리뷰를 요청
//! - `GET  /api/v1/reviews/{id}`          → 요청자, 문서 소유자, 지정된 리뷰어만 조회 가능
//! - `POST /api/v1/reviews/{id}/decision` → 지정된 리뷰어가 승인/거절

use crate::{db, error::AppError, middleware::auth::AuthUser, models::*};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::documents::{load_owned_document, AppState};

pub async fn create_review_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewRequest>), AppError> {
    if req.reviewers.iter().all(|r| r.trim().is_empty()) {
        return Err(AppError::BadRequest(
            "at least one reviewer is required".to_string(),
        ));
    }
    load_owned_document(&state, &auth_user, &req.document_id).await?;

    // 리뷰 대상 버전은 같은 문서에 있어야 합니다.
    let version_document = db::version_document_id(&state.pool, &req.version_id, req.is_sub).await?;
    if version_document.as_deref() != Some(req.document_id.as_str()) {
        return Err(AppError::VersionNotFound);
    }

    let review = db::create_review(&state.pool, &req, &auth_user.user_id).await?;
    tracing::info!(review_id = %review.id, document_id = %review.document_id, "Review requested");

    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn get_review_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ReviewRequest>, AppError> {
    let review = db::get_review(&state.pool, &id)
        .await?
        .ok_or(AppError::ReviewNotFound)?;

    let is_participant = review.requested_by == auth_user.user_id
        || review.reviewers.iter().any(|r| *r == auth_user.user_id);
    if !is_participant {
        load_owned_document(&state, &auth_user, &review.document_id).await?;
    }

    Ok(Json(review))
}

pub async fn decide_review_request(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<DecideReviewRequest>,
) -> Result<Json<ReviewRequest>, AppError> {
    let review = db::decide_review(
        &state.pool,
        &id,
        &auth_user.user_id,
        req.decision,
        req.comment.as_deref(),
    )
    .await?;
    Ok(Json(review))
}
