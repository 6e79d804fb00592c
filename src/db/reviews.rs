//! # 리뷰 요청 쿼리 모듈
//!
//! 리뷰 요청 생성, 조회, 결정(승인/거절)을 담당합니다.
//! 결정은 `WHERE status = 'pending'` 조건부 UPDATE로 기록하므로
//! 두 리뷰어가 동시에 결정해도 하나만 반영됩니다.

use crate::error::AppError;
use crate::models::*;
use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;

pub async fn create_review(
    pool: &SqlitePool,
    req: &CreateReviewRequest,
    requested_by: &str,
) -> Result<ReviewRequest, AppError> {
    let reviewers: Vec<&str> = req
        .reviewers
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    if reviewers.is_empty() {
        return Err(AppError::BadRequest(
            "at least one reviewer is required".to_string(),
        ));
    }

    let id = uuid::Uuid::now_v7().to_string();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO review_requests (id, document_id, version_id, is_sub, requested_by)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.document_id)
    .bind(&req.version_id)
    .bind(req.is_sub)
    .bind(requested_by)
    .execute(&mut *tx)
    .await?;

    // 같은 리뷰어가 두 번 들어와도 한 번만 기록합니다.
    for reviewer in reviewers {
        sqlx::query("INSERT OR IGNORE INTO review_reviewers (review_id, reviewer_id) VALUES (?, ?)")
            .bind(&id)
            .bind(reviewer)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    get_review(pool, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created review".to_string()))
}

pub async fn get_review(pool: &SqlitePool, id: &str) -> Result<Option<ReviewRequest>, AppError> {
    let review = sqlx::query_as::<_, ReviewRequest>(
        r#"
        SELECT id, document_id, version_id, is_sub, requested_by, status,
               decided_by, decided_at, comment, created_at
        FROM review_requests
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(mut review) = review else {
        return Ok(None);
    };

    review.reviewers = sqlx::query_scalar(
        "SELECT reviewer_id FROM review_reviewers WHERE review_id = ? ORDER BY reviewer_id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(review))
}

/// 리뷰 요청에 결정을 기록합니다.
///
/// - 리뷰어 목록에 없는 사용자: `Forbidden`
/// - 이미 승인/거절된 요청: `Conflict`
pub async fn decide_review(
    pool: &SqlitePool,
    id: &str,
    reviewer_id: &str,
    decision: ReviewDecision,
    comment: Option<&str>,
) -> Result<ReviewRequest, AppError> {
    let review = get_review(pool, id).await?.ok_or(AppError::ReviewNotFound)?;

    if !review.reviewers.iter().any(|r| r == reviewer_id) {
        return Err(AppError::Forbidden(
            "Only an assigned reviewer can decide this review".to_string(),
        ));
    }

    if review.status.is_terminal() {
        return Err(AppError::Conflict(
            format!("Review is already {:?}", review.status).to_lowercase(),
        ));
    }
    let next = review
        .status
        .apply(decision)
        .ok_or_else(|| AppError::Internal("Pending review rejected a decision".to_string()))?;

    let decided_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let result = sqlx::query(
        r#"
        UPDATE review_requests
        SET status = ?, decided_by = ?, decided_at = ?, comment = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(next)
    .bind(reviewer_id)
    .bind(&decided_at)
    .bind(comment)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict("Review was decided concurrently".to_string()));
    }

    tracing::info!(review_id = %id, reviewer = %reviewer_id, status = ?next, "Review decided");

    get_review(pool, id).await?.ok_or(AppError::ReviewNotFound)
}
