//! 브랜치 관련 쿼리.
//!
//! 브랜치는 별도 테이블이 아니라 메인 버전 행의 `branch` 태그입니다.
//! 태그가 NULL인 행은 모두 `main` 브랜치로 취급합니다.

use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

const SUMMARY_COLUMNS: &str = r#"
    id, document_id, main_version, description, editor_id, editor_name,
    status, branch, merged_from, created_at
"#;

/// 브랜치에서 가장 최근 메인 버전 (번호가 곧 생성 순서)
pub async fn latest_on_branch(
    pool: &SqlitePool,
    document_id: &str,
    branch: &str,
) -> Result<Option<MainVersion>, AppError> {
    let id: Option<String> = sqlx::query_scalar(
        r#"
        SELECT id FROM main_versions
        WHERE document_id = ? AND COALESCE(branch, 'main') = ?
        ORDER BY main_version DESC
        LIMIT 1
        "#,
    )
    .bind(document_id)
    .bind(branch)
    .fetch_optional(pool)
    .await?;

    match id {
        Some(id) => super::get_main_version(pool, &id).await,
        None => Ok(None),
    }
}

/// 브랜치와 상관없이 가장 최근 메인 버전
pub async fn latest_overall(
    pool: &SqlitePool,
    document_id: &str,
) -> Result<Option<MainVersion>, AppError> {
    let id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM main_versions WHERE document_id = ? ORDER BY main_version DESC LIMIT 1",
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await?;

    match id {
        Some(id) => super::get_main_version(pool, &id).await,
        None => Ok(None),
    }
}

/// 문서의 모든 메인 버전 요약을 최신순으로 조회합니다.
pub async fn list_version_summaries(
    pool: &SqlitePool,
    document_id: &str,
) -> Result<Vec<MainVersionSummary>, AppError> {
    let versions = sqlx::query_as::<_, MainVersionSummary>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM main_versions WHERE document_id = ? ORDER BY main_version DESC"
    ))
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    Ok(versions)
}

/// 문서에 사용된 브랜치 태그 목록 (중복 제거, 이름순)
pub async fn list_branch_names(
    pool: &SqlitePool,
    document_id: &str,
) -> Result<Vec<String>, AppError> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT COALESCE(branch, 'main') AS name
        FROM main_versions
        WHERE document_id = ?
        ORDER BY name
        "#,
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    Ok(names)
}
