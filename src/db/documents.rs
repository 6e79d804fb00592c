//! # 문서 데이터베이스 쿼리 모듈
//!
//! `documents` 테이블에 대한 쿼리 함수들입니다.
//! 문서 생성은 버전 저장 트랜잭션 안에서만 일어나므로,
//! 생성/조회 함수는 풀 대신 임의의 실행기(executor)를 받습니다.
//! (`&SqlitePool`이나 트랜잭션의 `&mut SqliteConnection` 모두 가능)

use crate::error::AppError;
use crate::models::*;
use sqlx::{SqliteExecutor, SqlitePool};

const DOCUMENT_COLUMNS: &str = r#"
    id, owner_id, name, slug, current_main_version, current_sub_version,
    latest_main_version_id, latest_sub_version_id, created_at, updated_at
"#;

/// 소유자의 모든 문서를 최근 수정순으로 조회합니다.
pub async fn list_documents(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Document>, AppError> {
    let docs = sqlx::query_as::<_, Document>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE owner_id = ? ORDER BY updated_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(docs)
}

/// ID로 단일 문서를 조회합니다.
///
/// # 반환값
/// - `Ok(Some(Document))`: 문서를 찾은 경우
/// - `Ok(None)`: 해당 ID의 문서가 없는 경우
pub async fn get_document<'e, E>(executor: E, id: &str) -> Result<Option<Document>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let doc = sqlx::query_as::<_, Document>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(doc)
}

/// 새 문서 행을 삽입합니다. 버전 포인터는 모두 NULL 상태로 시작합니다.
pub async fn insert_document(
    conn: &mut sqlx::SqliteConnection,
    owner_id: &str,
    name: &str,
) -> Result<Document, AppError> {
    let id = uuid::Uuid::now_v7().to_string();
    let slug = slug::slugify(name);

    sqlx::query("INSERT INTO documents (id, owner_id, name, slug) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(owner_id)
        .bind(name)
        .bind(&slug)
        .execute(&mut *conn)
        .await?;

    get_document(&mut *conn, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created document".to_string()))
}

/// 새 메인 버전이 기록된 뒤 문서 포인터를 갱신합니다.
/// 서브 버전 포인터는 새 메인 버전 기준으로 초기화됩니다.
pub async fn point_to_main_version(
    conn: &mut sqlx::SqliteConnection,
    document_id: &str,
    main_version: i64,
    version_id: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE documents
        SET current_main_version = ?, current_sub_version = NULL,
            latest_main_version_id = ?, latest_sub_version_id = NULL,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(main_version)
    .bind(version_id)
    .bind(document_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn point_to_sub_version(
    conn: &mut sqlx::SqliteConnection,
    document_id: &str,
    letter: &str,
    version_id: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE documents
        SET current_sub_version = ?, latest_sub_version_id = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(letter)
    .bind(version_id)
    .bind(document_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
