//! # 버전 저장소 (VersionStore)
//!
//! 메인 버전 / 서브 버전 행을 기록하고 조회하는 쿼리 모듈입니다.
//!
//! 다음 번호(`MAX + 1`)와 다음 문자를 계산하는 읽기와 INSERT, 문서 포인터 갱신은
//! 모두 하나의 `BEGIN IMMEDIATE` 트랜잭션 안에서 실행됩니다. 쓰기 잠금을 처음부터 잡으므로
//! 동시 저장은 SQLite busy timeout 동안 차례를 기다립니다.
//! 그래도 두 저장이 같은 값을 계산하면 `UNIQUE(document_id, main_version)` /
//! `UNIQUE(parent_id, letter)` 제약 때문에 늦은 쪽이 실패하고,
//! 트랜잭션 전체가 롤백된 뒤 잠시 물러났다가 처음부터 다시 시도합니다.
//!
//! 버전 행에 대한 UPDATE/DELETE 쿼리는 이 모듈에 존재하지 않습니다.

use std::collections::HashMap;
use std::time::Duration;

use crate::db::documents;
use crate::error::AppError;
use crate::models::*;
use rand::Rng;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 320;

const MAIN_VERSION_COLUMNS: &str = r#"
    id, document_id, main_version, content, blob_key, content_size, description,
    editor_id, editor_name, status, branch, merged_from, created_at
"#;

/// 서브 버전은 부모 메인 버전과 JOIN 해서 문서 ID와 부모 번호를 함께 가져옵니다.
const SUB_VERSION_SELECT: &str = r#"
    SELECT s.id, s.parent_id, m.document_id, m.main_version AS parent_main_version,
           s.letter, s.content, s.blob_key, s.content_size, s.description,
           s.editor_id, s.editor_name, s.created_at
    FROM sub_versions s
    JOIN main_versions m ON m.id = s.parent_id
"#;

/// 새 버전을 저장합니다.
///
/// - `document_id`가 없으면 문서를 새로 만듭니다.
/// - `is_main_version`이면 `MAX(main_version) + 1` 번호로 메인 버전을 만들고
///   문서의 서브 버전 포인터를 초기화합니다.
/// - 아니면 문서의 현재 메인 버전 아래에 다음 문자로 서브 버전을 만듭니다.
///   메인 버전이 없으면 `ParentVersionNotFound`.
///
/// 번호 충돌(동시 저장)이나 SQLite 잠금으로 실패하면 `retry_limit`번까지 다시 시도하고,
/// 그래도 실패하면 `Conflict`를 반환합니다.
pub async fn save_version(
    pool: &SqlitePool,
    owner_id: &str,
    params: &SaveVersionParams,
    retry_limit: u32,
) -> Result<SavedVersion, AppError> {
    validate(params)?;

    let attempts = retry_limit.max(1);
    let mut backoff_ms = INITIAL_BACKOFF_MS;
    for attempt in 1..=attempts {
        match try_save(pool, owner_id, params).await {
            Err(err) if is_retryable(&err) => {
                if attempt == attempts {
                    break;
                }
                // 같은 순간에 충돌한 저장들이 다시 부딪히지 않도록 대기 시간을 흩뜨립니다.
                let jitter = rand::rng().random_range(0..backoff_ms / 2 + 1);
                let sleep_ms = backoff_ms + jitter;
                tracing::warn!(
                    attempt,
                    backoff_ms = sleep_ms,
                    document_id = ?params.document_id,
                    "Version save collided with a concurrent writer, retrying: {}",
                    err
                );
                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
            result => return result,
        }
    }

    Err(AppError::Conflict(format!(
        "Could not assign a version number after {} attempts",
        attempts
    )))
}

fn validate(params: &SaveVersionParams) -> Result<(), AppError> {
    if params.description.trim().is_empty() {
        return Err(AppError::BadRequest("description is required".to_string()));
    }
    if params.editor.id.trim().is_empty() || params.editor.name.trim().is_empty() {
        return Err(AppError::BadRequest("editor is required".to_string()));
    }
    let missing_name = params
        .document_name
        .as_deref()
        .map_or(true, |name| name.trim().is_empty());
    if params.document_id.is_none() && missing_name {
        return Err(AppError::BadRequest(
            "document_name is required when creating a document".to_string(),
        ));
    }
    Ok(())
}

/// 유니크 제약 위반(번호 충돌)과 SQLITE_BUSY / SQLITE_LOCKED 계열은 재시도 대상입니다.
fn is_retryable(err: &AppError) -> bool {
    let AppError::Database(sqlx::Error::Database(db_err)) = err else {
        return false;
    };
    db_err.is_unique_violation()
        || matches!(
            db_err.code().as_deref(),
            Some("5") | Some("6") | Some("262") | Some("517")
        )
}

async fn try_save(
    pool: &SqlitePool,
    owner_id: &str,
    params: &SaveVersionParams,
) -> Result<SavedVersion, AppError> {
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let document = match params.document_id.as_deref() {
        Some(id) => documents::get_document(&mut *tx, id)
            .await?
            .ok_or(AppError::DocumentNotFound)?,
        None => {
            let name = params.document_name.as_deref().unwrap_or_default().trim();
            documents::insert_document(&mut tx, owner_id, name).await?
        }
    };

    let version = if params.is_main_version {
        VersionRecord::Main(insert_main_version(&mut tx, &document, params).await?)
    } else {
        VersionRecord::Sub(insert_sub_version(&mut tx, &document, params).await?)
    };

    let document = documents::get_document(&mut *tx, &document.id)
        .await?
        .ok_or(AppError::Internal("Document vanished during save".to_string()))?;

    tx.commit().await?;

    tracing::info!(
        document_id = %document.id,
        version_id = %version.id(),
        label = %version.label(),
        "Saved version"
    );

    Ok(SavedVersion { document, version })
}

async fn insert_main_version(
    conn: &mut SqliteConnection,
    document: &Document,
    params: &SaveVersionParams,
) -> Result<MainVersion, AppError> {
    let branch = params
        .branch
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_BRANCH);

    if params.new_branch {
        ensure_branch_is_new(conn, &document.id, branch).await?;
    }

    let next_version: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(main_version), 0) + 1 FROM main_versions WHERE document_id = ?",
    )
    .bind(&document.id)
    .fetch_one(&mut *conn)
    .await?;

    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query(
        r#"
        INSERT INTO main_versions
            (id, document_id, main_version, content, blob_key, content_size, description,
             editor_id, editor_name, status, branch, merged_from)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&document.id)
    .bind(next_version)
    .bind(&params.content)
    .bind(params.blob.as_ref().map(|b| b.key.as_str()))
    .bind(params.blob.as_ref().map(|b| b.size))
    .bind(params.description.trim())
    .bind(&params.editor.id)
    .bind(&params.editor.name)
    .bind(params.status.unwrap_or_default())
    .bind(branch)
    .bind(&params.merged_from)
    .execute(&mut *conn)
    .await?;

    documents::point_to_main_version(conn, &document.id, next_version, &id).await?;

    get_main_version(&mut *conn, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created version".to_string()))
}

/// `main`은 모든 문서에 항상 있는 브랜치로 봅니다. 태그가 NULL인 옛 행도 `main`입니다.
async fn ensure_branch_is_new(
    conn: &mut SqliteConnection,
    document_id: &str,
    branch: &str,
) -> Result<(), AppError> {
    let taken = branch == DEFAULT_BRANCH
        || sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM main_versions WHERE document_id = ? AND branch = ?)",
        )
        .bind(document_id)
        .bind(branch)
        .fetch_one(&mut *conn)
        .await?;

    if taken {
        return Err(AppError::Conflict(format!("Branch '{}' already exists", branch)));
    }
    Ok(())
}

async fn insert_sub_version(
    conn: &mut SqliteConnection,
    document: &Document,
    params: &SaveVersionParams,
) -> Result<SubVersion, AppError> {
    let current = document
        .current_main_version
        .ok_or(AppError::ParentVersionNotFound)?;

    let parent_id: String = sqlx::query_scalar(
        r#"
        SELECT id FROM main_versions
        WHERE document_id = ? AND main_version = ?
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(&document.id)
    .bind(current)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::ParentVersionNotFound)?;

    // 시퀀스 순서: 짧은 문자열이 먼저, 같은 길이 안에서는 사전순 (Z < ZA < ZB)
    let last_letter: Option<String> = sqlx::query_scalar(
        r#"
        SELECT letter FROM sub_versions
        WHERE parent_id = ?
        ORDER BY length(letter) DESC, letter DESC
        LIMIT 1
        "#,
    )
    .bind(&parent_id)
    .fetch_optional(&mut *conn)
    .await?;

    let letter = next_letter(last_letter.as_deref());
    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query(
        r#"
        INSERT INTO sub_versions
            (id, parent_id, letter, content, blob_key, content_size, description,
             editor_id, editor_name)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&parent_id)
    .bind(&letter)
    .bind(&params.content)
    .bind(params.blob.as_ref().map(|b| b.key.as_str()))
    .bind(params.blob.as_ref().map(|b| b.size))
    .bind(params.description.trim())
    .bind(&params.editor.id)
    .bind(&params.editor.name)
    .execute(&mut *conn)
    .await?;

    documents::point_to_sub_version(conn, &document.id, &letter, &id).await?;

    get_sub_version(&mut *conn, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created sub-version".to_string()))
}

pub async fn get_main_version<'e, E>(executor: E, id: &str) -> Result<Option<MainVersion>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let version = sqlx::query_as::<_, MainVersion>(&format!(
        "SELECT {MAIN_VERSION_COLUMNS} FROM main_versions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(version)
}

pub async fn get_sub_version<'e, E>(executor: E, id: &str) -> Result<Option<SubVersion>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let version = sqlx::query_as::<_, SubVersion>(&format!("{SUB_VERSION_SELECT} WHERE s.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(version)
}

/// 버전 하나를 종류 플래그로 조회합니다. 없으면 `Ok(None)`: 처리는 호출하는 쪽이 결정합니다.
pub async fn get_version(
    pool: &SqlitePool,
    id: &str,
    is_sub: bool,
) -> Result<Option<VersionRecord>, AppError> {
    let version = if is_sub {
        get_sub_version(pool, id).await?.map(VersionRecord::Sub)
    } else {
        get_main_version(pool, id).await?.map(VersionRecord::Main)
    };
    Ok(version)
}

/// 버전이 속한 문서 ID. 접근 권한을 확인할 때 내용 없이 가볍게 조회합니다.
pub async fn version_document_id(
    pool: &SqlitePool,
    id: &str,
    is_sub: bool,
) -> Result<Option<String>, AppError> {
    let query = if is_sub {
        "SELECT m.document_id FROM sub_versions s JOIN main_versions m ON m.id = s.parent_id WHERE s.id = ?"
    } else {
        "SELECT document_id FROM main_versions WHERE id = ?"
    };
    let document_id = sqlx::query_scalar(query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(document_id)
}

/// 문서와 모든 메인 버전(번호 내림차순), 각 메인 버전의 서브 버전(문자 오름차순)을 조회합니다.
pub async fn get_version_history(
    pool: &SqlitePool,
    document_id: &str,
) -> Result<VersionHistory, AppError> {
    let document = documents::get_document(pool, document_id)
        .await?
        .ok_or(AppError::DocumentNotFound)?;

    let mains = sqlx::query_as::<_, MainVersion>(&format!(
        "SELECT {MAIN_VERSION_COLUMNS} FROM main_versions WHERE document_id = ? ORDER BY main_version DESC"
    ))
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    let subs = sqlx::query_as::<_, SubVersion>(&format!(
        "{SUB_VERSION_SELECT} WHERE m.document_id = ? ORDER BY length(s.letter), s.letter"
    ))
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    let mut by_parent: HashMap<String, Vec<SubVersion>> = HashMap::new();
    for sub in subs {
        by_parent.entry(sub.parent_id.clone()).or_default().push(sub);
    }

    let versions = mains
        .into_iter()
        .map(|version| MainVersionWithSubs {
            sub_versions: by_parent.remove(&version.id).unwrap_or_default(),
            version,
        })
        .collect();

    Ok(VersionHistory { document, versions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, FileTestDb};

    fn editor() -> Editor {
        Editor {
            id: "user-1".to_string(),
            name: "Dana Kim".to_string(),
        }
    }

    fn params(document_id: Option<&str>, is_main: bool, content: &str) -> SaveVersionParams {
        SaveVersionParams {
            document_id: document_id.map(str::to_string),
            document_name: Some("Master Services Agreement".to_string()),
            content: content.to_string(),
            blob: None,
            description: "edit".to_string(),
            editor: editor(),
            is_main_version: is_main,
            status: None,
            branch: None,
            merged_from: None,
            new_branch: false,
        }
    }

    #[tokio::test]
    async fn first_save_creates_document_and_v1() {
        let pool = test_pool().await;
        let saved = save_version(&pool, "user-1", &params(None, true, "hello"), 3)
            .await
            .unwrap();

        assert_eq!(saved.document.name, "Master Services Agreement");
        assert_eq!(saved.document.slug, "master-services-agreement");
        assert_eq!(saved.document.current_main_version, Some(1));
        assert_eq!(saved.version.label(), "v1");
        assert_eq!(
            saved.document.latest_main_version_id.as_deref(),
            Some(saved.version.id())
        );
    }

    #[tokio::test]
    async fn main_versions_are_gapless_with_interleaved_subs() {
        let pool = test_pool().await;
        let first = save_version(&pool, "user-1", &params(None, true, "a"), 3)
            .await
            .unwrap();
        let doc_id = first.document.id.clone();

        for i in 0..6 {
            let is_main = i % 2 == 1;
            save_version(&pool, "user-1", &params(Some(&doc_id), is_main, "b"), 3)
                .await
                .unwrap();
        }

        let history = get_version_history(&pool, &doc_id).await.unwrap();
        let numbers: Vec<i64> = history.versions.iter().map(|v| v.version.main_version).collect();
        assert_eq!(numbers, vec![4, 3, 2, 1]);
        for v in &history.versions[1..] {
            assert_eq!(v.sub_versions.len(), 1);
            assert_eq!(v.sub_versions[0].letter, "A");
        }
        assert!(history.versions[0].sub_versions.is_empty());
        assert_eq!(history.document.current_sub_version, None);
    }

    #[tokio::test]
    async fn sub_version_letters_roll_past_z() {
        let pool = test_pool().await;
        let first = save_version(&pool, "user-1", &params(None, true, "a"), 3)
            .await
            .unwrap();
        let doc_id = first.document.id.clone();

        let mut last = None;
        for _ in 0..28 {
            let saved = save_version(&pool, "user-1", &params(Some(&doc_id), false, "x"), 3)
                .await
                .unwrap();
            last = Some(saved);
        }
        let last = last.unwrap();
        assert_eq!(last.version.label(), "v1.ZB");
        assert_eq!(last.document.current_sub_version.as_deref(), Some("ZB"));
        assert_eq!(
            last.document.latest_sub_version_id.as_deref(),
            Some(last.version.id())
        );

        let history = get_version_history(&pool, &doc_id).await.unwrap();
        let letters: Vec<&str> = history.versions[0]
            .sub_versions
            .iter()
            .map(|s| s.letter.as_str())
            .collect();
        assert_eq!(letters.len(), 28);
        assert_eq!(letters[0], "A");
        assert_eq!(letters[25], "Z");
        assert_eq!(letters[26], "ZA");
        assert_eq!(letters[27], "ZB");
    }

    #[tokio::test]
    async fn sub_version_without_main_fails() {
        let pool = test_pool().await;
        let err = save_version(&pool, "user-1", &params(None, false, "a"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ParentVersionNotFound));

        // 실패한 트랜잭션은 문서도 남기지 않습니다.
        let docs = documents::list_documents(&pool, "user-1").await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn validation_errors() {
        let pool = test_pool().await;

        let mut p = params(None, true, "a");
        p.description = "  ".to_string();
        assert!(matches!(
            save_version(&pool, "user-1", &p, 3).await,
            Err(AppError::BadRequest(_))
        ));

        let mut p = params(None, true, "a");
        p.editor.name = String::new();
        assert!(matches!(
            save_version(&pool, "user-1", &p, 3).await,
            Err(AppError::BadRequest(_))
        ));

        let mut p = params(None, true, "a");
        p.document_name = None;
        assert!(matches!(
            save_version(&pool, "user-1", &p, 3).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let pool = test_pool().await;
        let err = save_version(&pool, "user-1", &params(Some("missing"), true, "a"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DocumentNotFound));

        let err = get_version_history(&pool, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::DocumentNotFound));
    }

    #[tokio::test]
    async fn get_version_returns_none_for_missing_or_wrong_kind() {
        let pool = test_pool().await;
        let saved = save_version(&pool, "user-1", &params(None, true, "a"), 3)
            .await
            .unwrap();

        assert!(get_version(&pool, "nope", false).await.unwrap().is_none());
        assert_eq!(
            version_document_id(&pool, saved.version.id(), false).await.unwrap().as_deref(),
            Some(saved.document.id.as_str())
        );
        assert!(version_document_id(&pool, saved.version.id(), true).await.unwrap().is_none());
        assert!(get_version(&pool, saved.version.id(), true).await.unwrap().is_none());
        let found = get_version(&pool, saved.version.id(), false).await.unwrap().unwrap();
        assert_eq!(found.content(), "a");
    }

    #[tokio::test]
    async fn concurrent_main_saves_get_distinct_numbers() {
        let pool = test_pool().await;
        let first = save_version(&pool, "user-1", &params(None, true, "a"), 3)
            .await
            .unwrap();
        let doc_id = first.document.id.clone();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let p = params(Some(&doc_id), true, "c");
            handles.push(tokio::spawn(async move {
                save_version(&pool, "user-1", &p, 5).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = get_version_history(&pool, &doc_id).await.unwrap();
        let mut numbers: Vec<i64> = history.versions.iter().map(|v| v.version.main_version).collect();
        numbers.sort();
        assert_eq!(numbers, (1..=9).collect::<Vec<i64>>());
        assert_eq!(history.document.current_main_version, Some(9));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_over_many_connections_all_succeed() {
        let db = FileTestDb::open(8).await;
        let first = save_version(&db.pool, "user-1", &params(None, true, "a"), 5)
            .await
            .unwrap();
        let doc_id = first.document.id.clone();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let pool = db.pool.clone();
            let p = params(Some(&doc_id), true, "c");
            handles.push(tokio::spawn(async move {
                save_version(&pool, "user-1", &p, 5).await
            }));
        }
        let mut failures = Vec::new();
        for handle in handles {
            if let Err(err) = handle.await.unwrap() {
                failures.push(err.to_string());
            }
        }
        assert!(failures.is_empty(), "saves failed: {:?}", failures);

        let history = get_version_history(&db.pool, &doc_id).await.unwrap();
        let mut numbers: Vec<i64> = history.versions.iter().map(|v| v.version.main_version).collect();
        numbers.sort();
        assert_eq!(numbers, (1..=17).collect::<Vec<i64>>());
        assert_eq!(history.document.current_main_version, Some(17));
        assert_eq!(
            history.document.latest_main_version_id.as_deref(),
            Some(history.versions[0].version.id.as_str())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sub_saves_get_distinct_letters() {
        let db = FileTestDb::open(6).await;
        let first = save_version(&db.pool, "user-1", &params(None, true, "a"), 5)
            .await
            .unwrap();
        let doc_id = first.document.id.clone();

        let mut handles = Vec::new();
        for _ in 0..12 {
            let pool = db.pool.clone();
            let p = params(Some(&doc_id), false, "s");
            handles.push(tokio::spawn(async move {
                save_version(&pool, "user-1", &p, 5).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = get_version_history(&db.pool, &doc_id).await.unwrap();
        let letters: Vec<&str> = history.versions[0]
            .sub_versions
            .iter()
            .map(|s| s.letter.as_str())
            .collect();
        assert_eq!(
            letters,
            vec!["A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L"]
        );
        assert_eq!(history.document.current_sub_version.as_deref(), Some("L"));
    }

    #[tokio::test]
    async fn blob_reference_and_status_are_stored() {
        let pool = test_pool().await;
        let mut p = params(None, true, "text");
        p.blob = Some(BlobRef {
            key: "blob-1".to_string(),
            size: 42,
        });
        p.status = Some(VersionStatus::Circulated);

        let saved = save_version(&pool, "user-1", &p, 3).await.unwrap();
        let VersionRecord::Main(main) = &saved.version else {
            panic!("expected a main version");
        };
        assert_eq!(main.status, VersionStatus::Circulated);
        assert_eq!(main.branch_name(), "main");
        assert_eq!(
            saved.version.blob(),
            Some(BlobRef {
                key: "blob-1".to_string(),
                size: 42
            })
        );
    }
}
