//! # 브랜치 관리
//!
//! 브랜치는 메인 버전에 붙는 자유 텍스트 태그입니다.
//! 브랜치 생성과 병합은 모두 "최신 버전 내용을 복사한 새 메인 버전"을 만드는
//! 복사 전용 연산이며, 내용 수준의 병합(충돌 해결)은 하지 않습니다.

use std::collections::BTreeMap;

use sqlx::SqlitePool;

use crate::db::{self, branches as queries};
use crate::error::AppError;
use crate::models::*;

/// 새 브랜치를 만듭니다.
///
/// `from_branch`의 최신 메인 버전을 복사합니다. 해당 브랜치에 버전이 없거나
/// `from_branch`를 지정하지 않으면 문서 전체의 최신 메인 버전을 복사합니다.
pub async fn create_branch(
    pool: &SqlitePool,
    retry_limit: u32,
    owner_id: &str,
    editor: Editor,
    document_id: &str,
    req: &CreateBranchRequest,
) -> Result<SavedVersion, AppError> {
    let name = req.branch_name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("branch_name is required".to_string()));
    }
    ensure_document(pool, document_id).await?;

    let from = req.from_branch.as_deref().map(str::trim).filter(|b| !b.is_empty());
    let source = match from {
        Some(from) => match queries::latest_on_branch(pool, document_id, from).await? {
            Some(version) => Some(version),
            None => queries::latest_overall(pool, document_id).await?,
        },
        None => queries::latest_overall(pool, document_id).await?,
    }
    .ok_or(AppError::VersionNotFound)?;

    let mut params = copy_params(
        document_id,
        &source,
        editor,
        format!("Created branch '{}' from {}", name, source.label()),
        name,
        None,
    );
    // 이름 중복은 저장 트랜잭션 안에서 확인합니다.
    params.new_branch = true;
    let saved = db::save_version(pool, owner_id, &params, retry_limit).await?;

    tracing::info!(
        document_id,
        branch = name,
        source = %source.label(),
        created = %saved.version.label(),
        "Created branch"
    );
    Ok(saved)
}

/// `source_branch`의 최신 버전을 `target_branch`(기본 `main`) 태그의 새 메인 버전으로 복사합니다.
pub async fn merge_branch(
    pool: &SqlitePool,
    retry_limit: u32,
    owner_id: &str,
    editor: Editor,
    document_id: &str,
    req: &MergeBranchRequest,
) -> Result<SavedVersion, AppError> {
    let source_branch = req.source_branch.trim();
    let target_branch = req
        .target_branch
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_BRANCH);

    if source_branch.is_empty() {
        return Err(AppError::BadRequest("source_branch is required".to_string()));
    }
    if source_branch == target_branch {
        return Err(AppError::BadRequest(
            "source and target branch must differ".to_string(),
        ));
    }
    ensure_document(pool, document_id).await?;

    let source = queries::latest_on_branch(pool, document_id, source_branch)
        .await?
        .ok_or(AppError::VersionNotFound)?;

    let params = copy_params(
        document_id,
        &source,
        editor,
        format!(
            "Merged '{}' ({}) into '{}'",
            source_branch,
            source.label(),
            target_branch
        ),
        target_branch,
        Some(source_branch),
    );
    let saved = db::save_version(pool, owner_id, &params, retry_limit).await?;

    tracing::info!(
        document_id,
        source_branch,
        target_branch,
        created = %saved.version.label(),
        "Merged branch"
    );
    Ok(saved)
}

/// 브랜치별 버전 목록과 전체 타임라인 (둘 다 최신순).
/// 태그가 없는 버전은 `main`으로 묶고, `main`은 버전이 없어도 항상 포함합니다.
pub async fn get_version_graph(
    pool: &SqlitePool,
    document_id: &str,
) -> Result<VersionGraph, AppError> {
    ensure_document(pool, document_id).await?;
    let timeline = queries::list_version_summaries(pool, document_id).await?;

    let mut branches: BTreeMap<String, Vec<MainVersionSummary>> = BTreeMap::new();
    branches.insert(DEFAULT_BRANCH.to_string(), Vec::new());
    for version in &timeline {
        let tag = version
            .branch
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BRANCH);
        branches.entry(tag.to_string()).or_default().push(version.clone());
    }

    Ok(VersionGraph { branches, timeline })
}

/// 문서의 브랜치 이름 목록. `main`이 항상 맨 앞입니다.
pub async fn list_branches(pool: &SqlitePool, document_id: &str) -> Result<Vec<String>, AppError> {
    let mut names = queries::list_branch_names(pool, document_id).await?;
    names.retain(|n| n != DEFAULT_BRANCH);
    names.insert(0, DEFAULT_BRANCH.to_string());
    Ok(names)
}

async fn ensure_document(pool: &SqlitePool, document_id: &str) -> Result<Document, AppError> {
    db::get_document(pool, document_id)
        .await?
        .ok_or(AppError::DocumentNotFound)
}

fn copy_params(
    document_id: &str,
    source: &MainVersion,
    editor: Editor,
    description: String,
    branch: &str,
    merged_from: Option<&str>,
) -> SaveVersionParams {
    SaveVersionParams {
        document_id: Some(document_id.to_string()),
        document_name: None,
        content: source.content.clone(),
        blob: source.blob_key.as_ref().map(|key| BlobRef {
            key: key.clone(),
            size: source.content_size.unwrap_or(0),
        }),
        description,
        editor,
        is_main_version: true,
        status: None,
        branch: Some(branch.to_string()),
        merged_from: merged_from.map(str::to_string),
        new_branch: false,
    }
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

    async fn seed(pool: &SqlitePool, content: &str) -> String {
        let params = SaveVersionParams {
            document_id: None,
            document_name: Some("Joint Venture".to_string()),
            content: content.to_string(),
            blob: None,
            description: "initial".to_string(),
            editor: editor(),
            is_main_version: true,
            status: None,
            branch: None,
            merged_from: None,
            new_branch: false,
        };
        db::save_version(pool, "user-1", &params, 3)
            .await
            .unwrap()
            .document
            .id
    }

    fn branch(name: &str, from: Option<&str>) -> CreateBranchRequest {
        CreateBranchRequest {
            branch_name: name.to_string(),
            from_branch: from.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn branch_then_merge_copies_content() {
        let pool = test_pool().await;
        let doc_id = seed(&pool, "base terms").await;

        let created = create_branch(&pool, 3, "user-1", editor(), &doc_id, &branch("counter-offer", Some("main")))
            .await
            .unwrap();
        let VersionRecord::Main(created) = created.version else {
            panic!("branch must create a main version");
        };
        assert_eq!(created.main_version, 2);
        assert_eq!(created.branch.as_deref(), Some("counter-offer"));
        assert_eq!(created.content, "base terms");

        let merge = MergeBranchRequest {
            source_branch: "counter-offer".to_string(),
            target_branch: None,
        };
        let merged = merge_branch(&pool, 3, "user-1", editor(), &doc_id, &merge)
            .await
            .unwrap();
        let VersionRecord::Main(merged) = merged.version else {
            panic!("merge must create a main version");
        };
        assert_eq!(merged.main_version, 3);
        assert_eq!(merged.branch_name(), "main");
        assert_eq!(merged.merged_from.as_deref(), Some("counter-offer"));
        assert_eq!(merged.content, "base terms");

        assert_eq!(
            list_branches(&pool, &doc_id).await.unwrap(),
            vec!["main".to_string(), "counter-offer".to_string()]
        );
    }

    #[tokio::test]
    async fn branch_name_can_only_be_opened_once() {
        let pool = test_pool().await;
        let doc_id = seed(&pool, "terms").await;

        create_branch(&pool, 3, "user-1", editor(), &doc_id, &branch("redlines", None))
            .await
            .unwrap();
        let err = create_branch(&pool, 3, "user-1", editor(), &doc_id, &branch(" redlines ", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // 실패한 생성은 버전을 남기지 않습니다.
        let history = db::get_version_history(&pool, &doc_id).await.unwrap();
        assert_eq!(history.versions.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_of_same_branch_admit_one() {
        let db = FileTestDb::open(4).await;
        let doc_id = seed(&db.pool, "terms").await;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = db.pool.clone();
            let doc_id = doc_id.clone();
            handles.push(tokio::spawn(async move {
                create_branch(&pool, 5, "user-1", editor(), &doc_id, &branch("buyer-draft", None)).await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(AppError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!((created, conflicts), (1, 3));

        let graph = get_version_graph(&db.pool, &doc_id).await.unwrap();
        assert_eq!(graph.branches["buyer-draft"].len(), 1);
    }

    #[tokio::test]
    async fn unknown_from_branch_falls_back_to_latest() {
        let pool = test_pool().await;
        let doc_id = seed(&pool, "v1 text").await;

        let saved = create_branch(&pool, 3, "user-1", editor(), &doc_id, &branch("draft-b", Some("nope")))
            .await
            .unwrap();
        assert_eq!(saved.version.content(), "v1 text");
    }

    #[tokio::test]
    async fn branch_errors() {
        let pool = test_pool().await;
        let doc_id = seed(&pool, "text").await;

        assert!(matches!(
            create_branch(&pool, 3, "user-1", editor(), &doc_id, &branch("  ", None)).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            create_branch(&pool, 3, "user-1", editor(), &doc_id, &branch("main", None)).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            create_branch(&pool, 3, "user-1", editor(), "missing", &branch("x", None)).await,
            Err(AppError::DocumentNotFound)
        ));

        let same = MergeBranchRequest {
            source_branch: "main".to_string(),
            target_branch: Some("main".to_string()),
        };
        assert!(matches!(
            merge_branch(&pool, 3, "user-1", editor(), &doc_id, &same).await,
            Err(AppError::BadRequest(_))
        ));

        let ghost = MergeBranchRequest {
            source_branch: "ghost".to_string(),
            target_branch: None,
        };
        assert!(matches!(
            merge_branch(&pool, 3, "user-1", editor(), &doc_id, &ghost).await,
            Err(AppError::VersionNotFound)
        ));
    }

    #[tokio::test]
    async fn graph_groups_untagged_versions_under_main() {
        let pool = test_pool().await;
        let doc_id = seed(&pool, "one").await;
        create_branch(&pool, 3, "user-1", editor(), &doc_id, &branch("redlines", None))
            .await
            .unwrap();

        // 태그가 비어 있는 과거 데이터
        sqlx::query(
            r#"
            INSERT INTO main_versions
                (id, document_id, main_version, content, description, editor_id, editor_name, branch)
            VALUES ('legacy', ?, 3, 'old', 'imported', 'user-1', 'Dana Kim', NULL)
            "#,
        )
        .bind(&doc_id)
        .execute(&pool)
        .await
        .unwrap();

        let graph = get_version_graph(&pool, &doc_id).await.unwrap();
        let main: Vec<i64> = graph.branches["main"].iter().map(|v| v.main_version).collect();
        assert_eq!(main, vec![3, 1]);
        assert_eq!(graph.branches["redlines"].len(), 1);
        let timeline: Vec<i64> = graph.timeline.iter().map(|v| v.main_version).collect();
        assert_eq!(timeline, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn graph_always_lists_main() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO documents (id, owner_id, name, slug) VALUES ('doc-side', 'user-1', 'Side', 'side')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO main_versions
                (id, document_id, main_version, content, description, editor_id, editor_name, branch)
            VALUES ('side-1', 'doc-side', 1, 'text', 'imported', 'user-1', 'Dana Kim', 'side')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let graph = get_version_graph(&pool, "doc-side").await.unwrap();
        assert!(graph.branches["main"].is_empty());
        assert_eq!(graph.branches["side"].len(), 1);
        assert_eq!(list_branches(&pool, "doc-side").await.unwrap()[0], "main");
    }
}
