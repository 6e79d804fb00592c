//! # 복원과 비교
//!
//! VersionStore의 상위 연산입니다. 저장은 `db::save_version` 하나로 모이고,
//! 비교는 두 버전을 읽은 뒤 diff와 변경 요약을 블로킹 스레드에서 계산합니다.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::*;
use crate::services::diff::{diff_words, tokenize, DiffSegment, DiffStats};
use crate::services::summary::{summarize_changes, ChangeRecord};

/// 과거 버전의 내용으로 새 버전을 만듭니다.
///
/// 메인 버전을 복원하면 현재 메인 버전 아래 **서브 버전**이 생기고,
/// 서브 버전을 복원하면 새 **메인 버전**이 생깁니다. 블롭 참조도 그대로 옮깁니다.
pub async fn restore_version(
    pool: &SqlitePool,
    retry_limit: u32,
    owner_id: &str,
    editor: Editor,
    document_id: &str,
    req: &RestoreVersionRequest,
) -> Result<SavedVersion, AppError> {
    let target = db::get_version(pool, &req.version_id, req.is_sub)
        .await?
        .filter(|v| v.document_id() == document_id)
        .ok_or(AppError::VersionNotFound)?;

    let description = req
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Restored from {}", target.label()));

    let params = SaveVersionParams {
        document_id: Some(document_id.to_string()),
        document_name: None,
        content: target.content().to_string(),
        blob: target.blob(),
        description,
        editor,
        // 종류가 뒤집힙니다: 서브 -> 메인, 메인 -> 서브
        is_main_version: target.is_sub(),
        status: None,
        branch: None,
        merged_from: None,
        new_branch: false,
    };

    let saved = db::save_version(pool, owner_id, &params, retry_limit).await?;
    tracing::info!(
        document_id,
        restored = %target.label(),
        created = %saved.version.label(),
        "Restored version"
    );
    Ok(saved)
}

/// 비교 결과에 함께 내려가는 버전 식별 정보
#[derive(Debug, Clone, Serialize)]
pub struct ComparedVersion {
    pub id: String,
    pub document_id: String,
    pub label: String,
    pub is_sub: bool,
}

impl From<&VersionRecord> for ComparedVersion {
    fn from(record: &VersionRecord) -> Self {
        Self {
            id: record.id().to_string(),
            document_id: record.document_id().to_string(),
            label: record.label(),
            is_sub: record.is_sub(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareResult {
    pub version_a: ComparedVersion,
    pub version_b: ComparedVersion,
    pub stats: DiffStats,
    pub segments: Vec<DiffSegment>,
    pub summary: Vec<ChangeRecord>,
}

/// 비교 한 번의 입력 크기 상한
///
/// diff 표는 `(토큰 수 A + 1) × (토큰 수 B + 1)`칸이므로 문자 수와 별개로 칸 수를 제한합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffLimits {
    pub max_chars: usize,
    pub max_cells: usize,
}

impl DiffLimits {
    fn check(&self, old: &str, new: &str) -> Result<(), AppError> {
        let total = old.chars().count() + new.chars().count();
        if total > self.max_chars {
            return Err(AppError::BadRequest(format!(
                "versions are too large to compare ({} characters, limit {})",
                total, self.max_chars
            )));
        }

        let cells = (tokenize(old).len() + 1).saturating_mul(tokenize(new).len() + 1);
        if cells > self.max_cells {
            return Err(AppError::BadRequest(format!(
                "versions have too many words to compare ({} table cells, limit {})",
                cells, self.max_cells
            )));
        }
        Ok(())
    }
}

/// 두 버전(각각 메인/서브 플래그 지정)을 비교합니다.
pub async fn compare_versions(
    pool: &SqlitePool,
    limits: DiffLimits,
    a_id: &str,
    b_id: &str,
    is_sub_a: bool,
    is_sub_b: bool,
) -> Result<CompareResult, AppError> {
    if a_id.trim().is_empty() || b_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "both version ids are required for a comparison".to_string(),
        ));
    }

    let a = db::get_version(pool, a_id, is_sub_a)
        .await?
        .ok_or(AppError::VersionNotFound)?;
    let b = db::get_version(pool, b_id, is_sub_b)
        .await?
        .ok_or(AppError::VersionNotFound)?;

    compare_records(&a, &b, limits).await
}

/// 이미 읽어 온 두 버전을 비교합니다. 입력 크기는 블로킹 작업을 띄우기 전에 제한합니다.
pub async fn compare_records(
    a: &VersionRecord,
    b: &VersionRecord,
    limits: DiffLimits,
) -> Result<CompareResult, AppError> {
    limits.check(a.content(), b.content())?;

    let old = a.content().to_string();
    let new = b.content().to_string();
    let (segments, summary) = tokio::task::spawn_blocking(move || {
        let segments = diff_words(&old, &new);
        let summary = summarize_changes(&segments);
        (segments, summary)
    })
    .await
    .map_err(|e| AppError::Internal(format!("diff task failed: {}", e)))?;

    let stats = DiffStats::from_segments(&segments);
    tracing::debug!(
        a = %a.label(),
        b = %b.label(),
        segments = segments.len(),
        records = summary.len(),
        "Compared versions"
    );

    Ok(CompareResult {
        version_a: a.into(),
        version_b: b.into(),
        stats,
        segments,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn editor() -> Editor {
        Editor {
            id: "user-1".to_string(),
            name: "Dana Kim".to_string(),
        }
    }

    fn limits(max_chars: usize) -> DiffLimits {
        DiffLimits {
            max_chars,
            max_cells: 1_000_000,
        }
    }

    fn restore(version_id: &str, is_sub: bool, description: Option<&str>) -> RestoreVersionRequest {
        RestoreVersionRequest {
            version_id: version_id.to_string(),
            is_sub,
            description: description.map(str::to_string),
        }
    }

    fn params(document_id: Option<&str>, is_main: bool, content: &str) -> SaveVersionParams {
        SaveVersionParams {
            document_id: document_id.map(str::to_string),
            document_name: Some("Lease".to_string()),
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
    async fn restore_inverts_version_kind() {
        let pool = test_pool().await;
        let v1 = db::save_version(&pool, "user-1", &params(None, true, "one"), 3)
            .await
            .unwrap();
        let doc_id = v1.document.id.clone();
        let sub = db::save_version(&pool, "user-1", &params(Some(&doc_id), false, "one-a"), 3)
            .await
            .unwrap();

        // 메인 버전 복원 -> 서브 버전
        let restored = restore_version(&pool, 3, "user-1", editor(), &doc_id, &restore(v1.version.id(), false, None))
            .await
            .unwrap();
        assert!(restored.version.is_sub());
        assert_eq!(restored.version.label(), "v1.B");
        assert_eq!(restored.version.content(), "one");

        // 서브 버전 복원 -> 메인 버전
        let req = restore(sub.version.id(), true, Some("back to v1.A"));
        let restored = restore_version(&pool, 3, "user-1", editor(), &doc_id, &req)
            .await
            .unwrap();
        assert!(!restored.version.is_sub());
        assert_eq!(restored.version.label(), "v2");
        assert_eq!(restored.version.content(), "one-a");
        assert_eq!(restored.document.current_sub_version, None);
    }

    #[tokio::test]
    async fn restore_uses_default_description_and_checks_document() {
        let pool = test_pool().await;
        let v1 = db::save_version(&pool, "user-1", &params(None, true, "one"), 3)
            .await
            .unwrap();
        let doc_id = v1.document.id.clone();

        let restored = restore_version(&pool, 3, "user-1", editor(), &doc_id, &restore(v1.version.id(), false, Some("  ")))
            .await
            .unwrap();
        let VersionRecord::Sub(sub) = &restored.version else {
            panic!("expected a sub-version");
        };
        assert_eq!(sub.description, "Restored from v1");

        let other = db::save_version(&pool, "user-1", &params(None, true, "other"), 3)
            .await
            .unwrap();
        let err = restore_version(&pool, 3, "user-1", editor(), &other.document.id, &restore(v1.version.id(), false, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::VersionNotFound));
    }

    #[tokio::test]
    async fn identical_contents_have_no_changes() {
        let pool = test_pool().await;
        let text = "Clause one.\n\nClause two.";
        let v1 = db::save_version(&pool, "user-1", &params(None, true, text), 3)
            .await
            .unwrap();
        let doc_id = v1.document.id.clone();
        let v2 = db::save_version(&pool, "user-1", &params(Some(&doc_id), true, text), 3)
            .await
            .unwrap();

        let result = compare_versions(&pool, limits(10_000), v1.version.id(), v2.version.id(), false, false)
            .await
            .unwrap();
        assert_eq!(result.stats.chars_added, 0);
        assert_eq!(result.stats.chars_removed, 0);
        assert_eq!(result.stats.chars_unchanged, text.chars().count());
        assert!(result.summary.is_empty());
        assert_eq!(result.version_a.label, "v1");
        assert_eq!(result.version_b.label, "v2");
    }

    #[tokio::test]
    async fn compare_sub_against_main() {
        let pool = test_pool().await;
        let v1 = db::save_version(&pool, "user-1", &params(None, true, "The cat sat."), 3)
            .await
            .unwrap();
        let doc_id = v1.document.id.clone();
        let sub = db::save_version(&pool, "user-1", &params(Some(&doc_id), false, "The dog sat."), 3)
            .await
            .unwrap();

        let result = compare_versions(&pool, limits(10_000), v1.version.id(), sub.version.id(), false, true)
            .await
            .unwrap();
        assert_eq!(result.version_b.label, "v1.A");
        assert_eq!(result.segments.len(), 4);
        assert_eq!(result.summary.len(), 1);
        assert_eq!(result.stats.chars_added, 3);
    }

    #[tokio::test]
    async fn compare_errors() {
        let pool = test_pool().await;
        let v1 = db::save_version(&pool, "user-1", &params(None, true, "abcdef"), 3)
            .await
            .unwrap();
        let id = v1.version.id();

        assert!(matches!(
            compare_versions(&pool, limits(100), id, "", false, false).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            compare_versions(&pool, limits(100), id, "missing", false, false).await,
            Err(AppError::VersionNotFound)
        ));
        // 종류 플래그가 틀리면 찾지 못합니다.
        assert!(matches!(
            compare_versions(&pool, limits(100), id, id, false, true).await,
            Err(AppError::VersionNotFound)
        ));
        assert!(matches!(
            compare_versions(&pool, limits(10), id, id, false, false).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn word_heavy_versions_are_rejected_before_diffing() {
        let pool = test_pool().await;
        // 글자 수 한도 안이지만 토큰 수의 곱은 표 한도를 넘습니다.
        let v1 = db::save_version(&pool, "user-1", &params(None, true, &"a ".repeat(1_500)), 3)
            .await
            .unwrap();
        let doc_id = v1.document.id.clone();
        let v2 = db::save_version(&pool, "user-1", &params(Some(&doc_id), true, &"b ".repeat(1_500)), 3)
            .await
            .unwrap();

        let tight = DiffLimits {
            max_chars: 200_000,
            max_cells: 1_000_000,
        };
        let err = compare_versions(&pool, tight, v1.version.id(), v2.version.id(), false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("table cells")));

        let roomy = DiffLimits {
            max_chars: 200_000,
            max_cells: 10_000_000,
        };
        let result = compare_versions(&pool, roomy, v1.version.id(), v2.version.id(), false, false)
            .await
            .unwrap();
        // 공백 토큰만 공통입니다.
        assert_eq!(result.stats.chars_unchanged, 1_500);
    }

    #[test]
    fn cell_budget_counts_tokens_not_characters() {
        let limits = DiffLimits {
            max_chars: 1_000,
            max_cells: 100,
        };
        // 한 단어씩이면 (1 + 1) × (1 + 1) = 4칸
        assert!(limits.check(&"x".repeat(400), &"y".repeat(400)).is_ok());
        // 글자 수는 작아도 20 × 20 토큰은 넘칩니다.
        assert!(matches!(
            limits.check(&"a ".repeat(10), &"b ".repeat(10)),
            Err(AppError::BadRequest(_))
        ));
    }
}
