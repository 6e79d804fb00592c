//! # 버전 모델
//!
//! - `MainVersion`: 문서별로 1부터 순서대로 번호가 붙는 최상위 버전 (`v3`)
//! - `SubVersion`: 메인 버전 아래 문자로 구분되는 중간 수정본 (`v3.B`)
//!
//! 두 종류 모두 한 번 기록되면 바뀌지 않습니다.
//! 수정이 필요하면 항상 새 버전/서브 버전을 만듭니다.

use serde::{Deserialize, Serialize};

use super::Document;

/// 버전 진행 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum VersionStatus {
    #[default]
    Draft,
    Circulated,
    Executed,
    Archived,
}

/// 브랜치 태그가 없는 버전은 이 브랜치에 속한 것으로 취급합니다.
pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MainVersion {
    pub id: String,
    pub document_id: String,
    pub main_version: i64,
    pub content: String,
    pub blob_key: Option<String>,
    /// 바이너리 내용의 바이트 길이 (블롭이 없으면 None)
    pub content_size: Option<i64>,
    pub description: String,
    pub editor_id: String,
    pub editor_name: String,
    pub status: VersionStatus,
    pub branch: Option<String>,
    pub merged_from: Option<String>,
    pub created_at: String,
}

impl MainVersion {
    pub fn label(&self) -> String {
        main_label(self.main_version)
    }

    pub fn branch_name(&self) -> &str {
        self.branch.as_deref().unwrap_or(DEFAULT_BRANCH)
    }
}

/// 목록/그래프 응답용 메인 버전 요약 (내용 제외)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MainVersionSummary {
    pub id: String,
    pub document_id: String,
    pub main_version: i64,
    pub description: String,
    pub editor_id: String,
    pub editor_name: String,
    pub status: VersionStatus,
    pub branch: Option<String>,
    pub merged_from: Option<String>,
    pub created_at: String,
}

/// 서브 버전. `document_id`와 `parent_main_version`은
/// 부모 메인 버전 행과 JOIN 해서 채워집니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubVersion {
    pub id: String,
    pub parent_id: String,
    pub document_id: String,
    pub parent_main_version: i64,
    pub letter: String,
    pub content: String,
    pub blob_key: Option<String>,
    pub content_size: Option<i64>,
    pub description: String,
    pub editor_id: String,
    pub editor_name: String,
    pub created_at: String,
}

impl SubVersion {
    pub fn label(&self) -> String {
        sub_label(self.parent_main_version, &self.letter)
    }
}

/// 메인 버전 또는 서브 버전 하나.
/// 복원/비교처럼 두 종류를 똑같이 다루는 곳에서 사용합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VersionRecord {
    Main(MainVersion),
    Sub(SubVersion),
}

impl VersionRecord {
    pub fn id(&self) -> &str {
        match self {
            VersionRecord::Main(v) => &v.id,
            VersionRecord::Sub(v) => &v.id,
        }
    }

    pub fn document_id(&self) -> &str {
        match self {
            VersionRecord::Main(v) => &v.document_id,
            VersionRecord::Sub(v) => &v.document_id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            VersionRecord::Main(v) => &v.content,
            VersionRecord::Sub(v) => &v.content,
        }
    }

    pub fn blob(&self) -> Option<BlobRef> {
        let (key, size) = match self {
            VersionRecord::Main(v) => (&v.blob_key, v.content_size),
            VersionRecord::Sub(v) => (&v.blob_key, v.content_size),
        };
        key.as_ref().map(|key| BlobRef {
            key: key.clone(),
            size: size.unwrap_or(0),
        })
    }

    pub fn label(&self) -> String {
        match self {
            VersionRecord::Main(v) => v.label(),
            VersionRecord::Sub(v) => v.label(),
        }
    }

    pub fn is_sub(&self) -> bool {
        matches!(self, VersionRecord::Sub(_))
    }
}

/// `v<n>` 형식의 메인 버전 라벨
pub fn main_label(main_version: i64) -> String {
    format!("v{}", main_version)
}

/// `v<n>.<letter>` 형식의 서브 버전 라벨
pub fn sub_label(main_version: i64, letter: &str) -> String {
    format!("v{}.{}", main_version, letter)
}

/// 서브 버전 문자 시퀀스의 다음 값을 계산합니다.
///
/// A, B, …, Z 다음은 ZA, ZB, …, ZZ 다음은 ZZA 입니다.
/// 마지막 문자만 증가시키고, 마지막 문자가 Z이면 A를 덧붙입니다 (자리올림 없음).
pub fn next_letter(last: Option<&str>) -> String {
    let Some(last) = last.filter(|l| !l.is_empty()) else {
        return "A".to_string();
    };

    let mut letters: Vec<char> = last.chars().collect();
    match letters.last().copied() {
        Some('Z') => letters.push('A'),
        Some(c) if c.is_ascii_uppercase() => {
            let next = (c as u8 + 1) as char;
            if let Some(tail) = letters.last_mut() {
                *tail = next;
            }
        }
        // 잘못된 문자가 들어있던 경우 시퀀스를 새로 이어 붙입니다.
        _ => letters.push('A'),
    }
    letters.into_iter().collect()
}

/// 바이너리 블롭 참조 (블롭 저장소 키 + 바이트 길이)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub key: String,
    pub size: i64,
}

/// 버전을 기록하는 편집자. 인증 계층이 매 요청마다 제공합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Editor {
    pub id: String,
    pub name: String,
}

/// 버전 저장 파라미터 (VersionStore 내부용)
#[derive(Debug, Clone)]
pub struct SaveVersionParams {
    /// None이면 새 문서를 생성합니다.
    pub document_id: Option<String>,
    /// 새 문서를 만들 때 필요한 이름
    pub document_name: Option<String>,
    pub content: String,
    pub blob: Option<BlobRef>,
    pub description: String,
    pub editor: Editor,
    pub is_main_version: bool,
    pub status: Option<VersionStatus>,
    pub branch: Option<String>,
    pub merged_from: Option<String>,
    /// 브랜치를 새로 여는 저장이면 같은 이름의 브랜치가 아직 없어야 합니다 (같은 트랜잭션에서 확인).
    pub new_branch: bool,
}

/// `POST /api/v1/versions` 요청 본문
#[derive(Debug, Deserialize)]
pub struct SaveVersionRequest {
    pub document_id: Option<String>,
    pub document_name: Option<String>,
    #[serde(default)]
    pub content: String,
    /// `POST /api/v1/blobs`로 먼저 업로드한 블롭의 키
    pub blob_key: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_main_version: bool,
    pub status: Option<VersionStatus>,
    pub branch: Option<String>,
}

/// 버전 저장 결과: 갱신된 문서와 새로 만들어진 버전
#[derive(Debug, Clone, Serialize)]
pub struct SavedVersion {
    pub document: Document,
    pub version: VersionRecord,
}

/// 메인 버전 + 그 아래 서브 버전 목록 (문자 순서 오름차순)
#[derive(Debug, Clone, Serialize)]
pub struct MainVersionWithSubs {
    #[serde(flatten)]
    pub version: MainVersion,
    pub sub_versions: Vec<SubVersion>,
}

/// 문서 버전 이력 (메인 버전 번호 내림차순)
#[derive(Debug, Clone, Serialize)]
pub struct VersionHistory {
    pub document: Document,
    pub versions: Vec<MainVersionWithSubs>,
}

#[derive(Debug, Deserialize)]
pub struct VersionKindQuery {
    #[serde(default)]
    pub sub: bool,
}

/// `POST /api/v1/documents/:id/restore` 요청 본문
#[derive(Debug, Deserialize)]
pub struct RestoreVersionRequest {
    pub version_id: String,
    #[serde(default)]
    pub is_sub: bool,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_start_at_a() {
        assert_eq!(next_letter(None), "A");
        assert_eq!(next_letter(Some("")), "A");
    }

    #[test]
    fn letters_follow_sequence_without_carry() {
        assert_eq!(next_letter(Some("A")), "B");
        assert_eq!(next_letter(Some("Y")), "Z");
        assert_eq!(next_letter(Some("Z")), "ZA");
        assert_eq!(next_letter(Some("ZA")), "ZB");
        assert_eq!(next_letter(Some("ZY")), "ZZ");
        assert_eq!(next_letter(Some("ZZ")), "ZZA");
    }

    #[test]
    fn twenty_eight_letters_in_order() {
        let mut seq = Vec::new();
        let mut last: Option<String> = None;
        for _ in 0..28 {
            let next = next_letter(last.as_deref());
            seq.push(next.clone());
            last = Some(next);
        }
        assert_eq!(seq[0], "A");
        assert_eq!(seq[25], "Z");
        assert_eq!(seq[26], "ZA");
        assert_eq!(seq[27], "ZB");
        assert!(!seq.contains(&"AA".to_string()));
    }

    #[test]
    fn labels() {
        assert_eq!(main_label(3), "v3");
        assert_eq!(sub_label(3, "ZA"), "v3.ZA");
    }
}
