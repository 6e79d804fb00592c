//! # 문서(Document) 모델
//!
//! 문서는 첫 번째 버전 저장 시 암묵적으로 생성됩니다.
//! 문서 행은 "현재" 메인 버전 번호 / 서브 버전 문자와
//! 가장 최근에 만들어진 버전 행의 ID를 가리키는 포인터만 가지고 있고,
//! 실제 내용은 `main_versions` / `sub_versions` 테이블에 쌓입니다.

use serde::{Deserialize, Serialize};

/// 문서 엔티티: DB의 `documents` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub slug: String,
    /// 가장 최근 메인 버전 번호. 버전이 하나도 없으면 None
    pub current_main_version: Option<i64>,
    /// 현재 메인 버전 아래 가장 최근 서브 버전 문자.
    /// 새 메인 버전이 저장되면 None으로 초기화됩니다.
    pub current_sub_version: Option<String>,
    pub latest_main_version_id: Option<String>,
    pub latest_sub_version_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    /// 요청한 사용자가 이 문서의 소유자인지 확인합니다.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}
