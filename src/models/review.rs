//! # 리뷰 요청 모델
//!
//! 특정 버전에 대한 검토 요청입니다. 상태 전이는 단순합니다:
//!
//! ```text
//! pending ──approve──▶ approved  (종료)
//!    └─────reject────▶ rejected  (종료)
//! ```
//!
//! 종료 상태에서는 어떤 전이도 허용되지 않습니다.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReviewStatus::Pending)
    }

    /// 결정을 적용한 다음 상태를 반환합니다.
    /// 이미 종료된 요청이면 None.
    pub fn apply(self, decision: ReviewDecision) -> Option<ReviewStatus> {
        match (self, decision) {
            (ReviewStatus::Pending, ReviewDecision::Approve) => Some(ReviewStatus::Approved),
            (ReviewStatus::Pending, ReviewDecision::Reject) => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }
}

/// 리뷰 요청 엔티티: `review_requests` 테이블 한 행 + 리뷰어 목록
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewRequest {
    pub id: String,
    pub document_id: String,
    pub version_id: String,
    pub is_sub: bool,
    pub requested_by: String,
    pub status: ReviewStatus,
    pub decided_by: Option<String>,
    pub decided_at: Option<String>,
    pub comment: Option<String>,
    pub created_at: String,
    /// `review_reviewers` 테이블에서 따로 채웁니다.
    #[sqlx(skip)]
    pub reviewers: Vec<String>,
}

/// `POST /api/v1/reviews` 요청 본문
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub document_id: String,
    pub version_id: String,
    #[serde(default)]
    pub is_sub: bool,
    pub reviewers: Vec<String>,
}

/// `POST /api/v1/reviews/:id/decision` 요청 본문
#[derive(Debug, Deserialize)]
pub struct DecideReviewRequest {
    pub decision: ReviewDecision,
    pub comment: Option<String>,
}
