//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 도메인 에러(문서/버전 없음, 검증 실패, 충돌)와
//!   인프라 에러(DB, IO)를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 `{ "error": { "code", "message" } }` HTTP 응답으로 변환
//!
//! 저장소 내부 에러(sqlx, IO)의 상세 내용은 로그에만 남기고,
//! 클라이언트에는 일반적인 메시지와 대략적인 분류만 전달합니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 문서를 찾을 수 없음 (HTTP 404)
    #[error("Document not found")]
    DocumentNotFound,

    /// 버전/서브 버전을 찾을 수 없음 (HTTP 404)
    #[error("Version not found")]
    VersionNotFound,

    /// 메인 버전이 하나도 없는 문서에 서브 버전을 저장하려 함 (HTTP 404)
    #[error("Parent version not found: save a main version first")]
    ParentVersionNotFound,

    #[error("Review request not found")]
    ReviewNotFound,

    /// 잘못된 요청 (HTTP 400): 필수 값 누락, 입력 크기 초과 등
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 다른 소유자의 리소스에 접근 (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 리소스 충돌 (HTTP 409): 동시 저장 재시도 소진, 종료된 리뷰 등
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// #[from]: `?` 연산자로 sqlx::Error → AppError::Database 자동 변환
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 파일 입출력 오류 (HTTP 500): 블롭 저장소
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// 클라이언트에 노출되는 대략적인 에러 분류 코드
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DocumentNotFound
            | AppError::VersionNotFound
            | AppError::ParentVersionNotFound
            | AppError::ReviewNotFound => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal_error",
            AppError::Database(_) => "database_error",
            AppError::Io(_) => "io_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DocumentNotFound
            | AppError::VersionNotFound
            | AppError::ParentVersionNotFound
            | AppError::ReviewNotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Database(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러(Database, IO, Internal)는 실제 에러 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match self {
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                "A database error occurred".to_string()
            }
            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                "An IO error occurred".to_string()
            }
            AppError::BadRequest(ref msg)
            | AppError::Forbidden(ref msg)
            | AppError::Conflict(ref msg) => msg.clone(),
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
