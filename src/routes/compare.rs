//! # 비교 / 레드라인 내보내기 핸들러
//!
//! ## 엔드포인트
//! - `GET /api/v1/compare?a=&b=&sub_a=&sub_b=`        → diff 세그먼트 + 변경 요약 + 통계 (JSON)
//! - `GET /api/v1/compare/export?a=&b=&sub_a=&sub_b=` → 레드라인 PDF 첨부 파일
//!
//! 두 버전이 서로 다른 문서에 속해도 비교할 수 있지만, 둘 다 요청자 소유여야 합니다.
//! diff 계산 전에 권한을 먼저 확인합니다.

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthUser,
    models::Document,
    services::{
        redline::{self, fonts::RedlineFonts, RedlineInput},
        versioning::{self, CompareResult},
    },
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::documents::{load_owned_document, AppState};

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub a: Option<String>,
    pub b: Option<String>,
    #[serde(default)]
    pub sub_a: bool,
    #[serde(default)]
    pub sub_b: bool,
}

/// `GET /compare`
pub async fn compare(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<CompareQuery>,
) -> Result<Json<CompareResult>, AppError> {
    let (result, _) = run_compare(&state, &auth_user, &query).await?;
    Ok(Json(result))
}

/// `GET /compare/export`: `{문서명}_{라벨A}_vs_{라벨B}.pdf`로 내려갑니다.
pub async fn export_redline(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<CompareQuery>,
) -> Result<Response, AppError> {
    let (result, document) = run_compare(&state, &auth_user, &query).await?;
    let filename = redline::export_filename(
        &document.name,
        &result.version_a.label,
        &result.version_b.label,
    );

    let document_name = document.name;
    let font = state.redline_font.clone();
    let pdf = tokio::task::spawn_blocking(move || {
        let fonts = match font.as_deref() {
            Some(data) => RedlineFonts::with_truetype(data)
                .map_err(|e| AppError::Internal(format!("redline font is unusable: {}", e)))?,
            None => RedlineFonts::builtin(),
        };
        Ok::<_, AppError>(redline::render_redline(
            &RedlineInput {
                document_name: &document_name,
                label_a: &result.version_a.label,
                label_b: &result.version_b.label,
                segments: &result.segments,
                summary: &result.summary,
            },
            &fonts,
        ))
    })
    .await
    .map_err(|e| AppError::Internal(format!("redline render task failed: {}", e)))??;

    tracing::info!(user = %auth_user.user_id, %filename, bytes = pdf.len(), "Exported redline");

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        pdf,
    )
        .into_response())
}

/// 권한 확인 후 비교를 실행합니다. 원본(a) 쪽 문서를 함께 돌려줍니다.
async fn run_compare(
    state: &AppState,
    auth_user: &AuthUser,
    query: &CompareQuery,
) -> Result<(CompareResult, Document), AppError> {
    let (Some(a), Some(b)) = (query.a.as_deref(), query.b.as_deref()) else {
        return Err(AppError::BadRequest(
            "both `a` and `b` version ids are required".to_string(),
        ));
    };

    let document_a = owned_version_document(state, auth_user, a, query.sub_a).await?;
    owned_version_document(state, auth_user, b, query.sub_b).await?;

    let result = versioning::compare_versions(
        &state.pool,
        state.diff_limits,
        a,
        b,
        query.sub_a,
        query.sub_b,
    )
    .await?;

    Ok((result, document_a))
}

async fn owned_version_document(
    state: &AppState,
    auth_user: &AuthUser,
    version_id: &str,
    is_sub: bool,
) -> Result<Document, AppError> {
    let document_id = db::version_document_id(&state.pool, version_id, is_sub)
        .await?
        .ok_or(AppError::VersionNotFound)?;
    load_owned_document(state, auth_user, &document_id).await
}

/// ASCII 대체 이름과 RFC 5987 `filename*`을 함께 넣습니다.
fn content_disposition(filename: &str) -> HeaderValue {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .collect();
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        percent_encode(filename)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
