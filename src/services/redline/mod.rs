//! # 레드라인 PDF 렌더러
//!
//! 두 버전의 diff 세그먼트와 변경 요약을 받아 인쇄용 레드라인 문서를 만듭니다.
//!
//! - `layout`: 페이지 배치 (줄바꿈, 취소선/밑줄, 요약 표, 페이지 나누기)
//! - `pdf`: 배치 결과를 PDF 바이트로 직렬화
//! - `fonts`: 글자 폭과 유니코드 폰트 (기본 한글 CID 폰트 또는 내장 TrueType)
//!
//! 두 단계 모두 순수 함수라서 호출하는 쪽에서 `spawn_blocking`으로 돌립니다.

pub mod fonts;
pub mod layout;
pub mod pdf;

use crate::services::diff::DiffSegment;
use crate::services::summary::ChangeRecord;

use fonts::RedlineFonts;

/// 레드라인 한 부를 그리는 데 필요한 입력
#[derive(Debug, Clone, Copy)]
pub struct RedlineInput<'a> {
    pub document_name: &'a str,
    /// 원본 쪽 버전 라벨 (예: `v2`)
    pub label_a: &'a str,
    /// 수정본 쪽 버전 라벨 (예: `v2.C`)
    pub label_b: &'a str,
    pub segments: &'a [DiffSegment],
    pub summary: &'a [ChangeRecord],
}

/// 레드라인 PDF를 렌더링합니다.
pub fn render_redline(input: &RedlineInput<'_>, fonts: &RedlineFonts<'_>) -> Vec<u8> {
    let pages = layout::layout_redline(input, fonts);
    pdf::write_pdf(&pages, fonts)
}

/// `{documentName}_{labelA}_vs_{labelB}.pdf`
///
/// 파일 시스템과 `Content-Disposition` 헤더에 쓸 수 없는 문자는 `_`로 바꿉니다.
pub fn export_filename(document_name: &str, label_a: &str, label_b: &str) -> String {
    let raw = format!("{}_{}_vs_{}.pdf", document_name.trim(), label_a, label_b);
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
