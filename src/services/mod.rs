//! # 서비스 계층
//!
//! 라우트 핸들러와 DB 쿼리 사이의 도메인 로직입니다.
//!
//! - `diff`: 단어 단위 LCS diff
//! - `summary`: 문단 단위 변경 요약
//! - `redline`: 레드라인 PDF 렌더링
//! - `versioning`: 버전 복원과 비교
//! - `branches`: 브랜치 생성/병합/그래프
//! - `blobs`: 바이너리 블롭 파일 저장소

pub mod blobs;
pub mod branches;
pub mod diff;
pub mod redline;
pub mod summary;
pub mod versioning;
