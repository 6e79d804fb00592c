//! # 데이터 모델 모듈
//!
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `document`: 문서(Document)
//! - `version`: 메인 버전 / 서브 버전, 버전 라벨, 서브 버전 문자 시퀀스
//! - `branch`: 브랜치 그래프와 브랜치 요청 본문
//! - `review`: 리뷰 요청과 그 상태 전이
//!
//! `pub use X::*;`로 재공개하여 `crate::models::Document`처럼 짧게 접근합니다.

pub mod branch;
pub mod document;
pub mod review;
pub mod version;

pub use branch::*;
pub use document::*;
pub use review::*;
pub use version::*;
