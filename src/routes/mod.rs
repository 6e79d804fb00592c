//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `documents`: 공유 상태(`AppState`), 문서 목록, 버전 이력, 복원
//! - `versions`: 버전 저장/조회, 블롭 업로드/다운로드
//! - `compare`: 버전 비교와 레드라인 PDF 내보내기
//! - `branches`: 브랜치 생성/병합/그래프
//! - `reviews`: 리뷰 요청과 결정
//! - `health`: 서버 상태 확인

pub mod branches;
pub mod compare;
pub mod documents;
pub mod health;
pub mod reviews;
pub mod versions;

// main.rs에서 `routes::list_documents`처럼 바로 접근할 수 있게 재공개합니다.
pub use branches::*;
pub use compare::*;
pub use documents::*;
pub use health::*;
pub use reviews::*;
pub use versions::*;
