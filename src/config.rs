//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (필수)
//! - `JWT_SECRET`: Bearer 토큰 검증용 비밀키 (필수)
//! - `BLOBS_PATH`: 바이너리 블롭 저장 디렉토리
//! - `HOST`, `PORT`: 서버 바인딩 주소
//! - `MAX_DIFF_CHARS`: 비교 한 번에 허용하는 두 버전 내용의 합계 문자 수
//! - `MAX_DIFF_CELLS`: 비교 한 번에 허용하는 LCS 표 칸 수 (양쪽 토큰 수의 곱)
//! - `REDLINE_FONT_PATH`: 레드라인 PDF에 임베드할 트루타입 폰트 (선택)
//! - `SAVE_RETRY_LIMIT`: 동시 저장 충돌 시 재시도 횟수

use std::env;

/// 애플리케이션 전체 설정을 담는 구조체
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 URL (예: "sqlite:data/redline.db")
    pub database_url: String,
    pub jwt_secret: String,
    pub blobs_path: String,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
    /// 두 버전 내용의 합계 문자 수 상한 (기본값: 200,000자)
    pub max_diff_chars: usize,
    /// diff는 O(n·m) 표를 만들므로 토큰 수의 곱을 따로 제한합니다 (기본값: 16,000,000칸)
    pub max_diff_cells: usize,
    pub redline_font_path: Option<String>,
    pub save_retry_limit: u32,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없어도 동작합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            blobs_path: env::var("BLOBS_PATH").unwrap_or_else(|_| "data/blobs".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3000),
            max_diff_chars: parse_or("MAX_DIFF_CHARS", 200_000),
            max_diff_cells: parse_or("MAX_DIFF_CELLS", 16_000_000),
            redline_font_path: env::var("REDLINE_FONT_PATH")
                .ok()
                .filter(|path| !path.trim().is_empty()),
            save_retry_limit: parse_or("SAVE_RETRY_LIMIT", 5),
        })
    }
}

/// 환경변수를 파싱하고, 없거나 파싱에 실패하면 기본값을 사용합니다.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
