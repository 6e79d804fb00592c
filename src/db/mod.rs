//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `documents`: 문서 행 조회/생성, 버전 포인터 갱신
//! - `versions`: 메인/서브 버전 저장(번호 할당)과 이력 조회
//! - `branches`: 브랜치 태그 기준 조회
//! - `reviews`: 리뷰 요청과 결정

pub mod branches;
pub mod documents;
pub mod reviews;
pub mod versions;

pub use documents::*;
pub use reviews::*;
pub use versions::*;

/// 마이그레이션이 적용된 인메모리 SQLite 풀.
/// 인메모리 DB는 연결마다 따로 생기므로 연결을 하나로 고정합니다.
#[cfg(test)]
pub async fn test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// 여러 연결을 쓰는 파일 기반 테스트 DB. 동시 저장처럼 연결 사이의 잠금이 필요한 테스트용입니다.
/// 드롭할 때 임시 디렉토리를 지웁니다.
#[cfg(test)]
pub struct FileTestDb {
    pub pool: sqlx::SqlitePool,
    dir: std::path::PathBuf,
}

#[cfg(test)]
impl FileTestDb {
    pub async fn open(max_connections: u32) -> Self {
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

        let dir = std::env::temp_dir().join(format!("redline-db-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        let options = SqliteConnectOptions::new()
            .filename(dir.join("redline.db"))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(10));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        Self { pool, dir }
    }
}

#[cfg(test)]
impl Drop for FileTestDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}
