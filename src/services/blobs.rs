//! # 블롭 파일 저장소
//!
//! 버전에 딸린 원본 바이너리(.docx, .pdf 등)를 디스크에 그대로 저장합니다.
//! 내용은 해석하지 않고, 키(UUID)로만 찾습니다.
//!
//! 블롭은 `POST /api/v1/blobs`로 먼저 올린 뒤, 버전 저장 요청에서 키로 참조합니다.

use std::path::PathBuf;

use crate::error::AppError;
use crate::models::BlobRef;
// 동기 std::fs를 쓰면 파일 I/O 중에 런타임 워커가 막힙니다.
use tokio::fs;

/// 바이트를 새 키로 저장하고 참조를 반환합니다.
pub async fn write_blob(blobs_path: &str, bytes: &[u8]) -> Result<BlobRef, AppError> {
    let key = uuid::Uuid::now_v7().to_string();
    let full_path = PathBuf::from(blobs_path).join(&key);

    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&full_path, bytes).await?;

    tracing::debug!(blob_key = %key, size = bytes.len(), "Stored blob");

    Ok(BlobRef {
        key,
        size: bytes.len() as i64,
    })
}

/// 키로 블롭을 읽습니다. 없으면 `Ok(None)`.
pub async fn read_blob(blobs_path: &str, key: &str) -> Result<Option<Vec<u8>>, AppError> {
    let full_path = blob_path(blobs_path, key)?;
    match fs::read(&full_path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 버전 저장 전에 키가 실제로 있는지 확인하고 크기를 포함한 참조를 돌려줍니다.
pub async fn resolve_blob(blobs_path: &str, key: &str) -> Result<BlobRef, AppError> {
    let full_path = blob_path(blobs_path, key)?;
    match fs::metadata(&full_path).await {
        Ok(meta) if meta.is_file() => Ok(BlobRef {
            key: key.to_string(),
            size: meta.len() as i64,
        }),
        Ok(_) => Err(AppError::BadRequest(format!("Unknown blob key: {}", key))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::BadRequest(format!("Unknown blob key: {}", key)))
        }
        Err(e) => Err(e.into()),
    }
}

/// 키는 우리가 발급한 UUID 형식만 받습니다. 경로 탈출(`../`)을 막습니다.
fn blob_path(blobs_path: &str, key: &str) -> Result<PathBuf, AppError> {
    if uuid::Uuid::parse_str(key).is_err() {
        return Err(AppError::BadRequest(format!("Invalid blob key: {}", key)));
    }
    Ok(PathBuf::from(blobs_path).join(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> String {
        std::env::temp_dir()
            .join(format!("redline-blobs-{}", uuid::Uuid::now_v7()))
            .to_string_lossy()
            .into_owned()
    }

    #[tokio::test]
    async fn write_then_read() {
        let root = temp_root();
        let blob = write_blob(&root, b"PK\x03\x04docx").await.unwrap();
        assert_eq!(blob.size, 8);

        let bytes = read_blob(&root, &blob.key).await.unwrap().unwrap();
        assert_eq!(bytes, b"PK\x03\x04docx");

        let resolved = resolve_blob(&root, &blob.key).await.unwrap();
        assert_eq!(resolved, blob);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn unknown_and_malformed_keys() {
        let root = temp_root();
        let missing = uuid::Uuid::now_v7().to_string();

        assert!(read_blob(&root, &missing).await.unwrap().is_none());
        assert!(matches!(
            resolve_blob(&root, &missing).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            read_blob(&root, "../etc/passwd").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
