use std::path::PathBuf;

use uuid::Uuid;

use crate::error::AppResult;

/// Source of the guest session identifier that scopes the watchlist
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored identifier, creating and persisting one on first use
    async fn load_or_create(&self) -> AppResult<String>;
}

/// Keeps the session identifier in a single local file. The identifier never
/// expires and is never rotated.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl SessionStore for FileSessionStore {
    async fn load_or_create(&self) -> AppResult<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if !contents.trim().is_empty() => return Ok(contents.trim().to_string()),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let session_id = Uuid::new_v4().to_string();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, &session_id).await?;

        tracing::info!(path = %self.path.display(), "Created guest session");

        Ok(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("novafilm-test-{}", Uuid::new_v4()))
            .join(name)
    }

    #[tokio::test]
    async fn test_creates_once_then_reuses() {
        let path = temp_path("session");
        let store = FileSessionStore::new(&path);

        let first = tokio_test::assert_ok!(store.load_or_create().await);
        let second = tokio_test::assert_ok!(store.load_or_create().await);

        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_reads_existing_identifier() {
        let path = temp_path("session");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "guest-42\n").await.unwrap();

        let store = FileSessionStore::new(&path);
        assert_eq!(store.load_or_create().await.unwrap(), "guest-42");

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_blank_file_gets_new_identifier() {
        let path = temp_path("session");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "   ").await.unwrap();

        let store = FileSessionStore::new(&path);
        let id = store.load_or_create().await.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
