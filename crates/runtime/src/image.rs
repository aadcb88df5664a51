use anyhow::Result;
use sqlx::types::Uuid;

use storyloom_clients::{ImageUpload, R2Client};

/// Object storage for generated story images.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores PNG bytes under `key` and returns a publicly reachable URL.
    async fn put_png(&self, key: &str, data: Vec<u8>) -> Result<String>;
}

/// `{principal}/{session}/{image}.png`
pub fn story_image_key(principal_id: Uuid, session_id: &str) -> String {
    format!("{}/{}/{}.png", principal_id, session_id, Uuid::new_v4())
}

#[async_trait::async_trait]
impl ImageStore for R2Client {
    async fn put_png(&self, key: &str, data: Vec<u8>) -> Result<String> {
        self.upload(ImageUpload::png(key, data)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_scoped_to_principal_and_session() {
        let principal = Uuid::new_v4();
        let key = story_image_key(principal, "abcDEF123_-xyz00");
        let segments: Vec<_> = key.split('/').collect();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], principal.to_string());
        assert_eq!(segments[1], "abcDEF123_-xyz00");
        assert!(segments[2].ends_with(".png"));
        assert_ne!(key, story_image_key(principal, "abcDEF123_-xyz00"));
    }
}
