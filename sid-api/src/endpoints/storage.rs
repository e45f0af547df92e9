//! Object storage endpoints (`/storage/v1`).

use reqwest::Method;
use serde_json::json;
use tracing::debug;

use sid_core::constants;
use sid_core::error::SidResult;

use crate::client::ApiClient;

/// Recover the object path from a public URL of `bucket`.
///
/// Form submissions store public URLs; deleting the object needs the
/// bucket-relative path. Returns `None` for URLs from anywhere else.
pub fn object_path_from_public_url(url: &str, bucket: &str) -> Option<String> {
    let marker = format!("{}/object/public/{bucket}/", constants::STORAGE_PREFIX);
    let (_, rest) = url.split_once(&marker)?;
    let path = rest.split(&['?', '#'][..]).next().unwrap_or(rest);
    Some(path.to_string()).filter(|p| !p.is_empty())
}

impl ApiClient {
    /// Upload bytes to `bucket/path`, replacing any existing object.
    /// Returns the bucket-relative path.
    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> SidResult<String> {
        let url = self.storage_url(&format!("object/{bucket}/{path}"));
        self.send_bytes(
            Method::POST,
            &url,
            &[("Content-Type", mime), ("x-upsert", "true")],
            bytes,
        )
        .await?;
        debug!("uploaded {bucket}/{path}");
        Ok(path.to_string())
    }

    /// Public URL for an object in a public bucket.
    pub fn object_public_url(&self, bucket: &str, path: &str) -> String {
        self.storage_url(&format!("object/public/{bucket}/{}", path.trim_start_matches('/')))
    }

    /// Delete objects by bucket-relative path.
    pub async fn remove_objects(&self, bucket: &str, paths: &[String]) -> SidResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.storage_url(&format!("object/{bucket}"));
        let body = json!({ "prefixes": paths });
        self.request_with_retry(Method::DELETE, &url, self.default_timeout(), &[], Some(&body))
            .await?;
        debug!("removed {} objects from {bucket}", paths.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sid_core::config::AppConfig;

    #[test]
    fn test_public_url_roundtrip() {
        let mut config = AppConfig::default();
        config.backend.url = "https://abcd.supabase.co".into();
        config.backend.anon_key = "anon".into();
        let client = ApiClient::new(&config).unwrap();

        let url = client.object_public_url("uploads", "form/abc/foto.jpg");
        assert_eq!(
            url,
            "https://abcd.supabase.co/storage/v1/object/public/uploads/form/abc/foto.jpg"
        );
        assert_eq!(
            object_path_from_public_url(&url, "uploads").as_deref(),
            Some("form/abc/foto.jpg")
        );
    }

    #[test]
    fn test_foreign_urls_ignored() {
        assert!(object_path_from_public_url("https://example.com/foto.jpg", "uploads").is_none());
        assert!(object_path_from_public_url(
            "https://x.supabase.co/storage/v1/object/public/other/a.jpg",
            "uploads"
        )
        .is_none());
        assert_eq!(
            object_path_from_public_url(
                "https://x.supabase.co/storage/v1/object/public/uploads/a.jpg?t=1",
                "uploads"
            )
            .as_deref(),
            Some("a.jpg")
        );
    }
}
