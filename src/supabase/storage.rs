//! Image bucket access

use reqwest::Method;
use serde::Deserialize;

use super::error::SupabaseResult;
use super::SupabaseClient;

const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Object created by an upload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedObject {
    /// Bucket-qualified object key (e.g., "fruit-images/2024/05/a.jpg")
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
}

/// Percent-encode each path segment, keeping the separators
fn encode_object_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl SupabaseClient {
    /// Public URL of an object in the image bucket
    pub fn get_public_url(&self, path: &str) -> String {
        self.endpoint(&format!(
            "/storage/v1/object/public/{}/{}",
            self.config.bucket,
            encode_object_path(path)
        ))
    }

    /// Upload a JPEG into the image bucket; requires a signed-in session
    pub async fn upload_image(&self, bytes: Vec<u8>, path: &str) -> SupabaseResult<UploadedObject> {
        self.require_session()?;
        let object_path = format!(
            "/storage/v1/object/{}/{}",
            self.config.bucket,
            encode_object_path(path)
        );

        let builder = self
            .request(Method::POST, &object_path)
            .header("Content-Type", IMAGE_CONTENT_TYPE)
            .body(bytes);
        let object: UploadedObject = self.send(builder).await?.json().await?;

        tracing::info!(key = %object.key, "Uploaded image");
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{client_for, spawn_project};
    use super::super::{AuthSession, SupabaseError};
    use super::*;
    use axum::{body::Bytes, extract::Path, http::HeaderMap, routing::post, Json, Router};
    use serde_json::json;

    #[test]
    fn test_public_url() {
        let client = client_for("https://demo.supabase.co".to_string());
        assert_eq!(
            client.get_public_url("2024/05/apple 1.jpg"),
            "https://demo.supabase.co/storage/v1/object/public/fruit-images/2024/05/apple%201.jpg"
        );
        assert_eq!(
            client.get_public_url("/a.jpg"),
            "https://demo.supabase.co/storage/v1/object/public/fruit-images/a.jpg"
        );
    }

    #[tokio::test]
    async fn test_upload_requires_session() {
        let client = client_for("https://demo.supabase.co".to_string());
        assert!(matches!(
            client.upload_image(vec![0xFF, 0xD8], "a.jpg").await,
            Err(SupabaseError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_upload_sends_jpeg() {
        let router = Router::new().route(
            "/storage/v1/object/fruit-images/*path",
            post(|Path(path): Path<String>, headers: HeaderMap, body: Bytes| async move {
                assert_eq!(headers.get("content-type").unwrap(), "image/jpeg");
                assert_eq!(headers.get("authorization").unwrap(), "Bearer token-123");
                assert_eq!(&body[..], &[0xFFu8, 0xD8, 0xFF][..]);
                Json(json!({"Key": format!("fruit-images/{}", path), "Id": "obj-1"}))
            }),
        );
        let client = client_for(spawn_project(router).await);
        let session: AuthSession = serde_json::from_value(json!({
            "access_token": "token-123",
            "user": {"id": "user-1"}
        }))
        .unwrap();
        client.set_session(Some(session));

        let object = client.upload_image(vec![0xFF, 0xD8, 0xFF], "2024/a.jpg").await.unwrap();
        assert_eq!(object.key, "fruit-images/2024/a.jpg");
        assert_eq!(object.id.as_deref(), Some("obj-1"));
    }
}
