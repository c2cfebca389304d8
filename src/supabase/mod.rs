//! Hosted Data Service Adapter
//!
//! Thin client for the Supabase project backing the dashboard. Each call
//! maps to one REST or realtime request; nothing is retried or cached.
//!
//! ## Services
//!
//! - **Auth** (`/auth/v1`): OAuth and password sign-in, sign-up, sign-out, session changes
//! - **Table** (`/rest/v1`): recent classifications, user roles, aggregate statistics
//! - **Realtime** (`/realtime/v1/websocket`): change feed for the classifications table
//! - **Storage** (`/storage/v1`): public URLs and uploads in the image bucket

mod auth;
mod error;
mod realtime;
mod storage;
mod table;

pub use auth::{AuthSession, AuthSubscription, AuthUser, SignUpOutcome};
pub use error::{SupabaseError, SupabaseResult};
pub use realtime::{RealtimeSubscription, CHANNEL_NAME, HEARTBEAT_INTERVAL};
pub use storage::UploadedObject;
pub use table::{aggregate_rows, ClassificationRow, TableStatistics, DEFAULT_ROLE};

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Configuration for the hosted data service
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL (e.g., "https://your-project.supabase.co")
    pub url: String,
    /// Public anon key sent as `apikey` on every request
    pub anon_key: String,
    /// Storage bucket holding classified images
    pub bucket: String,
    /// Table of classification rows
    pub table: String,
    /// Table mapping user ids to roles
    pub users_table: String,
    /// Where the OAuth provider sends the browser back to
    pub redirect_to: Option<String>,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            bucket: "fruit-images".to_string(),
            table: "classifications".to_string(),
            users_table: "users".to_string(),
            redirect_to: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Client for auth, table, realtime and storage calls
///
/// Cheap to clone; clones share the signed-in session.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: Arc<SupabaseConfig>,
    session: Arc<watch::Sender<Option<AuthSession>>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

impl SupabaseClient {
    /// Create a client for the configured project
    pub fn new(config: SupabaseConfig) -> SupabaseResult<Self> {
        if !(config.url.starts_with("http://") || config.url.starts_with("https://")) {
            return Err(SupabaseError::Url(format!(
                "project URL must be http(s), got '{}'",
                config.url
            )));
        }

        let http = Client::builder().timeout(config.request_timeout).build()?;
        let (session, _) = watch::channel(None);

        Ok(Self {
            http,
            config: Arc::new(config),
            session: Arc::new(session),
        })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    /// Signed-in access token, falling back to the anon key
    fn bearer(&self) -> String {
        self.session
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
    }

    /// Send a request and turn non-success statuses into [`SupabaseError::Api`]
    async fn send(&self, builder: RequestBuilder) -> SupabaseResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or(text);

        Err(SupabaseError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
