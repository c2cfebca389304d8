//! Auth service calls

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;

use super::error::{SupabaseError, SupabaseResult};
use super::SupabaseClient;

/// Signed-in user as returned by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

/// Tokens plus user for a signed-in session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Result of a sign-up
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Signed in immediately
    Session(AuthSession),
    /// Account created, waiting for email confirmation
    ConfirmationPending(AuthUser),
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Keeps an auth state callback registered; dropping it unregisters
pub struct AuthSubscription {
    handle: JoinHandle<()>,
}

impl AuthSubscription {
    /// Stop delivering auth state changes
    pub fn unsubscribe(self) {
        self.handle.abort();
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl SupabaseClient {
    /// Build the provider authorize URL to send the user to
    ///
    /// The provider redirects back to the configured `redirect_to` with the
    /// session tokens; hand them to [`SupabaseClient::set_session`].
    pub fn sign_in_with_oauth(&self, provider: &str) -> SupabaseResult<String> {
        if provider.is_empty() {
            return Err(SupabaseError::Url("OAuth provider is empty".to_string()));
        }

        let mut url = format!(
            "{}?provider={}",
            self.endpoint("/auth/v1/authorize"),
            urlencoding::encode(provider)
        );
        if let Some(redirect) = &self.config.redirect_to {
            url.push_str("&redirect_to=");
            url.push_str(&urlencoding::encode(redirect));
        }
        Ok(url)
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> SupabaseResult<AuthSession> {
        let builder = self
            .request(Method::POST, "/auth/v1/token?grant_type=password")
            .json(&Credentials { email, password });
        let session: AuthSession = self.send(builder).await?.json().await?;

        tracing::info!(user_id = %session.user.id, "Signed in with password");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> SupabaseResult<SignUpOutcome> {
        let builder = self
            .request(Method::POST, "/auth/v1/signup")
            .json(&Credentials { email, password });
        let body: Value = self.send(builder).await?.json().await?;

        let outcome = parse_sign_up(body)?;
        if let SignUpOutcome::Session(session) = &outcome {
            self.set_session(Some(session.clone()));
        }
        Ok(outcome)
    }

    /// Revoke the current session and clear it locally
    ///
    /// The local session is cleared even when the revoke call fails.
    pub async fn sign_out(&self) -> SupabaseResult<()> {
        let Some(session) = self.get_session() else {
            return Ok(());
        };

        let result = self.send(self.request(Method::POST, "/auth/v1/logout")).await;

        self.set_session(None);
        tracing::info!(user_id = %session.user.id, "Signed out");
        result.map(|_| ())
    }

    /// Current session, if signed in
    pub fn get_session(&self) -> Option<AuthSession> {
        self.session.borrow().clone()
    }

    /// Install a session obtained elsewhere (e.g., an OAuth redirect)
    pub fn set_session(&self, session: Option<AuthSession>) {
        self.session.send_replace(session);
    }

    /// Call `callback` with the current user after every sign-in or sign-out
    pub fn on_auth_state_change<F>(&self, mut callback: F) -> AuthSubscription
    where
        F: FnMut(Option<AuthUser>) + Send + 'static,
    {
        let mut rx = self.session.subscribe();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let user = rx.borrow_and_update().as_ref().map(|s| s.user.clone());
                callback(user);
            }
        });
        AuthSubscription { handle }
    }

    /// Current session, or an error for authenticated-only calls
    pub(crate) fn require_session(&self) -> SupabaseResult<AuthSession> {
        self.get_session().ok_or(SupabaseError::NotAuthenticated)
    }
}

fn parse_sign_up(body: Value) -> SupabaseResult<SignUpOutcome> {
    if body.get("access_token").is_some() {
        Ok(SignUpOutcome::Session(serde_json::from_value(body)?))
    } else if let Some(user) = body.get("user") {
        Ok(SignUpOutcome::ConfirmationPending(serde_json::from_value(user.clone())?))
    } else {
        Ok(SignUpOutcome::ConfirmationPending(serde_json::from_value(body)?))
    }
}
