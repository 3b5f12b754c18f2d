//! Auth backend over HTTP.
//!
//! A 4xx answer is a negative result carrying the backend's `{"error": ...}`
//! message; only transport failures and 5xx answers are upstream errors.

use async_trait::async_trait;
use boutique_core::Username;
use reqwest::{Method, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{
    AuthBackend, AuthOutcome, AuthRejection, BackendClient, LoginSession, Profile, Registration,
    UpstreamError,
};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    expires_at: i64,
    username: String,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    username: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
}

/// `POST /api/login`, `POST /api/register`, `GET /api/profile`.
#[derive(Debug, Clone)]
pub struct HttpAuth {
    client: BackendClient,
}

impl HttpAuth {
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Split a response into success, rejection, or upstream failure.
    async fn classify(
        &self,
        response: Response,
        action: &str,
    ) -> Result<Result<Response, AuthRejection>, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(Ok(response));
        }
        if status.is_server_error() {
            return Err(UpstreamError::Status {
                backend: self.client.name(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .ok()
            .map(|e| e.error)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| rejection_message(action, status));
        Ok(Err(AuthRejection::new(message)))
    }
}

fn rejection_message(action: &str, status: StatusCode) -> String {
    format!("{action} failed (status {})", status.as_u16())
}

#[async_trait]
impl AuthBackend for HttpAuth {
    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &SecretString) -> AuthOutcome<LoginSession> {
        let request = self.client.request(Method::POST, &["login"]).json(&LoginRequest {
            email,
            password: password.expose_secret(),
        });
        let response = self.client.send_raw(request).await?;
        let response = match self.classify(response, "login").await? {
            Ok(response) => response,
            Err(rejection) => return Ok(Err(rejection)),
        };

        let body: LoginResponse = self.client.read_json(response).await?;
        Ok(Ok(LoginSession {
            token: SecretString::from(body.token),
            expires_at: body.expires_at,
            username: Username::from(body.username),
        }))
    }

    #[instrument(skip(self, registration), fields(username = %registration.username))]
    async fn register(&self, registration: &Registration) -> AuthOutcome<()> {
        let request = self
            .client
            .request(Method::POST, &["register"])
            .json(&RegisterRequest {
                email: &registration.email,
                username: &registration.username,
                password: registration.password.expose_secret(),
                first_name: &registration.first_name,
                last_name: &registration.last_name,
            });
        let response = self.client.send_raw(request).await?;
        Ok(self.classify(response, "registration").await?.map(|_| ()))
    }

    #[instrument(skip(self, token))]
    async fn profile(&self, token: &SecretString) -> AuthOutcome<Profile> {
        let request = self
            .client
            .request(Method::GET, &["profile"])
            .bearer_auth(token.expose_secret());
        let response = self.client.send_raw(request).await?;
        let response = match self.classify(response, "profile lookup").await? {
            Ok(response) => response,
            Err(rejection) => return Ok(Err(rejection)),
        };
        Ok(Ok(self.client.read_json(response).await?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_includes_status() {
        assert_eq!(
            rejection_message("login", StatusCode::UNAUTHORIZED),
            "login failed (status 401)"
        );
    }

    #[test]
    fn test_login_wire_shape() {
        let body: LoginResponse = serde_json::from_str(
            r#"{"token":"t0k","expires_at":1735689600,"username":"alice"}"#,
        )
        .unwrap();
        assert_eq!(body.token, "t0k");
        assert_eq!(body.expires_at, 1_735_689_600);
        assert_eq!(body.username, "alice");
    }
}
