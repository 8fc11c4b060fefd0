use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use shared::protocol::{AuthResponse, LoginRequest, RegisterRequest, User};

use crate::{error::Result, transport::ApiClient};

/// Calls the session lifecycle depends on. [`ApiClient`] is the production
/// implementation; tests substitute canned backends.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse>;
    async fn current_user(&self, token: &str) -> Result<User>;
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        self.send_json(
            Method::POST,
            self.endpoint(&["api", "auth", "login"]),
            None,
            request,
        )
        .await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        self.send_json(
            Method::POST,
            self.endpoint(&["api", "auth", "register"]),
            None,
            request,
        )
        .await
    }

    async fn current_user(&self, token: &str) -> Result<User> {
        self.get_json(self.endpoint(&["api", "users", "me"]), Some(token))
            .await
    }
}

#[async_trait]
impl<T: AuthBackend + ?Sized> AuthBackend for Arc<T> {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        (**self).login(request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        (**self).register(request).await
    }

    async fn current_user(&self, token: &str) -> Result<User> {
        (**self).current_user(token).await
    }
}
