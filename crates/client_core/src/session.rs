//! Session lifecycle: who is logged in, rebuilt from the stored credential.
//!
//! ```text
//! Unauthenticated --(stored token valid, profile fetch ok)--> Authenticated
//! Unauthenticated --(login / register ok)------------------> Authenticated
//! Authenticated   --(logout / 401 from the api)------------> Unauthenticated
//! ```
//!
//! Every failure on the way to `Authenticated` clears the stored credential.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use shared::{
    domain::Role,
    protocol::{AuthResponse, LoginRequest, RegisterRequest, TokenClaims, User},
};
use tracing::{error, info, warn};

use crate::{
    auth::AuthBackend,
    error::{ClientError, Result},
    store::{CredentialStore, StoredCredential},
};

#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedSession {
    pub token: String,
    pub claims: TokenClaims,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(AuthenticatedSession),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(session) => Some(&session.user),
            SessionState::Unauthenticated => None,
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated(session) => Some(session.token.as_str()),
            SessionState::Unauthenticated => None,
        }
    }
}

/// Reads the claims of a bearer token without checking its signature. The
/// API verifies tokens; the client only needs the expiry.
pub fn decode_credential(token: &str) -> Result<TokenClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|err| ClientError::InvalidCredential(err.to_string()))
}

/// `exp` is in seconds; the comparison runs in milliseconds.
pub fn is_expired(claims: &TokenClaims, now: DateTime<Utc>) -> bool {
    claims.exp.saturating_mul(1000) < now.timestamp_millis()
}

pub struct SessionManager<B, S> {
    backend: B,
    store: S,
    state: SessionState,
}

impl<B: AuthBackend, S: CredentialStore> SessionManager<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            store,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user()
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.state.bearer_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        self.user()
            .and_then(|user| user.role)
            .is_some_and(|role| roles.contains(&role))
    }

    pub async fn initialize(&mut self) -> &SessionState {
        self.initialize_at(Utc::now()).await
    }

    /// Rebuilds the session from storage as of `now`.
    pub async fn initialize_at(&mut self, now: DateTime<Utc>) -> &SessionState {
        self.state = SessionState::Unauthenticated;

        let stored = match self.store.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                self.clear_storage();
                return &self.state;
            }
            Err(err) => {
                error!(error = %format!("{err:#}"), "failed to load stored credential");
                self.clear_storage();
                return &self.state;
            }
        };

        let claims = match decode_credential(&stored.token) {
            Ok(claims) => claims,
            Err(err) => {
                error!(error = %err, "stored credential is not a valid token");
                self.clear_storage();
                return &self.state;
            }
        };

        if is_expired(&claims, now) {
            info!("stored credential expired");
            self.clear_storage();
            return &self.state;
        }

        match self.backend.current_user(&stored.token).await {
            Ok(user) => {
                let refreshed = StoredCredential {
                    token: stored.token.clone(),
                    user: Some(user.clone()),
                };
                if let Err(err) = self.store.save(&refreshed) {
                    warn!(error = %format!("{err:#}"), "failed to cache refreshed user");
                }
                self.state = SessionState::Authenticated(AuthenticatedSession {
                    token: stored.token,
                    claims,
                    user,
                });
            }
            Err(err) => {
                error!(error = %err, "failed to fetch current user during session initialization");
                self.clear_storage();
            }
        }

        &self.state
    }

    pub async fn login(&mut self, request: &LoginRequest) -> Result<&User> {
        let response = self.backend.login(request).await.inspect_err(|err| {
            error!(error = %err, "login failed");
        })?;
        self.establish(response)
    }

    pub async fn register(&mut self, request: &RegisterRequest) -> Result<&User> {
        let response = self.backend.register(request).await.inspect_err(|err| {
            error!(error = %err, "registration failed");
        })?;
        self.establish(response)
    }

    /// Fetches the profile again, e.g. after the user edited it.
    pub async fn refresh_user(&mut self) -> Result<&User> {
        let token = self
            .bearer_token()
            .ok_or(ClientError::NotAuthenticated)?
            .to_string();
        let user = match self.backend.current_user(&token).await {
            Ok(user) => user,
            Err(err) => return Err(self.observe_error(err)),
        };
        self.store
            .save(&StoredCredential {
                token,
                user: Some(user.clone()),
            })
            .map_err(ClientError::Storage)?;
        match &mut self.state {
            SessionState::Authenticated(session) => {
                session.user = user;
                Ok(&session.user)
            }
            SessionState::Unauthenticated => Err(ClientError::NotAuthenticated),
        }
    }

    pub fn logout(&mut self) {
        info!("logging out");
        self.clear_storage();
        self.state = SessionState::Unauthenticated;
    }

    /// Drops the session after the API rejected its credential.
    pub fn handle_unauthorized(&mut self) {
        if self.state.is_authenticated() {
            warn!("credential rejected by api; clearing session");
        }
        self.clear_storage();
        self.state = SessionState::Unauthenticated;
    }

    /// Passes `result` through, ending the session first if it is a 401.
    pub fn observe<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|err| self.observe_error(err))
    }

    fn observe_error(&mut self, err: ClientError) -> ClientError {
        if err.is_unauthorized() {
            self.handle_unauthorized();
        }
        err
    }

    fn establish(&mut self, response: AuthResponse) -> Result<&User> {
        let claims = decode_credential(&response.token)?;
        self.store
            .save(&StoredCredential {
                token: response.token.clone(),
                user: Some(response.user.clone()),
            })
            .map_err(ClientError::Storage)?;
        info!(username = %response.user.username, "session established");
        self.state = SessionState::Authenticated(AuthenticatedSession {
            token: response.token,
            claims,
            user: response.user,
        });
        match &self.state {
            SessionState::Authenticated(session) => Ok(&session.user),
            SessionState::Unauthenticated => Err(ClientError::NotAuthenticated),
        }
    }

    fn clear_storage(&self) {
        if let Err(err) = self.store.clear() {
            warn!(error = %format!("{err:#}"), "failed to clear stored credential");
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
