//! Client library for the EventSphere event-management API.
//!
//! [`ApiClient`] wraps every REST endpoint. [`SessionManager`] owns the login
//! state and hands out the bearer token that authorized calls take as an
//! argument. [`EventListView`] derives the filtered, sorted event list shown
//! to the user.

pub mod auth;
pub mod error;
pub mod events;
pub mod query;
pub mod reviews;
pub mod roles;
pub mod session;
pub mod store;
pub mod transport;
pub mod users;

pub use auth::AuthBackend;
pub use error::{ClientError, Result};
pub use events::{validate_event_draft, validate_event_update, EventDetail};
pub use query::{EventListView, EventQuery, SortDirection, SortField, SortKey, StatusFilter};
pub use reviews::{
    can_user_review, ensure_reviewable, event_has_finished, user_review, validate_review,
    RatingStats,
};
pub use session::{AuthenticatedSession, SessionManager, SessionState};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoredCredential};
pub use transport::{ApiClient, DEFAULT_API_URL};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
