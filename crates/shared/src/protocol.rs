use serde::{Deserialize, Serialize};

use crate::domain::{EventId, EventStatus, ReviewId, Role, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
}

impl Event {
    /// Events without a status are shown and filtered as drafts.
    pub fn effective_status(&self) -> EventStatus {
        self.status.unwrap_or_default()
    }

    pub fn effective_price(&self) -> f64 {
        self.price.unwrap_or(0.0)
    }
}

/// Payload of the create form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: String,
    pub location: String,
    pub price: f64,
    #[serde(default)]
    pub status: EventStatus,
}

/// Partial update sent by the edit form; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
}

impl EventUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: EventStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub user_id: UserId,
    pub username: String,
    pub event_id: EventId,
}

/// Body of both the create and the update review calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRatingSummary {
    pub event_id: EventId,
    pub total_reviews: u32,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Claims carried by the bearer token. Only `exp` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_uses_camel_case_and_tolerates_missing_optionals() {
        let event: Event = serde_json::from_str(
            r#"{"id":"evt_1","title":"Tech Conference","date":"2024-12-25","location":"Jakarta"}"#,
        )
        .expect("event");
        assert_eq!(event.id, Some(EventId::from("evt_1")));
        assert_eq!(event.effective_price(), 0.0);
        assert_eq!(event.effective_status(), EventStatus::Draft);
    }

    #[test]
    fn user_reads_phone_number_field() {
        let user: User = serde_json::from_str(
            r#"{"id":"u1","username":"ana","email":"ana@example.com","phoneNumber":"0812","role":"ORGANIZER","balance":12.5}"#,
        )
        .expect("user");
        assert_eq!(user.phone_number, "0812");
        assert_eq!(user.role, Some(Role::Organizer));
    }

    #[test]
    fn partial_update_only_sends_set_fields() {
        let update = EventUpdate {
            price: Some(20.0),
            ..EventUpdate::default()
        };
        assert_eq!(
            serde_json::to_string(&update).expect("serialize"),
            r#"{"price":20.0}"#
        );
        assert!(EventUpdate::default().is_empty());
    }

    #[test]
    fn review_reads_wire_names() {
        let review: Review = serde_json::from_str(
            r#"{"id":"r1","rating":4,"createdAt":"2024-01-01T10:00:00","userId":"u1","username":"ana","eventId":"evt_1"}"#,
        )
        .expect("review");
        assert_eq!(review.rating, 4);
        assert!(review.comment.is_none());
    }
}
