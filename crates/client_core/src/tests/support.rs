//! In-process stand-in for the EventSphere API, plus fixtures.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use shared::{
    domain::{EventId, EventStatus, ReviewId, Role, UserId},
    protocol::{
        AuthResponse, Event, EventDraft, EventRatingSummary, EventUpdate, LoginRequest,
        RegisterRequest, Review, ReviewRequest, StatusUpdateRequest, TokenClaims, User,
        UserUpdateRequest,
    },
};
use tokio::{net::TcpListener, sync::Mutex};

pub(crate) const TEST_PASSWORD: &str = "secret";
const TEST_SECRET: &[u8] = b"test-signing-secret";

pub(crate) fn mint_token(sub: &str, exp: i64) -> String {
    let claims = TokenClaims {
        sub: sub.to_string(),
        exp,
        role: None,
        iat: Some(Utc::now().timestamp()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET),
    )
    .expect("mint token")
}

pub(crate) fn valid_token(sub: &str) -> String {
    mint_token(sub, (Utc::now() + Duration::hours(1)).timestamp())
}

pub(crate) fn expired_token(sub: &str) -> String {
    mint_token(sub, (Utc::now() - Duration::hours(1)).timestamp())
}

pub(crate) fn sample_user(id: &str, username: &str, role: Role) -> User {
    User {
        id: UserId::from(id),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        phone_number: "081234567890".to_string(),
        role: Some(role),
        balance: 100.0,
    }
}

pub(crate) fn sample_event(
    id: &str,
    title: &str,
    date: &str,
    price: Option<f64>,
    status: Option<EventStatus>,
) -> Event {
    Event {
        id: Some(EventId::from(id)),
        title: title.to_string(),
        description: None,
        date: date.to_string(),
        location: "Jakarta Convention Center".to_string(),
        price,
        status,
        organizer: Some("ana".to_string()),
    }
}

pub(crate) fn sample_review(id: &str, event_id: &str, user_id: &str, rating: u8) -> Review {
    Review {
        id: ReviewId::from(id),
        rating,
        comment: Some("Great event".to_string()),
        created_at: "2024-10-21T09:00:00".to_string(),
        updated_at: None,
        user_id: UserId::from(user_id),
        username: format!("user-{user_id}"),
        event_id: EventId::from(event_id),
    }
}

#[derive(Default)]
pub(crate) struct FakeApiState {
    pub events: Vec<Event>,
    pub reviews: Vec<Review>,
    pub users: Vec<User>,
    pub current_user: Option<User>,
    /// When set, every non-auth route demands exactly this bearer token.
    pub accepted_token: Option<String>,
    /// Authorization header of each request, in arrival order.
    pub authorizations: Vec<Option<String>>,
    pub requests: Vec<String>,
    /// Answer event updates with an empty body.
    pub empty_update_response: bool,
    pub next_id: u32,
}

#[derive(Clone)]
pub(crate) struct FakeApi {
    pub state: Arc<Mutex<FakeApiState>>,
}

type ApiFailure = (StatusCode, Json<Value>);

fn failure(status: StatusCode, message: &str) -> ApiFailure {
    (status, Json(json!({ "message": message, "status": status.as_u16() })))
}

impl FakeApi {
    async fn record(&self, headers: &HeaderMap, request: String) -> Result<(), ApiFailure> {
        let mut state = self.state.lock().await;
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        state.authorizations.push(authorization.clone());
        state.requests.push(request);
        if let Some(expected) = &state.accepted_token {
            if authorization.as_deref() != Some(format!("Bearer {expected}").as_str()) {
                return Err(failure(StatusCode::UNAUTHORIZED, "Unauthorized"));
            }
        }
        Ok(())
    }
}

pub(crate) async fn spawn_fake_api(state: FakeApiState) -> (String, FakeApi) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let api = FakeApi {
        state: Arc::new(Mutex::new(state)),
    };
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/users/me", get(me))
        .route("/api/users", get(list_users))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/admin/create-account", post(create_account))
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/organizer/:organizer", get(events_by_organizer))
        .route(
            "/api/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/api/events/:id/status", patch(update_status))
        .route(
            "/api/events/:id/reviews",
            get(list_reviews).post(create_review),
        )
        .route(
            "/api/events/:id/reviews/:review_id",
            put(update_review).delete(delete_review),
        )
        .route("/api/events/:id/rating-summary", get(rating_summary))
        .with_state(api.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), api)
}

async fn login(
    State(api): State<FakeApi>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiFailure> {
    let mut state = api.state.lock().await;
    state.requests.push("POST /api/auth/login".to_string());
    let user = state
        .users
        .iter()
        .find(|u| u.email == request.email)
        .cloned()
        .filter(|_| request.password == TEST_PASSWORD)
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;
    let token = valid_token(&user.email);
    state.accepted_token = Some(token.clone());
    state.current_user = Some(user.clone());
    Ok(Json(AuthResponse { token, user }))
}

async fn register(
    State(api): State<FakeApi>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiFailure> {
    let mut state = api.state.lock().await;
    state.requests.push("POST /api/auth/register".to_string());
    if state.users.iter().any(|u| u.email == request.email) {
        return Err(failure(StatusCode::BAD_REQUEST, "Email is already registered"));
    }
    state.next_id += 1;
    let user = User {
        id: UserId(format!("u{}", state.next_id)),
        username: request.username,
        email: request.email,
        phone_number: request.phone_number,
        role: Some(request.role.unwrap_or(Role::User)),
        balance: 0.0,
    };
    state.users.push(user.clone());
    let token = valid_token(&user.email);
    state.accepted_token = Some(token.clone());
    state.current_user = Some(user.clone());
    Ok(Json(AuthResponse { token, user }))
}

async fn me(State(api): State<FakeApi>, headers: HeaderMap) -> Result<Json<User>, ApiFailure> {
    api.record(&headers, "GET /api/users/me".to_string()).await?;
    let state = api.state.lock().await;
    state
        .current_user
        .clone()
        .map(Json)
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Unauthorized"))
}

async fn list_users(
    State(api): State<FakeApi>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, ApiFailure> {
    api.record(&headers, "GET /api/users".to_string()).await?;
    Ok(Json(api.state.lock().await.users.clone()))
}

async fn get_user(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiFailure> {
    api.record(&headers, format!("GET /api/users/{id}")).await?;
    let state = api.state.lock().await;
    state
        .users
        .iter()
        .find(|u| u.id.as_str() == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "User not found"))
}

async fn update_user(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<UserUpdateRequest>,
) -> Result<Json<User>, ApiFailure> {
    api.record(&headers, format!("PUT /api/users/{id}")).await?;
    let mut state = api.state.lock().await;
    let user = state
        .users
        .iter_mut()
        .find(|u| u.id.as_str() == id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "User not found"))?;
    if let Some(username) = update.username {
        user.username = username;
    }
    if let Some(email) = update.email {
        user.email = email;
    }
    if let Some(phone_number) = update.phone_number {
        user.phone_number = phone_number;
    }
    let updated = user.clone();
    if state.current_user.as_ref().is_some_and(|u| u.id == updated.id) {
        state.current_user = Some(updated.clone());
    }
    Ok(Json(updated))
}

async fn delete_user(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    api.record(&headers, format!("DELETE /api/users/{id}")).await?;
    let mut state = api.state.lock().await;
    let before = state.users.len();
    state.users.retain(|u| u.id.as_str() != id);
    if state.users.len() == before {
        return Err(failure(StatusCode::NOT_FOUND, "User not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn create_account(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<User>, ApiFailure> {
    api.record(&headers, "POST /api/admin/create-account".to_string())
        .await?;
    let mut state = api.state.lock().await;
    let is_admin = state
        .current_user
        .as_ref()
        .is_some_and(|u| u.role == Some(Role::Admin));
    if !is_admin {
        return Err(failure(StatusCode::FORBIDDEN, "Admin access required"));
    }
    state.next_id += 1;
    let user = User {
        id: UserId(format!("u{}", state.next_id)),
        username: request.username,
        email: request.email,
        phone_number: request.phone_number,
        role: request.role,
        balance: 0.0,
    };
    state.users.push(user.clone());
    Ok(Json(user))
}

async fn list_events(
    State(api): State<FakeApi>,
    headers: HeaderMap,
) -> Result<Json<Vec<Event>>, ApiFailure> {
    api.record(&headers, "GET /api/events".to_string()).await?;
    Ok(Json(api.state.lock().await.events.clone()))
}

async fn events_by_organizer(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(organizer): Path<String>,
) -> Result<Json<Vec<Event>>, ApiFailure> {
    api.record(&headers, format!("GET /api/events/organizer/{organizer}"))
        .await?;
    let state = api.state.lock().await;
    Ok(Json(
        state
            .events
            .iter()
            .filter(|e| e.organizer.as_deref() == Some(organizer.as_str()))
            .cloned()
            .collect(),
    ))
}

async fn create_event(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(draft): Json<EventDraft>,
) -> Result<Json<Event>, ApiFailure> {
    api.record(&headers, "POST /api/events".to_string()).await?;
    let mut state = api.state.lock().await;
    state.next_id += 1;
    let organizer = state.current_user.as_ref().map(|u| u.username.clone());
    let event = Event {
        id: Some(EventId(format!("evt_{}", state.next_id))),
        title: draft.title,
        description: draft.description,
        date: draft.date,
        location: draft.location,
        price: Some(draft.price),
        status: Some(draft.status),
        organizer,
    };
    state.events.push(event.clone());
    Ok(Json(event))
}

async fn get_event(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiFailure> {
    api.record(&headers, format!("GET /api/events/{id}")).await?;
    find_event(&api, &id).await.map(Json)
}

async fn find_event(api: &FakeApi, id: &str) -> Result<Event, ApiFailure> {
    api.state
        .lock()
        .await
        .events
        .iter()
        .find(|e| e.id.as_ref().is_some_and(|eid| eid.as_str() == id))
        .cloned()
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Event not found"))
}

async fn update_event(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<EventUpdate>,
) -> Result<Response, ApiFailure> {
    api.record(&headers, format!("PUT /api/events/{id}")).await?;
    let mut state = api.state.lock().await;
    let event = state
        .events
        .iter_mut()
        .find(|e| e.id.as_ref().is_some_and(|eid| eid.as_str() == id))
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Event not found"))?;
    if let Some(title) = update.title {
        event.title = title;
    }
    if let Some(description) = update.description {
        event.description = Some(description);
    }
    if let Some(date) = update.date {
        event.date = date;
    }
    if let Some(location) = update.location {
        event.location = location;
    }
    if let Some(price) = update.price {
        event.price = Some(price);
    }
    if let Some(status) = update.status {
        event.status = Some(status);
    }
    let updated = event.clone();
    if state.empty_update_response {
        return Ok(StatusCode::OK.into_response());
    }
    Ok(Json(updated).into_response())
}

async fn update_status(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Event>, ApiFailure> {
    api.record(&headers, format!("PATCH /api/events/{id}/status"))
        .await?;
    let mut state = api.state.lock().await;
    let event = state
        .events
        .iter_mut()
        .find(|e| e.id.as_ref().is_some_and(|eid| eid.as_str() == id))
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Event not found"))?;
    event.status = Some(request.status);
    Ok(Json(event.clone()))
}

async fn delete_event(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    api.record(&headers, format!("DELETE /api/events/{id}")).await?;
    let mut state = api.state.lock().await;
    let before = state.events.len();
    state
        .events
        .retain(|e| e.id.as_ref().map_or(true, |eid| eid.as_str() != id));
    if state.events.len() == before {
        return Err(failure(StatusCode::NOT_FOUND, "Event not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_reviews(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>, ApiFailure> {
    api.record(&headers, format!("GET /api/events/{id}/reviews"))
        .await?;
    let state = api.state.lock().await;
    Ok(Json(
        state
            .reviews
            .iter()
            .filter(|r| r.event_id.as_str() == id)
            .cloned()
            .collect(),
    ))
}

async fn create_review(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<Review>, ApiFailure> {
    api.record(&headers, format!("POST /api/events/{id}/reviews"))
        .await?;
    let mut state = api.state.lock().await;
    let author = state
        .current_user
        .clone()
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Unauthorized"))?;
    if state
        .reviews
        .iter()
        .any(|r| r.event_id.as_str() == id && r.user_id == author.id)
    {
        return Err(failure(
            StatusCode::CONFLICT,
            "You have already reviewed this event",
        ));
    }
    state.next_id += 1;
    let review = Review {
        id: ReviewId(format!("rev_{}", state.next_id)),
        rating: request.rating,
        comment: request.comment,
        created_at: "2024-10-22T10:00:00".to_string(),
        updated_at: None,
        user_id: author.id,
        username: author.username,
        event_id: EventId(id),
    };
    state.reviews.push(review.clone());
    Ok(Json(review))
}

async fn update_review(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path((id, review_id)): Path<(String, String)>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<Review>, ApiFailure> {
    api.record(&headers, format!("PUT /api/events/{id}/reviews/{review_id}"))
        .await?;
    let mut state = api.state.lock().await;
    let review = state
        .reviews
        .iter_mut()
        .find(|r| r.event_id.as_str() == id && r.id.as_str() == review_id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Review not found"))?;
    review.rating = request.rating;
    review.comment = request.comment;
    review.updated_at = Some("2024-10-23T10:00:00".to_string());
    Ok(Json(review.clone()))
}

async fn delete_review(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path((id, review_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiFailure> {
    api.record(
        &headers,
        format!("DELETE /api/events/{id}/reviews/{review_id}"),
    )
    .await?;
    let mut state = api.state.lock().await;
    let before = state.reviews.len();
    state
        .reviews
        .retain(|r| !(r.event_id.as_str() == id && r.id.as_str() == review_id));
    if state.reviews.len() == before {
        return Err(failure(StatusCode::NOT_FOUND, "Review not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn rating_summary(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<EventRatingSummary>, ApiFailure> {
    api.record(&headers, format!("GET /api/events/{id}/rating-summary"))
        .await?;
    let state = api.state.lock().await;
    let ratings: Vec<u8> = state
        .reviews
        .iter()
        .filter(|r| r.event_id.as_str() == id)
        .map(|r| r.rating)
        .collect();
    let average_rating = if ratings.is_empty() {
        0.0
    } else {
        ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64
    };
    Ok(Json(EventRatingSummary {
        event_id: EventId(id),
        total_reviews: ratings.len() as u32,
        average_rating,
    }))
}
