use chrono::{Local, NaiveDate};
use futures::future::try_join3;
use reqwest::Method;
use shared::{
    domain::{EventId, EventStatus},
    protocol::{Event, EventDraft, EventRatingSummary, EventUpdate, Review, StatusUpdateRequest},
};
use tracing::debug;

use crate::{
    error::{ClientError, Result},
    query::parse_event_date,
    transport::ApiClient,
};

pub const PAST_DATE_MESSAGE: &str = "Event date must be today or in the future";

/// Everything the event detail page shows, fetched side by side.
#[derive(Debug, Clone)]
pub struct EventDetail {
    pub event: Event,
    pub reviews: Vec<Review>,
    pub rating_summary: EventRatingSummary,
}

impl ApiClient {
    pub async fn create_event(&self, bearer: Option<&str>, draft: &EventDraft) -> Result<Event> {
        self.send_json(
            Method::POST,
            self.endpoint(&["api", "events"]),
            bearer,
            draft,
        )
        .await
    }

    pub async fn list_events(&self, bearer: Option<&str>) -> Result<Vec<Event>> {
        self.get_json(self.endpoint(&["api", "events"]), bearer)
            .await
    }

    pub async fn get_event(&self, bearer: Option<&str>, event_id: &EventId) -> Result<Event> {
        self.get_json(self.endpoint(&["api", "events", event_id.as_str()]), bearer)
            .await
    }

    pub async fn list_events_by_organizer(
        &self,
        bearer: Option<&str>,
        organizer: &str,
    ) -> Result<Vec<Event>> {
        self.get_json(
            self.endpoint(&["api", "events", "organizer", organizer]),
            bearer,
        )
        .await
    }

    pub async fn update_event_status(
        &self,
        bearer: Option<&str>,
        event_id: &EventId,
        status: EventStatus,
    ) -> Result<Event> {
        self.send_json(
            Method::PATCH,
            self.endpoint(&["api", "events", event_id.as_str(), "status"]),
            bearer,
            &StatusUpdateRequest { status },
        )
        .await
    }

    pub async fn publish_event(&self, bearer: Option<&str>, event_id: &EventId) -> Result<Event> {
        self.update_event_status(bearer, event_id, EventStatus::Published)
            .await
    }

    pub async fn cancel_event(&self, bearer: Option<&str>, event_id: &EventId) -> Result<Event> {
        self.update_event_status(bearer, event_id, EventStatus::Cancelled)
            .await
    }

    /// Sends a partial update. When the server answers without the updated
    /// event (empty body or no `id`), the event is fetched again.
    pub async fn update_event(
        &self,
        bearer: Option<&str>,
        event_id: &EventId,
        update: &EventUpdate,
    ) -> Result<Event> {
        let body = self
            .send_json_optional(
                Method::PUT,
                self.endpoint(&["api", "events", event_id.as_str()]),
                bearer,
                update,
            )
            .await?;

        match body {
            Some(value) if value.get("id").is_some_and(|id| !id.is_null()) => {
                serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
            }
            _ => {
                debug!(event_id = %event_id, "update response carried no event; refetching");
                self.get_event(bearer, event_id).await
            }
        }
    }

    pub async fn delete_event(&self, bearer: Option<&str>, event_id: &EventId) -> Result<()> {
        self.delete(self.endpoint(&["api", "events", event_id.as_str()]), bearer)
            .await
    }

    pub async fn event_detail(
        &self,
        bearer: Option<&str>,
        event_id: &EventId,
    ) -> Result<EventDetail> {
        let (event, reviews, rating_summary) = try_join3(
            self.get_event(bearer, event_id),
            self.list_reviews(bearer, event_id),
            self.rating_summary(bearer, event_id),
        )
        .await?;
        Ok(EventDetail {
            event,
            reviews,
            rating_summary,
        })
    }
}

/// Checks the create form before it is submitted.
pub fn validate_event_draft(draft: &EventDraft, today: NaiveDate) -> Result<()> {
    require_text("Title", &draft.title)?;
    require_text("Date", &draft.date)?;
    require_text("Location", &draft.location)?;
    validate_price(draft.price)?;
    validate_event_date(&draft.date, today)
}

/// Checks the edit form. Only fields being changed are checked.
pub fn validate_event_update(update: &EventUpdate, today: NaiveDate) -> Result<()> {
    if update.is_empty() {
        return Err(ClientError::Validation("Nothing to update".to_string()));
    }
    if let Some(title) = &update.title {
        require_text("Title", title)?;
    }
    if let Some(location) = &update.location {
        require_text("Location", location)?;
    }
    if let Some(price) = update.price {
        validate_price(price)?;
    }
    if let Some(date) = &update.date {
        require_text("Date", date)?;
        validate_event_date(date, today)?;
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(ClientError::Validation(
            "Price must be zero or a positive number".to_string(),
        ));
    }
    Ok(())
}

fn validate_event_date(date: &str, today: NaiveDate) -> Result<()> {
    let parsed = parse_event_date(date)
        .ok_or_else(|| ClientError::Validation(format!("Invalid event date '{date}'")))?;
    if parsed.with_timezone(&Local).date_naive() < today {
        return Err(ClientError::Validation(PAST_DATE_MESSAGE.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/events_tests.rs"]
mod tests;
