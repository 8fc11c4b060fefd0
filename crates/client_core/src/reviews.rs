use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Method;
use shared::{
    domain::{EventId, ReviewId, UserId},
    protocol::{Event, EventRatingSummary, Review, ReviewRequest},
};

use crate::{
    error::{ClientError, Result},
    query::parse_event_date_in,
    transport::ApiClient,
};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

impl ApiClient {
    pub async fn list_reviews(
        &self,
        bearer: Option<&str>,
        event_id: &EventId,
    ) -> Result<Vec<Review>> {
        self.get_json(
            self.endpoint(&["api", "events", event_id.as_str(), "reviews"]),
            bearer,
        )
        .await
    }

    pub async fn create_review(
        &self,
        bearer: Option<&str>,
        event_id: &EventId,
        request: &ReviewRequest,
    ) -> Result<Review> {
        self.send_json(
            Method::POST,
            self.endpoint(&["api", "events", event_id.as_str(), "reviews"]),
            bearer,
            request,
        )
        .await
    }

    pub async fn update_review(
        &self,
        bearer: Option<&str>,
        event_id: &EventId,
        review_id: &ReviewId,
        request: &ReviewRequest,
    ) -> Result<Review> {
        self.send_json(
            Method::PUT,
            self.endpoint(&[
                "api",
                "events",
                event_id.as_str(),
                "reviews",
                review_id.as_str(),
            ]),
            bearer,
            request,
        )
        .await
    }

    pub async fn delete_review(
        &self,
        bearer: Option<&str>,
        event_id: &EventId,
        review_id: &ReviewId,
    ) -> Result<()> {
        self.delete(
            self.endpoint(&[
                "api",
                "events",
                event_id.as_str(),
                "reviews",
                review_id.as_str(),
            ]),
            bearer,
        )
        .await
    }

    pub async fn rating_summary(
        &self,
        bearer: Option<&str>,
        event_id: &EventId,
    ) -> Result<EventRatingSummary> {
        self.get_json(
            self.endpoint(&["api", "events", event_id.as_str(), "rating-summary"]),
            bearer,
        )
        .await
    }
}

/// Star-rating statistics computed locally from a list of reviews.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingStats {
    pub total_reviews: usize,
    /// Mean rating rounded to one decimal place.
    pub average_rating: f64,
    /// Count per star value; every value in 1..=5 is present.
    pub distribution: BTreeMap<u8, usize>,
}

impl RatingStats {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        let mut distribution: BTreeMap<u8, usize> =
            (MIN_RATING..=MAX_RATING).map(|star| (star, 0)).collect();
        if reviews.is_empty() {
            return Self {
                total_reviews: 0,
                average_rating: 0.0,
                distribution,
            };
        }

        let mut total: u64 = 0;
        for review in reviews {
            total += u64::from(review.rating);
            *distribution.entry(review.rating).or_insert(0) += 1;
        }
        let mean = total as f64 / reviews.len() as f64;

        Self {
            total_reviews: reviews.len(),
            average_rating: (mean * 10.0).round() / 10.0,
            distribution,
        }
    }
}

/// A user may leave one review per event.
pub fn can_user_review(reviews: &[Review], user_id: &UserId) -> bool {
    !reviews.iter().any(|review| &review.user_id == user_id)
}

pub fn user_review<'a>(reviews: &'a [Review], user_id: &UserId) -> Option<&'a Review> {
    reviews.iter().find(|review| &review.user_id == user_id)
}

/// True once the event's start is strictly before `now`. Dates without an
/// offset are wall-clock time in `now`'s zone, so date-only events start at
/// that zone's midnight. Unparseable dates never count as finished.
pub fn event_has_finished<Tz: TimeZone>(event: &Event, now: &DateTime<Tz>) -> bool {
    parse_event_date_in(&event.date, &now.timezone())
        .is_some_and(|start| start < now.with_timezone(&Utc))
}

pub fn validate_review(request: &ReviewRequest) -> Result<()> {
    if request.rating == 0 {
        return Err(ClientError::Validation("Please select a rating".to_string()));
    }
    if !(MIN_RATING..=MAX_RATING).contains(&request.rating) {
        return Err(ClientError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(())
}

/// Refuses review changes while the event is still upcoming.
pub fn ensure_reviewable<Tz: TimeZone>(event: &Event, now: &DateTime<Tz>) -> Result<()> {
    if event_has_finished(event, now) {
        Ok(())
    } else {
        Err(ClientError::Validation(
            "Reviews open once the event has finished".to_string(),
        ))
    }
}

#[cfg(test)]
#[path = "tests/reviews_tests.rs"]
mod tests;
