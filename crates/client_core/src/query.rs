//! Client-side filtering and ordering of the event list.
//!
//! The list page keeps the full collection in memory and derives what it
//! shows from a [`StatusFilter`] and a [`SortKey`]. Sorting is stable, so
//! events that compare equal keep the order they arrived in, in both
//! directions.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use shared::{
    domain::{EventId, EventStatus, ParseEnumError},
    protocol::Event,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(EventStatus),
}

impl StatusFilter {
    pub fn matches(self, event: &Event) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => event.effective_status() == status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => f.write_str(&status.as_str().to_ascii_lowercase()),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only).map_err(|_| ParseEnumError {
            kind: "status filter",
            value: s.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    Title,
    Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn reversed(self) -> Self {
        let direction = match self.direction {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        };
        Self { direction, ..self }
    }

    pub fn compare(self, a: &Event, b: &Event) -> Ordering {
        let ordering = match self.field {
            SortField::Date => compare_dates(&a.date, &b.date),
            SortField::Title => compare_titles(&a.title, &b.title),
            SortField::Price => a.effective_price().total_cmp(&b.effective_price()),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self::new(SortField::Date, SortDirection::Ascending)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match self.field {
            SortField::Date => "date",
            SortField::Title => "title",
            SortField::Price => "price",
        };
        let direction = match self.direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        write!(f, "{field}-{direction}")
    }
}

impl FromStr for SortKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseEnumError {
            kind: "sort key",
            value: s.to_string(),
        };
        let normalized = s.trim().to_ascii_lowercase();
        let (field, direction) = normalized.split_once('-').ok_or_else(invalid)?;
        let field = match field {
            "date" => SortField::Date,
            "title" => SortField::Title,
            "price" => SortField::Price,
            _ => return Err(invalid()),
        };
        let direction = match direction {
            "asc" => SortDirection::Ascending,
            "desc" => SortDirection::Descending,
            _ => return Err(invalid()),
        };
        Ok(Self::new(field, direction))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventQuery {
    pub status: StatusFilter,
    pub sort: SortKey,
}

impl EventQuery {
    pub fn new(status: StatusFilter, sort: SortKey) -> Self {
        Self { status, sort }
    }

    pub fn apply(&self, events: &[Event]) -> Vec<Event> {
        self.visible_indices(events)
            .into_iter()
            .map(|i| events[i].clone())
            .collect()
    }

    fn visible_indices(&self, events: &[Event]) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..events.len())
            .filter(|&i| self.status.matches(&events[i]))
            .collect();
        indices.sort_by(|&a, &b| self.sort.compare(&events[a], &events[b]));
        indices
    }
}

/// An event collection together with the list derived from it. The derived
/// list is recomputed whenever the events, the filter, or the sort change.
#[derive(Debug, Clone, Default)]
pub struct EventListView {
    events: Vec<Event>,
    query: EventQuery,
    visible: Vec<usize>,
}

impl EventListView {
    pub fn new(events: Vec<Event>, query: EventQuery) -> Self {
        let visible = query.visible_indices(&events);
        Self {
            events,
            query,
            visible,
        }
    }

    pub fn query(&self) -> EventQuery {
        self.query
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn visible(&self) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.visible.iter().map(|&i| &self.events[i])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn set_events(&mut self, events: Vec<Event>) {
        self.events = events;
        self.recompute();
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        if self.query.status != status {
            self.query.status = status;
            self.recompute();
        }
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        if self.query.sort != sort {
            self.query.sort = sort;
            self.recompute();
        }
    }

    /// Replaces the event with the same id, or appends it when unknown.
    pub fn upsert_event(&mut self, event: Event) {
        let existing = event
            .id
            .as_ref()
            .and_then(|id| self.position(id));
        match existing {
            Some(index) => self.events[index] = event,
            None => self.events.push(event),
        }
        self.recompute();
    }

    pub fn remove_event(&mut self, event_id: &EventId) -> Option<Event> {
        let index = self.position(event_id)?;
        let removed = self.events.remove(index);
        self.recompute();
        Some(removed)
    }

    fn position(&self, event_id: &EventId) -> Option<usize> {
        self.events
            .iter()
            .position(|e| e.id.as_ref() == Some(event_id))
    }

    fn recompute(&mut self) {
        self.visible = self.query.visible_indices(&self.events);
    }
}

const WALL_CLOCK_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parses the date formats the API and the create form produce into an
/// instant: a plain calendar date (midnight), a date-time without offset, or
/// an RFC 3339 timestamp. Values without an offset are wall-clock time in
/// `zone`.
pub fn parse_event_date_in<Tz: TimeZone>(raw: &str, zone: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    let wall_clock = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .or_else(|| {
            WALL_CLOCK_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        })?;
    resolve_wall_clock(wall_clock, zone)
}

/// [`parse_event_date_in`] with offset-less values read in the local zone.
pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    parse_event_date_in(raw, &Local)
}

// A wall-clock time skipped by a DST jump resolves to the hour after it.
fn resolve_wall_clock<Tz: TimeZone>(wall_clock: NaiveDateTime, zone: &Tz) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&wall_clock)
        .earliest()
        .or_else(|| {
            zone.from_local_datetime(&(wall_clock + Duration::hours(1)))
                .earliest()
        })
        .map(|instant| instant.with_timezone(&Utc))
}

// Unparseable dates sort after every valid one.
fn compare_dates(a: &str, b: &str) -> Ordering {
    match (parse_event_date(a), parse_event_date(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
