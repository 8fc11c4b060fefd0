//! Plain-text rendering of API data for the terminal.

use chrono::{DateTime, Local, TimeZone};
use client_core::{query::parse_event_date, EventDetail, RatingStats};
use shared::protocol::{Event, Review, User};

pub fn event_table<'a>(events: impl IntoIterator<Item = &'a Event>) -> String {
    let rows = events
        .into_iter()
        .map(|event| {
            vec![
                event.id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
                event.title.clone(),
                format_date(&event.date),
                event.location.clone(),
                format_price(event.effective_price()),
                event.effective_status().to_string(),
                event.organizer.clone().unwrap_or_default(),
            ]
        })
        .collect();
    table(
        &["ID", "TITLE", "DATE", "LOCATION", "PRICE", "STATUS", "ORGANIZER"],
        rows,
    )
}

pub fn event_detail<Tz: TimeZone>(detail: &EventDetail, now: &DateTime<Tz>) -> String {
    let event = &detail.event;
    let stats = RatingStats::from_reviews(&detail.reviews);
    let mut out = String::new();

    out.push_str(&format!("{}  [{}]\n", event.title, event.effective_status()));
    if let Some(id) = &event.id {
        out.push_str(&format!("  id:        {id}\n"));
    }
    out.push_str(&format!("  date:      {}\n", format_date(&event.date)));
    out.push_str(&format!("  location:  {}\n", event.location));
    out.push_str(&format!("  price:     {}\n", format_price(event.effective_price())));
    if let Some(organizer) = &event.organizer {
        out.push_str(&format!("  organizer: {organizer}\n"));
    }
    if let Some(description) = event.description.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push_str(&format!("\n{description}\n"));
    }

    out.push('\n');
    if client_core::event_has_finished(event, now) {
        out.push_str(&format!(
            "Rating: {:.1} / 5 from {} review(s)\n",
            detail.rating_summary.average_rating, detail.rating_summary.total_reviews
        ));
        out.push_str(&rating_distribution(&stats));
    } else {
        out.push_str("Reviews open once the event has finished.\n");
    }
    out
}

pub fn rating_distribution(stats: &RatingStats) -> String {
    let mut out = String::new();
    for (star, count) in stats.distribution.iter().rev() {
        let share = if stats.total_reviews == 0 {
            0
        } else {
            count * 20 / stats.total_reviews
        };
        out.push_str(&format!("  {star}★ {:<20} {count}\n", "#".repeat(share)));
    }
    out
}

pub fn review_table(reviews: &[Review]) -> String {
    let rows = reviews
        .iter()
        .map(|review| {
            vec![
                review.id.to_string(),
                stars(review.rating),
                review.username.clone(),
                format_date(&review.created_at),
                review.comment.clone().unwrap_or_default(),
            ]
        })
        .collect();
    table(&["ID", "RATING", "BY", "DATE", "COMMENT"], rows)
}

pub fn user_table(users: &[User]) -> String {
    let rows = users
        .iter()
        .map(|user| {
            vec![
                user.id.to_string(),
                user.username.clone(),
                user.email.clone(),
                user.phone_number.clone(),
                user.role.map(|r| r.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    table(&["ID", "USERNAME", "EMAIL", "PHONE", "ROLE"], rows)
}

pub fn user_card(user: &User) -> String {
    format!(
        "{} <{}>\n  id:      {}\n  role:    {}\n  phone:   {}\n  balance: {}\n",
        user.username,
        user.email,
        user.id,
        user.role.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
        if user.phone_number.is_empty() { "-" } else { user.phone_number.as_str() },
        format_price(user.balance),
    )
}

/// Rupiah with dot thousands separators and no decimals, e.g. `Rp 150.000`.
pub fn format_price(price: f64) -> String {
    let rounded = price.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// `December 25, 2024` in the local zone; unparseable input is shown as-is.
pub fn format_date(raw: &str) -> String {
    parse_event_date(raw)
        .map(|dt| dt.with_timezone(&Local).format("%B %-d, %Y").to_string())
        .unwrap_or_else(|| raw.to_string())
}

pub fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "(none)\n".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &headers, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        let pad = width.saturating_sub(cell.chars().count());
        line.extend(std::iter::repeat(' ').take(pad));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
