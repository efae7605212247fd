//! Event creation and listing

use crate::error::{AdminError, AdminResult};
use crate::Dashboard;
use geoattend_common::api::{EventSummary, NewEvent};
use geoattend_common::time::parse_timestamp;
use geoattend_common::GeoCoordinate;
use std::fmt::Write as _;
use tracing::{info, warn};

/// Event as entered by the administrator, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct EventForm {
    pub title: String,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub location_name: Option<String>,
}

impl EventForm {
    /// Check the form and build the request body
    pub fn validate(&self) -> AdminResult<NewEvent> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AdminError::Validation("title is required".to_string()));
        }

        let venue = GeoCoordinate::new(self.latitude, self.longitude)
            .map_err(|e| AdminError::Validation(e.to_string()))?;

        if !(self.radius_meters.is_finite() && self.radius_meters > 0.0) {
            return Err(AdminError::Validation(format!(
                "radius must be a positive number of meters, got {}",
                self.radius_meters
            )));
        }

        let start_time = parse_timestamp(&self.start_time).ok_or_else(|| {
            AdminError::Validation(format!("unrecognized start time {:?}", self.start_time))
        })?;
        let end_time = parse_timestamp(&self.end_time).ok_or_else(|| {
            AdminError::Validation(format!("unrecognized end time {:?}", self.end_time))
        })?;
        if end_time <= start_time {
            return Err(AdminError::Validation(
                "end time must be after start time".to_string(),
            ));
        }

        Ok(NewEvent {
            title: title.to_string(),
            description: non_blank(&self.description),
            start_time,
            end_time,
            latitude: venue.lat(),
            longitude: venue.lng(),
            radius_meters: self.radius_meters,
            location_name: non_blank(&self.location_name),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Dashboard {
    /// Create an event; returns the new event's id when the backend reports one
    pub async fn create_event(&self, form: &EventForm) -> AdminResult<Option<String>> {
        let event = form.validate()?;
        let response = self.api.create_event(&event).await?;

        if response
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("error"))
        {
            let message = response
                .message
                .unwrap_or_else(|| "event was not created".to_string());
            warn!(title = %event.title, "Event creation rejected: {}", message);
            return Err(AdminError::Rejected(message));
        }

        info!(title = %event.title, event_id = ?response.event_id, "Event created");
        Ok(response.event_id)
    }

    pub async fn active_events(&self) -> AdminResult<Vec<EventSummary>> {
        Ok(self.api.active_events().await?)
    }

    pub async fn past_events(&self) -> AdminResult<Vec<EventSummary>> {
        Ok(self.api.past_events().await?)
    }
}

/// Plain-text table of events
pub fn render_events(events: &[EventSummary]) -> String {
    if events.is_empty() {
        return "No events".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<32} {:<25} {:<25} {:>9}",
        "ID", "TITLE", "START", "END", "ATTENDEES"
    );
    for event in events {
        let _ = writeln!(
            out,
            "{:<8} {:<32} {:<25} {:<25} {:>9}",
            event.id,
            truncate(&event.title, 32),
            event.start_time.as_deref().unwrap_or("-"),
            event.end_time.as_deref().unwrap_or("-"),
            event
                .attendee_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    out.trim_end().to_string()
}

pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
