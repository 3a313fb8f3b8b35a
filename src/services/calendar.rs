//! Proyección de reservas al calendario del frontend

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::booking::BookingStatus;

const COLOR_AUTHORIZED: &str = "#2a8617ff";
const COLOR_PENDING: &str = "#e6650fff";
const COLOR_OTHER: &str = "#501d1bff";

/// Fila leída de `reservations` + `rooms`
#[derive(Debug, Clone, FromRow)]
pub struct CalendarRow {
    pub id: i32,
    pub event_name: String,
    pub room_name: String,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: i32,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub color: &'static str,
    pub status: BookingStatus,
}

pub fn status_color(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Authorized => COLOR_AUTHORIZED,
        BookingStatus::Pending => COLOR_PENDING,
        _ => COLOR_OTHER,
    }
}

impl From<CalendarRow> for CalendarEvent {
    fn from(row: CalendarRow) -> Self {
        Self {
            id: row.id,
            title: format!(
                "{} ({}) - {}",
                row.event_name,
                row.room_name,
                row.status.as_str().to_uppercase()
            ),
            start: row.event_date.and_time(row.start_time),
            end: row.event_date.and_time(row.end_time),
            color: status_color(row.status),
            status: row.status,
        }
    }
}

pub fn project(rows: Vec<CalendarRow>) -> Vec<CalendarEvent> {
    rows.into_iter().map(CalendarEvent::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: BookingStatus) -> CalendarRow {
        CalendarRow {
            id: 4,
            event_name: "Posada".to_string(),
            room_name: "Salón Azul".to_string(),
            event_date: NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(23, 30, 0).unwrap(),
            status,
        }
    }

    #[test]
    fn event_title_and_window() {
        let event = CalendarEvent::from(row(BookingStatus::Pending));
        assert_eq!(event.title, "Posada (Salón Azul) - PENDING");
        assert_eq!(event.start.to_string(), "2024-12-15 18:00:00");
        assert_eq!(event.end.to_string(), "2024-12-15 23:30:00");
        assert_eq!(event.color, "#e6650fff");
    }

    #[test]
    fn colors_by_status() {
        assert_eq!(status_color(BookingStatus::Authorized), "#2a8617ff");
        assert_eq!(status_color(BookingStatus::Active), "#501d1bff");
        assert_eq!(project(vec![row(BookingStatus::Authorized)])[0].color, "#2a8617ff");
    }
}
