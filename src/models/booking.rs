//! Modelo común de reservas
//!
//! Tipos compartidos por asignaciones de vehículos y reservas de salones:
//! estado del ciclo de vida, ventana de tiempo y reservas en conflicto.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;

/// Estado de una reserva - mapea al ENUM booking_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Authorized,
    Active,
    Finalized,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Finalized | BookingStatus::Cancelled)
    }

    /// Estados que bloquean el recurso para otras reservas
    pub fn is_blocking(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Authorized => "authorized",
            BookingStatus::Active => "active",
            BookingStatus::Finalized => "finalized",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ventana de tiempo semiabierta `[start, end)`.
///
/// `end = None` significa una asignación abierta, que se trata como `[start, +inf)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    /// Ventana cerrada; `None` si `end <= start`
    pub fn closed(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (end > start).then_some(Self { start, end: Some(end) })
    }

    pub fn open(start: NaiveDateTime) -> Self {
        Self { start, end: None }
    }

    /// Ventana de un evento de salón dentro de un mismo día
    pub fn on_date(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Option<Self> {
        Self::closed(date.and_time(start), date.and_time(end))
    }

    /// Intersección de intervalos semiabiertos. Tocarse en el borde no es conflicto.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        let starts_before_other_ends = match other.end {
            Some(other_end) => self.start < other_end,
            None => true,
        };
        let ends_after_other_starts = match self.end {
            Some(end) => end > other.start,
            None => true,
        };
        starts_before_other_ends && ends_after_other_starts
    }
}

/// Reserva existente que choca con la ventana solicitada
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingBooking {
    pub id: i32,
    pub title: String,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
    pub resource_name: String,
}

/// Recurso reservable, usado como llave del candado transaccional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Vehicle(i32),
    Room(i32),
}

impl ResourceKey {
    /// Llave de 64 bits para `pg_advisory_xact_lock`: tipo en la parte alta, id en la baja
    pub fn lock_key(self) -> i64 {
        let (namespace, id) = match self {
            ResourceKey::Vehicle(id) => (1_i64, id),
            ResourceKey::Room(id) => (2_i64, id),
        };
        (namespace << 32) | (id as u32 as i64)
    }
}

/// Agrega una nota al campo de observaciones con el separador `" | "`
pub fn append_note(existing: Option<&str>, note: &str) -> String {
    match existing {
        Some(current) if !current.trim().is_empty() => format!("{} | {}", current, note),
        _ => note.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn touching_windows_do_not_overlap() {
        let morning = TimeWindow::closed(at(8, 0), at(10, 0)).unwrap();
        let late_morning = TimeWindow::closed(at(10, 0), at(12, 0)).unwrap();
        assert!(!morning.overlaps(&late_morning));
        assert!(!late_morning.overlaps(&morning));
    }

    #[test]
    fn partial_overlap_is_detected() {
        let a = TimeWindow::closed(at(14, 0), at(16, 0)).unwrap();
        let b = TimeWindow::closed(at(15, 0), at(17, 0)).unwrap();
        assert!(a.overlaps(&b));
    }

    #[test]
    fn open_window_blocks_everything_after_its_start() {
        let open = TimeWindow::open(at(9, 0));
        let before = TimeWindow::closed(at(7, 0), at(9, 0)).unwrap();
        let after = TimeWindow::closed(at(18, 0), at(19, 0)).unwrap();
        let straddling = TimeWindow::closed(at(8, 0), at(9, 30)).unwrap();

        assert!(!open.overlaps(&before));
        assert!(open.overlaps(&after));
        assert!(open.overlaps(&straddling));
        assert!(open.overlaps(&TimeWindow::open(at(6, 0))));
    }

    #[test]
    fn closed_rejects_empty_windows() {
        assert!(TimeWindow::closed(at(10, 0), at(10, 0)).is_none());
        assert!(TimeWindow::closed(at(11, 0), at(10, 0)).is_none());
    }

    #[test]
    fn terminal_states_do_not_block() {
        assert!(BookingStatus::Pending.is_blocking());
        assert!(BookingStatus::Active.is_blocking());
        assert!(!BookingStatus::Finalized.is_blocking());
        assert!(!BookingStatus::Cancelled.is_blocking());
    }

    #[test]
    fn lock_keys_are_distinct_per_kind() {
        assert_ne!(ResourceKey::Vehicle(10).lock_key(), ResourceKey::Room(10).lock_key());
        assert_eq!(ResourceKey::Vehicle(10).lock_key(), ResourceKey::Vehicle(10).lock_key());
    }

    #[test]
    fn append_note_uses_separator() {
        assert_eq!(append_note(None, "Cierre: ok"), "Cierre: ok");
        assert_eq!(append_note(Some(""), "Cierre: ok"), "Cierre: ok");
        assert_eq!(append_note(Some("Salida temprano"), "Cierre: ok"), "Salida temprano | Cierre: ok");
    }

    fn window_strategy() -> impl Strategy<Value = TimeWindow> {
        (0u32..(24 * 60), prop::option::of(1u32..(12 * 60))).prop_map(|(start, length)| {
            let start_at = at(0, 0) + chrono::Duration::minutes(start as i64);
            match length {
                Some(len) => TimeWindow {
                    start: start_at,
                    end: Some(start_at + chrono::Duration::minutes(len as i64)),
                },
                None => TimeWindow::open(start_at),
            }
        })
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in window_strategy(), b in window_strategy()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn window_overlaps_itself(a in window_strategy()) {
            prop_assert!(a.overlaps(&a));
        }
    }
}
