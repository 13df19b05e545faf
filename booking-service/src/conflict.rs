use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::{BookingError, BookingStatus, ConflictKind};

use crate::models::{Booking, RestaurantTable};
use crate::schema::{booking_tables, bookings, restaurant_tables};

/// Dining-slot buffer applied on each side of a requested booking time.
pub const CONFLICT_BUFFER_HOURS: i64 = 2;

/// The window inside which another booking on the same table counts as a
/// conflict.
pub fn conflict_window(requested: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        requested - Duration::hours(CONFLICT_BUFFER_HOURS),
        requested + Duration::hours(CONFLICT_BUFFER_HOURS),
    )
}

/// Strict containment: a booking sitting exactly on a window edge does not
/// conflict.
pub fn strictly_inside(
    t: DateTime<Utc>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> bool {
    t > window_start && t < window_end
}

/// Active (non-cancelled) bookings on `table_id` whose booking time falls
/// strictly inside the window. Read-only; callers needing an authoritative
/// answer must run this inside the same transaction as their write.
pub async fn find_conflicts(
    conn: &mut AsyncPgConnection,
    table_id: i32,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<Booking>, BookingError> {
    let rows = booking_tables::table
        .inner_join(bookings::table)
        .filter(booking_tables::table_id.eq(table_id))
        .filter(bookings::status.ne(BookingStatus::Cancelled.as_str()))
        .filter(bookings::booking_time.gt(window_start))
        .filter(bookings::booking_time.lt(window_end))
        .select(bookings::all_columns)
        .load::<Booking>(conn)
        .await?;
    Ok(rows)
}

pub async fn has_conflict(
    conn: &mut AsyncPgConnection,
    table_id: i32,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<bool, BookingError> {
    let count: i64 = booking_tables::table
        .inner_join(bookings::table)
        .filter(booking_tables::table_id.eq(table_id))
        .filter(bookings::status.ne(BookingStatus::Cancelled.as_str()))
        .filter(bookings::booking_time.gt(window_start))
        .filter(bookings::booking_time.lt(window_end))
        .count()
        .get_result(conn)
        .await?;
    Ok(count > 0)
}

/// Rejects the requested slot if any of the given tables is blocked by its
/// physical status or already booked inside the conflict window.
/// `exclude_booking` removes the booking being updated from its own
/// conflict set.
pub async fn ensure_tables_free(
    conn: &mut AsyncPgConnection,
    tables: &[RestaurantTable],
    requested: DateTime<Utc>,
    exclude_booking: Option<i32>,
) -> Result<(), BookingError> {
    let (window_start, window_end) = conflict_window(requested);

    for table in tables {
        let status = table.status()?;
        if status.blocks_booking() {
            return Err(BookingError::Conflict {
                kind: ConflictKind::TableOccupied,
                detail: format!("table {} is currently {}", table.name, status.as_str()),
            });
        }

        let conflicts = find_conflicts(conn, table.id, window_start, window_end).await?;
        if let Some(existing) = conflicts.iter().find(|b| {
            exclude_booking != Some(b.id)
                && strictly_inside(b.booking_time, window_start, window_end)
        }) {
            let (busy_from, busy_until) = conflict_window(existing.booking_time);
            return Err(BookingError::Conflict {
                kind: ConflictKind::TimeOverlap,
                detail: format!(
                    "table {} is already booked in this time slot ({} - {})",
                    table.name,
                    busy_from.format("%H:%M"),
                    busy_until.format("%H:%M"),
                ),
            });
        }
    }

    Ok(())
}

/// Tables of a restaurant that can seat `guest_count` and are free around
/// `booking_time`. Advisory listing for availability screens.
pub async fn find_available_tables(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
    booking_time: DateTime<Utc>,
    guest_count: i32,
) -> Result<Vec<RestaurantTable>, BookingError> {
    let (window_start, window_end) = conflict_window(booking_time);

    let candidates = restaurant_tables::table
        .filter(restaurant_tables::restaurant_id.eq(restaurant_id))
        .filter(restaurant_tables::capacity.ge(guest_count))
        .order(restaurant_tables::capacity.asc())
        .load::<RestaurantTable>(conn)
        .await?;

    let mut free = Vec::with_capacity(candidates.len());
    for table in candidates {
        if table.status()?.blocks_booking() {
            continue;
        }
        if !has_conflict(conn, table.id, window_start, window_end).await? {
            free.push(table);
        }
    }
    Ok(free)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, hour, min, 0).unwrap()
    }

    #[test]
    fn window_spans_two_hours_each_side() {
        let (start, end) = conflict_window(at(18, 0));
        assert_eq!(start, at(16, 0));
        assert_eq!(end, at(20, 0));
    }

    #[test]
    fn edge_of_window_is_not_a_conflict() {
        let (start, end) = conflict_window(at(18, 0));
        assert!(!strictly_inside(at(16, 0), start, end));
        assert!(!strictly_inside(at(20, 0), start, end));
        assert!(strictly_inside(at(16, 1), start, end));
        assert!(strictly_inside(at(19, 59), start, end));
        assert!(strictly_inside(at(18, 0), start, end));
    }

    #[test]
    fn bookings_outside_window_do_not_overlap() {
        let (start, end) = conflict_window(at(12, 0));
        assert!(!strictly_inside(at(9, 59), start, end));
        assert!(!strictly_inside(at(14, 1), start, end));
    }
}
