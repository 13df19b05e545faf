use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::BookingError;
use tracing::debug;

use crate::models::{NewBookingTable, RestaurantTable};
use crate::schema::{booking_tables, restaurant_tables};

/// Parses a single table id or a comma-separated list. Every token must be
/// a positive integer after trimming; the first bad token aborts the whole
/// request so nothing is ever partially allocated.
pub fn parse_table_ids(raw: &str) -> Result<Vec<i32>, BookingError> {
    if raw.trim().is_empty() {
        return Err(BookingError::Validation(
            "select at least one table".to_string(),
        ));
    }

    raw.split(',')
        .map(|token| {
            let trimmed = token.trim();
            trimmed
                .parse::<i32>()
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(|| BookingError::InvalidIdFormat(trimmed.to_string()))
        })
        .collect()
}

pub fn combined_capacity(tables: &[RestaurantTable]) -> i32 {
    tables.iter().map(|t| t.capacity).sum()
}

pub fn check_capacity(tables: &[RestaurantTable], guest_count: i32) -> Result<(), BookingError> {
    let capacity = combined_capacity(tables);
    if guest_count > capacity {
        return Err(BookingError::CapacityExceeded {
            guests: guest_count,
            capacity,
        });
    }
    Ok(())
}

/// Loads every requested table under `FOR UPDATE`. The row locks serialize
/// concurrent bookings touching the same tables for the rest of the
/// surrounding transaction; ids are deduplicated and locked in ascending
/// order so two allocations can never deadlock against each other.
pub async fn resolve_tables_for_update(
    conn: &mut AsyncPgConnection,
    table_ids: &[i32],
) -> Result<Vec<RestaurantTable>, BookingError> {
    let mut ordered: Vec<i32> = table_ids.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    let mut tables = Vec::with_capacity(ordered.len());
    for id in ordered {
        let table = restaurant_tables::table
            .find(id)
            .for_update()
            .first::<RestaurantTable>(conn)
            .await
            .optional()?
            .ok_or_else(|| BookingError::NotFound(format!("table {id}")))?;
        tables.push(table);
    }
    Ok(tables)
}

/// Replaces the booking's table links wholesale: delete-all then
/// insert-all, never a diff. Replaying the same replacement is idempotent.
pub async fn replace_links(
    conn: &mut AsyncPgConnection,
    booking_id: i32,
    tables: &[RestaurantTable],
) -> Result<(), BookingError> {
    diesel::delete(booking_tables::table.filter(booking_tables::booking_id.eq(booking_id)))
        .execute(conn)
        .await?;

    let links: Vec<NewBookingTable> = tables
        .iter()
        .map(|t| NewBookingTable {
            booking_id,
            table_id: t.id,
        })
        .collect();

    diesel::insert_into(booking_tables::table)
        .values(&links)
        .execute(conn)
        .await?;

    debug!(
        "linked booking {} to {} table(s)",
        booking_id,
        links.len()
    );
    Ok(())
}

/// The allocation contract: resolve the requested tables, verify the
/// aggregate capacity covers the party, then persist the links. Must run
/// inside the caller's transaction.
pub async fn allocate(
    conn: &mut AsyncPgConnection,
    booking_id: i32,
    table_ids: &[i32],
    guest_count: i32,
) -> Result<Vec<RestaurantTable>, BookingError> {
    let tables = resolve_tables_for_update(conn, table_ids).await?;
    check_capacity(&tables, guest_count)?;
    replace_links(conn, booking_id, &tables).await?;
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(id: i32, capacity: i32) -> RestaurantTable {
        RestaurantTable {
            id,
            restaurant_id: 1,
            name: format!("T{id}"),
            capacity,
            deposit_amount: None,
            status: "AVAILABLE".to_string(),
        }
    }

    #[test]
    fn parses_single_id_and_comma_lists() {
        assert_eq!(parse_table_ids("7").unwrap(), vec![7]);
        assert_eq!(parse_table_ids("1, 2,3 ").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn rejects_blank_selection() {
        assert!(matches!(
            parse_table_ids("   "),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_and_malformed_tokens() {
        assert!(matches!(
            parse_table_ids("1,,3"),
            Err(BookingError::InvalidIdFormat(_))
        ));
        assert!(matches!(
            parse_table_ids("1,abc"),
            Err(BookingError::InvalidIdFormat(_))
        ));
        assert!(matches!(
            parse_table_ids("0"),
            Err(BookingError::InvalidIdFormat(_))
        ));
        assert!(matches!(
            parse_table_ids("-4"),
            Err(BookingError::InvalidIdFormat(_))
        ));
    }

    #[test]
    fn capacity_covers_party_or_fails_with_shortfall() {
        let tables = vec![table(1, 4), table(2, 6)];

        assert!(check_capacity(&tables, 8).is_ok());
        assert!(check_capacity(&tables, 10).is_ok());

        match check_capacity(&tables, 15) {
            Err(BookingError::CapacityExceeded { guests, capacity }) => {
                assert_eq!(guests, 15);
                assert_eq!(capacity, 10);
            }
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
    }

    #[test]
    fn capacity_error_message_names_both_numbers() {
        let err = check_capacity(&[table(1, 4)], 9).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains('9'), "{msg}");
        assert!(msg.contains('4'), "{msg}");
    }
}
