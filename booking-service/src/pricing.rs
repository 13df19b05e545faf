use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::Zero;
use shared::BookingError;

use crate::models::{BookingDish, BookingService, RestaurantTable};

/// Deposit for a booking. An explicit amount from the form wins verbatim;
/// otherwise the deposit defaults to 10% of the combined per-table deposit
/// of the allocated tables, rounded to whole currency units. A missing or
/// zero table-deposit sum yields a zero deposit, never an error.
pub fn compute_deposit(
    explicit: Option<&BigDecimal>,
    tables: &[RestaurantTable],
) -> BigDecimal {
    if let Some(amount) = explicit {
        return amount.clone();
    }

    let mut sum = BigDecimal::zero();
    for table in tables {
        if let Some(deposit) = &table.deposit_amount {
            sum += deposit;
        }
    }

    if sum <= BigDecimal::zero() {
        return BigDecimal::zero();
    }

    (sum / BigDecimal::from(10)).with_scale_round(0, RoundingMode::HalfUp)
}

/// Total amount = deposit + itemized dish and service lines. Absent lines
/// contribute zero. A line whose unit price was never captured points at
/// corrupt catalog data and must surface, not silently price as zero.
pub fn compute_total(
    deposit: &BigDecimal,
    dishes: &[BookingDish],
    services: &[BookingService],
) -> Result<BigDecimal, BookingError> {
    let mut total = deposit.clone();

    for line in dishes {
        let price = line
            .unit_price
            .as_ref()
            .ok_or(BookingError::CorruptCatalogPrice(line.dish_id))?;
        total += price * BigDecimal::from(line.quantity);
    }

    for line in services {
        let price = line
            .unit_price
            .as_ref()
            .ok_or(BookingError::CorruptCatalogPrice(line.service_id))?;
        total += price * BigDecimal::from(line.quantity);
    }

    Ok(total)
}

/// Discounts reduce the total only, floored at zero. The deposit is never
/// touched by a voucher.
pub fn apply_discount(total: &BigDecimal, discount: &BigDecimal) -> BigDecimal {
    let reduced = total - discount;
    if reduced < BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        reduced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn table(id: i32, deposit: Option<&str>) -> RestaurantTable {
        RestaurantTable {
            id,
            restaurant_id: 1,
            name: format!("T{id}"),
            capacity: 4,
            deposit_amount: deposit.map(dec),
            status: "AVAILABLE".to_string(),
        }
    }

    fn dish_line(dish_id: i32, quantity: i32, price: Option<&str>) -> BookingDish {
        BookingDish {
            id: 0,
            booking_id: 1,
            dish_id,
            quantity,
            unit_price: price.map(dec),
        }
    }

    fn service_line(service_id: i32, quantity: i32, price: Option<&str>) -> BookingService {
        BookingService {
            id: 0,
            booking_id: 1,
            service_id,
            quantity,
            unit_price: price.map(dec),
        }
    }

    #[test]
    fn explicit_deposit_wins_verbatim() {
        let tables = vec![table(1, Some("100000"))];
        assert_eq!(compute_deposit(Some(&dec("2500")), &tables), dec("2500"));
    }

    #[test]
    fn deposit_defaults_to_ten_percent_of_table_deposits() {
        let tables = vec![table(1, Some("100000"))];
        assert_eq!(compute_deposit(None, &tables), dec("10000"));

        let split = vec![table(1, Some("60000")), table(2, Some("40000"))];
        assert_eq!(compute_deposit(None, &split), dec("10000"));
    }

    #[test]
    fn missing_or_zero_table_deposits_mean_zero() {
        assert_eq!(
            compute_deposit(None, &[table(1, None), table(2, None)]),
            BigDecimal::zero()
        );
        assert_eq!(
            compute_deposit(None, &[table(1, Some("0"))]),
            BigDecimal::zero()
        );
        assert_eq!(compute_deposit(None, &[]), BigDecimal::zero());
    }

    #[test]
    fn deposit_rounds_half_up_to_whole_units() {
        // 10% of 1005 = 100.5 -> 101
        assert_eq!(compute_deposit(None, &[table(1, Some("1005"))]), dec("101"));
    }

    #[test]
    fn total_sums_deposit_dishes_and_services() {
        let dishes = vec![dish_line(1, 2, Some("50000")), dish_line(2, 1, Some("30000"))];
        let services = vec![service_line(9, 1, Some("20000"))];
        let total = compute_total(&dec("10000"), &dishes, &services).unwrap();
        assert_eq!(total, dec("160000"));
    }

    #[test]
    fn empty_item_lists_contribute_zero() {
        assert_eq!(compute_total(&dec("10000"), &[], &[]).unwrap(), dec("10000"));
    }

    #[test]
    fn null_unit_price_is_a_data_fault() {
        let dishes = vec![dish_line(42, 1, None)];
        match compute_total(&dec("0"), &dishes, &[]) {
            Err(BookingError::CorruptCatalogPrice(id)) => assert_eq!(id, 42),
            other => panic!("expected CorruptCatalogPrice, got {other:?}"),
        }
    }

    #[test]
    fn discount_reduces_total_but_never_below_zero() {
        assert_eq!(apply_discount(&dec("100000"), &dec("30000")), dec("70000"));
        assert_eq!(apply_discount(&dec("20000"), &dec("50000")), BigDecimal::zero());
    }
}
