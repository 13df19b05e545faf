use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::{
    BookingError, DiscountType, VoucherApplication, VoucherReason, VoucherStatus,
    VoucherValidation,
};
use uuid::Uuid;

use crate::models::{NewVoucherRedemption, Voucher, VoucherRedemption};
use crate::schema::{voucher_redemptions, vouchers};

diesel::sql_function!(fn lower(x: Text) -> Text);

#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub code: String,
    pub restaurant_id: i32,
    pub customer_id: Uuid,
    pub booking_id: i32,
    pub order_amount: BigDecimal,
}

/// Case-insensitive lookup by code.
pub async fn find_by_code(
    conn: &mut AsyncPgConnection,
    code: &str,
) -> Result<Option<Voucher>, BookingError> {
    let normalized = code.trim().to_lowercase();
    let voucher = vouchers::table
        .filter(lower(vouchers::code).eq(normalized))
        .first::<Voucher>(conn)
        .await
        .optional()?;
    Ok(voucher)
}

/// Same lookup, but takes a row-level exclusive lock on the voucher. Every
/// concurrent redemption of the same code serializes on this lock, which is
/// what makes the ledger counts below trustworthy.
async fn find_by_code_for_update(
    conn: &mut AsyncPgConnection,
    code: &str,
) -> Result<Option<Voucher>, BookingError> {
    let normalized = code.trim().to_lowercase();
    let voucher = vouchers::table
        .filter(lower(vouchers::code).eq(normalized))
        .for_update()
        .first::<Voucher>(conn)
        .await
        .optional()?;
    Ok(voucher)
}

/// Eligibility checks that do not depend on usage counts, in rejection
/// order: status, validity window, restaurant scope, minimum order.
pub fn eligibility(
    voucher: &Voucher,
    restaurant_id: i32,
    today: NaiveDate,
    order_amount: &BigDecimal,
) -> Result<(), VoucherReason> {
    if VoucherStatus::parse(&voucher.status) != Some(VoucherStatus::Active) {
        return Err(VoucherReason::Inactive);
    }

    if today < voucher.start_date || today > voucher.end_date {
        return Err(VoucherReason::Expired);
    }

    if let Some(scope) = voucher.restaurant_id {
        if scope != restaurant_id {
            return Err(VoucherReason::RestaurantScopeMismatch);
        }
    }

    if let Some(min) = &voucher.min_order_amount {
        if order_amount < min {
            return Err(VoucherReason::MinOrderNotMet);
        }
    }

    Ok(())
}

/// Percentage discounts are capped by `max_discount_amount` when set;
/// fixed discounts apply verbatim.
pub fn calculate_discount(
    voucher: &Voucher,
    order_amount: &BigDecimal,
) -> Result<BigDecimal, BookingError> {
    match voucher.discount_type()? {
        DiscountType::Percentage => {
            let mut discount =
                order_amount * &voucher.discount_value / BigDecimal::from(100);
            if let Some(cap) = &voucher.max_discount_amount {
                if discount > *cap {
                    discount = cap.clone();
                }
            }
            Ok(discount)
        }
        DiscountType::Fixed => Ok(voucher.discount_value.clone()),
    }
}

pub fn limit_reached(count: i64, limit: Option<i32>) -> bool {
    matches!(limit, Some(l) if count >= l as i64)
}

/// Read-only eligibility report for UI feedback. Deliberately ignores the
/// usage limits: without the apply-phase lock any count would be stale by
/// the time the redemption runs.
pub async fn validate(
    conn: &mut AsyncPgConnection,
    code: &str,
    restaurant_id: i32,
    order_amount: &BigDecimal,
) -> Result<VoucherValidation, BookingError> {
    if code.trim().is_empty() {
        return Ok(VoucherValidation::rejected(VoucherReason::EmptyCode));
    }

    let Some(voucher) = find_by_code(conn, code).await? else {
        return Ok(VoucherValidation::rejected(VoucherReason::NotFound));
    };

    let today = Utc::now().date_naive();
    if let Err(reason) = eligibility(&voucher, restaurant_id, today, order_amount) {
        return Ok(VoucherValidation::rejected(reason));
    }

    let discount = calculate_discount(&voucher, order_amount)?;
    Ok(VoucherValidation::accepted(discount))
}

/// Redeems a voucher against a booking. Must run inside the booking's
/// write transaction: the voucher row is locked `FOR UPDATE` for the whole
/// check-and-insert sequence, so for any interleaving of concurrent
/// attempts the committed redemption rows never exceed the global limit,
/// nor the per-customer limit per customer. Rejections leave no writes
/// behind; the lock falls with the transaction.
pub async fn apply_to_booking(
    conn: &mut AsyncPgConnection,
    req: &ApplyRequest,
) -> Result<VoucherApplication, BookingError> {
    if req.code.trim().is_empty() {
        return Err(BookingError::VoucherRejected(VoucherReason::EmptyCode));
    }

    let Some(voucher) = find_by_code_for_update(conn, &req.code).await? else {
        return Err(BookingError::VoucherRejected(VoucherReason::NotFound));
    };

    // The voucher may have expired or been deactivated between the
    // advisory validate call and now; re-check everything on the locked
    // row.
    let today = Utc::now().date_naive();
    eligibility(&voucher, req.restaurant_id, today, &req.order_amount)
        .map_err(BookingError::VoucherRejected)?;

    if voucher.global_usage_limit.is_some() {
        let global_count: i64 = voucher_redemptions::table
            .filter(voucher_redemptions::voucher_id.eq(voucher.id))
            .count()
            .get_result(conn)
            .await?;
        if limit_reached(global_count, voucher.global_usage_limit) {
            return Err(BookingError::VoucherRejected(
                VoucherReason::GlobalLimitReached,
            ));
        }
    }

    if voucher.per_customer_limit.is_some() {
        let customer_count: i64 = voucher_redemptions::table
            .filter(voucher_redemptions::voucher_id.eq(voucher.id))
            .filter(voucher_redemptions::customer_id.eq(req.customer_id))
            .count()
            .get_result(conn)
            .await?;
        if limit_reached(customer_count, voucher.per_customer_limit) {
            return Err(BookingError::VoucherRejected(
                VoucherReason::PerCustomerLimitReached,
            ));
        }
    }

    let discount = calculate_discount(&voucher, &req.order_amount)?;

    let redemption: VoucherRedemption = diesel::insert_into(voucher_redemptions::table)
        .values(&NewVoucherRedemption {
            voucher_id: voucher.id,
            customer_id: req.customer_id,
            booking_id: req.booking_id,
            discount_applied: discount.clone(),
        })
        .returning(voucher_redemptions::all_columns)
        .get_result(conn)
        .await?;

    Ok(VoucherApplication {
        redemption_id: redemption.id,
        discount_applied: discount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn voucher() -> Voucher {
        Voucher {
            id: 1,
            code: "TEST20".to_string(),
            discount_type: "PERCENTAGE".to_string(),
            discount_value: dec("20"),
            start_date: day(2025, 1, 1),
            end_date: day(2025, 12, 31),
            status: "ACTIVE".to_string(),
            global_usage_limit: Some(100),
            per_customer_limit: Some(1),
            min_order_amount: Some(dec("100000")),
            max_discount_amount: Some(dec("50000")),
            restaurant_id: None,
        }
    }

    #[test]
    fn percentage_discount_is_capped() {
        // 20% of 500000 would be 100000; the cap brings it down to 50000.
        let discount = calculate_discount(&voucher(), &dec("500000")).unwrap();
        assert_eq!(discount, dec("50000"));
    }

    #[test]
    fn percentage_discount_below_cap_is_untouched() {
        let discount = calculate_discount(&voucher(), &dec("150000")).unwrap();
        assert_eq!(discount, dec("30000"));
    }

    #[test]
    fn fixed_discount_applies_verbatim() {
        let mut v = voucher();
        v.discount_type = "FIXED".to_string();
        v.discount_value = dec("75000");
        let discount = calculate_discount(&v, &dec("500000")).unwrap();
        assert_eq!(discount, dec("75000"));
    }

    #[test]
    fn inactive_voucher_is_rejected_first() {
        let mut v = voucher();
        v.status = "INACTIVE".to_string();
        // Also out of window, but status must win the rejection order.
        assert_eq!(
            eligibility(&v, 1, day(2026, 6, 1), &dec("500000")),
            Err(VoucherReason::Inactive)
        );
    }

    #[test]
    fn out_of_window_voucher_is_expired() {
        let v = voucher();
        assert_eq!(
            eligibility(&v, 1, day(2024, 12, 31), &dec("500000")),
            Err(VoucherReason::Expired)
        );
        assert_eq!(
            eligibility(&v, 1, day(2026, 1, 1), &dec("500000")),
            Err(VoucherReason::Expired)
        );
        assert_eq!(eligibility(&v, 1, day(2025, 6, 15), &dec("500000")), Ok(()));
    }

    #[test]
    fn scoped_voucher_rejects_other_restaurants() {
        let mut v = voucher();
        v.restaurant_id = Some(7);
        assert_eq!(
            eligibility(&v, 8, day(2025, 6, 15), &dec("500000")),
            Err(VoucherReason::RestaurantScopeMismatch)
        );
        assert_eq!(eligibility(&v, 7, day(2025, 6, 15), &dec("500000")), Ok(()));
    }

    #[test]
    fn minimum_order_is_enforced() {
        let v = voucher();
        assert_eq!(
            eligibility(&v, 1, day(2025, 6, 15), &dec("99999")),
            Err(VoucherReason::MinOrderNotMet)
        );
        assert_eq!(eligibility(&v, 1, day(2025, 6, 15), &dec("100000")), Ok(()));
    }

    #[test]
    fn limits_trip_at_the_boundary() {
        assert!(!limit_reached(0, Some(1)));
        assert!(limit_reached(1, Some(1)));
        assert!(limit_reached(2, Some(1)));
        assert!(!limit_reached(99, Some(100)));
        assert!(limit_reached(100, Some(100)));
        assert!(!limit_reached(1_000_000, None));
    }
}
