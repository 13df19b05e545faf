use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{pooled_connection::bb8::Pool, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use shared::*;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::allocation;
use crate::conflict;
use crate::models::*;
use crate::notify::{self, NotificationSink};
use crate::pricing;
use crate::refund::{self, RefundGateway};
use crate::schema::*;
use crate::voucher;

pub type DbPool = Pool<AsyncPgConnection>;

pub const MIN_ADVANCE_MINUTES: i64 = 30;
pub const MAX_ADVANCE_DAYS: i64 = 30;
pub const MAX_GUESTS: i32 = 100;

/// Orchestrates the booking engine: one transaction per operation, with
/// conflict detection, table allocation, pricing and voucher redemption
/// composed inside it, and notifications/refunds dispatched strictly after
/// commit.
pub struct BookingLifecycle {
    pool: DbPool,
    notifier: Arc<dyn NotificationSink>,
    refunds: Arc<dyn RefundGateway>,
}

impl BookingLifecycle {
    pub fn new(
        pool: DbPool,
        notifier: Arc<dyn NotificationSink>,
        refunds: Arc<dyn RefundGateway>,
    ) -> Self {
        Self {
            pool,
            notifier,
            refunds,
        }
    }

    /// Creates a booking in PENDING state. Everything from the conflict
    /// check to the voucher redemption happens in one transaction; a
    /// failure at any step leaves no rows behind.
    pub async fn create(
        &self,
        form: BookingForm,
        customer_id: Uuid,
    ) -> Result<Booking, BookingError> {
        let now = Utc::now();
        let booking_time = validate_booking_time(form.booking_time, now)?;
        let guest_count = validate_guest_count(form.guest_count)?;
        validate_deposit(form.deposit_amount.as_ref())?;
        let table_ids = allocation::parse_table_ids(form.table_ids.as_deref().unwrap_or_default())?;

        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let booking = conn
            .transaction::<_, BookingError, _>(|conn| {
                Box::pin(async move {
                    ensure_customer(conn, customer_id).await?;
                    ensure_restaurant(conn, form.restaurant_id).await?;

                    let tables = allocation::resolve_tables_for_update(conn, &table_ids).await?;
                    allocation::check_capacity(&tables, guest_count)?;
                    conflict::ensure_tables_free(conn, &tables, booking_time, None).await?;

                    let deposit = pricing::compute_deposit(form.deposit_amount.as_ref(), &tables);

                    let booking: Booking = diesel::insert_into(bookings::table)
                        .values(&NewBooking {
                            customer_id,
                            restaurant_id: form.restaurant_id,
                            booking_time,
                            guest_count,
                            deposit_amount: deposit.clone(),
                            total_amount: deposit.clone(),
                            status: BookingStatus::Pending.as_str().to_string(),
                            note: form.note.clone(),
                        })
                        .returning(bookings::all_columns)
                        .get_result(conn)
                        .await?;

                    allocation::replace_links(conn, booking.id, &tables).await?;

                    let dish_lines =
                        attach_dishes(conn, booking.id, form.dish_ids.as_deref()).await?;
                    let service_lines =
                        attach_services(conn, booking.id, form.service_ids.as_deref()).await?;

                    let mut total = pricing::compute_total(&deposit, &dish_lines, &service_lines)?;

                    if let Some(code) = form
                        .voucher_code
                        .as_deref()
                        .filter(|c| !c.trim().is_empty())
                    {
                        let validation =
                            voucher::validate(conn, code, form.restaurant_id, &total).await?;
                        if let Some(reason) = validation.reason {
                            return Err(BookingError::VoucherRejected(reason));
                        }

                        let applied = voucher::apply_to_booking(
                            conn,
                            &voucher::ApplyRequest {
                                code: code.to_string(),
                                restaurant_id: form.restaurant_id,
                                customer_id,
                                booking_id: booking.id,
                                order_amount: total.clone(),
                            },
                        )
                        .await?;

                        info!(
                            "voucher {} redeemed for booking {} (redemption {}, discount {})",
                            code, booking.id, applied.redemption_id, applied.discount_applied
                        );
                        total = pricing::apply_discount(&total, &applied.discount_applied);
                    }

                    let booking: Booking = diesel::update(bookings::table.find(booking.id))
                        .set((
                            bookings::total_amount.eq(total),
                            bookings::updated_at.eq(Utc::now()),
                        ))
                        .returning(bookings::all_columns)
                        .get_result(conn)
                        .await?;

                    Ok(booking)
                })
            })
            .await?;

        info!(
            "booking {} created for customer {} at {}",
            booking.id, customer_id, booking.booking_time
        );
        notify::best_effort(
            self.notifier.as_ref(),
            booking_event(&booking, BookingEventKind::Created),
        )
        .await;

        Ok(booking)
    }

    /// Customer-side edit. The caller must own the booking; the booking
    /// must still be mutable.
    pub async fn update(
        &self,
        booking_id: i32,
        form: BookingForm,
        customer_id: Uuid,
    ) -> Result<Booking, BookingError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let booking = conn
            .transaction::<_, BookingError, _>(|conn| {
                Box::pin(async move {
                    let booking = lock_booking(conn, booking_id).await?;
                    if booking.customer_id != customer_id {
                        return Err(BookingError::Forbidden(
                            "you can only edit your own bookings".to_string(),
                        ));
                    }
                    apply_update(conn, booking, &form).await
                })
            })
            .await?;

        Ok(booking)
    }

    /// Restaurant-side edit. The booking and the target restaurant must
    /// both belong to the owner; that is checked before anything else.
    pub async fn update_for_restaurant_owner(
        &self,
        booking_id: i32,
        form: BookingForm,
        owner_restaurant_ids: HashSet<i32>,
    ) -> Result<Booking, BookingError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let booking = conn
            .transaction::<_, BookingError, _>(|conn| {
                Box::pin(async move {
                    let booking = lock_booking(conn, booking_id).await?;

                    if owner_restaurant_ids.is_empty() {
                        return Err(BookingError::Forbidden(
                            "owner has no restaurants assigned".to_string(),
                        ));
                    }
                    if !owner_restaurant_ids.contains(&booking.restaurant_id) {
                        return Err(BookingError::Forbidden(
                            "you can only edit bookings for your own restaurant".to_string(),
                        ));
                    }
                    if !owner_restaurant_ids.contains(&form.restaurant_id) {
                        return Err(BookingError::Forbidden(
                            "cannot move booking to a restaurant you do not own".to_string(),
                        ));
                    }

                    apply_update(conn, booking, &form).await
                })
            })
            .await?;

        Ok(booking)
    }

    /// Cancels a booking and records who did it and why. The refund
    /// decision is made on the payment row read inside the transaction;
    /// the refund itself and the notifications go out after commit, so a
    /// gateway failure can surface without undoing the cancellation.
    pub async fn cancel(
        &self,
        booking_id: i32,
        actor: CancelActor,
        reason: String,
        bank_code: String,
        account_number: String,
    ) -> Result<Booking, BookingError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let tx_actor = actor.clone();
        let tx_reason = reason.clone();
        let (booking, payment) = conn
            .transaction::<_, BookingError, _>(|conn| {
                Box::pin(async move {
                    let booking = lock_booking(conn, booking_id).await?;

                    match &tx_actor {
                        CancelActor::Customer(id) => {
                            if booking.customer_id != *id {
                                return Err(BookingError::Forbidden(
                                    "you can only cancel your own bookings".to_string(),
                                ));
                            }
                        }
                        CancelActor::RestaurantOwner { restaurant_ids, .. } => {
                            if !restaurant_ids.contains(&booking.restaurant_id) {
                                return Err(BookingError::Forbidden(
                                    "you can only cancel bookings for your restaurant".to_string(),
                                ));
                            }
                        }
                    }

                    let from = booking.status()?;
                    if !from.can_transition_to(BookingStatus::Cancelled) {
                        return Err(BookingError::InvalidStatusTransition {
                            from,
                            to: BookingStatus::Cancelled,
                        });
                    }

                    let payment = payments::table
                        .filter(payments::booking_id.eq(booking.id))
                        .first::<Payment>(conn)
                        .await
                        .optional()?;

                    let now = Utc::now();
                    let booking: Booking = diesel::update(bookings::table.find(booking.id))
                        .set((
                            bookings::status.eq(BookingStatus::Cancelled.as_str()),
                            bookings::cancel_reason.eq(Some(tx_reason)),
                            bookings::cancelled_at.eq(Some(now)),
                            bookings::cancelled_by.eq(Some(tx_actor.user_id())),
                            bookings::updated_at.eq(now),
                        ))
                        .returning(bookings::all_columns)
                        .get_result(conn)
                        .await?;

                    Ok((booking, payment))
                })
            })
            .await?;

        info!("booking {} cancelled by {}", booking.id, actor.user_id());

        refund::dispatch_refund(
            self.refunds.as_ref(),
            payment.as_ref(),
            booking.id,
            &reason,
            &bank_code,
            &account_number,
        )
        .await?;

        notify::best_effort(
            self.notifier.as_ref(),
            booking_event(&booking, BookingEventKind::Cancelled),
        )
        .await;

        Ok(booking)
    }

    pub async fn confirm(&self, booking_id: i32) -> Result<Booking, BookingError> {
        self.update_status(booking_id, BookingStatus::Confirmed).await
    }

    pub async fn complete(&self, booking_id: i32) -> Result<Booking, BookingError> {
        self.update_status(booking_id, BookingStatus::Completed).await
    }

    /// Entry point for the no-show scheduler.
    pub async fn mark_no_show(&self, booking_id: i32) -> Result<Booking, BookingError> {
        self.update_status(booking_id, BookingStatus::NoShow).await
    }

    /// Generic status transition, validated against the state machine.
    pub async fn update_status(
        &self,
        booking_id: i32,
        new_status: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let booking = conn
            .transaction::<_, BookingError, _>(|conn| {
                Box::pin(async move {
                    let booking = lock_booking(conn, booking_id).await?;
                    let from = booking.status()?;
                    if !from.can_transition_to(new_status) {
                        return Err(BookingError::InvalidStatusTransition {
                            from,
                            to: new_status,
                        });
                    }

                    let now = Utc::now();
                    let booking: Booking = if new_status == BookingStatus::Cancelled {
                        diesel::update(bookings::table.find(booking.id))
                            .set((
                                bookings::status.eq(new_status.as_str()),
                                bookings::cancelled_at.eq(Some(now)),
                                bookings::updated_at.eq(now),
                            ))
                            .returning(bookings::all_columns)
                            .get_result(conn)
                            .await?
                    } else {
                        diesel::update(bookings::table.find(booking.id))
                            .set((
                                bookings::status.eq(new_status.as_str()),
                                bookings::updated_at.eq(now),
                            ))
                            .returning(bookings::all_columns)
                            .get_result(conn)
                            .await?
                    };

                    Ok(booking)
                })
            })
            .await?;

        info!("booking {} moved to {}", booking.id, new_status);
        if let Some(kind) = event_kind_for(new_status) {
            notify::best_effort(self.notifier.as_ref(), booking_event(&booking, kind)).await;
        }

        Ok(booking)
    }

    pub async fn find_booking(&self, booking_id: i32) -> Result<Booking, BookingError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        bookings::table
            .find(booking_id)
            .first::<Booking>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))
    }

    pub async fn bookings_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<Booking>, BookingError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        ensure_customer(&mut conn, customer_id).await?;
        let rows = bookings::table
            .filter(bookings::customer_id.eq(customer_id))
            .order(bookings::booking_time.desc())
            .load::<Booking>(&mut conn)
            .await?;
        Ok(rows)
    }

    pub async fn bookings_for_restaurant(
        &self,
        restaurant_id: i32,
    ) -> Result<Vec<Booking>, BookingError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        ensure_restaurant(&mut conn, restaurant_id).await?;
        let rows = bookings::table
            .filter(bookings::restaurant_id.eq(restaurant_id))
            .order(bookings::booking_time.desc())
            .load::<Booking>(&mut conn)
            .await?;
        Ok(rows)
    }

    pub async fn available_tables(
        &self,
        restaurant_id: i32,
        booking_time: DateTime<Utc>,
        guest_count: i32,
    ) -> Result<Vec<RestaurantTable>, BookingError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        ensure_restaurant(&mut conn, restaurant_id).await?;
        conflict::find_available_tables(&mut conn, restaurant_id, booking_time, guest_count).await
    }

    /// Advisory voucher check for UI feedback; side-effect free.
    pub async fn validate_voucher(
        &self,
        code: &str,
        restaurant_id: i32,
        order_amount: &BigDecimal,
    ) -> Result<VoucherValidation, BookingError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        voucher::validate(&mut conn, code, restaurant_id, order_amount).await
    }
}

/// Shared body of the two update entry points. Runs after the caller's
/// authorization checks, inside their transaction.
async fn apply_update(
    conn: &mut AsyncPgConnection,
    booking: Booking,
    form: &BookingForm,
) -> Result<Booking, BookingError> {
    let status = booking.status()?;
    if !status.is_mutable() {
        return Err(BookingError::Validation(format!(
            "booking {} cannot be edited in status {}",
            booking.id, status
        )));
    }

    let now = Utc::now();
    let booking_time = validate_booking_time(form.booking_time, now)?;
    let guest_count = validate_guest_count(form.guest_count)?;
    validate_deposit(form.deposit_amount.as_ref())?;

    if form.restaurant_id != booking.restaurant_id {
        ensure_restaurant(conn, form.restaurant_id).await?;
    }

    // Reassign tables only when the form names them; the new time still
    // has to clear the conflict check against whichever tables end up
    // linked, with the booking excluded from its own conflict set. A
    // conflict after the link rewrite rolls the whole transaction back.
    let tables = match form.table_ids.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            let ids = allocation::parse_table_ids(raw)?;
            allocation::allocate(conn, booking.id, &ids, guest_count).await?
        }
        _ => {
            let tables = linked_tables(conn, booking.id).await?;
            allocation::check_capacity(&tables, guest_count)?;
            tables
        }
    };

    conflict::ensure_tables_free(conn, &tables, booking_time, Some(booking.id)).await?;

    let dish_lines = match form.dish_ids.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            diesel::delete(
                booking_dishes::table.filter(booking_dishes::booking_id.eq(booking.id)),
            )
            .execute(conn)
            .await?;
            attach_dishes(conn, booking.id, Some(raw)).await?
        }
        _ => {
            booking_dishes::table
                .filter(booking_dishes::booking_id.eq(booking.id))
                .load::<BookingDish>(conn)
                .await?
        }
    };

    let service_lines = match form.service_ids.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            diesel::delete(
                booking_services::table.filter(booking_services::booking_id.eq(booking.id)),
            )
            .execute(conn)
            .await?;
            attach_services(conn, booking.id, Some(raw)).await?
        }
        _ => {
            booking_services::table
                .filter(booking_services::booking_id.eq(booking.id))
                .load::<BookingService>(conn)
                .await?
        }
    };

    let deposit = pricing::compute_deposit(form.deposit_amount.as_ref(), &tables);
    let total = pricing::compute_total(&deposit, &dish_lines, &service_lines)?;

    let updated: Booking = diesel::update(bookings::table.find(booking.id))
        .set((
            bookings::booking_time.eq(booking_time),
            bookings::guest_count.eq(guest_count),
            bookings::restaurant_id.eq(form.restaurant_id),
            bookings::note.eq(form.note.clone()),
            bookings::deposit_amount.eq(deposit),
            bookings::total_amount.eq(total),
            bookings::updated_at.eq(now),
        ))
        .returning(bookings::all_columns)
        .get_result(conn)
        .await?;

    info!("booking {} updated", updated.id);
    Ok(updated)
}

/// Dish selections arrive as `id:quantity` pairs in a comma list, e.g.
/// `"12:2,7:1"`. Any malformed token fails the whole request.
pub fn parse_dish_selections(raw: &str) -> Result<Vec<(i32, i32)>, BookingError> {
    raw.split(',')
        .map(|pair| {
            let pair = pair.trim();
            let bad = || BookingError::Validation(format!("invalid dish selection {pair:?}"));
            let (id_part, qty_part) = pair.split_once(':').ok_or_else(bad)?;
            let id = id_part
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(bad)?;
            let qty = qty_part
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(bad)?;
            Ok((id, qty))
        })
        .collect()
}

/// Service selections are a plain comma list of ids; each is booked once.
pub fn parse_service_selections(raw: &str) -> Result<Vec<i32>, BookingError> {
    raw.split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<i32>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| {
                    BookingError::Validation(format!("invalid service selection {token:?}"))
                })
        })
        .collect()
}

async fn attach_dishes(
    conn: &mut AsyncPgConnection,
    booking_id: i32,
    raw: Option<&str>,
) -> Result<Vec<BookingDish>, BookingError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    let selections = parse_dish_selections(raw)?;
    let mut lines = Vec::with_capacity(selections.len());
    for (dish_id, quantity) in selections {
        let dish = dishes::table
            .find(dish_id)
            .first::<Dish>(conn)
            .await
            .optional()?
            .ok_or_else(|| BookingError::NotFound(format!("dish {dish_id}")))?;

        // Snapshot the unit price so later catalog edits cannot reprice an
        // existing booking.
        let line: BookingDish = diesel::insert_into(booking_dishes::table)
            .values(&NewBookingDish {
                booking_id,
                dish_id,
                quantity,
                unit_price: dish.price.clone(),
            })
            .returning(booking_dishes::all_columns)
            .get_result(conn)
            .await?;
        lines.push(line);
    }
    Ok(lines)
}

async fn attach_services(
    conn: &mut AsyncPgConnection,
    booking_id: i32,
    raw: Option<&str>,
) -> Result<Vec<BookingService>, BookingError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    let selections = parse_service_selections(raw)?;
    let mut lines = Vec::with_capacity(selections.len());
    for service_id in selections {
        let service = services::table
            .find(service_id)
            .first::<ServiceItem>(conn)
            .await
            .optional()?
            .ok_or_else(|| BookingError::NotFound(format!("service {service_id}")))?;

        let line: BookingService = diesel::insert_into(booking_services::table)
            .values(&NewBookingService {
                booking_id,
                service_id,
                quantity: 1,
                unit_price: service.price.clone(),
            })
            .returning(booking_services::all_columns)
            .get_result(conn)
            .await?;
        lines.push(line);
    }
    Ok(lines)
}

async fn linked_tables(
    conn: &mut AsyncPgConnection,
    booking_id: i32,
) -> Result<Vec<RestaurantTable>, BookingError> {
    let ids: Vec<i32> = booking_tables::table
        .filter(booking_tables::booking_id.eq(booking_id))
        .select(booking_tables::table_id)
        .load(conn)
        .await?;
    allocation::resolve_tables_for_update(conn, &ids).await
}

async fn lock_booking(
    conn: &mut AsyncPgConnection,
    booking_id: i32,
) -> Result<Booking, BookingError> {
    bookings::table
        .find(booking_id)
        .for_update()
        .first::<Booking>(conn)
        .await
        .optional()?
        .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))
}

async fn ensure_customer(
    conn: &mut AsyncPgConnection,
    customer_id: Uuid,
) -> Result<Customer, BookingError> {
    customers::table
        .find(customer_id)
        .first::<Customer>(conn)
        .await
        .optional()?
        .ok_or_else(|| BookingError::NotFound(format!("customer {customer_id}")))
}

async fn ensure_restaurant(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
) -> Result<Restaurant, BookingError> {
    restaurants::table
        .find(restaurant_id)
        .first::<Restaurant>(conn)
        .await
        .optional()?
        .ok_or_else(|| BookingError::NotFound(format!("restaurant {restaurant_id}")))
}

fn pool_error<E: std::fmt::Display>(e: E) -> BookingError {
    BookingError::Pool(e.to_string())
}

fn booking_event(booking: &Booking, kind: BookingEventKind) -> BookingEvent {
    BookingEvent {
        booking_id: booking.id,
        customer_id: booking.customer_id,
        restaurant_id: booking.restaurant_id,
        kind,
        booking_time: booking.booking_time,
        guest_count: booking.guest_count,
        cancel_reason: booking.cancel_reason.clone(),
        occurred_at: Utc::now(),
    }
}

fn event_kind_for(status: BookingStatus) -> Option<BookingEventKind> {
    match status {
        BookingStatus::Pending => None,
        BookingStatus::Confirmed => Some(BookingEventKind::Confirmed),
        BookingStatus::Completed => Some(BookingEventKind::Completed),
        BookingStatus::Cancelled => Some(BookingEventKind::Cancelled),
        BookingStatus::NoShow => Some(BookingEventKind::NoShow),
    }
}

pub fn validate_booking_time(
    time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, BookingError> {
    let Some(time) = time else {
        return Err(BookingError::Validation(
            "booking time is required".to_string(),
        ));
    };

    if time < now {
        return Err(BookingError::Validation(
            "booking time cannot be in the past".to_string(),
        ));
    }
    if time < now + Duration::minutes(MIN_ADVANCE_MINUTES) {
        return Err(BookingError::Validation(format!(
            "booking time must be at least {MIN_ADVANCE_MINUTES} minutes ahead"
        )));
    }
    if time > now + Duration::days(MAX_ADVANCE_DAYS) {
        return Err(BookingError::Validation(format!(
            "booking time cannot be more than {MAX_ADVANCE_DAYS} days ahead"
        )));
    }

    Ok(time)
}

pub fn validate_guest_count(count: Option<i32>) -> Result<i32, BookingError> {
    let Some(count) = count else {
        return Err(BookingError::Validation(
            "guest count is required".to_string(),
        ));
    };

    if count < 1 {
        return Err(BookingError::Validation(
            "guest count must be greater than zero".to_string(),
        ));
    }
    if count > MAX_GUESTS {
        return Err(BookingError::Validation(format!(
            "guest count cannot exceed {MAX_GUESTS} guests"
        )));
    }

    Ok(count)
}

pub fn validate_deposit(amount: Option<&BigDecimal>) -> Result<(), BookingError> {
    if let Some(amount) = amount {
        if *amount < BigDecimal::from(0) {
            return Err(BookingError::Validation(
                "deposit amount cannot be negative".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    #[test]
    fn booking_time_is_required() {
        let err = validate_booking_time(None, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn booking_time_in_the_past_is_rejected() {
        let now = Utc::now();
        let err = validate_booking_time(Some(now - Duration::hours(1)), now).unwrap_err();
        assert!(err.to_string().contains("past"));
    }

    #[test]
    fn twenty_nine_minutes_ahead_is_too_soon() {
        let now = Utc::now();
        let err = validate_booking_time(Some(now + Duration::minutes(29)), now).unwrap_err();
        assert!(
            err.to_string().contains("at least 30 minutes"),
            "{err}"
        );
    }

    #[test]
    fn thirty_one_minutes_ahead_is_accepted() {
        let now = Utc::now();
        let time = now + Duration::minutes(31);
        assert_eq!(validate_booking_time(Some(time), now).unwrap(), time);
    }

    #[test]
    fn more_than_thirty_days_ahead_is_rejected() {
        let now = Utc::now();
        let err = validate_booking_time(
            Some(now + Duration::days(30) + Duration::minutes(1)),
            now,
        )
        .unwrap_err();
        assert!(err.to_string().contains("30 days"), "{err}");

        let edge = now + Duration::days(30);
        assert!(validate_booking_time(Some(edge), now).is_ok());
    }

    #[test]
    fn guest_count_bounds() {
        assert!(validate_guest_count(None).is_err());
        assert!(validate_guest_count(Some(0)).is_err());
        assert!(validate_guest_count(Some(-3)).is_err());
        assert!(validate_guest_count(Some(101)).is_err());
        assert_eq!(validate_guest_count(Some(1)).unwrap(), 1);
        assert_eq!(validate_guest_count(Some(100)).unwrap(), 100);
    }

    #[test]
    fn negative_deposit_is_rejected_but_zero_is_fine() {
        assert!(validate_deposit(Some(&dec("-1"))).is_err());
        assert!(validate_deposit(Some(&dec("0"))).is_ok());
        assert!(validate_deposit(None).is_ok());
    }

    #[test]
    fn dish_selections_parse_id_quantity_pairs() {
        assert_eq!(
            parse_dish_selections("1:2, 3:1 ,5:3").unwrap(),
            vec![(1, 2), (3, 1), (5, 3)]
        );
    }

    #[test]
    fn malformed_dish_tokens_fail_fast() {
        assert!(parse_dish_selections("1").is_err());
        assert!(parse_dish_selections("1:").is_err());
        assert!(parse_dish_selections(":2").is_err());
        assert!(parse_dish_selections("1:0").is_err());
        assert!(parse_dish_selections("1:2,bad").is_err());
        assert!(parse_dish_selections("a:b").is_err());
    }

    #[test]
    fn service_selections_parse_comma_lists() {
        assert_eq!(parse_service_selections("4, 5,6").unwrap(), vec![4, 5, 6]);
        assert!(parse_service_selections("4,,6").is_err());
        assert!(parse_service_selections("x").is_err());
        assert!(parse_service_selections("-2").is_err());
    }

    #[test]
    fn only_status_changes_emit_matching_events() {
        assert_eq!(event_kind_for(BookingStatus::Pending), None);
        assert_eq!(
            event_kind_for(BookingStatus::Confirmed),
            Some(BookingEventKind::Confirmed)
        );
        assert_eq!(
            event_kind_for(BookingStatus::NoShow),
            Some(BookingEventKind::NoShow)
        );
    }
}
