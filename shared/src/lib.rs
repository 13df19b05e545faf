use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Booking lifecycle states. Stored in the database as the
/// SCREAMING_SNAKE_CASE string returned by [`BookingStatus::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "COMPLETED" => Some(BookingStatus::Completed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "NO_SHOW" => Some(BookingStatus::NoShow),
            _ => None,
        }
    }

    /// The booking state machine. Everything not listed here is an
    /// invalid transition.
    pub fn can_transition_to(self, to: BookingStatus) -> bool {
        match self {
            BookingStatus::Pending => {
                matches!(to, BookingStatus::Confirmed | BookingStatus::Cancelled)
            }
            BookingStatus::Confirmed => matches!(
                to,
                BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
            ),
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow => false,
        }
    }

    /// Whether the booking may still be edited by customers or owners.
    pub fn is_mutable(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical table states. Owned by the table-status scheduler; the
/// booking engine only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    Available,
    Reserved,
    Occupied,
    Cleaning,
    Maintenance,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "AVAILABLE",
            TableStatus::Reserved => "RESERVED",
            TableStatus::Occupied => "OCCUPIED",
            TableStatus::Cleaning => "CLEANING",
            TableStatus::Maintenance => "MAINTENANCE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(TableStatus::Available),
            "RESERVED" => Some(TableStatus::Reserved),
            "OCCUPIED" => Some(TableStatus::Occupied),
            "CLEANING" => Some(TableStatus::Cleaning),
            "MAINTENANCE" => Some(TableStatus::Maintenance),
            _ => None,
        }
    }

    /// OCCUPIED and MAINTENANCE tables cannot take new bookings at all;
    /// RESERVED is not blocked here because the schedule-overlap check is
    /// the authority for future slots.
    pub fn blocks_booking(self) -> bool {
        matches!(self, TableStatus::Occupied | TableStatus::Maintenance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            "CANCELLED" => Some(PaymentStatus::Cancelled),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherStatus {
    Active,
    Inactive,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Active => "ACTIVE",
            VoucherStatus::Inactive => "INACTIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(VoucherStatus::Active),
            "INACTIVE" => Some(VoucherStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "PERCENTAGE",
            DiscountType::Fixed => "FIXED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PERCENTAGE" => Some(DiscountType::Percentage),
            "FIXED" => Some(DiscountType::Fixed),
            _ => None,
        }
    }
}

/// Machine-readable tag carried by a booking conflict rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    TableOccupied,
    TimeOverlap,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::TableOccupied => f.write_str("TABLE_OCCUPIED"),
            ConflictKind::TimeOverlap => f.write_str("TIME_OVERLAP"),
        }
    }
}

/// Rejection reasons reported by voucher validation and application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherReason {
    EmptyCode,
    NotFound,
    Inactive,
    Expired,
    RestaurantScopeMismatch,
    MinOrderNotMet,
    GlobalLimitReached,
    PerCustomerLimitReached,
}

impl fmt::Display for VoucherReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VoucherReason::EmptyCode => "EMPTY_CODE",
            VoucherReason::NotFound => "NOT_FOUND",
            VoucherReason::Inactive => "INACTIVE",
            VoucherReason::Expired => "EXPIRED",
            VoucherReason::RestaurantScopeMismatch => "RESTAURANT_SCOPE_MISMATCH",
            VoucherReason::MinOrderNotMet => "MIN_ORDER_NOT_MET",
            VoucherReason::GlobalLimitReached => "GLOBAL_LIMIT_REACHED",
            VoucherReason::PerCustomerLimitReached => "PER_CUSTOMER_LIMIT_REACHED",
        };
        f.write_str(s)
    }
}

/// Domain error taxonomy for the booking engine. Validation, not-found
/// and conflict errors surface to the caller unchanged; infrastructure
/// failures around notifications are handled at the side-effect seam and
/// never appear here.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("booking conflict ({kind}): {detail}")]
    Conflict { kind: ConflictKind, detail: String },

    #[error("guest count ({guests}) exceeds the combined capacity of the selected tables ({capacity})")]
    CapacityExceeded { guests: i32, capacity: i32 },

    #[error("invalid table id format: {0:?}")]
    InvalidIdFormat(String),

    #[error("voucher rejected: {0}")]
    VoucherRejected(VoucherReason),

    #[error("catalog item {0} has no unit price")]
    CorruptCatalogPrice(i32),

    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("refund gateway failure: {0}")]
    RefundFailed(String),

    #[error(transparent)]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),
}

/// Incoming booking request payload, shared by create and update. Table,
/// dish and service selections arrive as the raw strings the web forms
/// submit: a comma list of table ids, `id:quantity` comma pairs for
/// dishes, a plain comma list for services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingForm {
    pub restaurant_id: i32,
    pub booking_time: Option<DateTime<Utc>>,
    pub guest_count: Option<i32>,
    pub deposit_amount: Option<BigDecimal>,
    pub table_ids: Option<String>,
    pub dish_ids: Option<String>,
    pub service_ids: Option<String>,
    pub voucher_code: Option<String>,
    pub note: Option<String>,
}

/// Who is asking for a cancellation. Restaurant-side cancellations carry
/// the set of restaurant ids the owner controls.
#[derive(Debug, Clone)]
pub enum CancelActor {
    Customer(Uuid),
    RestaurantOwner {
        user_id: Uuid,
        restaurant_ids: HashSet<i32>,
    },
}

impl CancelActor {
    pub fn user_id(&self) -> Uuid {
        match self {
            CancelActor::Customer(id) => *id,
            CancelActor::RestaurantOwner { user_id, .. } => *user_id,
        }
    }
}

/// Read-only voucher eligibility report. Safe to compute repeatedly; the
/// usage limits are deliberately absent because they can only be judged
/// under the row lock taken by the apply phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherValidation {
    pub valid: bool,
    pub reason: Option<VoucherReason>,
    pub calculated_discount: Option<BigDecimal>,
}

impl VoucherValidation {
    pub fn rejected(reason: VoucherReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            calculated_discount: None,
        }
    }

    pub fn accepted(discount: BigDecimal) -> Self {
        Self {
            valid: true,
            reason: None,
            calculated_discount: Some(discount),
        }
    }
}

/// Result of a committed voucher redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherApplication {
    pub redemption_id: i32,
    pub discount_applied: BigDecimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEventKind {
    Created,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

/// Event published to the notification topic after a lifecycle operation
/// commits. Delivery is best-effort; consumers fan it out to customers
/// and restaurant staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    pub booking_id: i32,
    pub customer_id: Uuid,
    pub restaurant_id: i32,
    pub kind: BookingEventKind,
    pub booking_time: DateTime<Utc>,
    pub guest_count: i32,
    pub cancel_reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Manual-transfer refund instruction handed to the refund gateway when
/// a booking with a completed payment is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundCommand {
    pub payment_id: i32,
    pub booking_id: i32,
    pub amount: BigDecimal,
    pub reason: String,
    pub bank_code: String,
    pub account_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_only_confirm_or_cancel() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Completed));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::NoShow));
    }

    #[test]
    fn confirmed_can_complete_cancel_or_no_show() {
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Completed));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::NoShow));
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Pending));
    }

    #[test]
    fn terminal_states_are_frozen() {
        for terminal in [
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ] {
            for to in [
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                BookingStatus::Completed,
                BookingStatus::Cancelled,
                BookingStatus::NoShow,
            ] {
                assert!(!terminal.can_transition_to(to), "{terminal} -> {to} must fail");
            }
        }
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("DELETED"), None);
    }

    #[test]
    fn occupied_and_maintenance_block_bookings() {
        assert!(TableStatus::Occupied.blocks_booking());
        assert!(TableStatus::Maintenance.blocks_booking());
        assert!(!TableStatus::Available.blocks_booking());
        assert!(!TableStatus::Reserved.blocks_booking());
        assert!(!TableStatus::Cleaning.blocks_booking());
    }
}
