use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use shared::*;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: i32,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct RestaurantTable {
    pub id: i32,
    pub restaurant_id: i32,
    pub name: String,
    pub capacity: i32,
    pub deposit_amount: Option<BigDecimal>,
    pub status: String,
}

impl RestaurantTable {
    pub fn status(&self) -> Result<TableStatus, BookingError> {
        TableStatus::parse(&self.status).ok_or_else(|| {
            BookingError::Validation(format!(
                "table {} carries unrecognized status {:?}",
                self.id, self.status
            ))
        })
    }
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct Booking {
    pub id: i32,
    pub customer_id: Uuid,
    pub restaurant_id: i32,
    pub booking_time: DateTime<Utc>,
    pub guest_count: i32,
    pub deposit_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub status: String,
    pub note: Option<String>,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn status(&self) -> Result<BookingStatus, BookingError> {
        BookingStatus::parse(&self.status).ok_or_else(|| {
            BookingError::Validation(format!(
                "booking {} carries unrecognized status {:?}",
                self.id, self.status
            ))
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::bookings)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub restaurant_id: i32,
    pub booking_time: DateTime<Utc>,
    pub guest_count: i32,
    pub deposit_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub status: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::booking_tables)]
pub struct NewBookingTable {
    pub booking_id: i32,
    pub table_id: i32,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct Dish {
    pub id: i32,
    pub restaurant_id: i32,
    pub name: String,
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: i32,
    pub restaurant_id: i32,
    pub name: String,
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct BookingDish {
    pub id: i32,
    pub booking_id: i32,
    pub dish_id: i32,
    pub quantity: i32,
    pub unit_price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::booking_dishes)]
pub struct NewBookingDish {
    pub booking_id: i32,
    pub dish_id: i32,
    pub quantity: i32,
    pub unit_price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct BookingService {
    pub id: i32,
    pub booking_id: i32,
    pub service_id: i32,
    pub quantity: i32,
    pub unit_price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::booking_services)]
pub struct NewBookingService {
    pub booking_id: i32,
    pub service_id: i32,
    pub quantity: i32,
    pub unit_price: Option<BigDecimal>,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct Voucher {
    pub id: i32,
    pub code: String,
    pub discount_type: String,
    pub discount_value: BigDecimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub global_usage_limit: Option<i32>,
    pub per_customer_limit: Option<i32>,
    pub min_order_amount: Option<BigDecimal>,
    pub max_discount_amount: Option<BigDecimal>,
    pub restaurant_id: Option<i32>,
}

impl Voucher {
    pub fn discount_type(&self) -> Result<DiscountType, BookingError> {
        DiscountType::parse(&self.discount_type).ok_or_else(|| {
            BookingError::Validation(format!(
                "voucher {} carries unrecognized discount type {:?}",
                self.id, self.discount_type
            ))
        })
    }
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct VoucherRedemption {
    pub id: i32,
    pub voucher_id: i32,
    pub customer_id: Uuid,
    pub booking_id: i32,
    pub discount_applied: BigDecimal,
    pub redeemed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::voucher_redemptions)]
pub struct NewVoucherRedemption {
    pub voucher_id: i32,
    pub customer_id: Uuid,
    pub booking_id: i32,
    pub discount_applied: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
pub struct Payment {
    pub id: i32,
    pub booking_id: i32,
    pub status: String,
    pub amount: BigDecimal,
}

impl Payment {
    pub fn status(&self) -> Result<PaymentStatus, BookingError> {
        PaymentStatus::parse(&self.status).ok_or_else(|| {
            BookingError::Validation(format!(
                "payment {} carries unrecognized status {:?}",
                self.id, self.status
            ))
        })
    }
}
