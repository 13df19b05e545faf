diesel::table! {
    customers (id) {
        id -> Uuid,
        full_name -> Varchar,
        email -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    restaurants (id) {
        id -> Int4,
        owner_id -> Uuid,
        name -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    restaurant_tables (id) {
        id -> Int4,
        restaurant_id -> Int4,
        name -> Varchar,
        capacity -> Int4,
        deposit_amount -> Nullable<Numeric>,
        status -> Varchar,
    }
}

diesel::table! {
    bookings (id) {
        id -> Int4,
        customer_id -> Uuid,
        restaurant_id -> Int4,
        booking_time -> Timestamptz,
        guest_count -> Int4,
        deposit_amount -> Numeric,
        total_amount -> Numeric,
        status -> Varchar,
        note -> Nullable<Text>,
        cancel_reason -> Nullable<Text>,
        cancelled_at -> Nullable<Timestamptz>,
        cancelled_by -> Nullable<Uuid>,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    booking_tables (id) {
        id -> Int4,
        booking_id -> Int4,
        table_id -> Int4,
    }
}

diesel::table! {
    dishes (id) {
        id -> Int4,
        restaurant_id -> Int4,
        name -> Varchar,
        price -> Nullable<Numeric>,
    }
}

diesel::table! {
    services (id) {
        id -> Int4,
        restaurant_id -> Int4,
        name -> Varchar,
        price -> Nullable<Numeric>,
    }
}

diesel::table! {
    booking_dishes (id) {
        id -> Int4,
        booking_id -> Int4,
        dish_id -> Int4,
        quantity -> Int4,
        unit_price -> Nullable<Numeric>,
    }
}

diesel::table! {
    booking_services (id) {
        id -> Int4,
        booking_id -> Int4,
        service_id -> Int4,
        quantity -> Int4,
        unit_price -> Nullable<Numeric>,
    }
}

diesel::table! {
    vouchers (id) {
        id -> Int4,
        code -> Varchar,
        discount_type -> Varchar,
        discount_value -> Numeric,
        start_date -> Date,
        end_date -> Date,
        status -> Varchar,
        global_usage_limit -> Nullable<Int4>,
        per_customer_limit -> Nullable<Int4>,
        min_order_amount -> Nullable<Numeric>,
        max_discount_amount -> Nullable<Numeric>,
        restaurant_id -> Nullable<Int4>,
    }
}

diesel::table! {
    voucher_redemptions (id) {
        id -> Int4,
        voucher_id -> Int4,
        customer_id -> Uuid,
        booking_id -> Int4,
        discount_applied -> Numeric,
        redeemed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    payments (id) {
        id -> Int4,
        booking_id -> Int4,
        status -> Varchar,
        amount -> Numeric,
    }
}

diesel::joinable!(restaurant_tables -> restaurants (restaurant_id));
diesel::joinable!(bookings -> customers (customer_id));
diesel::joinable!(bookings -> restaurants (restaurant_id));
diesel::joinable!(booking_tables -> bookings (booking_id));
diesel::joinable!(booking_tables -> restaurant_tables (table_id));
diesel::joinable!(booking_dishes -> bookings (booking_id));
diesel::joinable!(booking_dishes -> dishes (dish_id));
diesel::joinable!(booking_services -> bookings (booking_id));
diesel::joinable!(booking_services -> services (service_id));
diesel::joinable!(voucher_redemptions -> vouchers (voucher_id));
diesel::joinable!(voucher_redemptions -> bookings (booking_id));
diesel::joinable!(payments -> bookings (booking_id));

diesel::allow_tables_to_appear_in_same_query!(
    customers,
    restaurants,
    restaurant_tables,
    bookings,
    booking_tables,
    dishes,
    services,
    booking_dishes,
    booking_services,
    vouchers,
    voucher_redemptions,
    payments,
);
