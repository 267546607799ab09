//! Diesel table definitions for the ledger schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate them with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered users. Written by registration, read by the ledger.
    users (id) {
        id -> Uuid,
        username -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Stations that have received at least one price report.
    stations (id) {
        id -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Branch markers: `(station, fuel type, payment method)` triples that
    /// have been reported at least once.
    station_branches (station_id, fuel_type, payment_method) {
        station_id -> Varchar,
        fuel_type -> Varchar,
        payment_method -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Price observations. The correlation id is the primary key, so no two
    /// entries can share one.
    price_entries (correlation_id) {
        correlation_id -> Uuid,
        /// Append order within the whole ledger.
        seq -> Int8,
        station_id -> Varchar,
        fuel_type -> Varchar,
        payment_method -> Varchar,
        price -> Text,
        reported_by -> Uuid,
        reported_at -> Timestamptz,
        /// Ledger clock reading at insert; the audit ages entries by it.
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    /// Bookmarked stations, unique per `(user_id, station_id)`.
    favorites (user_id, station_id) {
        user_id -> Uuid,
        station_id -> Varchar,
        seq -> Int8,
        station_name -> Text,
        station_address -> Text,
        added_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-user append-only activity log.
    activity_log (seq) {
        /// Insertion order; breaks timestamp ties.
        seq -> Int8,
        user_id -> Uuid,
        kind -> Varchar,
        station_id -> Varchar,
        station_name -> Text,
        station_address -> Text,
        occurred_at -> Timestamptz,
        correlation_id -> Nullable<Uuid>,
        fuel_type -> Nullable<Varchar>,
        payment_method -> Nullable<Varchar>,
        price -> Nullable<Text>,
    }
}

diesel::joinable!(station_branches -> stations (station_id));
diesel::joinable!(favorites -> users (user_id));
diesel::joinable!(activity_log -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    stations,
    station_branches,
    price_entries,
    favorites,
    activity_log,
);
