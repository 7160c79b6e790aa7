//! Handwritten Diesel schema declarations used by the row structs in `db::models`.
//!
//! Migrations under `migrations/` define the actual tables and constraints. This module
//! only provides `diesel::table!` declarations so rows can derive Insertable/Queryable
//! in a type-safe way without running `diesel print-schema`.

diesel::table! {
    households (id) {
        id -> BigInt,
        name -> Text,
        onboarding_completed -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

// Membership with the role reported by the identity provider
diesel::table! {
    household_members (household_id, user_id) {
        household_id -> BigInt,
        user_id -> BigInt,
        role -> Text,
        joined_at -> Timestamptz,
    }
}

diesel::table! {
    locations (id) {
        id -> BigInt,
        household_id -> BigInt,
        name -> Text,
        description -> Nullable<Text>,
        is_primary -> Bool,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    containers (id) {
        id -> BigInt,
        household_id -> BigInt,
        location_id -> BigInt,
        name -> Text,
        container_type -> Text,
        capacity_note -> Nullable<Text>,
        photo_url -> Nullable<Text>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    consumables (id) {
        id -> BigInt,
        household_id -> BigInt,
        location_id -> BigInt,
        container_id -> Nullable<BigInt>,
        name -> Text,
        brand -> Nullable<Text>,
        current_quantity -> Integer,
        reorder_threshold -> Integer,
        unit_cost -> Nullable<Double>,
        expiration_date -> Nullable<Date>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    non_consumables (id) {
        id -> BigInt,
        household_id -> BigInt,
        location_id -> BigInt,
        container_id -> Nullable<BigInt>,
        name -> Text,
        brand -> Nullable<Text>,
        model -> Nullable<Text>,
        serial_number -> Nullable<Text>,
        condition -> Nullable<Text>,
        purchase_date -> Nullable<Date>,
        purchase_price -> Nullable<Double>,
        warranty_expiration -> Nullable<Date>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

// Append-only; rows are never updated
diesel::table! {
    condition_logs (id) {
        id -> BigInt,
        household_id -> BigInt,
        item_id -> BigInt,
        rating -> Text,
        notes -> Nullable<Text>,
        maintenance -> Nullable<Text>,
        repair_cost -> Nullable<Double>,
        photo_urls -> Array<Text>,
        author_id -> BigInt,
        logged_at -> Timestamptz,
    }
}

// Append-only audit trail
diesel::table! {
    activity_log (id) {
        id -> BigInt,
        household_id -> BigInt,
        actor_id -> BigInt,
        activity_type -> Text,
        description -> Text,
        item_kind -> Nullable<Text>,
        item_id -> Nullable<BigInt>,
        metadata -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    shopping_lists (id) {
        id -> BigInt,
        household_id -> BigInt,
        name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    shopping_list_items (id) {
        id -> BigInt,
        household_id -> BigInt,
        list_id -> BigInt,
        name -> Text,
        quantity -> Integer,
        notes -> Nullable<Text>,
        purchased -> Bool,
        purchased_by -> Nullable<BigInt>,
        purchased_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    onboarding_progress (user_id) {
        user_id -> BigInt,
        current_step -> Integer,
        completed_steps -> Array<Integer>,
        data -> Jsonb,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(household_members -> households (household_id));
diesel::joinable!(locations -> households (household_id));
diesel::joinable!(containers -> locations (location_id));
diesel::joinable!(consumables -> locations (location_id));
diesel::joinable!(non_consumables -> locations (location_id));
diesel::joinable!(condition_logs -> non_consumables (item_id));
diesel::joinable!(activity_log -> households (household_id));
diesel::joinable!(shopping_lists -> households (household_id));
diesel::joinable!(shopping_list_items -> shopping_lists (list_id));

diesel::allow_tables_to_appear_in_same_query!(
    households,
    household_members,
    locations,
    containers,
    consumables,
    non_consumables,
    condition_logs,
    activity_log,
    shopping_lists,
    shopping_list_items,
    onboarding_progress,
);
