//! Diesel table definitions mirroring `migrations/`.

diesel::table! {
    /// Last persisted availability per route.
    flights (from_destination_id, to_destination_id) {
        from_destination_id -> Int8,
        to_destination_id -> Int8,
        dates -> Array<Text>,
        hash_of_dates -> Text,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Chat subscriptions, unique per chat and route.
    subscriptions (chat_id, from_destination_id, to_destination_id) {
        chat_id -> Int8,
        from_destination_id -> Int8,
        to_destination_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(flights, subscriptions);
