diesel::table! {
    inventories (id) {
        id -> Uuid,
        #[max_length = 256]
        name -> Varchar,
        description -> Nullable<Text>,
        price -> Numeric,
        quantity -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    orders (id) {
        id -> Uuid,
        #[max_length = 320]
        email -> Varchar,
        #[max_length = 16]
        status -> Varchar,
        order_lines -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    inventories,
    orders,
);
