//! Esquema Diesel de los tres registros. Debe coincidir con `migrations/`.

diesel::table! {
    blueprints (id) {
        id -> BigInt,
        name -> Text,
        execution_table -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    steps (id) {
        id -> BigInt,
        blueprint_id -> BigInt,
        name -> Text,
        return_value -> Nullable<Integer>,
        position -> Integer,
    }
}

diesel::table! {
    jobs (id) {
        id -> Uuid,
        blueprint_id -> BigInt,
        current_execution_step -> Nullable<Integer>,
        state -> Text,
        data -> Jsonb,
        version -> BigInt,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(steps -> blueprints (blueprint_id));
diesel::joinable!(jobs -> blueprints (blueprint_id));

diesel::allow_tables_to_appear_in_same_query!(
    blueprints,
    steps,
    jobs,
);
