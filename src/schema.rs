// Kept in sync with `db::SCHEMA_SQL`.

diesel::table! {
    agents (id) {
        id -> Text,
        name -> Text,
        role -> Text,
        system_prompt -> Text,
        model -> Text,
        capabilities -> Text,
        functions -> Text,
        created_date -> Text,
    }
}

diesel::table! {
    tasks (id) {
        id -> Text,
        title -> Text,
        description -> Text,
        status -> Text,
        result -> Nullable<Text>,
        agent_id -> Text,
        parent_task_id -> Nullable<Text>,
        output_format -> Text,
        created_date -> Text,
        updated_date -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(agents, tasks,);
