// Mirrors the DDL in `crate::vector_store::CREATE_TABLES`.

diesel::table! {
    collections (id) {
        id -> Integer,
        name -> Text,
        dimension -> Nullable<Integer>,
    }
}

diesel::table! {
    documents (seq_id) {
        seq_id -> Integer,
        collection_id -> Integer,
        doc_id -> Text,
        content -> Text,
        embedding -> Binary,
    }
}

diesel::joinable!(documents -> collections (collection_id));

diesel::allow_tables_to_appear_in_same_query!(collections, documents,);
