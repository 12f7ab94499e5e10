pub mod posts_db_operations;
pub mod settings_db_operations;
pub mod users_db_operations;
