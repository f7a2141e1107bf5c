pub mod command;
pub mod data_source;
pub mod sqlx_transaction;
