pub mod create_user;
pub mod delete_user;
