pub mod create_user_web_input;
pub mod created_user_web_output;
