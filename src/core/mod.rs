pub mod domain;
pub mod port;
pub mod transactional;
pub mod use_case;
