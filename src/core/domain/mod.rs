pub mod command;
pub mod data_source;
pub mod entity;
pub mod propagation;
pub mod transaction;
