// Domain module - configuration, errors and API data types
pub mod config;
pub mod error;
pub mod model;
