// HTTP module - reqwest transport to the management API
pub mod client;

pub use client::{http_transport_factory, HttpTransport};
