pub mod api;
pub mod config;
pub mod report;
pub mod store;
