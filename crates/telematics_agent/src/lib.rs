pub mod auth;
pub mod config;
pub mod http;
pub mod mqtt;
pub mod obd;
pub mod scheduler;
pub mod tasks;
