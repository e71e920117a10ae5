pub mod cli;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod payment;
pub mod report;
pub mod services;
pub mod types;
pub mod uploads;
