pub mod cli;
pub mod config;
pub mod database;
pub mod models;
pub mod pipeline;
pub mod services;

pub use models::Result;
