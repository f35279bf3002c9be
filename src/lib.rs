pub mod atomic;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod fs;
pub mod logging;
pub mod plugin;
pub mod spec;
pub mod suggestions;
pub mod utils;
