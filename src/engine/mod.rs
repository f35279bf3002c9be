//! From raw arguments to a performed command: binding, context building,
//! execution and help generation.

pub mod binder;
pub mod builder;
pub mod context;
pub mod executor;
pub mod generator;
pub mod http;
pub mod loader;
pub mod plugin_executor;
