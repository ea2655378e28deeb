//! Command implementations.

pub mod catalog;
pub mod config;
pub mod query;

pub use self::catalog::execute_catalog;
pub use self::config::execute_config;
pub use self::query::execute_query;
