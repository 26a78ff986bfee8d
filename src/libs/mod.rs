pub mod clean;
pub mod config;
pub mod database;
pub mod dialect;
pub mod error;
pub mod frame;
pub mod postgres;
pub mod query_builder;
pub mod schema;
pub mod sqlite;

// Re-export them for easier access from callers
pub use clean::*;
pub use config::*;
pub use database::*;
pub use dialect::*;
pub use error::*;
pub use frame::*;
pub use postgres::*;
pub use query_builder::*;
pub use schema::*;
pub use sqlite::*;
