//! Create tables and bulk-load rows from typed tabular data into SQLite or
//! PostgreSQL.
//!
//! ```no_run
//! use sqlsetup::*;
//!
//! # async fn run() -> Result<()> {
//! let frame = Frame::new()
//!     .with_column(Column::infer("id", [1, 2, 3])?)?
//!     .with_column(Column::infer("name", ["a", "b", "c"])?)?;
//!
//! let db = SqliteDb::connect(SqliteConfig::new("people.db")).await?;
//! db.create_table(&frame, "people", &TableOptions::new().primary_key("id")).await?;
//! db.insert_data(&frame, "people").await?;
//! db.close().await;
//! # Ok(())
//! # }
//! ```

pub mod libs;

pub use libs::*;
