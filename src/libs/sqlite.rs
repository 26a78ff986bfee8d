use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::query_builder::Separated;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, error, info, warn};

use crate::libs::config::SqliteConfig;
use crate::libs::database::{decode_row, Database};
use crate::libs::dialect::Dialect;
use crate::libs::error::{Error, Result};
use crate::libs::frame::{Cell, Column, Frame, SourceTag};
use crate::libs::query_builder::InsertQuery;
use crate::libs::schema::check_identifier;

/// Handle on a SQLite database file.
///
/// Bulk inserts use `INSERT OR IGNORE`: rows that break a uniqueness
/// constraint are skipped and the rest of the batch is kept. Timestamps are
/// stored as epoch seconds.
pub struct SqliteDb {
    config: SqliteConfig,
    location: String,
    pool: SqlitePool,
}

impl SqliteDb {
    pub async fn connect(config: SqliteConfig) -> Result<Self> {
        let (location, options) = if config.is_memory() {
            (SqliteConfig::MEMORY.to_string(), SqliteConnectOptions::from_str("sqlite::memory:"))
        } else {
            let path = config.file_path().map_err(|e| Error::Connection {
                target: config.dbname.clone(),
                fatal: false,
                source: sqlx::Error::Io(e),
            })?;
            let options = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true);
            (path.display().to_string(), Ok(options))
        };

        // One connection, never recycled, so an in-memory database lives
        // exactly as long as this handle.
        let connected = match options {
            Ok(options) => {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
            }
            Err(e) => Err(e),
        };
        let pool = connected.map_err(|source| {
            error!("Cannot connect to database. Error triggered: {}", source);
            Error::Connection {
                target: location.clone(),
                fatal: false,
                source,
            }
        })?;

        info!("Database is set up for: {}", config.dbname);
        Ok(Self {
            config,
            location,
            pool,
        })
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
        info!("Database has been closed.");
    }
}

impl fmt::Display for SqliteDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DBName: {} - found at: {}", self.config.dbname, self.location)
    }
}

#[async_trait]
impl Database for SqliteDb {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        match sqlx::query(sql).execute(&self.pool).await {
            Ok(done) => Ok(done.rows_affected()),
            Err(source) => {
                error!("Error: {}", source);
                Err(Error::Execution {
                    statement: sql.to_string(),
                    source,
                })
            }
        }
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Vec<Cell>>> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| {
                error!("Error: {}", source);
                Error::Execution {
                    statement: sql.to_string(),
                    source,
                }
            })?;
        rows.iter().map(|row| decode_row(row, sql)).collect()
    }

    async fn insert_data(&self, frame: &Frame, table: &str) -> Result<u64> {
        check_identifier(table)?;
        let columns = frame.column_names();
        for column in &columns {
            check_identifier(column)?;
        }
        if frame.width() == 0 || frame.is_empty() {
            return Ok(0);
        }

        let head = InsertQuery::new(table, columns, Dialect::Sqlite).head()?;
        let tags: Vec<SourceTag> = frame.columns().iter().map(Column::tag).collect();
        let rows: Vec<Vec<&Cell>> = frame.rows().collect();
        let per_statement = Dialect::Sqlite.rows_per_statement(frame.width());
        debug!(sql = %head, rows = rows.len(), per_statement, "bulk insert");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|source| Error::from_insert(table, &head, source))?;
        let mut inserted = 0;
        for chunk in rows.chunks(per_statement) {
            let mut builder = QueryBuilder::<Sqlite>::new(head.as_str());
            builder.push_values(chunk, |mut values, row| {
                for (cell, tag) in row.iter().zip(&tags) {
                    bind_cell(&mut values, *cell, *tag);
                }
            });
            let result = builder.build().execute(&mut *tx).await;
            match result {
                Ok(done) => inserted += done.rows_affected(),
                Err(source) => {
                    // The failed statement is undone by the engine; earlier
                    // chunks stay.
                    error!("{}", source);
                    tx.commit()
                        .await
                        .map_err(|source| Error::from_insert(table, &head, source))?;
                    return Err(Error::from_insert(table, &head, source));
                }
            }
        }
        tx.commit()
            .await
            .map_err(|source| Error::from_insert(table, &head, source))?;

        let skipped = frame.len() as u64 - inserted;
        if skipped > 0 {
            warn!(skipped, "rows ignored by constraints on {}", table);
        }
        info!("Done data insert into {}", table);
        Ok(inserted)
    }
}

fn bind_cell<'args>(
    values: &mut Separated<'_, 'args, Sqlite, &'static str>,
    cell: &'args Cell,
    tag: SourceTag,
) {
    match cell {
        Cell::Int(v) => values.push_bind(*v),
        Cell::Float(v) => values.push_bind(*v),
        Cell::Text(s) => values.push_bind(s.as_str()),
        Cell::Timestamp(ts) => values.push_bind(epoch_seconds(ts)),
        Cell::Bool(b) => values.push_bind(*b),
        Cell::Null => match tag {
            SourceTag::Integer | SourceTag::Temporal => values.push_bind(None::<i64>),
            SourceTag::Float => values.push_bind(None::<f64>),
            SourceTag::Text => values.push_bind(None::<String>),
            SourceTag::Other => values.push_bind(None::<bool>),
        },
    };
}

fn epoch_seconds(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}
