use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{debug, error, info};

use crate::libs::config::PostgresConfig;
use crate::libs::database::{decode_cell, undecodable, Database};
use crate::libs::dialect::Dialect;
use crate::libs::error::{Error, Result};
use crate::libs::frame::{Cell, Column, Frame, SourceTag};
use crate::libs::query_builder::InsertQuery;
use crate::libs::schema::check_identifier;

/// Every statement runs in its own transaction and is rolled back on
/// failure. A bulk insert is all-or-nothing.
pub struct PostgresDb {
    config: PostgresConfig,
    pool: PgPool,
    schema: Option<String>,
}

impl PostgresDb {
    /// A refused connection is returned as a fatal [`Error::Connection`];
    /// callers are expected to stop rather than retry.
    pub async fn connect(config: PostgresConfig) -> Result<Self> {
        info!("Connecting to the PostgreSQL database...");
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect_with(options)
            .await
            .map_err(|source| {
                error!("Unable to connect to database: {}", source);
                Error::Connection {
                    target: config.target(),
                    fatal: true,
                    source,
                }
            })?;

        info!("Connection successful");
        Ok(Self {
            config,
            pool,
            schema: None,
        })
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Use `name` for every later table, creating the schema when the
    /// server does not list it yet.
    pub async fn ensure_schema(&mut self, name: &str) -> Result<()> {
        check_identifier(name)?;
        let sql = "SELECT schema_name::text FROM information_schema.schemata";
        let existing: Vec<String> = sqlx::query_scalar(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| Error::Execution {
                statement: sql.to_string(),
                source,
            })?;

        if existing.iter().any(|s| s == &name.to_lowercase()) {
            info!("{} is set.", name);
        } else {
            self.execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", name))
                .await?;
            info!("{} is created.", name);
        }
        self.schema = Some(name.to_string());
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
        info!("Database has been closed.");
    }
}

impl fmt::Display for PostgresDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.config, f)
    }
}

#[async_trait]
impl Database for PostgresDb {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn namespace(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let failed = |source: sqlx::Error| {
            error!("Error: {}", source);
            Error::Execution {
                statement: sql.to_string(),
                source,
            }
        };

        let mut tx = self.pool.begin().await.map_err(failed)?;
        match sqlx::query(sql).execute(&mut *tx).await {
            Ok(done) => {
                tx.commit().await.map_err(failed)?;
                Ok(done.rows_affected())
            }
            Err(source) => {
                if let Err(e) = tx.rollback().await {
                    error!("rollback failed: {}", e);
                }
                Err(failed(source))
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
        rows.iter().map(|row| decode_pg_row(row, sql)).collect()
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

        let head = InsertQuery::new(table, columns, Dialect::Postgres)
            .namespace(self.namespace())
            .head()?;
        let tags: Vec<SourceTag> = frame.columns().iter().map(Column::tag).collect();
        let rows: Vec<Vec<&Cell>> = frame.rows().collect();
        let per_statement = Dialect::Postgres.rows_per_statement(frame.width());
        debug!(sql = %head, rows = rows.len(), per_statement, "bulk insert");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|source| Error::from_insert(table, &head, source))?;
        let mut inserted = 0;
        for chunk in rows.chunks(per_statement) {
            let mut builder = QueryBuilder::<Postgres>::new(head.as_str());
            builder.push_values(chunk, |mut values, row| {
                for (cell, tag) in row.iter().zip(&tags) {
                    bind_cell(&mut values, *cell, *tag);
                }
            });
            let result = builder.build().execute(&mut *tx).await;
            match result {
                Ok(done) => inserted += done.rows_affected(),
                Err(source) => {
                    error!("Error: {}", source);
                    if let Err(e) = tx.rollback().await {
                        error!("rollback failed: {}", e);
                    }
                    return Err(Error::from_insert(table, &head, source));
                }
            }
        }
        tx.commit()
            .await
            .map_err(|source| Error::from_insert(table, &head, source))?;

        info!("Done data insert into {}", table);
        Ok(inserted)
    }
}

// Nulls carry the column's type; the server rejects an int8 null bound to a
// text column.
fn bind_cell<'args>(
    values: &mut Separated<'_, 'args, Postgres, &'static str>,
    cell: &'args Cell,
    tag: SourceTag,
) {
    match cell {
        Cell::Int(v) => values.push_bind(*v),
        Cell::Float(v) => values.push_bind(*v),
        Cell::Text(s) => values.push_bind(s.as_str()),
        Cell::Timestamp(ts) => values.push_bind(*ts),
        Cell::Bool(b) => values.push_bind(*b),
        Cell::Null => match tag {
            SourceTag::Integer => values.push_bind(None::<i64>),
            SourceTag::Float => values.push_bind(None::<f64>),
            SourceTag::Text => values.push_bind(None::<String>),
            SourceTag::Temporal => values.push_bind(None::<chrono::NaiveDateTime>),
            SourceTag::Other => values.push_bind(None::<bool>),
        },
    };
}

// Integer columns are NUMERIC here, so decimals are tried before the shared
// ladder.
fn decode_pg_row(row: &PgRow, sql: &str) -> Result<Vec<Cell>> {
    (0..row.len())
        .map(|i| {
            if let Ok(v) = row.try_get::<Option<BigDecimal>, _>(i) {
                return Ok(v.map_or(Cell::Null, |d| decimal_cell(&d)));
            }
            decode_cell(row, i).ok_or_else(|| undecodable(row, i, sql))
        })
        .collect()
}

fn decimal_cell(value: &BigDecimal) -> Cell {
    if value.with_scale(0) == *value {
        if let Some(i) = value.to_i64() {
            return Cell::Int(i);
        }
    }
    value.to_f64().map_or(Cell::Null, Cell::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn numeric_values_become_ints_or_floats() {
        let cell = |s: &str| decimal_cell(&BigDecimal::from_str(s).unwrap());
        assert_eq!(cell("42"), Cell::Int(42));
        assert_eq!(cell("-7.000"), Cell::Int(-7));
        assert_eq!(cell("2.5"), Cell::Float(2.5));
        assert_eq!(cell("100000000000000000000"), Cell::Float(1e20));
    }
}
