use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{Column as _, ColumnIndex, Decode, Row, Type, TypeInfo as _};
use tracing::{debug, error, info};

use crate::libs::dialect::Dialect;
use crate::libs::error::{Error, Result};
use crate::libs::frame::{Cell, Frame};
use crate::libs::query_builder::CreateTableQuery;
use crate::libs::schema::{TableOptions, TableSchema};

/// Execution surface shared by the SQLite and PostgreSQL adapters.
///
/// Every method awaits one engine round trip (or one transaction) before
/// returning; a handle is meant for a single writer.
#[async_trait]
pub trait Database: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn namespace(&self) -> Option<&str> {
        None
    }

    /// Run one statement and commit it. Returns the affected row count.
    async fn execute(&self, sql: &str) -> Result<u64>;

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Vec<Cell>>>;

    /// Insert every row of `frame` into `table` as one batch. Returns the
    /// number of rows the engine actually stored.
    async fn insert_data(&self, frame: &Frame, table: &str) -> Result<u64>;

    /// Infer a schema from `frame` and create `table` if it does not exist.
    async fn create_table(&self, frame: &Frame, table: &str, options: &TableOptions) -> Result<()> {
        let schema = TableSchema::describe(frame, table, options)?;
        let sql = CreateTableQuery::new(&schema, self.dialect())
            .namespace(self.namespace())
            .build_sql()?;
        debug!(dialect = %self.dialect(), %sql, "create table");
        self.execute(&sql).await?;
        info!("Table made for: {}", table);
        Ok(())
    }
}

/// Decode a result row column by column, trying each cell type in turn.
pub(crate) fn decode_row<R>(row: &R, sql: &str) -> Result<Vec<Cell>>
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> bool: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
{
    (0..row.len())
        .map(|i| decode_cell(row, i).ok_or_else(|| undecodable(row, i, sql)))
        .collect()
}

pub(crate) fn decode_cell<R>(row: &R, i: usize) -> Option<Cell>
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> bool: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return Some(v.into());
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
        return Some(v.map(i64::from).into());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return Some(v.into());
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(i) {
        return Some(v.map(f64::from).into());
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return Some(v.into());
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return Some(v.into());
    }
    row.try_get::<Option<NaiveDateTime>, _>(i).ok().map(Cell::from)
}

/// Error for a result column no [`Cell`] variant can hold.
pub(crate) fn undecodable<R>(row: &R, i: usize, sql: &str) -> Error
where
    R: Row,
    usize: ColumnIndex<R>,
{
    let type_name = row.column(i).type_info().name().to_string();
    error!("cannot decode column {} of type {}", i, type_name);
    Error::Execution {
        statement: sql.to_string(),
        source: sqlx::Error::ColumnDecode {
            index: i.to_string(),
            source: format!("no cell type holds {type_name}").into(),
        },
    }
}
