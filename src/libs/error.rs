use sqlx::error::ErrorKind;
use thiserror::Error;

use crate::libs::frame::SourceTag;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to connect to {target}: {source}")]
    Connection {
        target: String,
        /// The caller is expected to stop when this is set.
        fatal: bool,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("constraint violated while inserting into {table}: {source}")]
    ConstraintViolation {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("statement failed: {source}\n{statement}")]
    Execution {
        statement: String,
        #[source]
        source: sqlx::Error,
    },
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Connection { fatal: true, .. })
    }

    /// Sorts an engine error into `ConstraintViolation` or `Execution`.
    pub(crate) fn from_insert(table: &str, statement: &str, source: sqlx::Error) -> Self {
        if is_constraint_violation(&source) {
            Error::ConstraintViolation {
                table: table.to_string(),
                source,
            }
        } else {
            Error::Execution {
                statement: statement.to_string(),
                source,
            }
        }
    }
}

pub(crate) fn is_constraint_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => matches!(
            db.kind(),
            ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
        ),
        _ => false,
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("unknown primary key: {0}")]
    UnknownPrimaryKey(String),

    #[error("foreign key column {0} is not in the table")]
    UnknownForeignKey(String),

    #[error("column {column} has tag {tag:?} which has no SQL type")]
    UnmappedType { column: String, tag: SourceTag },

    #[error("table {0} has no columns")]
    EmptyTable(String),

    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("table {table} is already qualified; schema {namespace} is in use")]
    QualifiedTable { table: String, namespace: String },

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("column {column} has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("column {column} is {tag:?} but holds {value}")]
    CellTypeMismatch {
        column: String,
        tag: SourceTag,
        value: String,
    },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
