use std::fmt;

use crate::libs::error::SchemaError;
use crate::libs::frame::SourceTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Destination column type for a source tag. `Other` has no mapping.
    pub fn sql_type(self, tag: SourceTag) -> Option<&'static str> {
        match (self, tag) {
            (Dialect::Sqlite, SourceTag::Integer) => Some("INTEGER"),
            (Dialect::Postgres, SourceTag::Integer) => Some("NUMERIC"),
            (_, SourceTag::Float) => Some("REAL"),
            (_, SourceTag::Text) => Some("TEXT"),
            // stored as epoch seconds
            (Dialect::Sqlite, SourceTag::Temporal) => Some("INTEGER"),
            (Dialect::Postgres, SourceTag::Temporal) => Some("TIMESTAMP"),
            (_, SourceTag::Other) => None,
        }
    }

    pub fn infer_type(self, column: &str, tag: SourceTag) -> Result<&'static str, SchemaError> {
        self.sql_type(tag).ok_or_else(|| SchemaError::UnmappedType {
            column: column.to_string(),
            tag,
        })
    }

    /// Most bound parameters one statement may carry.
    pub fn max_bind_params(self) -> usize {
        match self {
            Dialect::Sqlite => 32_766,
            Dialect::Postgres => 65_535,
        }
    }

    /// Rows per multi-row insert for a table `width` columns wide.
    pub fn rows_per_statement(self, width: usize) -> usize {
        (self.max_bind_params() / width.max(1)).max(1)
    }

    /// Leading keywords of the bulk insert. SQLite skips rows that violate
    /// a constraint; Postgres fails the statement.
    pub fn insert_verb(self) -> &'static str {
        match self {
            Dialect::Sqlite => "INSERT OR IGNORE INTO",
            Dialect::Postgres => "INSERT INTO",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::Postgres => write!(f, "postgres"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPED: [SourceTag; 4] = [
        SourceTag::Integer,
        SourceTag::Float,
        SourceTag::Text,
        SourceTag::Temporal,
    ];

    #[test]
    fn sqlite_type_table() {
        let types: Vec<_> = MAPPED
            .iter()
            .map(|t| Dialect::Sqlite.sql_type(*t).unwrap())
            .collect();
        assert_eq!(types, vec!["INTEGER", "REAL", "TEXT", "INTEGER"]);
    }

    #[test]
    fn postgres_type_table() {
        let types: Vec<_> = MAPPED
            .iter()
            .map(|t| Dialect::Postgres.sql_type(*t).unwrap())
            .collect();
        assert_eq!(types, vec!["NUMERIC", "REAL", "TEXT", "TIMESTAMP"]);
    }

    #[test]
    fn other_tag_is_a_schema_error() {
        for dialect in [Dialect::Sqlite, Dialect::Postgres] {
            let err = dialect.infer_type("flag", SourceTag::Other).unwrap_err();
            assert_eq!(
                err,
                SchemaError::UnmappedType {
                    column: "flag".into(),
                    tag: SourceTag::Other
                }
            );
        }
    }

    #[test]
    fn batches_stay_under_the_bind_limit() {
        assert_eq!(Dialect::Sqlite.rows_per_statement(2), 16_383);
        assert_eq!(Dialect::Postgres.rows_per_statement(3), 21_845);
        assert_eq!(Dialect::Postgres.rows_per_statement(0), 65_535);
        assert_eq!(Dialect::Sqlite.rows_per_statement(40_000), 1);
    }
}
