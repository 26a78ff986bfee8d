use serde::{Deserialize, Serialize};

use crate::libs::error::SchemaError;
use crate::libs::frame::{Frame, SourceTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAttribute {
    PrimaryKey,
    NotNull,
    None,
}

impl ColumnAttribute {
    /// `PRIMARY KEY` wins over `NOT NULL`; a column with missing values
    /// gets neither.
    pub fn for_column(primary: bool, has_null: bool) -> Self {
        if primary {
            ColumnAttribute::PrimaryKey
        } else if has_null {
            ColumnAttribute::None
        } else {
            ColumnAttribute::NotNull
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            ColumnAttribute::PrimaryKey => "PRIMARY KEY",
            ColumnAttribute::NotNull => "NOT NULL",
            ColumnAttribute::None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

impl ForeignKey {
    pub fn clause(&self) -> String {
        self.clause_in(None)
    }

    /// Like [`ForeignKey::clause`], with an unqualified referenced table
    /// placed in `namespace`.
    pub fn clause_in(&self, namespace: Option<&str>) -> String {
        let ref_table = if self.ref_table.contains('.') {
            self.ref_table.clone()
        } else {
            prefix(namespace, &self.ref_table)
        };
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.column, ref_table, self.ref_column
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub primary_key: Option<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = Some(column.to_string());
        self
    }

    /// Declare `column` as referencing `ref_table (ref_column)`. A second
    /// declaration for the same column replaces the first.
    pub fn foreign_key(mut self, column: &str, ref_table: &str, ref_column: &str) -> Self {
        self.foreign_keys.retain(|fk| fk.column != column);
        self.foreign_keys.push(ForeignKey {
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub tag: SourceTag,
    pub has_null: bool,
}

/// Everything needed to write one `CREATE TABLE`. Built fresh per call.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub primary_key: Option<String>,
    /// In table column order.
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn describe(frame: &Frame, name: &str, options: &TableOptions) -> Result<Self, SchemaError> {
        check_identifier(name)?;
        if frame.width() == 0 {
            return Err(SchemaError::EmptyTable(name.to_string()));
        }
        for column in frame.column_names() {
            check_identifier(column)?;
        }

        check_primary_key(frame, options)?;
        let columns = frame
            .columns()
            .iter()
            .map(|c| ColumnSchema {
                name: c.name().to_string(),
                tag: c.tag(),
                has_null: c.null_count() > 0,
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            columns,
            primary_key: options.primary_key.clone(),
            foreign_keys: ordered_foreign_keys(frame, options)?,
        })
    }

    pub fn attribute(&self, column: &ColumnSchema) -> ColumnAttribute {
        ColumnAttribute::for_column(
            self.primary_key.as_deref() == Some(column.name.as_str()),
            column.has_null,
        )
    }
}

fn check_primary_key(frame: &Frame, options: &TableOptions) -> Result<(), SchemaError> {
    match &options.primary_key {
        Some(pk) if frame.column(pk).is_none() => Err(SchemaError::UnknownPrimaryKey(pk.clone())),
        _ => Ok(()),
    }
}

/// `PRIMARY KEY` for the designated column, `NOT NULL` for columns with no
/// missing values, nothing otherwise.
pub fn column_attributes(
    frame: &Frame,
    options: &TableOptions,
) -> Result<Vec<(String, ColumnAttribute)>, SchemaError> {
    check_primary_key(frame, options)?;
    Ok(frame
        .columns()
        .iter()
        .map(|c| {
            let attribute = ColumnAttribute::for_column(
                options.primary_key.as_deref() == Some(c.name()),
                c.null_count() > 0,
            );
            (c.name().to_string(), attribute)
        })
        .collect())
}

/// One `FOREIGN KEY` clause per declared key, in table column order. The
/// referenced table is not checked.
pub fn foreign_key_clauses(
    frame: &Frame,
    options: &TableOptions,
) -> Result<Vec<(String, String)>, SchemaError> {
    Ok(ordered_foreign_keys(frame, options)?
        .into_iter()
        .map(|fk| {
            let clause = fk.clause();
            (fk.column, clause)
        })
        .collect())
}

fn ordered_foreign_keys(
    frame: &Frame,
    options: &TableOptions,
) -> Result<Vec<ForeignKey>, SchemaError> {
    let mut keyed = Vec::with_capacity(options.foreign_keys.len());
    for fk in &options.foreign_keys {
        let position = frame
            .position(&fk.column)
            .map_err(|_| SchemaError::UnknownForeignKey(fk.column.clone()))?;
        check_identifier(&fk.ref_table)?;
        check_identifier(&fk.ref_column)?;
        keyed.push((position, fk.clone()));
    }
    keyed.sort_by_key(|(position, _)| *position);
    Ok(keyed.into_iter().map(|(_, fk)| fk).collect())
}

// Words that either engine refuses as a bare table or column name.
const RESERVED: &[&str] = &[
    "ADD", "ALL", "ALTER", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC",
    "ASYMMETRIC", "AUTHORIZATION", "AUTOINCREMENT", "BETWEEN", "BINARY", "BOTH", "CASE",
    "CAST", "CHECK", "COLLATE", "COLLATION", "COLUMN", "COMMIT", "CONCURRENTLY",
    "CONSTRAINT", "CREATE", "CROSS", "CURRENT_CATALOG", "CURRENT_DATE", "CURRENT_ROLE",
    "CURRENT_SCHEMA", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "DEFAULT",
    "DEFERRABLE", "DELETE", "DESC", "DISTINCT", "DO", "DROP", "ELSE", "END", "ESCAPE",
    "EXCEPT", "EXISTS", "FALSE", "FETCH", "FOR", "FOREIGN", "FREEZE", "FROM", "FULL",
    "GRANT", "GROUP", "HAVING", "ILIKE", "IN", "INDEX", "INITIALLY", "INNER", "INSERT",
    "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "LATERAL", "LEADING", "LEFT", "LIKE",
    "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NATURAL", "NOT", "NOTHING", "NOTNULL", "NULL",
    "OFFSET", "ON", "ONLY", "OR", "ORDER", "OUTER", "OVERLAPS", "PLACING", "PRIMARY",
    "REFERENCES", "RETURNING", "RIGHT", "SELECT", "SESSION_USER", "SET", "SIMILAR", "SOME",
    "SYMMETRIC", "TABLE", "TABLESAMPLE", "THEN", "TO", "TRAILING", "TRANSACTION", "TRUE",
    "UNION", "UNIQUE", "UPDATE", "USER", "USING", "VALUES", "VARIADIC", "VERBOSE", "WHEN",
    "WHERE", "WINDOW", "WITH",
];

/// Accepts plain identifiers, optionally schema-qualified (`schema.table`).
/// Reserved words are refused since names are never quoted.
pub fn check_identifier(name: &str) -> Result<(), SchemaError> {
    let plain = |part: &str| {
        let mut chars = part.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !RESERVED.iter().any(|w| w.eq_ignore_ascii_case(part))
    };
    if name.split('.').count() <= 2 && name.split('.').all(plain) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

/// `namespace.table`, or `table` alone when no namespace is in use. A table
/// that already names its schema cannot be placed in another one.
pub fn qualify(namespace: Option<&str>, table: &str) -> Result<String, SchemaError> {
    match namespace {
        Some(ns) if table.contains('.') => Err(SchemaError::QualifiedTable {
            table: table.to_string(),
            namespace: ns.to_string(),
        }),
        _ => Ok(prefix(namespace, table)),
    }
}

fn prefix(namespace: Option<&str>, table: &str) -> String {
    match namespace {
        Some(ns) => format!("{}.{}", ns, table),
        None => table.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::frame::Column;

    fn frame() -> Frame {
        Frame::new()
            .with_column(Column::infer("id", [1, 2, 3]).unwrap())
            .unwrap()
            .with_column(Column::infer("name", ["a", "", "c"]).unwrap())
            .unwrap()
            .with_column(Column::infer("team_id", [10, 10, 11]).unwrap())
            .unwrap()
    }

    #[test]
    fn primary_key_and_not_null_are_exclusive() {
        let attrs = column_attributes(&frame(), &TableOptions::new().primary_key("id")).unwrap();
        assert_eq!(
            attrs,
            vec![
                ("id".to_string(), ColumnAttribute::PrimaryKey),
                ("name".to_string(), ColumnAttribute::None),
                ("team_id".to_string(), ColumnAttribute::NotNull),
            ]
        );
    }

    #[test]
    fn unknown_primary_key_is_rejected() {
        let err = column_attributes(&frame(), &TableOptions::new().primary_key("uid")).unwrap_err();
        assert_eq!(err, SchemaError::UnknownPrimaryKey("uid".into()));
    }

    #[test]
    fn foreign_keys_follow_column_order() {
        let options = TableOptions::new()
            .foreign_key("team_id", "teams", "id")
            .foreign_key("id", "people", "id");
        let clauses = foreign_key_clauses(&frame(), &options).unwrap();
        assert_eq!(
            clauses,
            vec![
                ("id".to_string(), "FOREIGN KEY (id) REFERENCES people (id)".to_string()),
                (
                    "team_id".to_string(),
                    "FOREIGN KEY (team_id) REFERENCES teams (id)".to_string()
                ),
            ]
        );
    }

    #[test]
    fn redeclared_foreign_key_replaces_earlier_one() {
        let options = TableOptions::new()
            .foreign_key("team_id", "teams", "id")
            .foreign_key("team_id", "squads", "id");
        assert_eq!(options.foreign_keys.len(), 1);
        assert_eq!(options.foreign_keys[0].ref_table, "squads");
    }

    #[test]
    fn foreign_key_on_missing_column_is_rejected() {
        let options = TableOptions::new().foreign_key("owner", "people", "id");
        let err = foreign_key_clauses(&frame(), &options).unwrap_err();
        assert_eq!(err, SchemaError::UnknownForeignKey("owner".into()));
    }

    #[test]
    fn describe_validates_identifiers() {
        let err = TableSchema::describe(&frame(), "bad name", &TableOptions::new()).unwrap_err();
        assert_eq!(err, SchemaError::InvalidIdentifier("bad name".into()));
        assert!(check_identifier("public.people").is_ok());
        assert!(check_identifier("a.b.c").is_err());
        assert!(check_identifier("1st").is_err());
        assert!(check_identifier("id; DROP TABLE x").is_err());
    }

    #[test]
    fn reserved_words_are_not_identifiers() {
        for name in ["order", "GROUP", "Select", "public.table"] {
            assert_eq!(
                check_identifier(name),
                Err(SchemaError::InvalidIdentifier(name.into()))
            );
        }
        assert!(check_identifier("orders").is_ok());
        assert!(check_identifier("group_id").is_ok());

        let frame = frame()
            .with_column(Column::infer("order", [1, 2, 3]).unwrap())
            .unwrap();
        let err = TableSchema::describe(&frame, "t", &TableOptions::new()).unwrap_err();
        assert_eq!(err, SchemaError::InvalidIdentifier("order".into()));
    }

    #[test]
    fn attribute_follows_primary_key_and_nulls() {
        let schema =
            TableSchema::describe(&frame(), "t", &TableOptions::new().primary_key("id")).unwrap();
        let attrs: Vec<_> = schema.columns.iter().map(|c| schema.attribute(c)).collect();
        assert_eq!(
            attrs,
            vec![
                ColumnAttribute::PrimaryKey,
                ColumnAttribute::None,
                ColumnAttribute::NotNull
            ]
        );
        assert!(schema.columns[1].has_null);
    }

    #[test]
    fn qualify_keeps_tables_in_one_schema() {
        assert_eq!(qualify(None, "people").unwrap(), "people");
        assert_eq!(qualify(None, "hr.people").unwrap(), "hr.people");
        assert_eq!(qualify(Some("sales"), "people").unwrap(), "sales.people");
        assert_eq!(
            qualify(Some("sales"), "hr.people").unwrap_err(),
            SchemaError::QualifiedTable {
                table: "hr.people".into(),
                namespace: "sales".into()
            }
        );

        let fk = ForeignKey {
            column: "team_id".into(),
            ref_table: "teams".into(),
            ref_column: "id".into(),
        };
        assert_eq!(
            fk.clause_in(Some("sales")),
            "FOREIGN KEY (team_id) REFERENCES sales.teams (id)"
        );
        assert_eq!(fk.clause(), "FOREIGN KEY (team_id) REFERENCES teams (id)");
    }

    #[test]
    fn describe_rejects_empty_frame() {
        let err = TableSchema::describe(&Frame::new(), "t", &TableOptions::new()).unwrap_err();
        assert_eq!(err, SchemaError::EmptyTable("t".into()));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: TableOptions = serde_json::from_str(r#"{"primary_key": "id"}"#).unwrap();
        assert_eq!(options, TableOptions::new().primary_key("id"));
    }
}
