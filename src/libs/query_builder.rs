use crate::libs::dialect::Dialect;
use crate::libs::error::SchemaError;
use crate::libs::schema::{qualify, ColumnAttribute, TableSchema};

pub struct CreateTableQuery<'a> {
    schema: &'a TableSchema,
    dialect: Dialect,
    namespace: Option<&'a str>,
}

impl<'a> CreateTableQuery<'a> {
    pub fn new(schema: &'a TableSchema, dialect: Dialect) -> Self {
        Self {
            schema,
            dialect,
            namespace: None,
        }
    }

    pub fn namespace(mut self, namespace: Option<&'a str>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn build_sql(&self) -> Result<String, SchemaError> {
        let mut clauses = Vec::with_capacity(self.schema.columns.len() + self.schema.foreign_keys.len());
        for c in &self.schema.columns {
            let sql_type = self.dialect.infer_type(&c.name, c.tag)?;
            let mut col_def = format!("{} {}", c.name, sql_type);
            let attribute = self.schema.attribute(c);
            if attribute != ColumnAttribute::None {
                col_def.push(' ');
                col_def.push_str(attribute.as_sql());
            }
            clauses.push(col_def);
        }
        clauses.extend(
            self.schema
                .foreign_keys
                .iter()
                .map(|fk| fk.clause_in(self.namespace)),
        );

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n",
            qualify(self.namespace, &self.schema.name)?
        );
        sql.push_str(&clauses.join(",\n"));
        sql.push_str("\n)");
        Ok(sql)
    }
}

/// Start of a multi-row insert. The `VALUES` list is appended per chunk of
/// rows with [`sqlx::QueryBuilder::push_values`].
pub struct InsertQuery<'a> {
    table: &'a str,
    columns: Vec<&'a str>,
    dialect: Dialect,
    namespace: Option<&'a str>,
}

impl<'a> InsertQuery<'a> {
    pub fn new(table: &'a str, columns: Vec<&'a str>, dialect: Dialect) -> Self {
        Self {
            table,
            columns,
            dialect,
            namespace: None,
        }
    }

    pub fn namespace(mut self, namespace: Option<&'a str>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn head(&self) -> Result<String, SchemaError> {
        Ok(format!(
            "{} {} ({}) ",
            self.dialect.insert_verb(),
            qualify(self.namespace, self.table)?,
            self.columns.join(",")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::frame::{Column, Frame};
    use crate::libs::schema::TableOptions;

    fn people() -> Frame {
        Frame::new()
            .with_column(Column::infer("id", [1, 2, 3]).unwrap())
            .unwrap()
            .with_column(Column::infer("name", ["a", "", "c"]).unwrap())
            .unwrap()
    }

    #[test]
    fn create_table_for_sqlite() {
        let schema = TableSchema::describe(&people(), "people", &TableOptions::new().primary_key("id")).unwrap();
        let sql = CreateTableQuery::new(&schema, Dialect::Sqlite).build_sql().unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS people (\nid INTEGER PRIMARY KEY,\nname TEXT\n)"
        );
    }

    #[test]
    fn create_table_for_postgres_with_namespace_and_foreign_key() {
        let frame = people()
            .with_column(Column::infer("team_id", [7, 7, 8]).unwrap())
            .unwrap();
        let options = TableOptions::new()
            .primary_key("id")
            .foreign_key("team_id", "sales.teams", "id");
        let schema = TableSchema::describe(&frame, "people", &options).unwrap();
        let sql = CreateTableQuery::new(&schema, Dialect::Postgres)
            .namespace(Some("sales"))
            .build_sql()
            .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS sales.people (\n\
             id NUMERIC PRIMARY KEY,\n\
             name TEXT,\n\
             team_id NUMERIC NOT NULL,\n\
             FOREIGN KEY (team_id) REFERENCES sales.teams (id)\n)"
        );
    }

    #[test]
    fn foreign_key_target_joins_the_namespace() {
        let frame = people()
            .with_column(Column::infer("team_id", [7, 7, 8]).unwrap())
            .unwrap();
        let options = TableOptions::new().foreign_key("team_id", "teams", "id");
        let schema = TableSchema::describe(&frame, "people", &options).unwrap();

        let sql = CreateTableQuery::new(&schema, Dialect::Postgres)
            .namespace(Some("sales"))
            .build_sql()
            .unwrap();
        assert!(sql.ends_with("FOREIGN KEY (team_id) REFERENCES sales.teams (id)\n)"));

        let sql = CreateTableQuery::new(&schema, Dialect::Sqlite).build_sql().unwrap();
        assert!(sql.ends_with("FOREIGN KEY (team_id) REFERENCES teams (id)\n)"));
    }

    #[test]
    fn qualified_table_is_refused_inside_a_namespace() {
        let schema = TableSchema::describe(&people(), "hr.people", &TableOptions::new()).unwrap();
        let err = CreateTableQuery::new(&schema, Dialect::Postgres)
            .namespace(Some("sales"))
            .build_sql()
            .unwrap_err();
        assert!(matches!(err, SchemaError::QualifiedTable { .. }));

        let err = InsertQuery::new("hr.people", vec!["id"], Dialect::Postgres)
            .namespace(Some("sales"))
            .head()
            .unwrap_err();
        assert!(matches!(err, SchemaError::QualifiedTable { .. }));
    }

    #[test]
    fn one_clause_per_column_and_foreign_key() {
        let frame = people()
            .with_column(Column::infer("a", [1, 1, 1]).unwrap())
            .unwrap()
            .with_column(Column::infer("b", [1.5, 2.5, 3.5]).unwrap())
            .unwrap();
        let options = TableOptions::new()
            .foreign_key("a", "x", "id")
            .foreign_key("b", "y", "id");
        let schema = TableSchema::describe(&frame, "t", &options).unwrap();
        let sql = CreateTableQuery::new(&schema, Dialect::Sqlite).build_sql().unwrap();

        let body = sql
            .strip_prefix("CREATE TABLE IF NOT EXISTS t (\n")
            .and_then(|s| s.strip_suffix("\n)"))
            .unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4 + 2);
        let (last, rest) = lines.split_last().unwrap();
        assert!(rest.iter().all(|l| l.ends_with(',')));
        assert!(!last.ends_with(','));
    }

    #[test]
    fn unmapped_column_fails_the_whole_statement() {
        let frame = people()
            .with_column(Column::infer("flag", [true, false, true]).unwrap())
            .unwrap();
        let schema = TableSchema::describe(&frame, "t", &TableOptions::new()).unwrap();
        let err = CreateTableQuery::new(&schema, Dialect::Sqlite).build_sql().unwrap_err();
        assert!(matches!(err, SchemaError::UnmappedType { .. }));
    }

    #[test]
    fn insert_statements_carry_one_tuple_per_row() {
        let rows = [(1_i64, "a"), (2, "b")];

        let head = InsertQuery::new("people", vec!["id", "name"], Dialect::Sqlite)
            .head()
            .unwrap();
        let mut sqlite = sqlx::QueryBuilder::<sqlx::Sqlite>::new(head);
        sqlite.push_values(rows, |mut b, (id, name)| {
            b.push_bind(id).push_bind(name);
        });
        assert_eq!(
            sqlite.sql(),
            "INSERT OR IGNORE INTO people (id,name) VALUES (?, ?), (?, ?)"
        );

        let head = InsertQuery::new("people", vec!["id", "name"], Dialect::Postgres)
            .namespace(Some("sales"))
            .head()
            .unwrap();
        let mut pg = sqlx::QueryBuilder::<sqlx::Postgres>::new(head);
        pg.push_values(rows, |mut b, (id, name)| {
            b.push_bind(id).push_bind(name);
        });
        assert_eq!(
            pg.sql(),
            "INSERT INTO sales.people (id,name) VALUES ($1, $2), ($3, $4)"
        );
    }
}
