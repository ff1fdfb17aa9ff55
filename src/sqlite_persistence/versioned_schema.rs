use anyhow::{bail, Result};
use rusqlite::{params, types::Type, Connection};

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Allow unused_mut because the variable is only mutated when optional
            // field assignments are passed to the macro (e.g., `non_null = true`)
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        }
    }
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<S>,
}

/// A table definition. Indices are (index_name, column_list) pairs where the
/// column list may name several comma-separated columns.
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let mut create_sql = format!("CREATE TABLE {} (", self.name);
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                create_sql.push_str(", ");
            }
            create_sql.push_str(&format!("{} {}", column.name, column.sql_type.as_sql()));
            if column.is_primary_key {
                create_sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                create_sql.push_str(" NOT NULL");
            }
            if column.is_unique {
                create_sql.push_str(" UNIQUE");
            }
            if let Some(default_value) = column.default_value {
                create_sql.push_str(&format!(" DEFAULT {}", default_value));
            }
        }

        for unique_constraint in self.unique_constraints {
            create_sql.push_str(&format!(", UNIQUE ({})", unique_constraint.join(", ")));
        }
        create_sql.push_str(");");
        conn.execute(&create_sql, params![])?;

        for (index_name, column_list) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_list
                ),
                params![],
            )?;
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

fn strip_leading_and_trailing_parentheses<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();
    if s.starts_with('(') && s.ends_with(')') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    /// Checks that the open database matches this schema definition: every
    /// table's columns (name, type, nullability, default, primary key), every
    /// named index, and every multi-column unique constraint.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            self.validate_columns(conn, table)?;
            self.validate_indices(conn, table)?;
            self.validate_unique_constraints(conn, table)?;
        }
        Ok(())
    }

    fn validate_columns(&self, conn: &Connection, table: &Table) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table.name))?;
        let actual_columns: Vec<Column<'_, String>> = stmt
            .query_map(params![], |row| {
                let sql_type = match row.get::<_, String>(2)?.as_str() {
                    "TEXT" => &SqlType::Text,
                    "INTEGER" => &SqlType::Integer,
                    "REAL" => &SqlType::Real,
                    "BLOB" => &SqlType::Blob,
                    _ => {
                        return Err(rusqlite::Error::InvalidColumnType(
                            2,
                            "".to_string(),
                            Type::Text,
                        ))
                    }
                };
                Ok(Column {
                    name: row.get::<usize, String>(1)?,
                    sql_type,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get::<_, Option<String>>(4)?,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                    is_unique: false,
                })
            })?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;

        if actual_columns.len() != table.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found: [{}], expected: [{}]",
                table.name,
                actual_columns.len(),
                table.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.clone())
                    .collect::<Vec<String>>()
                    .join(", "),
                table
                    .columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(table.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    table.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != expected.sql_type {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {:?}",
                    table.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    table.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            // Default values might be wrapped in parentheses, so strip before comparing
            if actual
                .default_value
                .as_ref()
                .map(strip_leading_and_trailing_parentheses)
                != expected
                    .default_value
                    .map(strip_leading_and_trailing_parentheses)
            {
                bail!(
                    "Table {} column {} default value mismatch: expected {:?}, got {:?}",
                    table.name,
                    expected.name,
                    expected.default_value,
                    actual.default_value
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    table.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }
        Ok(())
    }

    fn validate_indices(&self, conn: &Connection, table: &Table) -> Result<()> {
        for (index_name, _columns) in table.indices {
            let index_exists: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, table.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);

            if !index_exists {
                bail!("Table {} is missing index '{}'", table.name, index_name);
            }
        }
        Ok(())
    }

    fn validate_unique_constraints(&self, conn: &Connection, table: &Table) -> Result<()> {
        if table.unique_constraints.is_empty() {
            return Ok(());
        }

        // SQLite surfaces table-level unique constraints as unique indices
        let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", table.name))?;
        let unique_indices: Vec<String> = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let is_unique: i32 = row.get(2)?;
                Ok((name, is_unique))
            })?
            .filter_map(|r| r.ok())
            .filter(|(_, is_unique)| *is_unique == 1)
            .map(|(name, _)| name)
            .collect();

        let mut unique_index_columns: Vec<Vec<String>> = Vec::new();
        for index_name in &unique_indices {
            let mut idx_stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
            let mut cols: Vec<String> = idx_stmt
                .query_map([], |row| row.get::<_, String>(2))?
                .filter_map(|r| r.ok())
                .collect();
            cols.sort();
            unique_index_columns.push(cols);
        }

        for expected_columns in table.unique_constraints {
            let mut expected_sorted: Vec<&str> = expected_columns.to_vec();
            expected_sorted.sort_unstable();

            let found = unique_index_columns.iter().any(|actual_cols| {
                actual_cols.iter().map(|s| s.as_str()).collect::<Vec<_>>() == expected_sorted
            });

            if !found {
                bail!(
                    "Table {} is missing unique constraint on columns ({})",
                    table.name,
                    expected_columns.join(", ")
                );
            }
        }
        Ok(())
    }
}

pub const BASE_DB_VERSION: usize = 99999;
