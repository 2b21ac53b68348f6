//! Runtime schema discovery.
//!
//! The destination schema is authoritative and only known at runtime, so
//! every load starts by introspecting the target table from
//! `INFORMATION_SCHEMA.COLUMNS`. The result is an explicit [`TableSchema`]
//! value handed to the planner and executor — schema knowledge never lives
//! in globals.

use crate::error::{LoadError, LoadResult};
use sqlx::mysql::MySqlPool;
use sqlx::Row;

/// The MySQL scalar types the loader recognizes.
///
/// Declared types are resolved against this fixed list by longest match,
/// so `DATETIME` is never mistaken for `TIME`, nor `MEDIUMTEXT` for `TEXT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SqlType {
    BigInt,
    Bit,
    Char,
    DateTime,
    Decimal,
    Double,
    Float,
    Integer,
    LongBlob,
    LongText,
    MediumBlob,
    MediumInt,
    MediumText,
    NChar,
    Numeric,
    NVarChar,
    Real,
    SmallInt,
    TinyInt,
    Text,
    Time,
    Timestamp,
    VarChar,
    Year,
}

impl SqlType {
    /// Every recognized type.
    pub const ALL: [SqlType; 24] = [
        SqlType::BigInt,
        SqlType::Bit,
        SqlType::Char,
        SqlType::DateTime,
        SqlType::Decimal,
        SqlType::Double,
        SqlType::Float,
        SqlType::Integer,
        SqlType::LongBlob,
        SqlType::LongText,
        SqlType::MediumBlob,
        SqlType::MediumInt,
        SqlType::MediumText,
        SqlType::NChar,
        SqlType::Numeric,
        SqlType::NVarChar,
        SqlType::Real,
        SqlType::SmallInt,
        SqlType::TinyInt,
        SqlType::Text,
        SqlType::Time,
        SqlType::Timestamp,
        SqlType::VarChar,
        SqlType::Year,
    ];

    /// The SQL name of this type.
    pub fn name(&self) -> &'static str {
        match self {
            SqlType::BigInt => "BIGINT",
            SqlType::Bit => "BIT",
            SqlType::Char => "CHAR",
            SqlType::DateTime => "DATETIME",
            SqlType::Decimal => "DECIMAL",
            SqlType::Double => "DOUBLE",
            SqlType::Float => "FLOAT",
            SqlType::Integer => "INTEGER",
            SqlType::LongBlob => "LONGBLOB",
            SqlType::LongText => "LONGTEXT",
            SqlType::MediumBlob => "MEDIUMBLOB",
            SqlType::MediumInt => "MEDIUMINT",
            SqlType::MediumText => "MEDIUMTEXT",
            SqlType::NChar => "NCHAR",
            SqlType::Numeric => "NUMERIC",
            SqlType::NVarChar => "NVARCHAR",
            SqlType::Real => "REAL",
            SqlType::SmallInt => "SMALLINT",
            SqlType::TinyInt => "TINYINT",
            SqlType::Text => "TEXT",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::VarChar => "VARCHAR",
            SqlType::Year => "YEAR",
        }
    }

    /// Resolve a declared type string (e.g. `bigint(20) unsigned`) to the
    /// recognized type whose name is the longest match inside it.
    pub fn from_declared(declared: &str) -> Option<SqlType> {
        let upper = declared.to_uppercase();
        SqlType::ALL
            .iter()
            .filter(|t| upper.contains(t.name()))
            .max_by_key(|t| t.name().len())
            .copied()
    }

    /// Whether values of this type decode as integers.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SqlType::BigInt
                | SqlType::Bit
                | SqlType::Integer
                | SqlType::MediumInt
                | SqlType::SmallInt
                | SqlType::TinyInt
                | SqlType::Year
        )
    }

    /// Whether values of this type decode as floating point numbers.
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            SqlType::Decimal | SqlType::Double | SqlType::Float | SqlType::Numeric | SqlType::Real
        )
    }
}

/// One introspected column: declared type plus display width or length.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Resolved scalar type
    pub sql_type: SqlType,
    /// Character length or numeric precision, when the engine reports one
    pub size: Option<u32>,
}

/// The introspected structure of one target table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    table: String,
    columns: Vec<ColumnInfo>,
    primary_keys: Vec<String>,
}

impl TableSchema {
    /// Build a schema value directly. Normal construction goes through
    /// [`introspect`](Self::introspect); this exists for planning against
    /// a known structure (and for tests).
    pub fn new(table: impl Into<String>, columns: Vec<ColumnInfo>, primary_keys: Vec<String>) -> Self {
        TableSchema {
            table: table.into(),
            columns,
            primary_keys,
        }
    }

    /// Discover a table's columns, types and primary keys from
    /// `INFORMATION_SCHEMA.COLUMNS`.
    ///
    /// Fails with [`LoadError::SchemaLookup`] when the table does not exist
    /// in the connected database, introspection yields no columns, or a
    /// declared type matches nothing in the recognized list.
    pub async fn introspect(pool: &MySqlPool, table: &str) -> LoadResult<TableSchema> {
        // The length/precision columns are unsigned on some server
        // versions and signed on others; cast to one shape.
        let rows = sqlx::query(
            "SELECT COLUMN_NAME, COLUMN_TYPE, COLUMN_KEY, \
                    CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS char_len, \
                    CAST(NUMERIC_PRECISION AS SIGNED) AS num_precision \
             FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
             ORDER BY ORDINAL_POSITION",
        )
        .bind(table)
        .fetch_all(pool)
        .await?;

        if rows.is_empty() {
            return Err(LoadError::SchemaLookup {
                table: table.to_string(),
                reason: "table does not exist or has no columns".to_string(),
            });
        }

        let mut columns = Vec::with_capacity(rows.len());
        let mut primary_keys = Vec::new();
        for row in rows {
            let name: String = row.try_get("COLUMN_NAME")?;
            let declared: String = row.try_get("COLUMN_TYPE")?;
            let key: String = row.try_get("COLUMN_KEY")?;
            let char_len: Option<i64> = row.try_get("char_len")?;
            let precision: Option<i64> = row.try_get("num_precision")?;

            let sql_type = SqlType::from_declared(&declared).ok_or_else(|| {
                LoadError::SchemaLookup {
                    table: table.to_string(),
                    reason: format!("column '{name}' has unrecognized type '{declared}'"),
                }
            })?;

            if key == "PRI" {
                primary_keys.push(name.clone());
            }
            columns.push(ColumnInfo {
                name,
                sql_type,
                size: char_len.or(precision).map(|v| v as u32),
            });
        }

        Ok(TableSchema {
            table: table.to_string(),
            columns,
            primary_keys,
        })
    }

    /// The introspected table's name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns in ordinal order.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Column names in ordinal order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Whether the table has a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Look up one column's info.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key column names.
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }
}
