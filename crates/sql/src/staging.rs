//! Staging table lifecycle.
//!
//! Each load operation materializes its candidate dataset as a transient
//! table named `{target}_{unix_seconds}`, uses it as the right-hand side of
//! the planned set-difference or join, and drops it before the operation
//! returns — success or failure. Dropping a table that is already gone is
//! not an error; cleanup must never mask the primary outcome.

use crate::error::{LoadError, LoadResult};
use crate::planner::quote_identifier;
use cfbload_core::{Dataset, Value};
use sqlx::mysql::{MySql, MySqlPool};
use sqlx::query::Query;
use tracing::{debug, warn};

// Rows per multi-row INSERT while populating a staging table.
const INSERT_CHUNK_ROWS: usize = 500;

/// Build a staging table name for a target table. The unix-seconds suffix
/// keeps concurrent loads of the same target from colliding.
pub fn staging_table_name(table: &str) -> String {
    format!("{table}_{}", chrono::Utc::now().timestamp())
}

// Staging column types are inferred from the data: a column of integers
// stays joinable against INT targets, everything else degrades to TEXT.
fn infer_column_type(dataset: &Dataset, index: usize) -> &'static str {
    let mut all_int = true;
    let mut all_numeric = true;
    let mut seen_value = false;
    for row in dataset.rows() {
        match &row[index] {
            Value::Null => {}
            Value::Int(_) => seen_value = true,
            Value::Float(_) => {
                seen_value = true;
                all_int = false;
            }
            Value::Text(_) => {
                seen_value = true;
                all_int = false;
                all_numeric = false;
            }
        }
    }
    match (seen_value, all_int, all_numeric) {
        (false, _, _) => "TEXT",
        (_, true, _) => "BIGINT",
        (_, _, true) => "DOUBLE",
        _ => "TEXT",
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, sqlx::mysql::MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, sqlx::mysql::MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.clone()),
    }
}

/// Materialize a dataset as the staging table `name`, replacing any
/// existing table of that name. Data values travel as bound parameters;
/// only validated identifiers are interpolated.
pub async fn create_staging_table(
    pool: &MySqlPool,
    dataset: &Dataset,
    name: &str,
) -> LoadResult<()> {
    if dataset.columns().is_empty() {
        return Err(LoadError::NoSharedColumns {
            table: name.to_string(),
        });
    }

    let staging = quote_identifier(name)?;
    let quoted: Vec<String> = dataset
        .columns()
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<LoadResult<_>>()?;

    sqlx::query(&format!("DROP TABLE IF EXISTS {staging}"))
        .execute(pool)
        .await?;

    let column_defs: Vec<String> = quoted
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{col} {} NULL", infer_column_type(dataset, i)))
        .collect();
    sqlx::query(&format!(
        "CREATE TABLE {staging} ({})",
        column_defs.join(", ")
    ))
    .execute(pool)
    .await?;

    debug!(
        staging = name,
        rows = dataset.len(),
        "moving rows into staging table"
    );

    let placeholders = format!("({})", vec!["?"; quoted.len()].join(", "));
    for chunk in dataset.rows().chunks(INSERT_CHUNK_ROWS) {
        let statement = format!(
            "INSERT INTO {staging} ({}) VALUES {}",
            quoted.join(", "),
            vec![placeholders.as_str(); chunk.len()].join(", ")
        );
        let mut query = sqlx::query(&statement);
        for row in chunk {
            for value in row {
                query = bind_value(query, value);
            }
        }
        query.execute(pool).await?;
    }

    Ok(())
}

/// Drop a staging table. Missing tables are tolerated (`IF EXISTS`);
/// other failures surface as [`LoadError::Cleanup`].
pub async fn drop_staging_table(pool: &MySqlPool, name: &str) -> LoadResult<()> {
    let staging = quote_identifier(name)?;
    sqlx::query(&format!("DROP TABLE IF EXISTS {staging}"))
        .execute(pool)
        .await
        .map_err(|source| LoadError::Cleanup {
            table: name.to_string(),
            source,
        })?;
    Ok(())
}

/// Drop a staging table, demoting any failure to a warning. Used on paths
/// where a cleanup error must not mask the operation's primary outcome.
pub async fn drop_staging_table_best_effort(pool: &MySqlPool, name: &str) {
    if let Err(error) = drop_staging_table(pool, name).await {
        warn!(staging = name, %error, "staging table cleanup failed");
    }
}
