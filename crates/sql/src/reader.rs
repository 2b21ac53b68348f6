//! Reading target tables back as datasets.
//!
//! The load sequence needs generated primary keys to build dependent
//! tables, so after loading an entity table the orchestrator reads it back
//! and joins it against the next candidate dataset. Decoding is driven by
//! the introspected column types.

use crate::error::LoadResult;
use crate::introspect::{SqlType, TableSchema};
use crate::planner::quote_identifier;
use cfbload_core::{Dataset, Value};
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row;
use tracing::debug;

/// Read an entire table into a [`Dataset`], columns in ordinal order.
pub async fn read_table(pool: &MySqlPool, table: &str) -> LoadResult<Dataset> {
    let schema = TableSchema::introspect(pool, table).await?;
    let target = quote_identifier(schema.table())?;
    let quoted: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<LoadResult<_>>()?;

    let statement = format!("SELECT {} FROM {target}", quoted.join(", "));
    let rows = sqlx::query(&statement).fetch_all(pool).await?;
    debug!(table, rows = rows.len(), "read table into dataset");

    let mut dataset = Dataset::new(
        schema
            .column_names()
            .map(str::to_string)
            .collect::<Vec<_>>(),
    );
    for row in rows {
        let mut values = Vec::with_capacity(schema.columns().len());
        for (index, column) in schema.columns().iter().enumerate() {
            values.push(decode_value(&row, index, column.sql_type)?);
        }
        dataset.push_row(values)?;
    }
    Ok(dataset)
}

fn decode_value(row: &MySqlRow, index: usize, sql_type: SqlType) -> LoadResult<Value> {
    let value = if sql_type.is_integer() {
        row.try_get::<Option<i64>, _>(index)?.map(Value::Int)
    } else if sql_type.is_float() {
        row.try_get::<Option<f64>, _>(index)?.map(Value::Float)
    } else {
        match sql_type {
            SqlType::DateTime | SqlType::Timestamp => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(index)?
                .map(|v| Value::Text(v.to_string())),
            SqlType::Time => row
                .try_get::<Option<chrono::NaiveTime>, _>(index)?
                .map(|v| Value::Text(v.to_string())),
            _ => row.try_get::<Option<String>, _>(index)?.map(Value::Text),
        }
    };
    Ok(value.unwrap_or(Value::Null))
}
