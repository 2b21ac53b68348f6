//! Transactional execution of planned upserts.
//!
//! Each operation runs as one unit: stage the candidate rows, execute the
//! planned statement inside a transaction, drop the staging table. All
//! validation happens before anything touches the database. On failure the
//! transaction is rolled back, the staging table is dropped best-effort,
//! and the original error is re-surfaced — cleanup problems are reported
//! but never allowed to mask it. Every transaction is explicitly committed
//! or rolled back on every exit path.

use crate::error::{LoadError, LoadResult};
use crate::introspect::TableSchema;
use crate::planner::{self, quote_identifier, UpdateColumns};
use crate::staging;
use cfbload_core::Dataset;
use sqlx::mysql::{MySql, MySqlPool};
use sqlx::Transaction;
use tracing::{debug, info, warn};

/// Insert candidate rows that match no existing row on the identity
/// columns. Returns the generated primary-key values when they can be
/// recovered unambiguously, `None` otherwise — callers must tolerate
/// `None`.
pub async fn insert_new(
    pool: &MySqlPool,
    dataset: &Dataset,
    table: &str,
    identity_columns: &[&str],
) -> LoadResult<Option<Vec<i64>>> {
    if dataset.is_empty() {
        debug!(table, "no candidate rows to insert");
        return Ok(None);
    }

    let schema = TableSchema::introspect(pool, table).await?;
    let identity: Vec<String> = identity_columns.iter().map(|c| c.to_string()).collect();
    let staging_name = staging::staging_table_name(table);
    let plan = planner::plan_insert(&schema, dataset.columns(), &identity, &staging_name)?;

    // Stage only the columns the plan references; candidate-only columns
    // never reach the database.
    let staged_columns: Vec<&str> = plan.columns.iter().map(String::as_str).collect();
    let staged = dataset.select(&staged_columns)?;

    if let Err(error) = staging::create_staging_table(pool, &staged, &staging_name).await {
        staging::drop_staging_table_best_effort(pool, &staging_name).await;
        return Err(error);
    }

    let outcome = apply_insert(pool, &schema, &plan.statement, staged.len()).await;
    staging::drop_staging_table_best_effort(pool, &staging_name).await;

    let inserted_ids = outcome?;
    info!(
        table,
        offered = staged.len(),
        recovered_ids = inserted_ids.as_ref().map(Vec::len),
        "insert-new complete"
    );
    Ok(inserted_ids)
}

/// Overwrite the update columns of target rows matching staged rows on the
/// identity columns. Never inserts; staged rows matching nothing are
/// ignored.
pub async fn update_matching(
    pool: &MySqlPool,
    dataset: &Dataset,
    table: &str,
    identity_columns: &[&str],
    update_columns: UpdateColumns,
) -> LoadResult<()> {
    if dataset.is_empty() {
        debug!(table, "no candidate rows to update from");
        return Ok(());
    }

    let schema = TableSchema::introspect(pool, table).await?;
    let identity: Vec<String> = identity_columns.iter().map(|c| c.to_string()).collect();
    let staging_name = staging::staging_table_name(table);
    let plan = planner::plan_update(
        &schema,
        dataset.columns(),
        &identity,
        &update_columns,
        &staging_name,
    )?;

    // The join needs the identity columns alongside the update columns.
    let mut staged_columns: Vec<&str> = Vec::new();
    for column in identity.iter().chain(plan.columns.iter()) {
        if !staged_columns.contains(&column.as_str()) {
            staged_columns.push(column.as_str());
        }
    }
    let staged = dataset.select(&staged_columns)?;

    if let Err(error) = staging::create_staging_table(pool, &staged, &staging_name).await {
        staging::drop_staging_table_best_effort(pool, &staging_name).await;
        return Err(error);
    }

    let outcome = apply_statement(pool, &plan.statement).await;
    staging::drop_staging_table_best_effort(pool, &staging_name).await;

    let matched = outcome?;
    info!(table, rows_updated = matched, "update-matching complete");
    Ok(())
}

// Run the planned insert inside a transaction and recover generated keys
// when the target has a single primary-key column.
async fn apply_insert(
    pool: &MySqlPool,
    schema: &TableSchema,
    statement: &str,
    offered_rows: usize,
) -> LoadResult<Option<Vec<i64>>> {
    let mut tx = pool.begin().await?;

    debug!(statement, "executing planned insert");
    let result = match sqlx::query(statement).execute(&mut *tx).await {
        Ok(result) => result,
        Err(source) => {
            rollback(tx).await;
            return Err(LoadError::Transaction {
                statement: statement.to_string(),
                source,
            });
        }
    };

    let mut inserted_ids = None;
    if let [pk] = schema.primary_keys() {
        let last_insert_id = result.last_insert_id();
        match recover_inserted_keys(&mut tx, schema.table(), pk, last_insert_id, offered_rows)
            .await
        {
            Ok(ids) => inserted_ids = ids,
            Err(source) => {
                rollback(tx).await;
                return Err(LoadError::Transaction {
                    statement: statement.to_string(),
                    source,
                });
            }
        }
    }

    tx.commit().await?;
    Ok(inserted_ids)
}

// Run a planned statement inside a transaction, returning affected rows.
async fn apply_statement(pool: &MySqlPool, statement: &str) -> LoadResult<u64> {
    let mut tx = pool.begin().await?;

    debug!(statement, "executing planned statement");
    match sqlx::query(statement).execute(&mut *tx).await {
        Ok(result) => {
            tx.commit().await?;
            Ok(result.rows_affected())
        }
        Err(source) => {
            rollback(tx).await;
            Err(LoadError::Transaction {
                statement: statement.to_string(),
                source,
            })
        }
    }
}

async fn rollback(tx: Transaction<'_, MySql>) {
    if let Err(error) = tx.rollback().await {
        warn!(%error, "transaction rollback failed");
    }
}

// Best-effort recovery of the contiguous block of generated keys.
//
// MySQL reports the first auto-increment value a multi-row insert
// generated; if the distance to the current maximum fits within the number
// of offered rows, the block [last, max] is exactly what this statement
// created. A zero last-insert id means nothing was generated, and a larger
// gap means another writer interleaved — both are ambiguous, so the result
// is `None` rather than a guess.
async fn recover_inserted_keys(
    tx: &mut Transaction<'_, MySql>,
    table: &str,
    primary_key: &str,
    last_insert_id: u64,
    offered_rows: usize,
) -> Result<Option<Vec<i64>>, sqlx::Error> {
    if last_insert_id == 0 {
        return Ok(None);
    }
    let (Ok(target), Ok(pk)) = (quote_identifier(table), quote_identifier(primary_key)) else {
        // Identifiers were validated during planning; treat anything else
        // as unrecoverable rather than guessing.
        return Ok(None);
    };

    let max_id: Option<i64> = sqlx::query_scalar(&format!("SELECT MAX({pk}) FROM {target}"))
        .fetch_one(&mut **tx)
        .await?;

    let first = last_insert_id as i64;
    match max_id {
        Some(max) if max >= first && (max - first) as usize <= offered_rows => {
            Ok(Some((first..=max).collect()))
        }
        _ => {
            warn!(
                table,
                last_insert_id, "generated key recovery was ambiguous"
            );
            Ok(None)
        }
    }
}
