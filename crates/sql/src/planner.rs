//! Upsert plan construction.
//!
//! Plans are built entirely from an introspected [`TableSchema`] and the
//! candidate dataset's column names — no connection required, so every
//! property of the generated SQL is unit-testable. Two operations exist:
//! insert-only-new-rows (a set difference against the target on the
//! identity columns) and update-matching-rows (a join back to the staging
//! table). The destination schema is authoritative: candidate columns the
//! target does not have are silently dropped.
//!
//! Identifiers are never bindable in SQL, so every table and column name is
//! validated against a conservative charset and backtick-quoted before
//! interpolation. Data values never appear in planned statements at all —
//! they travel through the staging table.

use crate::error::{LoadError, LoadResult};
use crate::introspect::TableSchema;

/// Which columns an update should overwrite.
#[derive(Debug, Clone)]
pub enum UpdateColumns {
    /// All non-primary-key target columns (narrowed to the candidate set).
    All,
    /// An explicit list (primary keys are excluded, then narrowed to the
    /// candidate set).
    Named(Vec<String>),
}

/// A planned insert-new operation.
#[derive(Debug, Clone)]
pub struct InsertPlan {
    /// The `INSERT INTO … SELECT … WHERE NOT EXISTS` statement
    pub statement: String,
    /// Columns being inserted, in target-schema order
    pub columns: Vec<String>,
}

/// A planned update-matching operation.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    /// The `UPDATE … INNER JOIN … SET` statement
    pub statement: String,
    /// Columns being overwritten
    pub columns: Vec<String>,
}

// Identifiers reach SQL via interpolation, so only a conservative charset
// is allowed regardless of where the name came from.
pub(crate) fn validate_identifier(name: &str) -> LoadResult<()> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if valid_head && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(LoadError::InvalidIdentifier(name.to_string()))
    }
}

pub(crate) fn quote_identifier(name: &str) -> LoadResult<String> {
    validate_identifier(name)?;
    Ok(format!("`{name}`"))
}

// Identity columns must exist in both the target schema and the candidate
// dataset; report every missing name at once, before any mutation.
fn validate_identity_columns(
    schema: &TableSchema,
    candidate_columns: &[String],
    identity_columns: &[String],
) -> LoadResult<Vec<String>> {
    let mut identity: Vec<String> = Vec::new();
    for column in identity_columns {
        if !identity.contains(column) {
            identity.push(column.clone());
        }
    }

    let mut missing: Vec<String> = Vec::new();
    for column in &identity {
        if !schema.has_column(column) || !candidate_columns.contains(column) {
            missing.push(column.clone());
        }
    }
    if !missing.is_empty() {
        return Err(LoadError::InvalidIdentityColumns {
            table: schema.table().to_string(),
            missing,
        });
    }
    Ok(identity)
}

// Target-schema order keeps generated SQL deterministic run to run.
fn shared_columns(schema: &TableSchema, candidate_columns: &[String]) -> Vec<String> {
    schema
        .column_names()
        .filter(|c| candidate_columns.iter().any(|d| d == c))
        .map(str::to_string)
        .collect()
}

/// Plan an insert of only-new rows from `staging_table` into the target.
///
/// Rows whose identity-column tuple already exists in the target are
/// blocked; rows matching no existing tuple are inserted. An empty identity
/// set degenerates to an unconditional insert of all staged rows.
pub fn plan_insert(
    schema: &TableSchema,
    candidate_columns: &[String],
    identity_columns: &[String],
    staging_table: &str,
) -> LoadResult<InsertPlan> {
    let identity = validate_identity_columns(schema, candidate_columns, identity_columns)?;
    let columns = shared_columns(schema, candidate_columns);
    if columns.is_empty() {
        return Err(LoadError::NoSharedColumns {
            table: schema.table().to_string(),
        });
    }

    let target = quote_identifier(schema.table())?;
    let staging = quote_identifier(staging_table)?;
    let quoted: Vec<String> = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<LoadResult<_>>()?;

    let mut statement = format!(
        "INSERT INTO {target} ({cols}) SELECT {cols} FROM {staging} t2",
        cols = quoted.join(", "),
    );

    if !identity.is_empty() {
        let matches: Vec<String> = identity
            .iter()
            .map(|c| {
                let col = quote_identifier(c)?;
                Ok(format!("{target}.{col} = t2.{col}"))
            })
            .collect::<LoadResult<_>>()?;
        statement.push_str(&format!(
            " WHERE NOT EXISTS (SELECT * FROM {target} WHERE {})",
            matches.join(" AND ")
        ));
    }

    Ok(InsertPlan { statement, columns })
}

/// Plan an update of rows in the target that match staged rows on the
/// identity columns. Unmatched target rows are untouched; unmatched staged
/// rows are ignored. This operation never inserts.
pub fn plan_update(
    schema: &TableSchema,
    candidate_columns: &[String],
    identity_columns: &[String],
    update_columns: &UpdateColumns,
    staging_table: &str,
) -> LoadResult<UpdatePlan> {
    let identity = validate_identity_columns(schema, candidate_columns, identity_columns)?;
    if identity.is_empty() {
        return Err(LoadError::EmptyIdentity {
            table: schema.table().to_string(),
        });
    }

    let requested: Vec<String> = match update_columns {
        UpdateColumns::All => schema.column_names().map(str::to_string).collect(),
        UpdateColumns::Named(names) => names.clone(),
    };
    let columns: Vec<String> = shared_columns(schema, candidate_columns)
        .into_iter()
        .filter(|c| requested.contains(c))
        .filter(|c| !schema.primary_keys().contains(c))
        .collect();
    if columns.is_empty() {
        return Err(LoadError::NoSharedColumns {
            table: schema.table().to_string(),
        });
    }

    let target = quote_identifier(schema.table())?;
    let staging = quote_identifier(staging_table)?;

    let join: Vec<String> = identity
        .iter()
        .map(|c| {
            let col = quote_identifier(c)?;
            Ok(format!("{target}.{col} = {staging}.{col}"))
        })
        .collect::<LoadResult<_>>()?;
    let assignments: Vec<String> = columns
        .iter()
        .map(|c| {
            let col = quote_identifier(c)?;
            Ok(format!("{target}.{col} = {staging}.{col}"))
        })
        .collect::<LoadResult<_>>()?;

    let statement = format!(
        "UPDATE {target} INNER JOIN {staging} ON {} SET {}",
        join.join(" AND "),
        assignments.join(", ")
    );

    Ok(UpdatePlan { statement, columns })
}
