//! Generic document queries over the `documents` table.
//!
//! Documents are JSON objects grouped by collection. Lookups are equality
//! predicates on top-level fields, AND-combined and limited to one row.

use rusqlite::{Connection, OptionalExtension, params, types::Value};
use uuid::Uuid;

use crate::error::{AppError, Result};

pub const LICENSES: &str = "licenses";

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Field names are interpolated into SQL, so only plain identifiers pass.
fn json_path(field: &str) -> Result<String> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(AppError::Internal(format!("Invalid document field: {field:?}")));
    }
    Ok(format!("json_extract(data, '$.{}')", field))
}

/// Insert a document and return its generated id.
pub fn insert_document(
    conn: &Connection,
    collection: &str,
    data: &serde_json::Value,
    created_at: &str,
) -> Result<String> {
    let id = gen_id();
    let data = serde_json::to_string(data)
        .map_err(|e| AppError::Internal(format!("Failed to encode document: {}", e)))?;

    conn.execute(
        "INSERT INTO documents (id, collection, data, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![&id, collection, &data, created_at],
    )?;

    Ok(id)
}

/// Oldest document in `collection` whose fields equal every filter value.
pub fn find_one_document(
    conn: &Connection,
    collection: &str,
    filters: &[(&'static str, &str)],
) -> Result<Option<(String, serde_json::Value)>> {
    let mut sql = String::from("SELECT id, data FROM documents WHERE collection = ?1");
    let mut values: Vec<Value> = vec![collection.to_string().into()];

    for (field, expected) in filters {
        values.push(expected.to_string().into());
        sql.push_str(&format!(" AND {} = ?{}", json_path(field)?, values.len()));
    }
    sql.push_str(" ORDER BY created_at, rowid LIMIT 1");

    let row: Option<(String, String)> = conn
        .query_row(&sql, rusqlite::params_from_iter(values), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?;

    row.map(|(id, data)| {
        serde_json::from_str(&data)
            .map(|doc| (id.clone(), doc))
            .map_err(|e| AppError::Internal(format!("Corrupt document {}: {}", id, e)))
    })
    .transpose()
}
