use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::gateway::{Document, DocumentStore, Fields};
use crate::schema;

/// SQLite-backed document store. One row per record, body kept as JSON text.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Write a record under a caller-chosen id, replacing any previous body.
    pub fn set_node(&self, collection: &str, id: &str, fields: &Fields) -> Result<()> {
        let body = serde_json::to_string(fields)?;
        self.conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body",
            params![collection, id, body],
        )?;
        Ok(())
    }

    fn query_documents(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Document>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows: Vec<(String, String)> = stmt
            .query_map(params, read_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter()
            .map(|(id, body)| parse_document(id, &body))
            .collect()
    }
}

impl DocumentStore for Store {
    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, body FROM documents
                 WHERE collection = ?1
                   AND json_type(body, ?2) = 'text'
                   AND json_extract(body, ?2) = ?3
                 ORDER BY rowid LIMIT 1",
                params![collection, field_path(field), value],
                read_row,
            )
            .optional()?;
        tracing::debug!(collection, field, value, found = row.is_some(), "find_by_field");
        row.map(|(id, body)| parse_document(id, &body)).transpose()
    }

    fn find_all_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>> {
        self.query_documents(
            "SELECT id, body FROM documents
             WHERE collection = ?1
               AND json_type(body, ?2) = 'text'
               AND json_extract(body, ?2) = ?3
             ORDER BY rowid",
            params![collection, field_path(field), value],
        )
    }

    fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                read_row,
            )
            .optional()?;
        row.map(|(id, body)| parse_document(id, &body)).transpose()
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>> {
        self.query_documents(
            "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY rowid",
            [collection],
        )
    }

    fn create_node(&self, collection: &str, fields: &Fields) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(fields)?;
        self.conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
            params![collection, id, body],
        )?;
        Ok(id)
    }

    fn update_node(&self, collection: &str, id: &str, fields: &Fields) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(body) = body else {
            return Err(missing(collection, id));
        };

        let mut stored = parse_document(id.to_string(), &body)?.fields;
        for (key, value) in fields {
            stored.insert(key.clone(), value.clone());
        }

        tx.execute(
            "UPDATE documents SET body = ?3 WHERE collection = ?1 AND id = ?2",
            params![collection, id, serde_json::to_string(&stored)?],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_node(&self, collection: &str, id: &str) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        if rows == 0 {
            return Err(missing(collection, id));
        }
        Ok(())
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

/// JSON path for a top-level key. Quoting keeps keys with dots or spaces literal.
fn field_path(field: &str) -> String {
    format!("$.\"{field}\"")
}

fn parse_document(id: String, body: &str) -> Result<Document> {
    match serde_json::from_str::<serde_json::Value>(body)? {
        serde_json::Value::Object(fields) => Ok(Document { id, fields }),
        other => Err(StoreError::InvalidData(format!(
            "document {id} is not a JSON object: {other}"
        ))),
    }
}

fn missing(collection: &str, id: &str) -> StoreError {
    StoreError::Missing {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}
