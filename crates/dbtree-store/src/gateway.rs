//! Persistence gateway contract.
//!
//! Records are schemaless JSON objects grouped into named collections and
//! addressed by an opaque string id that the store assigns on creation.
//! The id is not part of the stored fields.

use crate::error::Result;

pub type Fields = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

pub trait DocumentStore {
    /// First record (oldest) whose top-level `field` is a string exactly equal
    /// to `value`. Case-sensitive; not a search.
    fn find_by_field(&self, collection: &str, field: &str, value: &str)
    -> Result<Option<Document>>;

    /// Every record whose top-level `field` equals `value`, in insertion order.
    fn find_all_by_field(&self, collection: &str, field: &str, value: &str)
    -> Result<Vec<Document>>;

    fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Every record in the collection, in insertion order.
    fn list(&self, collection: &str) -> Result<Vec<Document>>;

    /// Insert a new record and return its freshly assigned id.
    fn create_node(&self, collection: &str, fields: &Fields) -> Result<String>;

    /// Overlay `fields` onto the stored record's top-level fields.
    /// Fails with [`crate::StoreError::Missing`] when the record does not exist.
    fn update_node(&self, collection: &str, id: &str, fields: &Fields) -> Result<()>;

    /// Fails with [`crate::StoreError::Missing`] when the record does not exist.
    fn delete_node(&self, collection: &str, id: &str) -> Result<()>;
}
