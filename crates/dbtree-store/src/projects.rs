use dbtree_core::{
    Project, Resolution, SqlServer, ValidationError, canonicalize, now_iso8601, sort_by_name,
    validate_project, validate_servers,
};
use serde_json::Value;

use crate::error::{ProjectError, StoreError};
use crate::gateway::{Document, DocumentStore, Fields};
use crate::resolve::resolve_and_persist;
use crate::store::Store;

pub const PROJECTS: &str = "projects";

/// Auxiliary per-project principal records, keyed by the project id.
pub const PRINCIPALS: &str = "principals";

/// Fields a patch may never write.
const WRITE_ONCE: [&str; 2] = ["id", "createdAt"];

/// Project operations on top of a [`DocumentStore`].
pub struct ProjectService<S = Store> {
    store: S,
}

impl<S: DocumentStore> ProjectService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a project, or merge it into the stored project with the same name.
    ///
    /// `createdAt` is stamped here; on a merge the stored value wins.
    /// A submitted `updatedAt` is dropped: only a merge or an update sets it.
    /// Store failures are returned as they are, without retry.
    pub fn create(&self, candidate: Project) -> Result<Resolution, ProjectError> {
        validate_project(&candidate)?;

        let mut candidate = canonicalize(&candidate);
        candidate.created_at = Some(now_iso8601());
        candidate.updated_at = None;

        resolve_and_persist(&self.store, candidate)
    }

    pub fn find_all(&self) -> Result<Vec<Project>, ProjectError> {
        self.store
            .list(PROJECTS)?
            .into_iter()
            .map(|doc| from_document(doc).map_err(ProjectError::from))
            .collect()
    }

    pub fn find_all_by_user_id(&self, user_id: &str) -> Result<Vec<Project>, ProjectError> {
        self.store
            .find_all_by_field(PROJECTS, "userId", user_id)?
            .into_iter()
            .map(|doc| from_document(doc).map_err(ProjectError::from))
            .collect()
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<Project>, ProjectError> {
        match self.store.find_by_id(PROJECTS, id)? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Apply a partial update. `id` and `createdAt` in the patch are ignored,
    /// `updatedAt` is refreshed, and a patched `sqlServers` tree is stored in
    /// canonical order.
    pub fn update(&self, id: &str, patch: Fields) -> Result<Project, ProjectError> {
        let Some(doc) = self.store.find_by_id(PROJECTS, id)? else {
            return Err(ProjectError::not_found(id));
        };

        let patch = prepare_patch(patch, &now_iso8601())?;
        self.store.update_node(PROJECTS, id, &patch)?;
        tracing::info!(id, fields = patch.len(), "updated project");

        let mut fields = doc.fields;
        fields.extend(patch);
        Ok(from_document(Document {
            id: doc.id,
            fields,
        })?)
    }

    /// Apply several patches, each carrying its own `id`, in order.
    ///
    /// Every entry is checked for an id before anything is written. After
    /// that the first failing entry stops the batch; entries already applied
    /// stay applied.
    pub fn update_many(&self, patches: Vec<Fields>) -> Result<Vec<Project>, ProjectError> {
        let mut batch = Vec::with_capacity(patches.len());
        for mut patch in patches {
            let id = match patch.remove("id") {
                Some(Value::String(id)) if !id.is_empty() => id,
                _ => {
                    return Err(ValidationError::Invalid(
                        "Each project update must include an id".into(),
                    )
                    .into());
                }
            };
            batch.push((id, patch));
        }

        batch
            .into_iter()
            .map(|(id, patch)| self.update(&id, patch))
            .collect()
    }

    /// Delete a project, then make a best-effort pass over its auxiliary
    /// principal record. A failed cleanup is logged and does not fail the call.
    pub fn remove(&self, id: &str) -> Result<(), ProjectError> {
        if self.store.find_by_id(PROJECTS, id)?.is_none() {
            return Err(ProjectError::not_found(id));
        }

        self.store.delete_node(PROJECTS, id)?;
        tracing::info!(id, "deleted project");

        match self.store.delete_node(PRINCIPALS, id) {
            Ok(()) => tracing::debug!(id, "deleted project principal"),
            Err(StoreError::Missing { .. }) => tracing::debug!(id, "no principal to delete"),
            Err(e) => tracing::warn!(id, "could not delete project principal: {e}"),
        }
        Ok(())
    }
}

/// Serialize a project into stored fields. The id is the record key, not a field.
pub(crate) fn to_fields(project: &Project) -> Result<Fields, StoreError> {
    match serde_json::to_value(project)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::InvalidData(format!(
            "project did not serialize to an object: {other}"
        ))),
    }
}

pub(crate) fn from_document(doc: Document) -> Result<Project, StoreError> {
    let mut fields = doc.fields;
    fields.insert("id".into(), Value::String(doc.id));
    Ok(serde_json::from_value(Value::Object(fields))?)
}

fn prepare_patch(mut patch: Fields, now: &str) -> Result<Fields, ProjectError> {
    for key in WRITE_ONCE {
        patch.remove(key);
    }

    match patch.get("name") {
        None => {}
        Some(Value::String(name)) if !name.trim().is_empty() => {}
        Some(Value::String(_)) => return Err(ValidationError::MissingName("name".into()).into()),
        Some(_) => {
            return Err(ValidationError::WrongType {
                field: "name".into(),
                expected: "a string",
            }
            .into());
        }
    }

    if let Some(user_id) = patch.get("userId")
        && !matches!(user_id, Value::String(_) | Value::Null)
    {
        return Err(ValidationError::WrongType {
            field: "userId".into(),
            expected: "a string or null",
        }
        .into());
    }

    if let Some(servers) = patch.remove("sqlServers") {
        let servers = match servers {
            Value::Null => Value::Null,
            raw => {
                let mut servers: Vec<SqlServer> = serde_json::from_value(raw)
                    .map_err(|e| ValidationError::Invalid(format!("sqlServers: {e}")))?;
                validate_servers(&servers)?;
                sort_by_name(&mut servers);
                serde_json::to_value(servers).map_err(StoreError::from)?
            }
        };
        patch.insert("sqlServers".into(), servers);
    }

    patch.insert("updatedAt".into(), Value::String(now.to_string()));
    Ok(patch)
}
