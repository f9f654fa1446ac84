use dbtree_core::{Project, Resolution, canonicalize, merge};

use crate::error::ProjectError;
use crate::gateway::DocumentStore;
use crate::projects::{PROJECTS, from_document, to_fields};

/// Persist `candidate` as a new project, or merge it into the stored project
/// that already has exactly the same name.
///
/// The lookup and the write are two separate store calls with nothing
/// guarding the gap between them: two concurrent submissions of a new name
/// can both miss the lookup and create two records.
pub fn resolve_and_persist<S: DocumentStore + ?Sized>(
    store: &S,
    candidate: Project,
) -> Result<Resolution, ProjectError> {
    match store.find_by_field(PROJECTS, "name", &candidate.name)? {
        None => {
            let mut project = canonicalize(&candidate);
            project.id = None;
            let id = store.create_node(PROJECTS, &to_fields(&project)?)?;
            tracing::info!(id = %id, name = %project.name, "created project");
            project.id = Some(id);
            Ok(Resolution::Created(project))
        }
        Some(doc) => {
            let id = doc.id.clone();
            let stored = from_document(doc)?;
            let merged = canonicalize(&merge(&stored, &candidate));
            store.update_node(PROJECTS, &id, &to_fields(&merged)?)?;
            tracing::info!(
                id = %id,
                name = %merged.name,
                nodes = merged.node_count(),
                "merged submission into existing project"
            );
            Ok(Resolution::Merged(merged))
        }
    }
}
