//! Name-keyed deep merge of project trees.
//!
//! At each level the incoming collection is matched against the existing one
//! by name. Matching nodes merge recursively, new nodes are kept as they came,
//! and existing nodes the submission did not mention are appended. Scalar
//! attributes follow "incoming wins"; child collections are merged, never
//! replaced wholesale. Every merged collection leaves in canonical order.
//!
//! Two incoming siblings with the same name are not detected: each one is
//! merged against the same existing node and both survive. Among existing
//! siblings sharing a name, the last one is the merge target.

use std::collections::{HashMap, HashSet};

use crate::model::{Attributes, Database, Named, Project, SqlServer, Table};
use crate::sort::sort_by_name;
use crate::time::now_iso8601;

/// A node that can absorb a same-named node from an incoming tree.
pub trait Mergeable: Named + Clone {
    /// Combine `self` (stored) with `incoming` into a new node.
    fn absorb(&self, incoming: &Self) -> Self;
}

impl Mergeable for Table {
    fn absorb(&self, incoming: &Self) -> Self {
        Table {
            name: self.name.clone(),
            attributes: overlay(&self.attributes, &incoming.attributes),
        }
    }
}

impl Mergeable for Database {
    fn absorb(&self, incoming: &Self) -> Self {
        Database {
            name: self.name.clone(),
            tables: merge_optional(self.tables.as_deref(), incoming.tables.as_deref()),
            attributes: overlay(&self.attributes, &incoming.attributes),
        }
    }
}

impl Mergeable for SqlServer {
    fn absorb(&self, incoming: &Self) -> Self {
        SqlServer {
            name: self.name.clone(),
            databases: merge_optional(self.databases.as_deref(), incoming.databases.as_deref()),
            attributes: overlay(&self.attributes, &incoming.attributes),
        }
    }
}

/// Merge `incoming` into `existing`, stamping `updatedAt` with the current time.
pub fn merge(existing: &Project, incoming: &Project) -> Project {
    merge_at(existing, incoming, &now_iso8601())
}

/// Merge `incoming` into `existing`, stamping `updatedAt` with `merged_at`.
///
/// Neither input is modified. The result keeps `existing.id`, keeps
/// `existing.userId` when set, and keeps `existing.createdAt` when set.
pub fn merge_at(existing: &Project, incoming: &Project, merged_at: &str) -> Project {
    Project {
        id: existing.id.clone(),
        name: incoming.name.clone(),
        user_id: existing.user_id.clone().or_else(|| incoming.user_id.clone()),
        sql_servers: merge_optional(
            existing.sql_servers.as_deref(),
            incoming.sql_servers.as_deref(),
        ),
        created_at: existing
            .created_at
            .clone()
            .or_else(|| incoming.created_at.clone()),
        updated_at: Some(merged_at.to_string()),
        attributes: overlay(&existing.attributes, &incoming.attributes),
    }
}

/// Merge two sibling collections by name and return them sorted.
///
/// Output before sorting: incoming nodes in their given order (merged with
/// their existing counterpart when there is one), followed by the existing
/// nodes whose name the incoming collection does not mention.
pub fn merge_children<T: Mergeable>(existing: &[T], incoming: &[T]) -> Vec<T> {
    let by_name: HashMap<&str, &T> = existing.iter().map(|n| (n.name(), n)).collect();
    let incoming_names: HashSet<&str> = incoming.iter().map(Named::name).collect();

    let mut merged: Vec<T> = incoming
        .iter()
        .map(|node| match by_name.get(node.name()) {
            Some(stored) => stored.absorb(node),
            None => node.clone(),
        })
        .collect();

    merged.extend(
        existing
            .iter()
            .filter(|n| !incoming_names.contains(n.name()))
            .cloned(),
    );

    sort_by_name(&mut merged);
    merged
}

/// When only one side has the collection, that side is taken as is.
fn merge_optional<T: Mergeable>(existing: Option<&[T]>, incoming: Option<&[T]>) -> Option<Vec<T>> {
    match (existing, incoming) {
        (Some(existing), Some(incoming)) => Some(merge_children(existing, incoming)),
        (Some(only), None) | (None, Some(only)) => Some(only.to_vec()),
        (None, None) => None,
    }
}

fn overlay(existing: &Attributes, incoming: &Attributes) -> Attributes {
    let mut out = existing.clone();
    for (key, value) in incoming {
        out.insert(key.clone(), value.clone());
    }
    out
}
