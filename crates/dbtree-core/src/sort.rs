//! Canonical ordering of named collections.
//!
//! Ordering is byte-wise on the UTF-8 name (equivalently, code point order),
//! ascending, with no locale folding. The sort is stable so equal names keep
//! their relative order.

use crate::model::{Named, Project};

/// Sort `nodes` by name in place, then sort each node's own children.
pub fn sort_by_name<T: Named>(nodes: &mut [T]) {
    nodes.sort_by(|a, b| a.name().cmp(b.name()));
    for node in nodes.iter_mut() {
        node.sort_children();
    }
}

/// Sorted copy of `nodes`; the input is left as is.
pub fn sorted_by_name<T: Named + Clone>(nodes: &[T]) -> Vec<T> {
    let mut out = nodes.to_vec();
    sort_by_name(&mut out);
    out
}

/// Canonical copy of a project: servers, databases and tables all sorted.
pub fn canonicalize(project: &Project) -> Project {
    let mut out = project.clone();
    canonicalize_in_place(&mut out);
    out
}

pub(crate) fn canonicalize_in_place(project: &mut Project) {
    if let Some(servers) = project.sql_servers.as_mut() {
        sort_by_name(servers);
    }
}

/// True when every collection at every level is already in canonical order.
pub fn is_canonical(project: &Project) -> bool {
    let servers = project.servers();
    is_sorted(servers)
        && servers.iter().all(|server| {
            let databases = server.databases.as_deref().unwrap_or_default();
            is_sorted(databases)
                && databases
                    .iter()
                    .all(|db| is_sorted(db.tables.as_deref().unwrap_or_default()))
        })
}

fn is_sorted<T: Named>(nodes: &[T]) -> bool {
    nodes.windows(2).all(|w| w[0].name() <= w[1].name())
}
