//! Project tree engine.
//!
//! A project owns a three-level tree: SQL servers → databases → tables.
//! Identity at every level is the node's `name`, not a generated key.
//! Re-submitting a project merges the incoming tree into the stored one
//! by name, preserving branches the submission left out, and every
//! collection is kept in canonical (ascending name) order.
//!
//! No I/O here; persistence lives in `dbtree-store`.

pub mod merge;
pub mod model;
pub mod resolution;
pub mod sort;
pub mod time;
pub mod validate;

pub use merge::{Mergeable, merge, merge_at};
pub use model::{Attributes, Database, Named, Project, SqlServer, Table};
pub use resolution::Resolution;
pub use sort::{canonicalize, is_canonical, sort_by_name, sorted_by_name};
pub use time::{now_iso8601, now_unix_millis, unix_millis_to_iso8601};
pub use validate::{ValidationError, validate_project, validate_servers};
