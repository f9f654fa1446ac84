pub mod error;
pub mod gateway;
pub mod projects;
pub mod resolve;
pub mod schema;
pub mod store;

pub use error::{ProjectError, Result, StoreError};
pub use gateway::{Document, DocumentStore, Fields};
pub use projects::{PRINCIPALS, PROJECTS, ProjectService};
pub use resolve::resolve_and_persist;
pub use store::Store;
