use serde::{Deserialize, Serialize};

/// Open set of extra scalar fields carried by a node.
///
/// Anything the wire format sends that is not a known field lands here and
/// round-trips untouched. Merges overlay these key by key.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A node whose identity within its sibling collection is its name.
pub trait Named {
    fn name(&self) -> &str;

    /// Sort every nested collection of this node by name, recursively.
    /// Leaves have nothing to sort.
    fn sort_children(&mut self) {}
}

/// Leaf of the tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<Table>>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlServer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub databases: Option<Vec<Database>>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

/// Root of the tree. `id` is assigned by persistence and never changes
/// afterwards; `name` is unique among projects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_servers: Option<Vec<SqlServer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Attributes::new(),
        }
    }
}

impl Database {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_tables(name: &str, tables: Vec<Table>) -> Self {
        Self {
            tables: Some(tables),
            ..Self::new(name)
        }
    }
}

impl SqlServer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            databases: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_databases(name: &str, databases: Vec<Database>) -> Self {
        Self {
            databases: Some(databases),
            ..Self::new(name)
        }
    }
}

impl Project {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_servers(name: &str, servers: Vec<SqlServer>) -> Self {
        Self {
            sql_servers: Some(servers),
            ..Self::new(name)
        }
    }

    /// Servers as a slice; an absent list reads as empty.
    pub fn servers(&self) -> &[SqlServer] {
        self.sql_servers.as_deref().unwrap_or_default()
    }

    /// Total number of nodes below the project (servers + databases + tables).
    pub fn node_count(&self) -> usize {
        self.servers()
            .iter()
            .map(|server| {
                1 + server
                    .databases
                    .iter()
                    .flatten()
                    .map(|db| 1 + db.tables.as_ref().map_or(0, Vec::len))
                    .sum::<usize>()
            })
            .sum()
    }
}

impl Named for Table {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Database {
    fn name(&self) -> &str {
        &self.name
    }

    fn sort_children(&mut self) {
        if let Some(tables) = self.tables.as_mut() {
            crate::sort::sort_by_name(tables);
        }
    }
}

impl Named for SqlServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn sort_children(&mut self) {
        if let Some(databases) = self.databases.as_mut() {
            crate::sort::sort_by_name(databases);
        }
    }
}
