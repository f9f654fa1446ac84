use thiserror::Error;

use crate::model::{Project, SqlServer};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingName(String),

    #[error("{field} must be {expected}")]
    WrongType { field: String, expected: &'static str },

    #[error("{0}")]
    Invalid(String),
}

/// Check that the project and every nested node carry a non-empty name.
///
/// Offending nodes are reported by their JSON path, e.g.
/// `sqlServers[1].databases[0].name`.
pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    require_name(&project.name, || "name".to_string())?;
    validate_servers(project.servers())
}

/// Same checks as [`validate_project`] for a bare `sqlServers` list.
pub fn validate_servers(servers: &[SqlServer]) -> Result<(), ValidationError> {
    for (i, server) in servers.iter().enumerate() {
        require_name(&server.name, || format!("sqlServers[{i}].name"))?;
        for (j, db) in server.databases.iter().flatten().enumerate() {
            require_name(&db.name, || format!("sqlServers[{i}].databases[{j}].name"))?;
            for (k, table) in db.tables.iter().flatten().enumerate() {
                require_name(&table.name, || {
                    format!("sqlServers[{i}].databases[{j}].tables[{k}].name")
                })?;
            }
        }
    }
    Ok(())
}

fn require_name(name: &str, path: impl FnOnce() -> String) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::MissingName(path()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Database, SqlServer, Table};

    #[test]
    fn test_valid_project() {
        let project = Project::with_servers(
            "P",
            vec![SqlServer::with_databases(
                "S",
                vec![Database::with_tables("D", vec![Table::new("T")])],
            )],
        );
        assert_eq!(validate_project(&project), Ok(()));
    }

    #[test]
    fn test_blank_project_name() {
        let err = validate_project(&Project::new("   ")).unwrap_err();
        assert_eq!(err, ValidationError::MissingName("name".into()));
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn test_reports_nested_path() {
        let project = Project::with_servers(
            "P",
            vec![
                SqlServer::new("ok"),
                SqlServer::with_databases(
                    "S",
                    vec![Database::with_tables("D", vec![Table::new("T"), Table::new("")])],
                ),
            ],
        );
        let err = validate_project(&project).unwrap_err();
        assert_eq!(
            err.to_string(),
            "sqlServers[1].databases[0].tables[1].name is required"
        );
    }
}
