use crate::model::Project;

/// Outcome of submitting a project: a fresh record, or a merge into the
/// record that already carried the same name.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Created(Project),
    Merged(Project),
}

impl Resolution {
    pub fn project(&self) -> &Project {
        match self {
            Resolution::Created(p) | Resolution::Merged(p) => p,
        }
    }

    pub fn into_project(self) -> Project {
        match self {
            Resolution::Created(p) | Resolution::Merged(p) => p,
        }
    }

    pub fn is_merge(&self) -> bool {
        matches!(self, Resolution::Merged(_))
    }
}
