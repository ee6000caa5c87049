//! Project identifiers and the startup allow-list.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::EnvelopeError;

/// Identifier of a cloud project. Guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Parse a project identifier, rejecting empty or whitespace-only input.
    pub fn new(raw: impl Into<String>) -> Result<Self, EnvelopeError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(EnvelopeError::MissingProjectId);
        }
        Ok(Self(raw))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

/// Immutable set of projects this service is allowed to act on.
///
/// Fixed at startup; membership is exact string match, no wildcards, no
/// case folding.
#[derive(Debug, Clone)]
pub struct ProjectAllowList {
    projects: BTreeSet<String>,
}

impl ProjectAllowList {
    /// Build the allow-list from configured project identifiers.
    #[must_use]
    pub fn new(projects: impl IntoIterator<Item = String>) -> Self {
        Self {
            projects: projects.into_iter().collect(),
        }
    }

    /// Whether the project is a member of the allow-list.
    #[must_use]
    pub fn is_authorized(&self, project: &ProjectId) -> bool {
        self.projects.contains(project.as_str())
    }

    /// Number of configured projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Whether no projects are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(raw: &str) -> ProjectId {
        ProjectId::new(raw).expect("valid project id")
    }

    #[test]
    fn rejects_empty_project_id() {
        assert!(matches!(
            ProjectId::new(""),
            Err(EnvelopeError::MissingProjectId)
        ));
        assert!(matches!(
            ProjectId::new("   "),
            Err(EnvelopeError::MissingProjectId)
        ));
    }

    #[test]
    fn exact_membership() {
        let list = ProjectAllowList::new(["oriproject".to_string(), "otherproj".to_string()]);
        assert!(list.is_authorized(&pid("oriproject")));
        assert!(!list.is_authorized(&pid("unknownproj")));
    }

    #[test]
    fn no_case_folding_or_prefix_match() {
        let list = ProjectAllowList::new(["oriproject".to_string()]);
        assert!(!list.is_authorized(&pid("OriProject")));
        assert!(!list.is_authorized(&pid("oriproject2")));
        assert!(!list.is_authorized(&pid("oriproj")));
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&pid("oriproject")).expect("serialize");
        assert_eq!(json, "\"oriproject\"");
    }
}
