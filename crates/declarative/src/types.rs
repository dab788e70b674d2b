//! Core types for declarative block reconciliation

use serde::{Deserialize, Serialize};
use std::fmt;

/// One numbered version of a remote service.
///
/// All create/delete/list operations are scoped to a single version. Writes
/// are staged on the latest (draft) version while reads query the active
/// (published) one; the caller decides which number to pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceVersion {
    /// Remote service identifier
    pub service_id: String,
    /// Version number within the service
    pub number: u32,
}

impl ServiceVersion {
    /// Create a new service version reference
    pub fn new(service_id: impl Into<String>, number: u32) -> Self {
        Self {
            service_id: service_id.into(),
            number,
        }
    }
}

impl fmt::Display for ServiceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (version {})", self.service_id, self.number)
    }
}

/// Execution phase of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Deleting stale blocks
    Remove,
    /// Creating new blocks
    Create,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remove => write!(f, "remove"),
            Self::Create => write!(f, "create"),
        }
    }
}

/// Result of applying a single plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Remote entity was created
    Created,
    /// Remote entity was removed
    Removed,
    /// Delete target did not exist remotely
    AlreadyAbsent,
}

impl ApplyResult {
    /// Check if the result represents a remote change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Removed)
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub created: usize,
    pub removed: usize,
    pub already_absent: usize,
}

impl ApplySummary {
    /// Total number of actual remote changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.removed
    }

    /// Total number of steps processed
    pub fn total(&self) -> usize {
        self.created + self.removed + self.already_absent
    }

    /// Whether nothing was processed at all
    pub fn is_noop(&self) -> bool {
        self.total() == 0
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ApplySummary) {
        self.created += other.created;
        self.removed += other.removed;
        self.already_absent += other.already_absent;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::Created => self.created += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::AlreadyAbsent => self.already_absent += 1,
        }
    }
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} removed, {} already absent",
            self.created, self.removed, self.already_absent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_add_and_merge() {
        let mut summary = ApplySummary::default();
        summary.add_result(&ApplyResult::Removed);
        summary.add_result(&ApplyResult::AlreadyAbsent);
        summary.add_result(&ApplyResult::Created);

        let mut other = ApplySummary::default();
        other.add_result(&ApplyResult::Created);

        summary.merge(&other);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.already_absent, 1);
        assert_eq!(summary.total_changes(), 3);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.to_string(), "2 created, 1 removed, 1 already absent");
    }

    #[test]
    fn test_already_absent_is_not_a_change() {
        assert!(!ApplyResult::AlreadyAbsent.is_change());
        assert!(ApplyResult::Removed.is_change());
    }

    #[test]
    fn test_service_version_display() {
        let version = ServiceVersion::new("svc-1", 7);
        assert_eq!(version.to_string(), "svc-1 (version 7)");
    }
}
