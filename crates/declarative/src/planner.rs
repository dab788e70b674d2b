//! Execution planner - orders diff results into remote steps

use crate::diff::{DiffSummary, SetDiff};
use crate::resource::Keyed;
use crate::types::Phase;
use std::fmt;

/// A single remote mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<B> {
    /// Delete the remote entity carrying this block's key
    Remove(B),
    /// Create a remote entity from this block
    Create(B),
}

impl<B: Keyed> Step<B> {
    /// The declared block this step acts on
    pub fn block(&self) -> &B {
        match self {
            Self::Remove(b) | Self::Create(b) => b,
        }
    }

    /// Key of the block this step acts on
    pub fn key(&self) -> B::Key {
        self.block().key()
    }

    /// Phase this step belongs to
    pub fn phase(&self) -> Phase {
        match self {
            Self::Remove(_) => Phase::Remove,
            Self::Create(_) => Phase::Create,
        }
    }
}

impl<B: Keyed> fmt::Display for Step<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remove(b) => write!(f, "- {}", b.key()),
            Self::Create(b) => write!(f, "+ {}", b.key()),
        }
    }
}

/// An execution plan with every removal ordered before any creation
///
/// The remote API rejects duplicate names within a version, so a block that
/// is replaced (same key, different fields) must be deleted before its
/// successor is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan<B> {
    steps: Vec<Step<B>>,
    summary: DiffSummary,
}

impl<B: Keyed> Plan<B> {
    /// Build a plan from a diff
    pub fn from_diff(diff: SetDiff<B>) -> Self {
        let summary = DiffSummary::from_diff(&diff);
        let steps = diff
            .to_remove
            .into_iter()
            .map(Step::Remove)
            .chain(diff.to_add.into_iter().map(Step::Create))
            .collect();

        Self { steps, summary }
    }

    /// All steps in execution order
    pub fn steps(&self) -> &[Step<B>] {
        &self.steps
    }

    /// Steps of the removal phase
    pub fn removals(&self) -> impl Iterator<Item = &B> {
        self.steps.iter().filter_map(|s| match s {
            Step::Remove(b) => Some(b),
            Step::Create(_) => None,
        })
    }

    /// Steps of the creation phase
    pub fn creations(&self) -> impl Iterator<Item = &B> {
        self.steps.iter().filter_map(|s| match s {
            Step::Create(b) => Some(b),
            Step::Remove(_) => None,
        })
    }

    /// Number of steps in the given phase
    pub fn phase_len(&self, phase: Phase) -> usize {
        self.steps.iter().filter(|s| s.phase() == phase).count()
    }

    /// Key-level summary of the changes in this plan
    pub fn summary(&self) -> &DiffSummary {
        &self.summary
    }

    /// Total number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<B: Keyed> Default for Plan<B> {
    fn default() -> Self {
        Self::from_diff(SetDiff::default())
    }
}
