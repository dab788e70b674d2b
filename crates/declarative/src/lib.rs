//! # Declarative
//!
//! A framework for reconciling declared collections of keyed blocks against
//! a versioned remote object.
//!
//! Every sub-resource handler follows the same shape: the user declares a set
//! of blocks, the previous declaration is known, and the remote service must
//! be brought in line by deleting what disappeared and creating what
//! appeared. This crate implements that shape once.
//!
//! ## Core Concepts
//!
//! - **Keyed**: A declared block with a stable identity (usually a name)
//! - **SetDiff**: Blocks to remove and blocks to add, by structural equality
//! - **Plan**: Ordered steps, every removal before any creation
//! - **Remote**: The create/delete/list capability for one block kind
//! - **Executor**: Applies a plan sequentially, absorbing NotFound on delete
//! - **Normalize**: Maps remote entities back into the declared shape
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{diff, apply, NoProgress, Plan, ServiceVersion};
//!
//! let changes = diff(Some(&old_blocks), Some(&new_blocks));
//! let plan = Plan::from_diff(changes);
//! let version = ServiceVersion::new("svc-123", 4);
//!
//! let summary = apply(&remote, &version, &plan, &mut NoProgress)?;
//! println!("{} created, {} removed", summary.created, summary.removed);
//! ```
//!
//! ## Failure Model
//!
//! Processing stops at the first fatal error. Nothing already applied is
//! rolled back; re-running the reconciliation computes a fresh diff and
//! resumes, with deletes of already-absent entities absorbed as no-ops.

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{LogProgress, NoProgress, ProgressCallback};
pub use diff::{DiffSummary, SetDiff, diff};
pub use error::{Error, ErrorCategory, Operation, RemoteError, RemoteResult, Result};
pub use executor::apply;
pub use normalize::{FromRemote, normalize, normalize_with, prune, prune_empty_strings, prune_opt};
pub use planner::{Plan, Step};
pub use resource::{Keyed, Remote};
pub use types::{ApplyResult, ApplySummary, Phase, ServiceVersion};
