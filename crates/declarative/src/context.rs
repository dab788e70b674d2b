//! Progress callbacks for plan execution
//!
//! These let callers observe execution without the crate depending on a
//! particular UI or logging setup.

use crate::types::{ApplyResult, Phase};

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called when a phase with at least one step starts
    fn on_phase_start(&mut self, kind: &str, phase: Phase, count: usize);

    /// Called before a step touches the remote
    fn on_step_start(&mut self, kind: &str, phase: Phase, key: &str);

    /// Called when a step completes successfully
    fn on_step_complete(&mut self, kind: &str, key: &str, result: &ApplyResult);

    /// Called when every step of a phase completed
    fn on_phase_complete(&mut self, kind: &str, phase: Phase);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_phase_start(&mut self, _kind: &str, _phase: Phase, _count: usize) {}
    fn on_step_start(&mut self, _kind: &str, _phase: Phase, _key: &str) {}
    fn on_step_complete(&mut self, _kind: &str, _key: &str, _result: &ApplyResult) {}
    fn on_phase_complete(&mut self, _kind: &str, _phase: Phase) {}
}

/// Progress callback that reports through the `log` facade
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_phase_start(&mut self, kind: &str, phase: Phase, count: usize) {
        log::info!("{kind}: {phase} phase, {count} step(s)");
    }

    fn on_step_start(&mut self, kind: &str, phase: Phase, key: &str) {
        log::debug!("{kind}: {phase} {key}");
    }

    fn on_step_complete(&mut self, kind: &str, key: &str, result: &ApplyResult) {
        log::debug!("{kind}: {key} -> {result:?}");
    }

    fn on_phase_complete(&mut self, _kind: &str, _phase: Phase) {}
}
