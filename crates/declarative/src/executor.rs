//! Execution engine - applies a plan against a remote, one step at a time

use crate::context::ProgressCallback;
use crate::error::{Error, Operation, Result};
use crate::planner::{Plan, Step};
use crate::resource::{Keyed, Remote};
use crate::types::{ApplyResult, ApplySummary, Phase, ServiceVersion};

/// Execute a plan, reporting to a progress callback
///
/// Steps run sequentially in plan order, so every removal completes before
/// any creation begins. A delete answered with NotFound counts as
/// [`ApplyResult::AlreadyAbsent`]. Any other failure stops execution at that
/// step and is returned; steps already applied stay applied.
///
/// # Arguments
/// * `remote` - Remote capability for the plan's block kind
/// * `version` - Service version all mutations target (normally the draft)
/// * `plan` - The plan to run
/// * `progress` - Progress callback
///
/// # Returns
/// Summary of execution results
pub fn apply<B, R, P>(
    remote: &R,
    version: &ServiceVersion,
    plan: &Plan<B>,
    progress: &mut P,
) -> Result<ApplySummary>
where
    B: Keyed,
    R: Remote<B> + ?Sized,
    P: ProgressCallback + ?Sized,
{
    let kind = remote.kind();
    let mut summary = ApplySummary::default();

    if plan.is_empty() {
        log::debug!("{kind}: nothing to reconcile on {version}");
        return Ok(summary);
    }

    let mut current_phase: Option<Phase> = None;

    for step in plan.steps() {
        let phase = step.phase();
        if current_phase != Some(phase) {
            if let Some(done) = current_phase {
                progress.on_phase_complete(kind, done);
            }
            progress.on_phase_start(kind, phase, plan.phase_len(phase));
            current_phase = Some(phase);
        }

        let key = step.key().to_string();
        progress.on_step_start(kind, phase, &key);

        let result = apply_step(remote, version, step)?;

        progress.on_step_complete(kind, &key, &result);
        summary.add_result(&result);
    }

    if let Some(done) = current_phase {
        progress.on_phase_complete(kind, done);
    }

    log::info!("{kind}: reconciled {version}: {summary}");
    Ok(summary)
}

/// Apply a single step
fn apply_step<B, R>(remote: &R, version: &ServiceVersion, step: &Step<B>) -> Result<ApplyResult>
where
    B: Keyed,
    R: Remote<B> + ?Sized,
{
    let kind = remote.kind();

    match step {
        Step::Remove(block) => {
            let key = block.key();
            log::debug!("{kind} removal on {version}: {block:?}");

            match remote.delete(version, &key) {
                Ok(()) => Ok(ApplyResult::Removed),
                Err(err) if err.category().is_ignorable_on_delete() => {
                    log::debug!("{kind} {key} already absent on {version}: {err}");
                    Ok(ApplyResult::AlreadyAbsent)
                }
                Err(err) => Err(Error::remote(
                    kind,
                    Operation::Delete,
                    version,
                    Some(key.to_string()),
                    err,
                )),
            }
        }
        Step::Create(block) => {
            log::debug!("{kind} creation on {version}: {block:?}");

            remote
                .create(version, block)
                .map(|_| ApplyResult::Created)
                .map_err(|err| {
                    Error::remote(
                        kind,
                        Operation::Create,
                        version,
                        Some(block.key().to_string()),
                        err,
                    )
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::diff::diff;
    use crate::error::{ErrorCategory, RemoteError, RemoteResult};
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Block {
        name: String,
        value: u32,
    }

    impl Keyed for Block {
        type Key = String;

        fn key(&self) -> String {
            self.name.clone()
        }
    }

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn block(name: &str, value: u32) -> Block {
        Block {
            name: name.to_string(),
            value,
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Create(String, u32),
        Delete(String),
    }

    /// In-memory remote recording every call
    #[derive(Default)]
    struct MockRemote {
        entities: RefCell<HashMap<String, Block>>,
        calls: RefCell<Vec<Call>>,
        fail_create: HashMap<String, RemoteError>,
        fail_delete: HashMap<String, RemoteError>,
    }

    impl MockRemote {
        fn seeded(blocks: &[Block]) -> Self {
            let remote = Self::default();
            for b in blocks {
                remote.entities.borrow_mut().insert(b.name.clone(), b.clone());
            }
            remote
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl Remote<Block> for MockRemote {
        type Entity = Block;

        fn kind(&self) -> &'static str {
            "Block"
        }

        fn create(&self, _version: &ServiceVersion, block: &Block) -> RemoteResult<Block> {
            self.calls
                .borrow_mut()
                .push(Call::Create(block.name.clone(), block.value));
            if let Some(err) = self.fail_create.get(&block.name) {
                return Err(err.clone());
            }
            let mut entities = self.entities.borrow_mut();
            if entities.contains_key(&block.name) {
                return Err(RemoteError::from_status(409, "duplicate name"));
            }
            entities.insert(block.name.clone(), block.clone());
            Ok(block.clone())
        }

        fn delete(&self, _version: &ServiceVersion, key: &String) -> RemoteResult<()> {
            self.calls.borrow_mut().push(Call::Delete(key.clone()));
            if let Some(err) = self.fail_delete.get(key) {
                return Err(err.clone());
            }
            self.entities
                .borrow_mut()
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| RemoteError::not_found(key.clone()))
        }

        fn list(&self, _version: &ServiceVersion) -> RemoteResult<Vec<Block>> {
            Ok(self.entities.borrow().values().cloned().collect())
        }
    }

    fn version() -> ServiceVersion {
        ServiceVersion::new("svc", 2)
    }

    fn plan(old: &[Block], new: &[Block]) -> Plan<Block> {
        Plan::from_diff(diff(Some(old), Some(new)))
    }

    fn run(remote: &MockRemote, plan: &Plan<Block>) -> Result<ApplySummary> {
        apply(remote, &version(), plan, &mut NoProgress)
    }

    #[test]
    fn test_apply_empty_plan() {
        let remote = MockRemote::default();
        let summary = run(&remote, &Plan::default()).unwrap();
        assert!(summary.is_noop());
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn test_apply_single_create() {
        let remote = MockRemote::default();
        let summary = run(&remote, &plan(&[], &[block("a", 1)])).unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(remote.calls(), vec![Call::Create("a".into(), 1)]);
    }

    #[test]
    fn test_apply_single_delete() {
        let remote = MockRemote::seeded(&[block("a", 0), block("b", 0)]);
        let summary = run(
            &remote,
            &plan(&[block("a", 0), block("b", 0)], &[block("b", 0)]),
        )
        .unwrap();

        assert_eq!(summary.removed, 1);
        assert_eq!(summary.created, 0);
        assert_eq!(remote.calls(), vec![Call::Delete("a".into())]);
    }

    #[test]
    fn test_replacement_deletes_before_create() {
        let remote = MockRemote::seeded(&[block("k", 1)]);
        let summary = run(&remote, &plan(&[block("k", 1)], &[block("k", 2)])).unwrap();

        assert_eq!(
            remote.calls(),
            vec![Call::Delete("k".into()), Call::Create("k".into(), 2)]
        );
        assert_eq!(summary.total_changes(), 2);
    }

    #[test]
    fn test_delete_not_found_is_absorbed() {
        init_logging();
        let remote = MockRemote::default();
        let summary = run(&remote, &plan(&[block("gone", 1)], &[])).unwrap();

        assert_eq!(summary.already_absent, 1);
        assert_eq!(summary.removed, 0);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let remote = MockRemote::seeded(&[block("a", 1)]);
        let p = plan(&[block("a", 1)], &[block("b", 1)]);

        run(&remote, &p).unwrap();
        // Re-running the same plan: the delete hits NotFound, the create
        // conflicts because the first run already made it.
        let rerun = run(&remote, &p);
        assert_eq!(rerun.unwrap_err().category(), ErrorCategory::Conflict);

        // Re-running from the new declared state is a no-op.
        let noop = plan(&[block("b", 1)], &[block("b", 1)]);
        let summary = run(&remote, &noop).unwrap();
        assert!(summary.is_noop());
    }

    #[test]
    fn test_delete_failure_aborts_before_creates() {
        let mut remote = MockRemote::seeded(&[block("a", 1), block("b", 1)]);
        remote
            .fail_delete
            .insert("a".into(), RemoteError::from_status(500, "boom"));

        let err = run(
            &remote,
            &plan(&[block("a", 1), block("b", 1)], &[block("c", 1)]),
        )
        .unwrap_err();

        assert_eq!(err.operation(), Operation::Delete);
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(remote.calls(), vec![Call::Delete("a".into())]);
    }

    #[test]
    fn test_create_failure_short_circuits() {
        init_logging();
        let mut remote = MockRemote::default();
        remote
            .fail_create
            .insert("second".into(), RemoteError::from_status(400, "invalid"));

        let err = run(
            &remote,
            &plan(&[], &[block("first", 1), block("second", 1), block("third", 1)]),
        )
        .unwrap_err();

        assert_eq!(
            remote.calls(),
            vec![
                Call::Create("first".into(), 1),
                Call::Create("second".into(), 1)
            ]
        );
        assert_eq!(
            err.remote_error(),
            &RemoteError::from_status(400, "invalid")
        );
        match err {
            Error::Remote { key, version, .. } => {
                assert_eq!(key.as_deref(), Some("second"));
                assert_eq!(version, 2);
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ProgressCallback for Recorder {
        fn on_phase_start(&mut self, _kind: &str, phase: Phase, count: usize) {
            self.events.push(format!("start {phase} {count}"));
        }

        fn on_step_start(&mut self, _kind: &str, _phase: Phase, key: &str) {
            self.events.push(format!("step {key}"));
        }

        fn on_step_complete(&mut self, _kind: &str, key: &str, _result: &ApplyResult) {
            self.events.push(format!("done {key}"));
        }

        fn on_phase_complete(&mut self, _kind: &str, phase: Phase) {
            self.events.push(format!("end {phase}"));
        }
    }

    #[test]
    fn test_progress_callback_sequence() {
        let remote = MockRemote::seeded(&[block("k", 1)]);
        let mut recorder = Recorder::default();
        apply(
            &remote,
            &version(),
            &plan(&[block("k", 1)], &[block("k", 2)]),
            &mut recorder,
        )
        .unwrap();

        assert_eq!(
            recorder.events,
            vec![
                "start remove 1",
                "step k",
                "done k",
                "end remove",
                "start create 1",
                "step k",
                "done k",
                "end create",
            ]
        );
    }
}
