//! Unit-of-work executor
//!
//! Applies a validated [`Plan`]. Actions are split by destination into a
//! local and a remote unit of work, and the two units run concurrently. Each
//! unit runs in stages:
//!
//! ```text
//!   saves:   branches ─► configs ─► rows
//!   deletes: rows ─► configs ─► branches
//! ```
//!
//! Every stage runs on a bounded pool of scoped threads fed by a channel, and
//! completes before the next one starts. A save below a failed object and a
//! delete above a failed object are blocked, not executed. The registry and
//! the manifest are only written by the calling thread, once both units have
//! finished.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::unbounded;
use tracing::{Span, debug, error, info, warn};

use projsync_model::{Manifest, ManifestRecord, Object, ObjectKey, ObjectState, Registry};

use crate::backend::{LocalBackend, NamingResolver, RemoteBackend};
use crate::error::{Error, Errors, Result};
use crate::mapper::{MapperContext, RemoteChanges};
use crate::plan::{Action, Operation, Plan};

/// Cooperative cancellation shared between the caller and the executor
///
/// Checked between stages and before each action; actions already dispatched
/// to a backend run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    pub local_workers: usize,
    pub remote_workers: usize,
    /// Attached to every remote write
    pub change_description: String,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            local_workers: 8,
            remote_workers: 4,
            change_description: "projsync".to_string(),
        }
    }
}

/// Identity of an action in the execution report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRef {
    pub key: ObjectKey,
    pub operation: Operation,
    pub path: String,
}

impl From<&Action> for ActionRef {
    fn from(action: &Action) -> Self {
        Self {
            key: action.key().clone(),
            operation: action.operation,
            path: action.path.clone(),
        }
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.path)
    }
}

/// What happened to every action of a plan
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub applied: Vec<ActionRef>,
    pub failed: Vec<ActionRef>,
    /// Not executed because a related action failed
    pub blocked: Vec<ActionRef>,
    /// Remote deletions not allowed for this run
    pub skipped: Vec<ActionRef>,
    /// Not dispatched because the run was cancelled
    pub cancelled: Vec<ActionRef>,
    /// Stale manifest records removed by the cleanup pass
    pub cleaned: Vec<ObjectKey>,
    pub errors: Errors,
}

impl ExecutionReport {
    /// Whether every executable action was applied
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
            && self.failed.is_empty()
            && self.blocked.is_empty()
            && self.cancelled.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "applied {}, failed {}, blocked {}, skipped {}, cancelled {}, cleaned {}",
            self.applied.len(),
            self.failed.len(),
            self.blocked.len(),
            self.skipped.len(),
            self.cancelled.len(),
            self.cleaned.len()
        )
    }

    fn sort(&mut self) {
        for list in [
            &mut self.applied,
            &mut self.failed,
            &mut self.blocked,
            &mut self.skipped,
            &mut self.cancelled,
        ] {
            list.sort_by(|a, b| a.key.cmp(&b.key));
        }
        self.cleaned.sort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Local,
    Remote,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// A prepared action, carrying everything the backend call needs
struct Job {
    action: ActionRef,
    kind: JobKind,
}

enum JobKind {
    SaveLocal {
        record: ManifestRecord,
        object: Object,
    },
    DeleteLocal {
        record: ManifestRecord,
    },
    SaveRemote {
        object: Object,
    },
    DeleteRemote,
}

impl Job {
    /// Whether a failure of `failed` prevents this job
    fn is_blocked_by(&self, failed: &ObjectKey) -> bool {
        if self.action.operation.is_delete() {
            self.action.key.is_ancestor_of(failed)
        } else {
            failed.is_ancestor_of(&self.action.key)
        }
    }
}

struct Stage {
    level: usize,
    deletes: bool,
    jobs: Vec<Job>,
}

#[derive(Default)]
struct UnitOutcome {
    /// Applied jobs with the object returned by a remote save
    applied: Vec<(Job, Option<Object>)>,
    failed: Vec<(ActionRef, Error)>,
    blocked: Vec<ActionRef>,
    cancelled: Vec<ActionRef>,
}

/// Applies plans against a pair of backends
pub struct Executor<'a> {
    local: &'a dyn LocalBackend,
    remote: &'a dyn RemoteBackend,
    naming: &'a dyn NamingResolver,
    options: ExecutorOptions,
    cancel: CancellationToken,
    span: Span,
}

impl<'a> Executor<'a> {
    pub fn new(
        local: &'a dyn LocalBackend,
        remote: &'a dyn RemoteBackend,
        naming: &'a dyn NamingResolver,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            local,
            remote,
            naming,
            options,
            cancel: CancellationToken::new(),
            span: Span::current(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Span entered by workers and handed to mapper hooks
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Apply every action of the plan at most once
    ///
    /// Per-action failures are collected in the report. Only a plan that
    /// fails validation returns an error.
    pub fn execute(
        &self,
        plan: Plan,
        registry: &mut Registry,
        manifest: &mut Manifest,
    ) -> Result<ExecutionReport> {
        plan.validate()?;

        let direction = plan.direction();
        let allow_remote_delete = plan.allow_remote_delete();
        let mut report = ExecutionReport::default();
        let mut touched: HashSet<ObjectKey> = HashSet::new();

        // Parents first, so new children can be placed under new parents.
        let mut actions = plan.into_actions();
        actions.sort_by(|a, b| a.level().cmp(&b.level()).then_with(|| a.path.cmp(&b.path)));

        let mut planned_paths: HashMap<ObjectKey, String> = HashMap::new();
        let mut local_jobs = Vec::new();
        let mut remote_jobs = Vec::new();
        let mut local_invalid = Vec::new();
        let mut remote_invalid = Vec::new();

        for action in &actions {
            let action_ref = ActionRef::from(action);
            touched.insert(action_ref.key.clone());

            if action.operation == Operation::DeleteRemote && !allow_remote_delete {
                warn!(key = %action_ref.key.desc(), path = %action_ref.path, "Remote deletion skipped");
                report.skipped.push(action_ref);
                continue;
            }

            match self.prepare(action, registry, &mut planned_paths) {
                Ok(kind) => {
                    let job = Job {
                        action: action_ref,
                        kind,
                    };
                    if action.operation.is_local() {
                        local_jobs.push(job);
                    } else {
                        remote_jobs.push(job);
                    }
                }
                Err(e) => {
                    error!(key = %action_ref.key.desc(), error = %e, "Invalid action");
                    if action.operation.is_local() {
                        local_invalid.push(action_ref.key.clone());
                    } else {
                        remote_invalid.push(action_ref.key.clone());
                    }
                    report.failed.push(action_ref);
                    report.errors.push(e);
                }
            }
        }

        info!(
            %direction,
            local = local_jobs.len(),
            remote = remote_jobs.len(),
            skipped = report.skipped.len(),
            "Executing plan"
        );

        let snapshot: &Registry = registry;
        let (local_outcome, remote_outcome) = thread::scope(|s| {
            let local = s.spawn(|| self.run_unit(Unit::Local, local_jobs, local_invalid, snapshot));
            let remote = self.run_unit(Unit::Remote, remote_jobs, remote_invalid, snapshot);
            let local = local
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (local, remote)
        });

        for outcome in [&local_outcome, &remote_outcome] {
            report.blocked.extend(outcome.blocked.iter().cloned());
            report.cancelled.extend(outcome.cancelled.iter().cloned());
        }
        for (action, e) in local_outcome.failed.into_iter().chain(remote_outcome.failed) {
            report.failed.push(action);
            report.errors.push(e);
        }

        let remote_changes = self.commit_remote(remote_outcome.applied, registry, &mut report);
        self.commit_local(local_outcome.applied, registry, manifest, &mut report);

        if !remote_changes.is_empty() {
            let requested = {
                let ctx = MapperContext::new(registry, self.naming, &self.span);
                self.remote.after_batch(&ctx, remote_changes)
            };
            match requested {
                Ok(changes) => {
                    // Hooks may have rewritten the saved objects.
                    for object in changes.saved {
                        if let Err(e) = registry.apply_remote(object) {
                            report.errors.push(e);
                        }
                    }
                    let errors = self.apply_local_saves(changes.local_saves, registry, manifest);
                    report.errors.extend(errors);
                }
                Err(e) => {
                    error!(error = %e, "Remote change hooks failed");
                    report.errors.push(e);
                }
            }
        }

        if self.cancel.is_cancelled() {
            report.errors.push(Error::Cancelled);
        } else {
            self.cleanup(registry, manifest, &touched, &mut report);
        }

        report.sort();
        info!(%direction, summary = %report.summary(), "Execution finished");
        Ok(report)
    }

    /// Resolve the record and object an action needs
    fn prepare(
        &self,
        action: &Action,
        registry: &Registry,
        planned_paths: &mut HashMap<ObjectKey, String>,
    ) -> Result<JobKind> {
        let state = &action.state;
        let key = state.key();
        let invalid = |reason: &str| Error::InvalidAction {
            key: key.clone(),
            operation: action.operation.verb(),
            reason: reason.to_string(),
        };

        match action.operation {
            Operation::SaveLocal => {
                let object = state
                    .remote()
                    .ok_or_else(|| invalid("no remote object"))?
                    .clone();
                let record = match state.manifest() {
                    Some(record) => record.clone(),
                    None => {
                        let parent_path = match key.parent() {
                            Some(parent) => Some(
                                planned_paths
                                    .get(&parent)
                                    .map(String::as_str)
                                    .or_else(|| registry.get(&parent).and_then(ObjectState::path))
                                    .ok_or_else(|| invalid("parent has no local path"))?,
                            ),
                            None => None,
                        };
                        let path = self.naming.path_for(key, &object, parent_path);
                        ManifestRecord::new(key.clone(), path)
                    }
                };
                planned_paths.insert(key.clone(), record.path.clone());
                Ok(JobKind::SaveLocal { record, object })
            }
            Operation::DeleteLocal => {
                let record = state
                    .manifest()
                    .ok_or_else(|| invalid("no manifest record"))?
                    .clone();
                Ok(JobKind::DeleteLocal { record })
            }
            Operation::SaveRemote => {
                let object = state
                    .local()
                    .ok_or_else(|| invalid("no local object"))?
                    .clone();
                Ok(JobKind::SaveRemote { object })
            }
            Operation::DeleteRemote => {
                if !state.has_remote() {
                    return Err(invalid("no remote object"));
                }
                Ok(JobKind::DeleteRemote)
            }
        }
    }

    fn run_unit(
        &self,
        unit: Unit,
        jobs: Vec<Job>,
        mut failed: Vec<ObjectKey>,
        registry: &Registry,
    ) -> UnitOutcome {
        let _guard = self.span.enter();
        let workers = match unit {
            Unit::Local => self.options.local_workers,
            Unit::Remote => self.options.remote_workers,
        };
        let ctx = MapperContext::new(registry, self.naming, &self.span);
        let mut outcome = UnitOutcome::default();

        for stage in stages(jobs) {
            if self.cancel.is_cancelled() {
                outcome
                    .cancelled
                    .extend(stage.jobs.into_iter().map(|job| job.action));
                continue;
            }

            let (blocked, runnable): (Vec<Job>, Vec<Job>) = stage
                .jobs
                .into_iter()
                .partition(|job| failed.iter().any(|f| job.is_blocked_by(f)));
            for job in blocked {
                warn!(%unit, key = %job.action.key.desc(), operation = %job.action.operation, "Action blocked by a failed action");
                failed.push(job.action.key.clone());
                outcome.blocked.push(job.action);
            }
            if runnable.is_empty() {
                continue;
            }

            info!(%unit, level = stage.level, deletes = stage.deletes, actions = runnable.len(), "Executing stage");
            let results = run_pool(workers, runnable, &self.cancel, &self.span, |job| {
                self.apply(&ctx, job)
            });

            for (job, result) in results {
                match result {
                    None => outcome.cancelled.push(job.action),
                    Some(Ok(saved)) => {
                        debug!(%unit, key = %job.action.key.desc(), operation = %job.action.operation, "Applied");
                        outcome.applied.push((job, saved));
                    }
                    Some(Err(e)) => {
                        error!(%unit, key = %job.action.key.desc(), operation = %job.action.operation, error = %e, "Action failed");
                        failed.push(job.action.key.clone());
                        outcome.failed.push((job.action, e));
                    }
                }
            }
        }
        outcome
    }

    /// Run one backend call, returning the stored object of a remote save
    fn apply(&self, ctx: &MapperContext<'_>, job: &Job) -> Result<Option<Object>> {
        match &job.kind {
            JobKind::SaveLocal { record, object } => {
                self.local.save(ctx, record, object)?;
                Ok(None)
            }
            JobKind::DeleteLocal { record } => {
                self.local.delete(record)?;
                Ok(None)
            }
            JobKind::SaveRemote { object } => {
                let saved = self.remote.save(object, &self.options.change_description)?;
                Ok(Some(saved))
            }
            JobKind::DeleteRemote => {
                self.remote
                    .delete(&job.action.key, &self.options.change_description)?;
                Ok(None)
            }
        }
    }

    fn commit_remote(
        &self,
        applied: Vec<(Job, Option<Object>)>,
        registry: &mut Registry,
        report: &mut ExecutionReport,
    ) -> RemoteChanges {
        let mut changes = RemoteChanges::default();
        for (job, saved) in applied {
            let key = job.action.key.clone();
            let result = match (job.kind, saved) {
                (JobKind::SaveRemote { .. }, Some(object)) => {
                    changes.saved.push(object.clone());
                    registry.apply_remote(object)
                }
                (JobKind::DeleteRemote, _) => {
                    changes.deleted.push(key.clone());
                    forget_remote_subtree(registry, &key)
                }
                _ => Ok(()),
            };
            if let Err(e) = result {
                report.errors.push(e);
            }
            report.applied.push(job.action);
        }
        changes
    }

    fn commit_local(
        &self,
        applied: Vec<(Job, Option<Object>)>,
        registry: &mut Registry,
        manifest: &mut Manifest,
        report: &mut ExecutionReport,
    ) {
        for (job, _) in applied {
            let result = match job.kind {
                JobKind::SaveLocal { record, object } => {
                    let record = saved_record(record);
                    manifest.set(record.clone());
                    registry.apply_local(object, record)
                }
                JobKind::DeleteLocal { record } => {
                    manifest.remove(&record.key);
                    registry.forget_local(&record.key)
                }
                _ => Ok(()),
            };
            if let Err(e) = result {
                report.errors.push(e);
            }
            report.applied.push(job.action);
        }
    }

    /// Local saves requested by remote change hooks, applied sequentially
    ///
    /// Each key is saved from its remote view, which carries any rewrite the
    /// hooks made, falling back to the local view. Failures are returned, the
    /// remaining saves still run.
    pub fn apply_local_saves(
        &self,
        keys: Vec<ObjectKey>,
        registry: &mut Registry,
        manifest: &mut Manifest,
    ) -> Errors {
        let mut errors = Errors::new();
        for key in keys {
            let prepared = registry.get(&key).and_then(|state| {
                let object = state.remote().or(state.local())?.clone();
                let record = match state.manifest() {
                    Some(record) => record.clone(),
                    None => {
                        let parent_path = registry.parent_path(&key);
                        let path = self.naming.path_for(&key, &object, parent_path);
                        ManifestRecord::new(key.clone(), path)
                    }
                };
                Some((record, object))
            });
            let Some((record, object)) = prepared else {
                warn!(key = %key.desc(), "Requested local save of an unknown object");
                continue;
            };

            let saved = {
                let ctx = MapperContext::new(registry, self.naming, &self.span);
                self.local.save(&ctx, &record, &object)
            };
            match saved {
                Ok(()) => {
                    debug!(key = %key.desc(), path = %record.path, "Saved locally after remote change");
                    let record = saved_record(record);
                    manifest.set(record.clone());
                    if let Err(e) = registry.apply_local(object, record) {
                        errors.push(e);
                    }
                }
                Err(e) => {
                    error!(key = %key.desc(), error = %e, "Requested local save failed");
                    errors.push(e);
                }
            }
        }
        errors
    }

    /// Delete manifest records whose objects vanished from disk
    ///
    /// Best effort: failures are logged and the records kept.
    fn cleanup(
        &self,
        registry: &mut Registry,
        manifest: &mut Manifest,
        touched: &HashSet<ObjectKey>,
        report: &mut ExecutionReport,
    ) {
        let stale: Vec<ManifestRecord> = registry
            .states()
            .filter(|state| !state.has_local() && !touched.contains(state.key()))
            .filter_map(|state| state.manifest().filter(|record| record.not_found).cloned())
            .collect();

        for record in stale {
            match self.local.delete(&record) {
                Ok(()) => {
                    debug!(key = %record.key.desc(), path = %record.path, "Removed stale manifest record");
                    manifest.remove(&record.key);
                    if let Err(e) = registry.forget_local(&record.key) {
                        warn!(key = %record.key.desc(), error = %e, "Cleanup left the registry inconsistent");
                    }
                    report.cleaned.push(record.key);
                }
                Err(e) => {
                    warn!(key = %record.key.desc(), error = %e, "Cleanup failed");
                }
            }
        }
    }
}

fn saved_record(record: ManifestRecord) -> ManifestRecord {
    ManifestRecord {
        persisted: true,
        not_found: false,
        ..record
    }
}

fn forget_remote_subtree(registry: &mut Registry, key: &ObjectKey) -> projsync_model::Result<()> {
    let keys: Vec<ObjectKey> = registry
        .states()
        .filter(|state| state.has_remote())
        .map(|state| state.key().clone())
        .filter(|k| k == key || key.is_ancestor_of(k))
        .collect();
    for k in keys {
        registry.forget_remote(&k)?;
    }
    Ok(())
}

/// Saves by ascending level, then deletes by descending level
fn stages(jobs: Vec<Job>) -> Vec<Stage> {
    let mut saves: BTreeMap<usize, Vec<Job>> = BTreeMap::new();
    let mut deletes: BTreeMap<usize, Vec<Job>> = BTreeMap::new();
    for job in jobs {
        let level = job.action.key.level();
        let target = if job.action.operation.is_delete() {
            &mut deletes
        } else {
            &mut saves
        };
        target.entry(level).or_default().push(job);
    }

    let saves = saves.into_iter().map(|(level, jobs)| Stage {
        level,
        deletes: false,
        jobs,
    });
    let deletes = deletes.into_iter().rev().map(|(level, jobs)| Stage {
        level,
        deletes: true,
        jobs,
    });
    saves.chain(deletes).collect()
}

/// Run jobs on at most `workers` scoped threads
///
/// Jobs not started because of cancellation come back with `None`.
fn run_pool<J, R, F>(
    workers: usize,
    jobs: Vec<J>,
    cancel: &CancellationToken,
    span: &Span,
    f: F,
) -> Vec<(J, Option<R>)>
where
    J: Send,
    R: Send,
    F: Fn(&J) -> R + Sync,
{
    let workers = workers.clamp(1, jobs.len().max(1));
    let (job_tx, job_rx) = unbounded::<J>();
    let (out_tx, out_rx) = unbounded::<(J, Option<R>)>();

    for job in jobs {
        // The receiver outlives this loop, so sending cannot fail.
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|s| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let out_tx = out_tx.clone();
            let f = &f;
            s.spawn(move || {
                let _guard = span.enter();
                for job in job_rx {
                    let result = (!cancel.is_cancelled()).then(|| f(&job));
                    if out_tx.send((job, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(out_tx);

    out_rx.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use projsync_model::{BranchKey, ConfigKey};
    use std::sync::atomic::AtomicUsize;

    fn job(key: ObjectKey, operation: Operation) -> Job {
        Job {
            action: ActionRef {
                key,
                operation,
                path: String::new(),
            },
            kind: JobKind::DeleteRemote,
        }
    }

    #[test]
    fn test_stages_order() {
        let branch: ObjectKey = BranchKey::new(1).into();
        let config: ObjectKey = ConfigKey::new(1, "ex", "1").into();
        let row: ObjectKey = ConfigKey::new(1, "ex", "1").row("1").into();

        let stages = stages(vec![
            job(branch.clone(), Operation::DeleteRemote),
            job(row.clone(), Operation::SaveRemote),
            job(config.clone(), Operation::DeleteRemote),
            job(branch.clone(), Operation::SaveRemote),
            job(row.clone(), Operation::DeleteRemote),
        ]);

        let order: Vec<(usize, bool)> = stages.iter().map(|s| (s.level, s.deletes)).collect();
        assert_eq!(order, vec![(0, false), (2, false), (2, true), (1, true), (0, true)]);
    }

    #[test]
    fn test_blocking_rules() {
        let branch: ObjectKey = BranchKey::new(1).into();
        let row: ObjectKey = ConfigKey::new(1, "ex", "1").row("1").into();

        assert!(job(row.clone(), Operation::SaveLocal).is_blocked_by(&branch));
        assert!(!job(branch.clone(), Operation::SaveLocal).is_blocked_by(&row));
        assert!(job(branch.clone(), Operation::DeleteLocal).is_blocked_by(&row));
        assert!(!job(row, Operation::DeleteLocal).is_blocked_by(&branch));
    }

    #[test]
    fn test_pool_runs_every_job_once() {
        let calls = AtomicUsize::new(0);
        let token = CancellationToken::new();
        let results = run_pool(3, (0..20).collect(), &token, &Span::none(), |n: &i32| {
            calls.fetch_add(1, Ordering::SeqCst);
            n * 2
        });

        assert_eq!(calls.load(Ordering::SeqCst), 20);
        let mut doubled: Vec<i32> = results.into_iter().filter_map(|(_, r)| r).collect();
        doubled.sort();
        assert_eq!(doubled, (0..20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_pool_respects_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let results = run_pool(2, vec![1, 2, 3], &token, &Span::none(), |n: &i32| *n);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, r)| r.is_none()));
    }
}
