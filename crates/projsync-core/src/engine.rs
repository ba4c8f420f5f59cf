//! SyncEngine implementation
//!
//! The SyncEngine ties the pieces together for one project: it loads both
//! sides through the backends, diffs them, builds a plan for the requested
//! direction and hands the plan to the executor.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{Span, info, info_span, warn};
use uuid::Uuid;

use projsync_diff::{Differ, Results};
use projsync_model::{Manifest, ObjectKey, Registry};

use crate::backend::{DefaultNaming, LocalBackend, NamingResolver, RemoteBackend};
use crate::config::{SyncConfig, SyncOptions};
use crate::error::{Error, Errors, Result};
use crate::executor::{CancellationToken, ExecutionReport, Executor, ExecutorOptions};
use crate::mapper::MapperContext;
use crate::plan::{Direction, Plan, PlanSummary};

/// Report from a pull or push
#[derive(Debug)]
pub struct SyncReport {
    pub direction: Direction,
    /// Id of the run, also present in the tracing span and the default
    /// change description
    pub run_id: String,
    pub dry_run: bool,
    /// Rendered plan
    pub plan: String,
    pub summary: PlanSummary,
    /// `None` for dry runs
    pub execution: Option<ExecutionReport>,
    /// Load and comparison errors a forced run carried on past
    pub warnings: Errors,
}

impl SyncReport {
    /// Whether the run applied everything it planned and tolerated nothing
    pub fn success(&self) -> bool {
        self.warnings.is_empty()
            && self
                .execution
                .as_ref()
                .is_none_or(ExecutionReport::is_success)
    }
}

/// Everything a full load produced
#[derive(Debug)]
pub struct LoadedProject {
    pub registry: Registry,
    /// Local saves requested by remote change hooks while loading
    pub local_saves: Vec<ObjectKey>,
    /// Objects that failed to load; they are missing from the registry
    pub errors: Errors,
}

/// Engine for synchronizing a local tree with a remote project
///
/// The SyncEngine provides two main operations:
/// - **pull**: make the local tree match the remote project
/// - **push**: make the remote project match the local tree
///
/// The individual steps (`load`, `diff`, `plan`, `execute`) are public for
/// callers that need to inspect or alter the plan in between.
pub struct SyncEngine {
    config: SyncConfig,
    local: Arc<dyn LocalBackend>,
    remote: Arc<dyn RemoteBackend>,
    naming: Arc<dyn NamingResolver>,
    manifest: Manifest,
    /// Where the manifest is persisted after each execution
    manifest_path: Option<PathBuf>,
    cancel: CancellationToken,
}

impl SyncEngine {
    /// Create an engine with an in-memory manifest
    pub fn new(
        config: SyncConfig,
        local: Arc<dyn LocalBackend>,
        remote: Arc<dyn RemoteBackend>,
    ) -> Self {
        Self {
            config,
            local,
            remote,
            naming: Arc::new(DefaultNaming),
            manifest: Manifest::new(),
            manifest_path: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Create an engine whose manifest is loaded from, and saved to, a file
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest file exists but cannot be read or
    /// parsed.
    pub fn open(
        config: SyncConfig,
        local: Arc<dyn LocalBackend>,
        remote: Arc<dyn RemoteBackend>,
        manifest_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let manifest_path = manifest_path.into();
        let manifest = Manifest::load_or_default(&manifest_path)?;
        let mut engine = Self::new(config, local, remote);
        engine.manifest = manifest;
        engine.manifest_path = Some(manifest_path);
        Ok(engine)
    }

    pub fn with_naming(mut self, naming: Arc<dyn NamingResolver>) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Token that cancels the running execution when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Load both sides into a fresh registry
    ///
    /// # Errors
    ///
    /// Every object that failed to load is reported; nothing is returned
    /// unless both loads succeeded completely.
    pub fn load(&self) -> Result<Registry> {
        let loaded = self.load_project()?;
        loaded.errors.into_result()?;
        Ok(loaded.registry)
    }

    /// Load both sides, keeping the states that loaded next to the errors
    ///
    /// # Errors
    ///
    /// Only fails when the loaded states cannot form a registry.
    pub fn load_project(&self) -> Result<LoadedProject> {
        let empty = Registry::new();
        let span = Span::current();
        let ctx = MapperContext::new(&empty, self.naming.as_ref(), &span);

        let local = self.local.load_all(&ctx, &self.manifest);
        let remote = self.remote.load_all(&ctx);
        info!(
            local = local.states.len(),
            remote = remote.states.len(),
            errors = local.errors.len() + remote.errors.len(),
            "Loaded project"
        );

        let mut errors = Errors::new();
        errors.extend(local.errors);
        errors.extend(remote.errors);
        let mut local_saves = local.local_saves;
        for key in remote.local_saves {
            if !local_saves.contains(&key) {
                local_saves.push(key);
            }
        }

        Ok(LoadedProject {
            registry: Registry::from_loaded(local.states, remote.states)?,
            local_saves,
            errors,
        })
    }

    /// Diff the registry
    ///
    /// # Errors
    ///
    /// Returns the comparison errors of all objects that could not be diffed.
    pub fn diff(&self, registry: &Registry) -> Result<Results> {
        let (results, errors) = self.compare(registry);
        errors.into_result()?;
        Ok(results)
    }

    /// Diff the registry, returning partial results next to the errors
    fn compare(&self, registry: &Registry) -> (Results, Errors) {
        let mut results = Differ::new(self.config.diff_options()).diff(registry);
        let mut errors = Errors::new();
        errors.extend(std::mem::take(&mut results.errors).into_iter().map(Error::from));
        (results, errors)
    }

    /// Build and validate the plan for a direction
    pub fn plan(
        &self,
        direction: Direction,
        registry: &Registry,
        results: &Results,
        options: &SyncOptions,
    ) -> Result<Plan> {
        let mut plan = Plan::build(direction, results, registry)?;
        plan.set_allow_remote_delete(self.config.plan.allow_remote_delete || options.force);
        plan.validate()?;
        Ok(plan)
    }

    /// Execute a plan and persist the manifest
    pub fn execute(&mut self, plan: Plan, registry: &mut Registry) -> Result<ExecutionReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("sync", direction = %plan.direction(), %run_id);
        self.execute_in(plan, registry, Vec::new(), &run_id, span)
    }

    /// Pull remote changes into the local tree
    pub fn pull(&mut self, options: SyncOptions) -> Result<SyncReport> {
        self.sync(Direction::Pull, options)
    }

    /// Push local changes to the remote project
    pub fn push(&mut self, options: SyncOptions) -> Result<SyncReport> {
        self.sync(Direction::Push, options)
    }

    /// Run load, diff, plan and, unless `dry_run`, execute
    ///
    /// Load and comparison errors abort the run unless `force` is set. A
    /// forced run logs them, plans from whatever loaded and compared, and
    /// returns them as the report's warnings.
    pub fn sync(&mut self, direction: Direction, options: SyncOptions) -> Result<SyncReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("sync", %direction, %run_id);
        let _guard = span.enter();

        let LoadedProject {
            mut registry,
            local_saves,
            errors: load_errors,
        } = self.load_project()?;
        let mut warnings = tolerate(load_errors, options.force)?;

        let (results, diff_errors) = self.compare(&registry);
        warnings.extend(tolerate(diff_errors, options.force)?);

        let plan = self.plan(direction, &registry, &results, &options)?;
        let summary = plan.summary();
        let rendered = plan.format();
        info!(%summary, "Plan built");

        let execution = if options.dry_run {
            info!(requested_saves = local_saves.len(), "Dry run, plan not executed");
            None
        } else {
            Some(self.execute_in(plan, &mut registry, local_saves, &run_id, span.clone())?)
        };

        Ok(SyncReport {
            direction,
            run_id,
            dry_run: options.dry_run,
            plan: rendered,
            summary,
            execution,
            warnings,
        })
    }

    fn execute_in(
        &mut self,
        plan: Plan,
        registry: &mut Registry,
        local_saves: Vec<ObjectKey>,
        run_id: &str,
        span: Span,
    ) -> Result<ExecutionReport> {
        let direction = plan.direction();
        let options = ExecutorOptions {
            local_workers: self.config.executor.local_workers,
            remote_workers: self.config.executor.remote_workers,
            change_description: self
                .config
                .executor
                .change_description
                .clone()
                .unwrap_or_else(|| format!("projsync {direction} run {run_id}")),
        };

        let executor = Executor::new(
            self.local.as_ref(),
            self.remote.as_ref(),
            self.naming.as_ref(),
            options,
        )
        .with_cancellation(self.cancel.clone())
        .with_span(span);
        let mut report = executor.execute(plan, registry, &mut self.manifest)?;
        if !local_saves.is_empty() {
            let errors = executor.apply_local_saves(local_saves, registry, &mut self.manifest);
            report.errors.extend(errors);
        }

        if let Some(path) = &self.manifest_path {
            self.manifest.save(path)?;
        }
        Ok(report)
    }
}

/// Pass non-fatal errors through as warnings when forced, fail otherwise
fn tolerate(errors: Errors, force: bool) -> Result<Errors> {
    if errors.is_empty() || !force {
        errors.into_result()?;
        return Ok(Errors::new());
    }
    for error in errors.iter() {
        warn!(error = %error, "Continuing past error");
    }
    Ok(errors)
}
