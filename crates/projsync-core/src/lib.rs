//! Reconciliation engine for projsync
//!
//! This crate turns diff results into changes:
//!
//! - **Plan**: [`Plan`] classifies diff results into directional actions and
//!   validates them.
//! - **Executor**: [`Executor`] applies a plan through the backends with
//!   level ordering, bounded worker pools and failure aggregation.
//! - **Mappers**: [`MapperPipeline`] holds the translation rules backends
//!   call while loading and saving.
//! - **Engine**: [`SyncEngine`] runs load, diff, plan and execute for a pull
//!   or a push.
//!
//! ```text
//!   LocalBackend ─┐                        ┌─► LocalBackend ─► mappers
//!                 ├─► Registry ─► Differ ─► Plan ─► Executor
//!   RemoteBackend ┘                        └─► RemoteBackend ─► mappers
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mapper;
pub mod plan;

pub use backend::{
    DefaultNaming, LoadOutcome, LocalBackend, MemoryLocal, MemoryRemote, NamingResolver,
    RemoteBackend, RemoteWrite, StoredObject,
};
pub use config::{SyncConfig, SyncOptions};
pub use engine::{LoadedProject, SyncEngine, SyncReport};
pub use error::{Error, Errors, Result};
pub use executor::{ActionRef, CancellationToken, ExecutionReport, Executor, ExecutorOptions};
pub use mapper::{
    FileBundle, LocalLoadHook, LocalLoadRecipe, LocalSaveHook, LocalSaveRecipe, Mapper,
    MapperContext, MapperPipeline, RawFile, RemoteChangeHook, RemoteChanges,
};
pub use plan::{Action, Direction, Operation, Plan, PlanSummary};
