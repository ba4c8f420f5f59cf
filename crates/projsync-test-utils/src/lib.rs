//! Shared test utilities for the projsync workspace.
//!
//! This crate provides standardised fixtures for the engine test suites. It
//! is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`project`]: [`TestProject`] builder seeding both in-memory backends
//! - [`failing`]: backends failing on chosen keys
//! - [`mapper`]: [`RecordingMapper`] observing every hook call

pub mod failing;
pub mod mapper;
pub mod project;

pub use failing::{FailingLocal, FailingRemote};
pub use mapper::{RECORDED_FILE, RecordingMapper};
pub use project::{TestProject, branch, config, default_branch, row};
