//! Object model for projsync
//!
//! Leaf data structures shared by the diff engine, the plan builder and the
//! executor:
//!
//! - **Keys**: [`ObjectKey`] is a closed sum over branch, config and config row
//!   keys forming a strict parent chain.
//! - **Objects**: [`Object`] carries the typed payload for a key, including
//!   relations, orchestrations, transformations and shared code.
//! - **States**: [`ObjectState`] pairs the remote view, the local view and the
//!   manifest record of one key.
//! - **Registry**: [`Registry`] owns every live state of a project.
//! - **Manifest**: [`Manifest`] is the persisted record store of local paths.
//!
//! ```text
//!   Branch ──► Config ──► ConfigRow
//!     │          │            │
//!     └──────────┴────────────┴──► ObjectState { remote, local, manifest }
//! ```

pub mod error;
pub mod key;
pub mod manifest;
pub mod object;
pub mod orchestration;
pub mod registry;
pub mod relation;
pub mod state;
pub mod transformation;

pub use error::{Error, Result};
pub use key::{
    BranchId, BranchKey, ComponentId, ConfigId, ConfigKey, ConfigRowKey, ObjectKey, ObjectKind,
    RowId,
};
pub use manifest::Manifest;
pub use object::{Branch, Config, ConfigRow, JsonMap, Object};
pub use orchestration::{Orchestration, Phase, Task};
pub use registry::Registry;
pub use relation::{Relation, RelationSide, Relations};
pub use state::{ManifestRecord, ObjectState};
pub use transformation::{Block, Code, Script, SharedCodeConfig, SharedCodeRow, Transformation};
