//! Structural diff of local and remote project objects
//!
//! The [`Differ`] walks every [`ObjectState`](projsync_model::ObjectState) of
//! a registry and classifies it:
//!
//! | remote | local | result                        |
//! |--------|-------|-------------------------------|
//! | yes    | yes   | [`ResultState::Equal`] or [`ResultState::NotEqual`] |
//! | yes    | no    | [`ResultState::OnlyInRemote`] |
//! | no     | yes   | [`ResultState::OnlyInLocal`]  |
//!
//! Field comparison is type-directed: scalars are compared directly, JSON maps
//! are compared structurally (key order and indentation never matter),
//! relations are compared per side and composite structures are rendered to
//! text and diffed line by line.

pub mod differ;
pub mod error;
pub mod fields;
pub mod json;
pub mod relations;
pub mod render;
pub mod result;
pub mod text;

pub use differ::{DiffOptions, Differ};
pub use error::{Error, Result};
pub use fields::{Field, FieldValue, fields_for};
pub use json::{JsonChange, diff_maps, format_changes};
pub use relations::{SideDiff, diff_relations, format_side_diffs};
pub use result::{ChangedField, ChangedFields, DiffResult, ResultState, Results};
pub use text::{DEFAULT_CONTEXT_LINES, diff_text};
