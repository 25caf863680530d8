// src/lib.rs

//! hostconf — host configuration profile core
//!
//! The data model and reconciliation engine of a configuration
//! distribution platform. A host's desired configuration is a profile: a
//! tree of named components holding typed resources, conditioned by a
//! prioritized set of contexts. This crate owns:
//!
//! - Contexts and their boolean/priority evaluation, including the
//!   pending/active promotion cycle
//! - The typed resource model with validation, templates, and merge rules
//! - The diff engine (resource, component, and whole-profile deltas, plus
//!   the cheap quickdiff pre-filter)
//! - The persistence codec: key encoding, key-value store, status files,
//!   hold files, and environment exports
//! - The package version comparator used during merge tie-breaking
//!
//! Profile loading from XML, CLI tooling, and package discovery are
//! external collaborators that call in through the types re-exported
//! here.

pub mod change;
pub mod component;
pub mod context;
pub mod derivation;
pub mod diff;
mod error;
pub mod packages;
pub mod resource;
pub mod store;
pub mod version;

pub use change::Change;
pub use component::{Component, Profile};
pub use context::{
    combine_expressions, promote, Context, ContextList, DirLock, PromoteOutcome,
};
pub use derivation::{Derivation, DerivationList, SharedDerivation};
pub use diff::{
    component_diff, profile_diff, quickdiff, render_holdfile, resource_diff, ComponentDiff,
    ProfileDiff, QuickDiff, ResourceDiff,
};
pub use error::{Error, Result};
pub use packages::{Package, PackageList, PackagePrefix};
pub use resource::{
    canonicalize_boolean, decode_value, encode_value, valid_name, Resource, ResourceType,
    TemplateChain,
};
pub use store::{KeyKind, KvStore, ResourceKey, StatusOptions};
pub use version::{compare_version_release, compare_versions};
