// src/store/mod.rs

//! Persistence codec: key encoding, key-value store, and text formats.
//!
//! The canonical key encoding in [`keys`] is shared by the key-value
//! store ([`kv`]) and referenced by the status text format ([`status`]);
//! [`export`] renders shell-evaluable environment exports.

pub mod export;
pub mod keys;
pub mod kv;
pub mod status;

pub use export::{export_component, export_resource};
pub use keys::{KeyKind, ResourceKey};
pub use kv::KvStore;
pub use status::{
    load_status_file, parse_component, render_component, render_resource, store_status_file,
    StatusOptions,
};
