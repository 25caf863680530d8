// src/store/kv.rs

//! Key-value store backed by a single SQLite file.
//!
//! The mapping follows the canonical key encoding: for each component a
//! primary entry under the bare component name holds its sorted,
//! space-separated resource names (so a component can be enumerated
//! without a full scan), and each resource contributes up to five entries
//! under [`ResourceKey`] forms — the value always, type/derivation/
//! context/priority only when non-default. A resource listed in its
//! component's name entry but missing from the store reads back as
//! present-but-empty rather than missing.

use super::keys::{KeyKind, ResourceKey};
use crate::component::{Component, Profile};
use crate::error::{Error, Result};
use crate::resource::{decode_value, Resource, ResourceType};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use tracing::debug;

/// A single-file keyed store of profile data
pub struct KvStore {
    conn: Connection,
}

impl KvStore {
    /// Create (truncating any existing content) a store at `path`
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "DROP TABLE IF EXISTS kv;
             CREATE TABLE kv (key TEXT PRIMARY KEY, value TEXT NOT NULL);",
        )?;
        Ok(Self { conn })
    }

    /// Open an existing store read-only
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    /// Raw fetch of one entry
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Raw insert-or-replace of one entry
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Write every component of `profile` under `namespace`, atomically
    pub fn write_profile(&mut self, profile: &Profile, namespace: &str) -> Result<()> {
        let tx = self.conn.transaction()?;

        for component in profile.sorted_components() {
            let names = component.resource_names().join(" ");
            let list_key = ResourceKey::value(component.name())
                .with_namespace(namespace)
                .encode();
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![list_key, names],
            )?;

            for resource in component.sorted_resources() {
                let base = ResourceKey::value(resource.name())
                    .with_namespace(namespace)
                    .with_component(component.name());

                let mut write = |kind: KeyKind, value: String| {
                    tx.execute(
                        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                        params![base.clone().with_kind(kind).encode(), value],
                    )
                    .map(|_| ())
                };

                // The value entry is always written, escaped to one line
                write(KeyKind::Value, resource.encoded_value())?;

                // Metadata entries only when non-default
                if resource.rtype() != ResourceType::default() {
                    write(KeyKind::Type, resource.rtype().to_string())?;
                }
                if let Some(derivation) = resource.derivation() {
                    if !derivation.is_empty() {
                        write(KeyKind::Derivation, derivation.to_string())?;
                    }
                }
                if let Some(context) = resource.context() {
                    write(KeyKind::Context, context.to_string())?;
                }
                if resource.priority() != 0 {
                    write(KeyKind::Priority, resource.priority().to_string())?;
                }
            }
        }

        tx.commit()?;
        debug!(namespace, components = profile.len(), "wrote profile to store");
        Ok(())
    }

    /// Read one component back.
    ///
    /// The name-list entry must exist; each listed resource is then
    /// fetched individually, and one missing from the store is treated as
    /// present with an empty value.
    pub fn read_component(&self, namespace: &str, name: &str) -> Result<Component> {
        let list_key = ResourceKey::value(name).with_namespace(namespace).encode();
        let names = self.get(&list_key)?.ok_or_else(|| {
            Error::Parse(format!(
                "component '{}' not present in store under namespace '{}'",
                name, namespace
            ))
        })?;

        let mut component = Component::new(name);
        for rname in names.split_whitespace() {
            component.merge_resource(self.read_resource(namespace, name, rname)?);
        }
        Ok(component)
    }

    /// Read a whole profile given its component names
    pub fn read_profile(&self, namespace: &str, components: &[&str]) -> Result<Profile> {
        let mut profile = Profile::new();
        for name in components {
            profile.insert(self.read_component(namespace, name)?);
        }
        Ok(profile)
    }

    fn read_resource(&self, namespace: &str, component: &str, name: &str) -> Result<Resource> {
        let base = ResourceKey::value(name)
            .with_namespace(namespace)
            .with_component(component);

        let mut resource = Resource::new(name)?;

        // Type first so the value is validated against it
        if let Some(type_text) = self.get(&base.clone().with_kind(KeyKind::Type).encode())? {
            let rtype: ResourceType = type_text
                .parse()
                .map_err(|_| Error::Parse(format!("unknown resource type '{}'", type_text)))?;
            resource.set_type(rtype)?;
        }

        // Listed-but-unwritten and empty value entries both read back as
        // absent; a non-String type never re-validates ""
        if let Some(encoded) = self.get(&base.encode())? {
            if !encoded.is_empty() {
                resource.set_value(decode_value(&encoded))?;
            }
        }

        if let Some(derivation) = self.get(&base.clone().with_kind(KeyKind::Derivation).encode())? {
            resource.set_derivation(Some(crate::derivation::SharedDerivation::parse(
                &derivation,
            )?));
        }
        if let Some(context) = self.get(&base.clone().with_kind(KeyKind::Context).encode())? {
            resource.set_context(Some(context));
        }
        if let Some(priority) = self.get(&base.clone().with_kind(KeyKind::Priority).encode())? {
            let parsed = priority
                .parse::<i32>()
                .map_err(|_| Error::Parse(format!("bad priority '{}' in store", priority)))?;
            resource.set_priority(parsed);
        }

        Ok(resource)
    }
}
