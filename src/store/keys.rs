// src/store/keys.rs

//! Canonical resource key encoding.
//!
//! Every persisted resource attribute lives under a key of the form
//! `[type_symbol]?[namespace.]?[component.]?resource`, where the leading
//! symbol selects the attribute: none for the value itself, `%` type,
//! `#` derivation, `=` context, `^` priority. The same encoding is used
//! by the key-value store reader and writer and is the canonical form
//! diff and merge report; it must stay byte-exact.

use crate::error::{Error, Result};
use std::fmt;

/// Which attribute of a resource a key addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyKind {
    /// The value itself; no symbol prefix
    #[default]
    Value,
    /// `%` — resource type
    Type,
    /// `#` — derivation
    Derivation,
    /// `=` — context expression
    Context,
    /// `^` — evaluated priority
    Priority,
}

impl KeyKind {
    /// The symbol prefix, empty for `Value`
    pub fn symbol(self) -> &'static str {
        match self {
            KeyKind::Value => "",
            KeyKind::Type => "%",
            KeyKind::Derivation => "#",
            KeyKind::Context => "=",
            KeyKind::Priority => "^",
        }
    }

    fn from_leading(c: char) -> Option<Self> {
        match c {
            '%' => Some(KeyKind::Type),
            '#' => Some(KeyKind::Derivation),
            '=' => Some(KeyKind::Context),
            '^' => Some(KeyKind::Priority),
            _ => None,
        }
    }
}

/// A parsed store key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    pub kind: KeyKind,
    pub namespace: Option<String>,
    pub component: Option<String>,
    pub resource: String,
}

impl ResourceKey {
    /// A bare value key for `resource`
    pub fn value(resource: impl Into<String>) -> Self {
        Self {
            kind: KeyKind::Value,
            namespace: None,
            component: None,
            resource: resource.into(),
        }
    }

    pub fn with_kind(mut self, kind: KeyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Render the canonical byte-exact form
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push_str(self.kind.symbol());
        if let Some(ns) = &self.namespace {
            out.push_str(ns);
            out.push('.');
        }
        if let Some(component) = &self.component {
            out.push_str(component);
            out.push('.');
        }
        out.push_str(&self.resource);
        out
    }

    /// Parse a key back into its parts.
    ///
    /// Dots split namespace/component/resource: one dot means
    /// component.resource, two mean namespace.component.resource. More
    /// than two dots is malformed.
    pub fn parse(key: &str) -> Result<Self> {
        let (kind, rest) = match key.chars().next() {
            None => return Err(Error::Parse("empty store key".into())),
            Some(c) => match KeyKind::from_leading(c) {
                Some(kind) => (kind, &key[c.len_utf8()..]),
                None => (KeyKind::Value, key),
            },
        };

        if rest.is_empty() {
            return Err(Error::Parse(format!("store key '{}' has no name", key)));
        }

        let parts: Vec<&str> = rest.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(Error::Parse(format!("empty segment in store key '{}'", key)));
        }

        let (namespace, component, resource) = match parts.as_slice() {
            [resource] => (None, None, *resource),
            [component, resource] => (None, Some(*component), *resource),
            [namespace, component, resource] => (Some(*namespace), Some(*component), *resource),
            _ => {
                return Err(Error::Parse(format!(
                    "too many segments in store key '{}'",
                    key
                )))
            }
        };

        Ok(Self {
            kind,
            namespace: namespace.map(str::to_string),
            component: component.map(str::to_string),
            resource: resource.to_string(),
        })
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_forms() {
        let key = ResourceKey::value("port")
            .with_namespace("host1")
            .with_component("sshd");
        assert_eq!(key.encode(), "host1.sshd.port");
        assert_eq!(
            key.clone().with_kind(KeyKind::Type).encode(),
            "%host1.sshd.port"
        );
        assert_eq!(
            key.clone().with_kind(KeyKind::Derivation).encode(),
            "#host1.sshd.port"
        );
        assert_eq!(
            key.clone().with_kind(KeyKind::Context).encode(),
            "=host1.sshd.port"
        );
        assert_eq!(
            key.with_kind(KeyKind::Priority).encode(),
            "^host1.sshd.port"
        );
    }

    #[test]
    fn test_encode_partial_forms() {
        assert_eq!(ResourceKey::value("port").encode(), "port");
        assert_eq!(
            ResourceKey::value("port").with_component("sshd").encode(),
            "sshd.port"
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        for text in [
            "port",
            "sshd.port",
            "host1.sshd.port",
            "%host1.sshd.port",
            "#sshd.port",
            "=port",
            "^host1.sshd.port",
        ] {
            let key = ResourceKey::parse(text).unwrap();
            assert_eq!(key.encode(), text);
        }
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(ResourceKey::parse("%a.b").unwrap().kind, KeyKind::Type);
        assert_eq!(ResourceKey::parse("=a.b").unwrap().kind, KeyKind::Context);
        assert_eq!(ResourceKey::parse("a.b").unwrap().kind, KeyKind::Value);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ResourceKey::parse("").is_err());
        assert!(ResourceKey::parse("%").is_err());
        assert!(ResourceKey::parse("a..b").is_err());
        assert!(ResourceKey::parse("a.b.c.d").is_err());
        assert!(ResourceKey::parse(".a").is_err());
    }
}
