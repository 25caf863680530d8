// src/resource/template.rs

//! Child-resource name templates.
//!
//! A list resource may carry a whitespace-separated chain of templates
//! such as `server_$ port_$_$`. Each `$` placeholder is substituted
//! left-to-right from a supplied tag list, producing one child-resource
//! name per template. The generated names must themselves be valid
//! resource names, so tags are restricted to the resource-name-safe
//! alphabet.

use super::valid_name;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Placeholder character inside a template
pub const PLACEHOLDER: char = '$';

/// A single template, e.g. `prefix_$_$`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
    placeholders: usize,
}

impl Template {
    /// Parse a template, counting its placeholders (at least one required)
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Parse("empty template".into()));
        }
        let placeholders = s.chars().filter(|c| *c == PLACEHOLDER).count();
        if placeholders == 0 {
            return Err(Error::Parse(format!(
                "template '{}' has no {} placeholder",
                s, PLACEHOLDER
            )));
        }
        Ok(Self {
            text: s.to_string(),
            placeholders,
        })
    }

    pub fn placeholders(&self) -> usize {
        self.placeholders
    }

    /// Substitute placeholders left-to-right from `tags`
    pub fn expand(&self, tags: &[&str]) -> Result<String> {
        if tags.len() < self.placeholders {
            return Err(Error::validation("template tags", self.text.clone()));
        }

        let mut out = String::with_capacity(self.text.len() + tags.len() * 4);
        let mut next = 0;
        for c in self.text.chars() {
            if c == PLACEHOLDER {
                out.push_str(tags[next]);
                next += 1;
            } else {
                out.push(c);
            }
        }

        if !valid_name(&out) {
            return Err(Error::validation("expanded resource name", out));
        }
        Ok(out)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A whitespace-separated chain of templates
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateChain {
    templates: Vec<Template>,
}

impl TemplateChain {
    /// Parse a chain like `server_$ port_$_$`
    pub fn parse(s: &str) -> Result<Self> {
        let templates = s
            .split_whitespace()
            .map(Template::parse)
            .collect::<Result<Vec<_>>>()?;
        if templates.is_empty() {
            return Err(Error::Parse("empty template chain".into()));
        }
        Ok(Self { templates })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    /// Apply every template in the chain; one generated name per template
    pub fn expand(&self, tags: &[&str]) -> Result<Vec<String>> {
        self.templates.iter().map(|t| t.expand(tags)).collect()
    }
}

impl fmt::Display for TemplateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.templates.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl FromStr for TemplateChain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TemplateChain::parse(s)
    }
}
