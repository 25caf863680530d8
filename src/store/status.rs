// src/store/status.rs

//! Status text format.
//!
//! One resource per line, `[namespace.][component.]resource[context]=value`,
//! with optional metadata lines prefixed by the key symbols: `%key=type`,
//! `#key=derivation`, `=key=context`, `^key=priority`. Metadata is only
//! emitted when non-default. A list resource's template chain rides along
//! inside the type annotation (`%key=list: server_$`), so the type line is
//! emitted whenever a template is present even though `list` itself is
//! not the default type spelling.

use super::keys::{KeyKind, ResourceKey};
use crate::component::Component;
use crate::error::{Error, Result};
use crate::resource::{decode_value, encode_value, Resource, ResourceType, TemplateChain};
use std::fmt::Write as _;
use std::path::Path;

/// Serialization options, enumerated explicitly.
///
/// All options default to off; [`StatusOptions::for_status_file`] is the
/// combination status files are written with.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusOptions {
    /// Omit the namespace/component prefix from keys
    pub no_prefix: bool,
    /// Omit the `[context]` suffix
    pub no_context: bool,
    /// Terminate a single-resource render with a newline
    pub newline: bool,
    /// Emit metadata lines (type, derivation, priority)
    pub use_meta: bool,
    /// Leave template chains out of the type annotation
    pub notemplates: bool,
    /// Treat a missing input file as an empty component
    pub allow_noexist: bool,
    /// Escape CR/LF/`&` in values
    pub encode: bool,
}

impl StatusOptions {
    /// Options used for on-disk status files: metadata, escaping, newlines
    pub fn for_status_file() -> Self {
        Self {
            newline: true,
            use_meta: true,
            encode: true,
            ..Self::default()
        }
    }
}

/// The type annotation text, with the template chain appended when present
fn type_annotation(resource: &Resource, options: &StatusOptions) -> Option<String> {
    let template = resource.template().filter(|_| !options.notemplates);
    match (resource.rtype() != ResourceType::default(), template) {
        (false, None) => None,
        (_, Some(chain)) => Some(format!("{}: {}", resource.rtype(), chain)),
        (true, None) => Some(resource.rtype().to_string()),
    }
}

/// Render one resource as status text
pub fn render_resource(
    resource: &Resource,
    namespace: Option<&str>,
    component: Option<&str>,
    options: &StatusOptions,
) -> String {
    let mut key = ResourceKey::value(resource.name());
    if !options.no_prefix {
        if let Some(ns) = namespace {
            key = key.with_namespace(ns);
        }
        if let Some(c) = component {
            key = key.with_component(c);
        }
    }
    let key_text = key.encode();

    let value = if options.encode {
        resource.encoded_value()
    } else {
        resource.value_or_empty().to_string()
    };

    let mut out = String::new();
    let _ = write!(out, "{}", key_text);
    if !options.no_context {
        if let Some(context) = resource.context() {
            let _ = write!(out, "[{}]", context);
        }
    }
    let _ = write!(out, "={}", value);

    if options.use_meta {
        if let Some(annotation) = type_annotation(resource, options) {
            let _ = write!(out, "\n%{}={}", key_text, annotation);
        }
        if let Some(derivation) = resource.derivation() {
            if !derivation.is_empty() {
                let _ = write!(out, "\n#{}={}", key_text, derivation);
            }
        }
        if resource.priority() != 0 {
            let _ = write!(out, "\n^{}={}", key_text, resource.priority());
        }
    }

    if options.newline {
        out.push('\n');
    }
    out
}

/// Render a whole component, resources in name order
pub fn render_component(
    component: &Component,
    namespace: Option<&str>,
    options: &StatusOptions,
) -> String {
    let mut line_options = *options;
    line_options.newline = true;

    let mut out = String::new();
    for resource in component.sorted_resources() {
        out.push_str(&render_resource(
            resource,
            namespace,
            Some(component.name()),
            &line_options,
        ));
    }
    out
}

/// Parse a type annotation, splitting off any embedded template chain
fn parse_type_annotation(resource: &mut Resource, text: &str) -> Result<()> {
    let (type_text, template_text) = match text.split_once(':') {
        Some((t, rest)) => (t.trim(), Some(rest.trim())),
        None => (text.trim(), None),
    };

    let rtype: ResourceType = type_text
        .parse()
        .map_err(|_| Error::Parse(format!("unknown resource type '{}'", type_text)))?;
    resource.set_type(rtype)?;

    if let Some(template_text) = template_text.filter(|t| !t.is_empty()) {
        resource.set_template(Some(TemplateChain::parse(template_text)?));
    }
    Ok(())
}

/// Parse status text into a component named `name`.
///
/// Metadata lines must follow the main line of the resource they
/// annotate having appeared; an annotation for an unknown resource is a
/// parse error.
pub fn parse_component(text: &str, name: &str, options: &StatusOptions) -> Result<Component> {
    let mut component = Component::new(name);

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let located = |msg: String| Error::ParseAt {
            file: format!("<{}>", name),
            line: idx + 1,
            msg,
        };

        let meta_kind = match line.chars().next() {
            Some('%') => Some(KeyKind::Type),
            Some('#') => Some(KeyKind::Derivation),
            Some('=') => Some(KeyKind::Context),
            Some('^') => Some(KeyKind::Priority),
            _ => None,
        };

        let body = match meta_kind {
            Some(_) => &line[1..],
            None => line,
        };

        // A `[context]` suffix on a main-line key may itself contain `=`,
        // so it is split off before the key=value split.
        let (body, context) = match (meta_kind, body.find('['), body.find('=')) {
            (None, Some(start), eq) if eq.is_none_or(|e| start < e) => {
                let end = body[start..]
                    .find(']')
                    .map(|i| start + i)
                    .ok_or_else(|| located(format!("unterminated context in '{}'", line)))?;
                let context = body[start + 1..end].to_string();
                let rest = body[end + 1..]
                    .strip_prefix('=')
                    .ok_or_else(|| located(format!("expected '=' after context in '{}'", line)))?;
                (format!("{}={}", &body[..start], rest), Some(context))
            }
            _ => (body.to_string(), None),
        };

        let (key_part, value) = body
            .split_once('=')
            .ok_or_else(|| located(format!("expected key=value, got '{}'", line)))?;

        let key = ResourceKey::parse(key_part).map_err(|e| located(e.to_string()))?;
        let rname = key.resource.clone();

        match meta_kind {
            None => {
                let mut resource = Resource::new(rname).map_err(|e| located(e.to_string()))?;
                let decoded = if options.encode {
                    decode_value(value)
                } else {
                    value.to_string()
                };
                // An empty main line means the value is absent, so a later
                // type annotation never re-validates ""
                if !decoded.is_empty() {
                    resource
                        .set_value(decoded)
                        .map_err(|e| located(e.to_string()))?;
                }
                if !options.no_context {
                    resource.set_context(context);
                }
                component.merge_resource(resource);
            }
            Some(kind) => {
                let resource = component
                    .find_mut(&rname)
                    .ok_or_else(|| located(format!("metadata for unknown resource '{}'", rname)))?;
                match kind {
                    KeyKind::Type => {
                        parse_type_annotation(resource, value).map_err(|e| located(e.to_string()))?
                    }
                    KeyKind::Derivation => resource.set_derivation(Some(
                        crate::derivation::SharedDerivation::parse(value)
                            .map_err(|e| located(e.to_string()))?,
                    )),
                    KeyKind::Context => resource.set_context(Some(value.to_string())),
                    KeyKind::Priority => {
                        let priority = value
                            .parse::<i32>()
                            .map_err(|_| located(format!("bad priority '{}'", value)))?;
                        resource.set_priority(priority);
                    }
                    KeyKind::Value => unreachable!(),
                }
            }
        }
    }

    Ok(component)
}

/// Read and parse a status file.
///
/// With `allow_noexist` set in `options`, a missing file yields an empty
/// component.
pub fn load_status_file(path: &Path, name: &str, options: &StatusOptions) -> Result<Component> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && options.allow_noexist => {
            return Ok(Component::new(name));
        }
        Err(e) => return Err(e.into()),
    };
    parse_component(&text, name, options)
}

/// Atomically write a component's status file (temp + rename)
pub fn store_status_file(
    path: &Path,
    component: &Component,
    namespace: Option<&str>,
    options: &StatusOptions,
) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, render_component(component, namespace, options).as_bytes())?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
