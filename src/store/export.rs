// src/store/export.rs

//! Shell environment export rendering.
//!
//! A resource exports as one or two `export NAME='value'` lines: the
//! value always, and a `NAME_TYPE` metadata line when requested and
//! non-default. Names are the caller-supplied prefix concatenated with
//! the resource name; values are single-quoted with embedded quotes
//! escaped as `'"'"'` so the output is safe to `eval`.

use crate::component::Component;
use crate::resource::{Resource, ResourceType};
use std::fmt::Write as _;

/// Quote a value for a single-quoted shell string
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

/// Render the export lines for one resource
pub fn export_resource(resource: &Resource, prefix: &str, with_type: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "export {}{}={}",
        prefix,
        resource.name(),
        shell_quote(resource.value_or_empty())
    );

    if with_type && resource.rtype() != ResourceType::default() {
        let _ = writeln!(
            out,
            "export {}{}_TYPE={}",
            prefix,
            resource.name(),
            shell_quote(&resource.rtype().to_string())
        );
    }

    out
}

/// Render export lines for every resource of a component, name-sorted
pub fn export_component(component: &Component, prefix: &str, with_type: bool) -> String {
    let mut out = String::new();
    for resource in component.sorted_resources() {
        out.push_str(&export_resource(resource, prefix, with_type));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_plain() {
        let r = Resource::with_value("port", "22").unwrap();
        assert_eq!(export_resource(&r, "SSHD_", false), "export SSHD_port='22'\n");
    }

    #[test]
    fn test_export_quotes_escaped() {
        let r = Resource::with_value("motd", "it's here").unwrap();
        assert_eq!(
            export_resource(&r, "X_", false),
            "export X_motd='it'\"'\"'s here'\n"
        );
    }

    #[test]
    fn test_export_type_line_only_when_nondefault() {
        let mut r = Resource::new("port").unwrap();
        r.set_type(ResourceType::Integer).unwrap();
        r.set_value("22".into()).unwrap();
        assert_eq!(
            export_resource(&r, "X_", true),
            "export X_port='22'\nexport X_port_TYPE='integer'\n"
        );

        let plain = Resource::with_value("name", "x").unwrap();
        assert_eq!(export_resource(&plain, "X_", true), "export X_name='x'\n");
    }

    #[test]
    fn test_export_component_sorted() {
        let mut c = Component::new("sshd");
        c.merge_resource(Resource::with_value("zz", "1").unwrap());
        c.merge_resource(Resource::with_value("aa", "2").unwrap());

        let text = export_component(&c, "SSHD_", false);
        assert_eq!(text, "export SSHD_aa='2'\nexport SSHD_zz='1'\n");
    }
}
