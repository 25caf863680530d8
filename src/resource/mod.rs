// src/resource/mod.rs

//! Typed resource values.
//!
//! A resource is a single named configuration value owned by a component.
//! Its type constrains the value (`set_value` validates, and a type change
//! is only legal when the current value already satisfies the new type),
//! its context expression decides whether it applies on a host, and its
//! derivation records where the value came from.

pub mod template;

pub use template::TemplateChain;

use crate::context::ContextList;
use crate::derivation::SharedDerivation;
use crate::error::{Error, Result};
use std::fmt;
use strum_macros::{Display, EnumString};

/// Check a resource-name-safe identifier: `[A-Za-z][A-Za-z0-9_]*`.
///
/// Context names and expanded template names follow the same grammar.
pub fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The value types a resource can carry.
///
/// `Publish` and `Subscribe` behave like `String` for validation; they
/// mark values exchanged between component spanning maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceType {
    #[default]
    String,
    Integer,
    Boolean,
    List,
    Publish,
    Subscribe,
}

impl ResourceType {
    /// Check a value against this type's grammar
    pub fn validate(&self, value: &str) -> bool {
        match self {
            ResourceType::String | ResourceType::Publish | ResourceType::Subscribe => true,
            ResourceType::Integer => validate_integer(value),
            ResourceType::Boolean => value.is_empty() || value == "yes",
            ResourceType::List => value.split_whitespace().all(valid_name),
        }
    }
}

/// Integer grammar: optional leading `-`, digits only, no leading zero
/// unless the value is exactly "0"
fn validate_integer(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    digits == "0" || !digits.starts_with('0')
}

/// Map common boolean spellings onto the stored form.
///
/// `true`/`yes`/`on`/`1` (any case) become `"yes"`; `false`/`no`/`off`/
/// `0` and the empty string become `""`; anything else is `None`.
pub fn canonicalize_boolean(input: &str) -> Option<String> {
    match input.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some("yes".to_string()),
        "false" | "no" | "off" | "0" | "" => Some(String::new()),
        _ => None,
    }
}

/// Escape a value for single-line text formats.
///
/// Ampersand first so decoded escapes are not re-escaped; CR, LF and `&`
/// become `&#xD;`, `&#xA;`, `&#x26;`.
pub fn encode_value(value: &str) -> String {
    value
        .replace('&', "&#x26;")
        .replace('\r', "&#xD;")
        .replace('\n', "&#xA;")
}

/// Reverse [`encode_value`]; `&#x26;` decoded last
pub fn decode_value(value: &str) -> String {
    value
        .replace("&#xD;", "\r")
        .replace("&#xA;", "\n")
        .replace("&#x26;", "&")
}

/// A named, typed configuration value
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    name: String,
    value: Option<String>,
    rtype: ResourceType,
    template: Option<TemplateChain>,
    context: Option<String>,
    derivation: Option<SharedDerivation>,
    comment: Option<String>,
    priority: i32,
}

impl Resource {
    /// Create an empty string-typed resource, validating the name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !valid_name(&name) {
            return Err(Error::validation("resource name", name));
        }
        Ok(Self {
            name,
            value: None,
            rtype: ResourceType::default(),
            template: None,
            context: None,
            derivation: None,
            comment: None,
            priority: 0,
        })
    }

    /// Convenience constructor: a named resource with a value
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let mut r = Self::new(name)?;
        r.set_value(value.into())?;
        Ok(r)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Value with absent mapped to empty, the form diff/merge compare
    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    pub fn rtype(&self) -> ResourceType {
        self.rtype
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn derivation(&self) -> Option<&SharedDerivation> {
        self.derivation.as_ref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn template(&self) -> Option<&TemplateChain> {
        self.template.as_ref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Active resources (priority >= 0) apply on the host
    pub fn is_active(&self) -> bool {
        self.priority >= 0
    }

    /// Set the value, rejecting anything the current type does not accept
    pub fn set_value(&mut self, value: String) -> Result<()> {
        if !self.rtype.validate(&value) {
            return Err(Error::validation("resource value", value));
        }
        self.value = Some(value);
        Ok(())
    }

    /// Drop the value entirely
    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// Change the type.
    ///
    /// A no-op when unchanged; otherwise the current value (if any) must
    /// already satisfy the new type.
    pub fn set_type(&mut self, rtype: ResourceType) -> Result<()> {
        if rtype == self.rtype {
            return Ok(());
        }
        if let Some(value) = &self.value {
            if !rtype.validate(value) {
                return Err(Error::validation("resource type", rtype.to_string()));
            }
        }
        self.rtype = rtype;
        Ok(())
    }

    /// Attach a context expression (`None` clears it)
    pub fn set_context(&mut self, context: Option<String>) {
        self.context = context.filter(|c| !c.is_empty());
    }

    pub fn set_derivation(&mut self, derivation: Option<SharedDerivation>) {
        self.derivation = derivation;
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    pub fn set_template(&mut self, template: Option<TemplateChain>) {
        self.template = template;
    }

    /// Explicitly set the stored priority (normally via [`eval_priority`])
    ///
    /// [`eval_priority`]: Resource::eval_priority
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Evaluate this resource's context expression against `contexts` and
    /// store the signed result. A resource with no expression gets 0.
    pub fn eval_priority(&mut self, contexts: &ContextList) -> Result<i32> {
        let priority = match &self.context {
            Some(expr) => contexts.eval(expr)?,
            None => 0,
        };
        self.priority = priority;
        Ok(priority)
    }

    /// Expand this resource's template chain with the given tags.
    ///
    /// Only list resources carry templates; a resource without one
    /// expands to nothing.
    pub fn expand_template(&self, tags: &[&str]) -> Result<Vec<String>> {
        match &self.template {
            Some(chain) => chain.expand(tags),
            None => Ok(Vec::new()),
        }
    }

    /// Value in its escaped single-line form
    pub fn encoded_value(&self) -> String {
        encode_value(self.value_or_empty())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value_or_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    // === names ===

    #[test]
    fn test_valid_names() {
        assert!(valid_name("site"));
        assert!(valid_name("Site_2"));
        assert!(!valid_name(""));
        assert!(!valid_name("2site"));
        assert!(!valid_name("si-te"));
        assert!(!valid_name("_x"));
    }

    // === type validation ===

    #[test]
    fn test_integer_validation() {
        let t = ResourceType::Integer;
        assert!(t.validate("0"));
        assert!(t.validate("42"));
        assert!(t.validate("-7"));
        assert!(!t.validate(""));
        assert!(!t.validate("007"));
        assert!(!t.validate("-0"));
        assert!(!t.validate("1.5"));
        assert!(!t.validate("x"));
    }

    #[test]
    fn test_boolean_validation() {
        let t = ResourceType::Boolean;
        assert!(t.validate(""));
        assert!(t.validate("yes"));
        assert!(!t.validate("no"));
        assert!(!t.validate("true"));
    }

    #[test]
    fn test_list_validation() {
        let t = ResourceType::List;
        assert!(t.validate("one two three"));
        assert!(t.validate(""));
        assert!(!t.validate("one 2bad"));
        assert!(!t.validate("a,b"));
    }

    #[test]
    fn test_string_accepts_anything() {
        assert!(ResourceType::String.validate("anything at all; even ="));
        assert!(ResourceType::Publish.validate("x y"));
        assert!(ResourceType::Subscribe.validate(""));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ResourceType::Integer.to_string(), "integer");
        assert_eq!("list".parse::<ResourceType>().unwrap(), ResourceType::List);
        assert!("bogus".parse::<ResourceType>().is_err());
    }

    // === canonicalize_boolean ===

    #[test]
    fn test_canonicalize_boolean() {
        for s in ["true", "YES", "On", "1"] {
            assert_eq!(canonicalize_boolean(s).as_deref(), Some("yes"));
        }
        for s in ["false", "No", "OFF", "0", ""] {
            assert_eq!(canonicalize_boolean(s).as_deref(), Some(""));
        }
        assert_eq!(canonicalize_boolean("maybe"), None);
    }

    // === value encoding ===

    #[test]
    fn test_value_encoding_roundtrip() {
        let raw = "line1\nline2\rwith & ampersand";
        let encoded = encode_value(raw);
        assert!(!encoded.contains('\n'));
        assert!(!encoded.contains('\r'));
        assert_eq!(encoded, "line1&#xA;line2&#xD;with &#x26; ampersand");
        assert_eq!(decode_value(&encoded), raw);
    }

    #[test]
    fn test_encoding_does_not_double_escape() {
        // A literal "&#xA;" in the input must survive a round trip
        let raw = "literal &#xA; text";
        assert_eq!(decode_value(&encode_value(raw)), raw);
    }

    // === set_value / set_type ===

    #[test]
    fn test_set_value_validates() {
        let mut r = Resource::new("count").unwrap();
        r.set_type(ResourceType::Integer).unwrap();
        assert!(r.set_value("12".into()).is_ok());
        assert!(r.set_value("twelve".into()).is_err());
        assert_eq!(r.value(), Some("12"));
    }

    #[test]
    fn test_set_type_checks_current_value() {
        let mut r = Resource::with_value("port", "8080").unwrap();
        // "8080" is a valid integer, so the transition is legal
        r.set_type(ResourceType::Integer).unwrap();
        assert_eq!(r.rtype(), ResourceType::Integer);

        let mut r = Resource::with_value("name", "not a number").unwrap();
        assert!(r.set_type(ResourceType::Integer).is_err());
        assert_eq!(r.rtype(), ResourceType::String);
    }

    #[test]
    fn test_set_type_same_is_noop() {
        let mut r = Resource::with_value("x", "free text").unwrap();
        r.set_type(ResourceType::String).unwrap();
    }

    #[test]
    fn test_bad_name_rejected() {
        assert!(Resource::new("9lives").is_err());
        assert!(Resource::new("").is_err());
        assert!(Resource::new("ok_name").is_ok());
    }

    // === priority ===

    #[test]
    fn test_eval_priority() {
        let mut contexts = ContextList::new();
        contexts.update(Context::new("live", Some("yes".into()), 2).unwrap());

        let mut r = Resource::with_value("x", "1").unwrap();
        r.set_context(Some("live".into()));
        assert_eq!(r.eval_priority(&contexts).unwrap(), 2);
        assert!(r.is_active());

        r.set_context(Some("!live".into()));
        assert_eq!(r.eval_priority(&contexts).unwrap(), -2);
        assert!(!r.is_active());
    }

    #[test]
    fn test_no_context_defaults_to_zero_active() {
        let contexts = ContextList::new();
        let mut r = Resource::with_value("x", "1").unwrap();
        assert_eq!(r.eval_priority(&contexts).unwrap(), 0);
        assert!(r.is_active());
    }
}
