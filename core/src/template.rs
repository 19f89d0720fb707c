//! `{{placeholder}}` substitution.
//!
//! Templates are scanned left to right for `{{ … }}` spans. The inner text,
//! trimmed, is the placeholder name. An unterminated `{{` or an empty `{{}}`
//! is ordinary text.
//!
//! Every occurrence is resolved on its own: a body with three
//! `{{$timestamp}}` spans evaluates the generator three times.
//!
//! # Unresolved placeholders
//!
//! [`UnresolvedPolicy`] is fixed per engine and applies to every field the
//! engine renders:
//!
//! - `Fail` (default): the substitution returns [`TemplateError::Unresolved`]
//! - `KeepLiteral`: the original `{{name}}` span is left in the output
//!
//! There is no path that silently substitutes an empty string.
//!
//! # JSON bodies
//!
//! Prefer [`TemplateEngine::substitute_json`], which substitutes inside the
//! string leaves (and keys) of an already-structured body, so serialization
//! does the escaping. For raw JSON text use [`Escape::Json`], which escapes
//! each resolved value for a JSON string context.

use crate::resolver::{ResolveError, Resolver};
use serde_json::{Map, Value};
use thiserror::Error;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Errors from rendering a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A placeholder could not be resolved under `UnresolvedPolicy::Fail`.
    #[error("unresolved placeholder in {field}: {source}")]
    Unresolved {
        /// Which part of the request was being rendered (`path`, `body`, ...)
        field: String,
        /// The resolution failure
        #[source]
        source: ResolveError,
    },
}

/// What to do with a placeholder nobody can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedPolicy {
    /// Fail the substitution.
    #[default]
    Fail,
    /// Leave `{{name}}` in the output unchanged.
    KeepLiteral,
}

/// How resolved values are written into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Escape {
    /// Insert verbatim.
    #[default]
    None,
    /// Escape for the inside of a JSON string literal.
    Json,
}

/// One piece of a parsed template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t> {
    /// Text copied through unchanged.
    Literal(&'t str),
    /// A `{{name}}` span.
    Placeholder {
        /// Trimmed placeholder name
        name: &'t str,
        /// The full span as written, including braces
        raw: &'t str,
    },
}

/// A parsed template borrowing from its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'t> {
    segments: Vec<Segment<'t>>,
}

impl<'t> Template<'t> {
    /// Split `text` into literal and placeholder segments.
    #[must_use]
    pub fn parse(text: &'t str) -> Self {
        let mut segments = Vec::new();
        let mut rest = text;

        while let Some(open) = rest.find(OPEN) {
            let after_open = &rest[open + OPEN.len()..];
            let Some(close) = after_open.find(CLOSE) else {
                break;
            };
            let inner = &after_open[..close];

            if inner.contains(OPEN) {
                // `{{{{name}}`: the later `{{` starts the placeholder.
                segments.push(Segment::Literal(&rest[..open + OPEN.len()]));
                rest = after_open;
                continue;
            }

            let end = open + OPEN.len() + close + CLOSE.len();
            let name = inner.trim();
            if name.is_empty() {
                segments.push(Segment::Literal(&rest[..end]));
            } else {
                if open > 0 {
                    segments.push(Segment::Literal(&rest[..open]));
                }
                segments.push(Segment::Placeholder {
                    name,
                    raw: &rest[open..end],
                });
            }
            rest = &rest[end..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }

        Self { segments }
    }

    /// Segments in source order.
    #[must_use]
    pub fn segments(&self) -> &[Segment<'t>] {
        &self.segments
    }

    /// Placeholder names in source order, repeats included.
    pub fn placeholders(&self) -> impl Iterator<Item = &'t str> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder { name, .. } => Some(*name),
            Segment::Literal(_) => None,
        })
    }

    /// Whether the template contains no placeholders.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.placeholders().next().is_none()
    }
}

/// Renders templates against a [`Resolver`].
#[derive(Debug, Clone, Copy)]
pub struct TemplateEngine<'r> {
    resolver: &'r Resolver<'r>,
    policy: UnresolvedPolicy,
    escape: Escape,
}

impl<'r> TemplateEngine<'r> {
    /// Engine with `UnresolvedPolicy::Fail` and no escaping.
    #[must_use]
    pub const fn new(resolver: &'r Resolver<'r>) -> Self {
        Self {
            resolver,
            policy: UnresolvedPolicy::Fail,
            escape: Escape::None,
        }
    }

    /// Set the unresolved-placeholder policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the escaping applied to resolved values.
    #[must_use]
    pub const fn with_escape(mut self, escape: Escape) -> Self {
        self.escape = escape;
        self
    }

    /// The policy in effect.
    #[must_use]
    pub const fn policy(&self) -> UnresolvedPolicy {
        self.policy
    }

    /// The resolver this engine reads from.
    #[must_use]
    pub const fn resolver(&self) -> &'r Resolver<'r> {
        self.resolver
    }

    /// Substitute every placeholder in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unresolved`] under `UnresolvedPolicy::Fail`
    /// when a placeholder cannot be resolved.
    pub fn substitute(&self, text: &str) -> Result<String, TemplateError> {
        self.substitute_field("template", text)
    }

    /// Like [`TemplateEngine::substitute`], naming the field in errors.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unresolved`] under `UnresolvedPolicy::Fail`
    /// when a placeholder cannot be resolved.
    pub fn substitute_field(&self, field: &str, text: &str) -> Result<String, TemplateError> {
        let template = Template::parse(text);
        let mut out = String::with_capacity(text.len());

        for segment in template.segments() {
            match *segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Placeholder { name, raw } => match self.resolver.resolve(name) {
                    Ok(value) => self.push_value(&mut out, &value),
                    Err(err) => match self.policy {
                        UnresolvedPolicy::KeepLiteral => {
                            tracing::debug!(field, name, "leaving unresolved placeholder");
                            out.push_str(raw);
                        }
                        UnresolvedPolicy::Fail => {
                            return Err(TemplateError::Unresolved {
                                field: field.to_string(),
                                source: err,
                            });
                        }
                    },
                },
            }
        }

        Ok(out)
    }

    /// Substitute inside every string leaf and object key of a JSON value.
    ///
    /// Values are inserted as plain strings; escaping happens when the result
    /// is serialized, so the output is always valid JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unresolved`] under `UnresolvedPolicy::Fail`
    /// when a placeholder cannot be resolved.
    pub fn substitute_json(&self, value: &Value) -> Result<Value, TemplateError> {
        let plain = self.with_escape(Escape::None);
        plain.substitute_json_at("body", value)
    }

    fn substitute_json_at(&self, field: &str, value: &Value) -> Result<Value, TemplateError> {
        Ok(match value {
            Value::String(s) => Value::String(self.substitute_field(field, s)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.substitute_json_at(field, item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(
                        self.substitute_field(field, key)?,
                        self.substitute_json_at(field, item)?,
                    );
                }
                Value::Object(out)
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        })
    }

    fn push_value(&self, out: &mut String, value: &str) {
        match self.escape {
            Escape::None => out.push_str(value),
            Escape::Json => out.push_str(&escape_json(value)),
        }
    }
}

/// Escape `value` for the inside of a JSON string literal (no quotes added).
#[must_use]
pub fn escape_json(value: &str) -> String {
    let quoted = Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::generator::Generators;
    use crate::scope::Scope;
    use crate::store::EnvironmentStore;
    use chrono::{DateTime, Duration, Utc};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct StepClock(Mutex<DateTime<Utc>>);

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.0.lock().expect("clock lock");
            let now = *next;
            *next = now + Duration::milliseconds(1);
            now
        }
    }

    fn stepping() -> Generators {
        Generators::new(Arc::new(StepClock(Mutex::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("valid timestamp")
                .with_timezone(&Utc),
        ))))
    }

    #[test]
    fn test_parse_segments() {
        let template = Template::parse("/events/{{ last_event_id }}/codes?x={{$timestamp}}");
        assert_eq!(
            template.segments(),
            &[
                Segment::Literal("/events/"),
                Segment::Placeholder {
                    name: "last_event_id",
                    raw: "{{ last_event_id }}"
                },
                Segment::Literal("/codes?x="),
                Segment::Placeholder {
                    name: "$timestamp",
                    raw: "{{$timestamp}}"
                },
            ]
        );
        assert_eq!(
            template.placeholders().collect::<Vec<_>>(),
            vec!["last_event_id", "$timestamp"]
        );
    }

    #[test]
    fn test_parse_edge_cases() {
        assert!(Template::parse("no placeholders").is_static());
        assert!(Template::parse("open {{ but never closed").is_static());
        assert!(Template::parse("empty {{}} and {{   }}").is_static());

        let nested = Template::parse("{{{{name}}");
        assert_eq!(nested.placeholders().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn test_event_path_substitution() {
        let generators = stepping();
        let mut store = EnvironmentStore::new();
        store.set("last_event_id", "E1");
        let variables = Scope::new("variables");
        let resolver = Resolver::new(&generators, &store, &variables);
        let engine = TemplateEngine::new(&resolver);

        assert_eq!(
            engine
                .substitute("/events/{{last_event_id}}/ticket_types")
                .expect("resolves"),
            "/events/E1/ticket_types"
        );
    }

    #[test]
    fn test_each_timestamp_occurrence_resolves_independently() {
        let generators = stepping();
        let store = EnvironmentStore::new();
        let variables = Scope::new("variables");
        let resolver = Resolver::new(&generators, &store, &variables);
        let engine = TemplateEngine::new(&resolver);

        let out = engine
            .substitute("{{$timestamp}}|{{$timestamp}}")
            .expect("resolves");
        assert_eq!(out, "1735689600000|1735689600001");
    }

    #[test]
    fn test_unresolved_fail_policy() {
        let generators = stepping();
        let store = EnvironmentStore::new();
        let variables = Scope::new("variables");
        let resolver = Resolver::new(&generators, &store, &variables);
        let engine = TemplateEngine::new(&resolver);

        let err = engine
            .substitute_field("path", "/events/{{last_event_id}}")
            .expect_err("should fail");
        let TemplateError::Unresolved { field, source } = err;
        assert_eq!(field, "path");
        assert_eq!(source.name(), "last_event_id");
    }

    #[test]
    fn test_unresolved_keep_literal_policy() {
        let generators = stepping();
        let store = EnvironmentStore::new();
        let variables = Scope::new("variables");
        let resolver = Resolver::new(&generators, &store, &variables);
        let engine = TemplateEngine::new(&resolver).with_policy(UnresolvedPolicy::KeepLiteral);

        assert_eq!(
            engine
                .substitute("/events/{{ last_event_id }}/codes")
                .expect("keeps literal"),
            "/events/{{ last_event_id }}/codes"
        );
    }

    #[test]
    fn test_json_escape_mode() {
        let generators = stepping();
        let mut store = EnvironmentStore::new();
        store.set("name", "say \"hi\"\n");
        let variables = Scope::new("variables");
        let resolver = Resolver::new(&generators, &store, &variables);
        let engine = TemplateEngine::new(&resolver).with_escape(Escape::Json);

        let text = engine
            .substitute(r#"{"name": "{{name}}"}"#)
            .expect("resolves");
        let parsed: Value = serde_json::from_str(&text).expect("valid JSON");
        assert_eq!(parsed["name"], "say \"hi\"\n");
    }

    #[test]
    fn test_structured_json_substitution() {
        let generators = stepping();
        let mut store = EnvironmentStore::new();
        store.set("last_ticket_type_id", "TT\"1");
        store.set("field", "renamed");
        let variables = Scope::new("variables");
        let resolver = Resolver::new(&generators, &store, &variables);
        let engine = TemplateEngine::new(&resolver);

        let body = json!({
            "ticket_type_ids": ["{{last_ticket_type_id}}"],
            "max_uses": 10,
            "{{field}}": true,
            "names": ["A_{{$timestamp}}", "B_{{$timestamp}}"]
        });

        let out = engine.substitute_json(&body).expect("resolves");
        assert_eq!(out["ticket_type_ids"][0], "TT\"1");
        assert_eq!(out["max_uses"], 10);
        assert_eq!(out["renamed"], true);
        assert_ne!(out["names"][0].as_str().map(|s| &s[2..]), out["names"][1].as_str().map(|s| &s[2..]));

        let reparsed: Value =
            serde_json::from_str(&out.to_string()).expect("serialized body is valid JSON");
        assert_eq!(reparsed, out);
    }
}
