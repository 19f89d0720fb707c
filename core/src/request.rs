//! Typed request templates.
//!
//! A [`RequestTemplate`] keeps method, path, headers, bearer token and body as
//! separate fields. Rendering substitutes each field on its own, and JSON
//! bodies stay structured until the transport serializes them.

use crate::generator::is_dynamic;
use crate::template::{Template, TemplateEngine, TemplateError};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
}

impl Method {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body template.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Structured JSON; placeholders live in string leaves and keys.
    Json(Value),
    /// Raw text; substituted verbatim.
    Text(String),
}

/// A request with `{{placeholder}}` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTemplate {
    /// HTTP method
    pub method: Method,
    /// Path (and query) relative to the server base URL
    pub path: String,
    /// Extra headers; values may contain placeholders
    pub headers: Vec<(String, String)>,
    /// Bearer token template for the `Authorization` header
    pub bearer: Option<String>,
    /// Body template
    pub body: Body,
}

impl RequestTemplate {
    /// New request with no headers and no body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            bearer: None,
            body: Body::Empty,
        }
    }

    /// GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// POST request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// PUT request.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// PATCH request.
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Authenticate with a bearer token, e.g. `"{{org_member_token}}"`.
    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Structured JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    /// Raw text body.
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Body::Text(body.into());
        self
    }

    /// Every non-dynamic placeholder this request reads, sorted.
    #[must_use]
    pub fn placeholders(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let mut collect = |text: &str| {
            for name in Template::parse(text).placeholders() {
                if !is_dynamic(name) {
                    names.insert(name.to_string());
                }
            }
        };

        collect(&self.path);
        for (name, value) in &self.headers {
            collect(name);
            collect(value);
        }
        if let Some(token) = &self.bearer {
            collect(token);
        }
        match &self.body {
            Body::Empty => {}
            Body::Text(text) => collect(text),
            Body::Json(value) => visit_json_strings(value, &mut collect),
        }

        names
    }

    /// Substitute every field and attach the standard headers.
    ///
    /// Always adds `Accept: application/json`; adds
    /// `Content-Type: application/json` for JSON bodies and
    /// `Authorization: Bearer …` when a bearer template is set.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if any field contains an unresolvable
    /// placeholder under `UnresolvedPolicy::Fail`.
    pub fn render(&self, engine: &TemplateEngine<'_>) -> Result<PreparedRequest, TemplateError> {
        let path = engine.substitute_field("path", &self.path)?;

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if matches!(self.body, Body::Json(_)) {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = &self.bearer {
            let token = engine.substitute_field("authorization", token)?;
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        for (name, value) in &self.headers {
            let field = format!("header {name}");
            headers.push((
                engine.substitute_field(&field, name)?,
                engine.substitute_field(&field, value)?,
            ));
        }

        let body = match &self.body {
            Body::Empty => None,
            Body::Json(value) => Some(engine.substitute_json(value)?.to_string()),
            Body::Text(text) => Some(engine.substitute_field("body", text)?),
        };

        Ok(PreparedRequest {
            method: self.method,
            path,
            headers,
            body,
        })
    }
}

/// A fully substituted request, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the server base URL
    pub path: String,
    /// Headers in send order
    pub headers: Vec<(String, String)>,
    /// Serialized body
    pub body: Option<String>,
}

impl PreparedRequest {
    /// First header with this name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Headers with credentials masked, for logging.
    #[must_use]
    pub fn redacted_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(key, value)| {
                if key.eq_ignore_ascii_case("authorization") {
                    (key.clone(), "<redacted>".to_string())
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect()
    }
}

fn visit_json_strings(value: &Value, visit: &mut impl FnMut(&str)) {
    match value {
        Value::String(s) => visit(s),
        Value::Array(items) => {
            for item in items {
                visit_json_strings(item, visit);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                visit(key);
                visit_json_strings(item, visit);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
