//! JSONPath lookups into response bodies.

use serde_json::Value;
use thiserror::Error;

/// Errors from evaluating a JSONPath expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The expression did not parse.
    #[error("JSONPath query error in '{path}': {message}")]
    InvalidPath {
        /// The expression
        path: String,
        /// Parser message
        message: String,
    },
}

/// Evaluate `path` (e.g. `$.data[0][1][0].id`) and return the first match.
///
/// # Errors
///
/// Returns [`QueryError::InvalidPath`] if the expression does not parse.
pub fn query(document: &Value, path: &str) -> Result<Option<Value>, QueryError> {
    use jsonpath_rust::JsonPathQuery;

    let results = document
        .clone()
        .path(path)
        .map_err(|e| QueryError::InvalidPath {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    Ok(match results {
        Value::Null => None,
        Value::Array(mut items) => {
            if items.is_empty() {
                None
            } else {
                Some(items.swap_remove(0))
            }
        }
        other => Some(other),
    })
}

/// String form used when a JSON value is written into the environment.
///
/// Strings are stored without quotes; everything else as compact JSON.
#[must_use]
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
