use crate::routing::{HttpMethod, Operation};
use crate::validation::ValidationError;
use serde_json::Value;
use std::collections::BTreeMap;

/// A fully described outbound call. Built per invocation, consumed by the dispatcher,
/// and reused unchanged for retries.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub operation: Operation,
    pub method: HttpMethod,
    pub path_template: &'static str,
    pub path_params: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestSpec {
    /// Start from the operation's static route with no parameters.
    pub fn new(operation: Operation) -> Self {
        let route = operation.route();
        Self {
            operation,
            method: route.method,
            path_template: route.path,
            path_params: BTreeMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Substitute path parameters into the template, one entry per path segment.
    ///
    /// Segments are returned unencoded; the transport percent-encodes each one.
    pub fn path_segments(&self) -> Result<Vec<String>, ValidationError> {
        self.path_template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|segment| {
                match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(name) => self
                        .path_params
                        .get(name)
                        .filter(|v| !v.is_empty())
                        .cloned()
                        .ok_or_else(|| ValidationError::new(name, "missing path parameter")),
                    None => Ok(segment.to_string()),
                }
            })
            .collect()
    }

    /// Rendered path for logs and stats, e.g. `/activity/i55`.
    pub fn display_path(&self) -> String {
        match self.path_segments() {
            Ok(segments) => format!("/{}", segments.join("/")),
            Err(_) => self.path_template.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_template() {
        let spec = RequestSpec::new(Operation::UpdateWellness)
            .with_path_param("athlete_id", "i42")
            .with_path_param("date", "2024-05-01");
        assert_eq!(
            spec.path_segments().unwrap(),
            vec!["athlete", "i42", "wellness", "2024-05-01"]
        );
        assert_eq!(spec.display_path(), "/athlete/i42/wellness/2024-05-01");
        assert_eq!(spec.method, HttpMethod::Put);
    }

    #[test]
    fn missing_param_is_reported() {
        let spec = RequestSpec::new(Operation::GetActivityDetails);
        let err = spec.path_segments().unwrap_err();
        assert_eq!(err.field, "activity_id");
        assert_eq!(spec.display_path(), "/activity/{activity_id}");
    }
}
