//! Parameter validation.
//!
//! Turns a tool-facing operation name plus JSON parameters into a
//! [`RequestSpec`] ready for dispatch. Nothing here touches the network.

mod checks;

use crate::request::RequestSpec;
use crate::routing::{Location, Operation, ParamKind};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Caller input that can never produce a valid request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    default_athlete_id: Option<String>,
}

impl Validator {
    /// `default_athlete_id` fills `athlete_id` when a call omits it.
    pub fn new(default_athlete_id: Option<String>) -> Self {
        Self {
            default_athlete_id: default_athlete_id.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn validate(&self, operation: &str, params: &Value) -> Result<RequestSpec, ValidationError> {
        let op = Operation::from_name(operation)
            .ok_or_else(|| ValidationError::new("operation", "unknown operation"))?;
        self.validate_operation(op, params)
    }

    pub fn validate_operation(
        &self,
        op: Operation,
        params: &Value,
    ) -> Result<RequestSpec, ValidationError> {
        let empty = Map::new();
        let given = match params {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(ValidationError::new("params", "expected a JSON object")),
        };

        let route = op.route();
        for key in given.keys() {
            if route.param(key).is_none() {
                warn!(operation = op.name(), param = key.as_str(), "ignoring unknown parameter");
            }
        }

        let mut spec = RequestSpec::new(op);
        let mut body = Map::new();
        let mut body_root = None;
        let mut moments = HashMap::new();

        for param in route.params {
            let defaulted;
            let raw = match given.get(param.name).filter(|v| !v.is_null()) {
                Some(v) => v,
                None if param.name == "athlete_id" && self.default_athlete_id.is_some() => {
                    defaulted = Value::String(self.default_athlete_id.clone().unwrap_or_default());
                    &defaulted
                }
                None if param.required => return Err(ValidationError::new(param.name, "required")),
                None => continue,
            };

            let checked = checks::check(op, param, raw)?;
            if let Some(moment) = checked.moment {
                moments.insert(param.name, moment);
            }

            match param.location {
                Location::Path => {
                    spec.path_params.insert(param.name.to_string(), checked.as_text());
                }
                Location::Query => spec.query.push((param.api_name.to_string(), checked.as_text())),
                Location::Body => {
                    let value = match (param.kind, checked.value) {
                        // numeric ids travel as JSON numbers inside bodies
                        (ParamKind::Id, Value::String(s)) => match s.parse::<u64>() {
                            Ok(n) => Value::Number(n.into()),
                            Err(_) => Value::String(s),
                        },
                        (_, v) => v,
                    };
                    body.insert(param.api_name.to_string(), value);
                }
                Location::BodyRoot => match checked.value {
                    Value::Array(items) if !items.is_empty() => body_root = Some(Value::Array(items)),
                    _ => return Err(ValidationError::new(param.name, "expected a non-empty array")),
                },
            }
        }

        if let Some((start, end)) = route.date_range {
            if let (Some(s), Some(e)) = (moments.get(start), moments.get(end)) {
                if e < s {
                    return Err(ValidationError::new(end, "before start"));
                }
            }
        }

        if route.has_body() {
            spec.body = Some(match body_root {
                Some(root) => root,
                None => {
                    if body.is_empty() {
                        return Err(ValidationError::new("params", "no fields to update"));
                    }
                    let mut merged = match op.body_defaults() {
                        Some(Value::Object(defaults)) => defaults,
                        _ => Map::new(),
                    };
                    merged.extend(body);
                    Value::Object(merged)
                }
            });
        }

        debug!(operation = op.name(), path = %spec.display_path(), "parameters validated");
        Ok(spec)
    }
}
