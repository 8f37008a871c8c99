//! Per-kind field checks. Each returns the normalized JSON value to send.

use super::ValidationError;
use crate::routing::{Operation, ParamKind, ParamSpec};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use tracing::warn;

static EXTERNAL_ID: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{0,63}$").ok());

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A checked parameter value and, for date kinds, the instant it names.
/// Bare dates are midnight so mixed date and date-time ranges compare.
pub(crate) struct Checked {
    pub value: Value,
    pub moment: Option<NaiveDateTime>,
}

impl Checked {
    fn plain(value: Value) -> Self {
        Self { value, moment: None }
    }

    /// Text form used for path segments and query strings.
    pub fn as_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

pub(crate) fn check(op: Operation, spec: &ParamSpec, raw: &Value) -> Result<Checked, ValidationError> {
    let field = spec.name;
    match spec.kind {
        ParamKind::Id => check_id(field, raw).map(Checked::plain),
        ParamKind::Date => {
            let date = check_date(field, raw)?;
            Ok(Checked {
                value: Value::String(date.format(DATE_FORMAT).to_string()),
                moment: Some(date.and_time(NaiveTime::MIN)),
            })
        }
        ParamKind::DateTime => {
            let dt = check_datetime(field, raw)?;
            Ok(Checked {
                value: Value::String(dt.format(DATETIME_FORMAT).to_string()),
                moment: Some(dt),
            })
        }
        ParamKind::Enum(allowed) => {
            let s = expect_str(field, raw)?;
            Ok(Checked::plain(Value::String(check_member(op, field, s, allowed))))
        }
        ParamKind::EnumList(allowed) => check_enum_list(op, field, raw, allowed).map(Checked::plain),
        ParamKind::Int { min, max } => {
            let n = check_int(field, raw, min, max)?;
            Ok(Checked::plain(Value::Number(n.into())))
        }
        ParamKind::Number { min, max } => {
            let n = check_number(field, raw, min, max)?;
            let num = Number::from_f64(n)
                .ok_or_else(|| ValidationError::new(field, "must be a finite number"))?;
            Ok(Checked::plain(Value::Number(num)))
        }
        ParamKind::Bool => check_bool(field, raw).map(|b| Checked::plain(Value::Bool(b))),
        ParamKind::Text { max_len } => {
            check_text(field, raw, max_len, spec.required).map(|s| Checked::plain(Value::String(s)))
        }
        ParamKind::Json => Ok(Checked::plain(raw.clone())),
    }
}

fn expect_str<'a>(field: &str, raw: &'a Value) -> Result<&'a str, ValidationError> {
    raw.as_str()
        .map(str::trim)
        .ok_or_else(|| ValidationError::new(field, "expected a string"))
}

/// Positive integer, or an external identifier such as `i12345`.
///
/// Numeric identifiers keep their JSON number form so body fields stay numeric.
pub(crate) fn check_id(field: &str, raw: &Value) -> Result<Value, ValidationError> {
    match raw {
        Value::Number(n) => match n.as_u64() {
            Some(v) if v > 0 => Ok(Value::Number(v.into())),
            _ => Err(ValidationError::new(field, "must be a positive integer")),
        },
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(ValidationError::new(field, "required"));
            }
            if s.bytes().all(|b| b.is_ascii_digit()) {
                return match s.parse::<u64>() {
                    Ok(v) if v > 0 => Ok(Value::String(s.to_string())),
                    _ => Err(ValidationError::new(field, "must be a positive integer")),
                };
            }
            if s.starts_with('-') && s[1..].bytes().all(|b| b.is_ascii_digit()) {
                return Err(ValidationError::new(field, "must be a positive integer"));
            }
            if EXTERNAL_ID.as_ref().map_or(false, |re| re.is_match(s)) {
                Ok(Value::String(s.to_string()))
            } else {
                Err(ValidationError::new(field, "malformed identifier"))
            }
        }
        _ => Err(ValidationError::new(
            field,
            "expected a positive integer or identifier string",
        )),
    }
}

pub(crate) fn check_date(field: &str, raw: &Value) -> Result<NaiveDate, ValidationError> {
    let s = expect_str(field, raw)?;
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| ValidationError::new(field, "invalid date, expected YYYY-MM-DD"))
}

/// A date, or a date with a local time of day. Bare dates mean midnight.
pub(crate) fn check_datetime(field: &str, raw: &Value) -> Result<NaiveDateTime, ValidationError> {
    let s = expect_str(field, raw)?;
    if s.contains('T') {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
            .map_err(|_| ValidationError::new(field, "invalid date-time, expected YYYY-MM-DDTHH:MM:SS"))
    } else {
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(|d| d.and_time(NaiveTime::MIN))
            .map_err(|_| ValidationError::new(field, "invalid date, expected YYYY-MM-DD"))
    }
}

/// Unknown members are kept: the remote enumeration may grow ahead of this table.
fn check_member(op: Operation, field: &str, value: &str, allowed: &[&str]) -> String {
    if let Some(known) = allowed.iter().find(|a| a.eq_ignore_ascii_case(value)) {
        return (*known).to_string();
    }
    warn!(
        operation = op.name(),
        field,
        value,
        "unrecognized enumerated value passed through"
    );
    value.to_string()
}

fn check_enum_list(
    op: Operation,
    field: &str,
    raw: &Value,
    allowed: &[&str],
) -> Result<Value, ValidationError> {
    let items: Vec<&str> = match raw {
        Value::String(s) => s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect(),
        Value::Array(arr) => arr
            .iter()
            .map(|v| expect_str(field, v))
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(ValidationError::new(field, "expected a comma-separated string or list")),
    };
    if items.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    let normalized: Vec<String> = items
        .into_iter()
        .map(|item| check_member(op, field, item, allowed))
        .collect();
    Ok(Value::String(normalized.join(",")))
}

fn check_int(field: &str, raw: &Value, min: i64, max: i64) -> Result<i64, ValidationError> {
    let n = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ValidationError::new(field, "expected an integer"))?;

    if n < min || n > max {
        let reason = if max == i64::MAX {
            format!("must be at least {}", min)
        } else {
            format!("must be between {} and {}", min, max)
        };
        return Err(ValidationError::new(field, reason));
    }
    Ok(n)
}

fn check_number(field: &str, raw: &Value, min: f64, max: f64) -> Result<f64, ValidationError> {
    let n = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
    .ok_or_else(|| ValidationError::new(field, "expected a number"))?;

    if n < min || n > max {
        return Err(ValidationError::new(
            field,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(n)
}

fn check_bool(field: &str, raw: &Value) -> Result<bool, ValidationError> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ValidationError::new(field, "expected a boolean")),
        },
        _ => Err(ValidationError::new(field, "expected a boolean")),
    }
}

fn check_text(field: &str, raw: &Value, max_len: usize, required: bool) -> Result<String, ValidationError> {
    let s = expect_str(field, raw)?;
    if required && s.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if s.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("exceeds {} characters", max_len),
        ));
    }
    Ok(s.to_string())
}
