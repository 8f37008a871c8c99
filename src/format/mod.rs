//! Response normalization.
//!
//! [`ResponseFormatter::format`] is total: whatever JSON a 2xx response carries,
//! it returns a bounded value with a predictable shape. Known fields get
//! canonical names and units, required fields are always present (`null` when
//! missing or malformed) and everything else is kept under `extra`.

mod fields;

use crate::routing::{EntityKind, Operation};
use fields::{Conv, FieldRule};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub const TRUNCATION_MARKER: &str = "…[truncated]";

/// Size ceilings applied to every formatted payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Strings longer than this many characters are cut
    pub max_string_len: usize,
    /// Top-level list payloads keep at most this many items
    pub max_items: usize,
    /// Arrays nested inside an entity keep at most this many elements
    pub max_array_len: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_string_len: 4_000,
            max_items: 200,
            max_array_len: 500,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseFormatter {
    config: FormatterConfig,
}

impl ResponseFormatter {
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    pub fn format(&self, operation: Operation, raw: &Value) -> Value {
        self.format_entity(operation.route().entity, raw)
    }

    pub fn format_entity(&self, kind: EntityKind, raw: &Value) -> Value {
        let table = fields::table(kind);
        match raw {
            Value::Array(items) => {
                let total = items.len();
                let kept: Vec<Value> = items
                    .iter()
                    .take(self.config.max_items)
                    .map(|item| self.item(table, item))
                    .collect();
                let mut out = Map::new();
                out.insert("items".to_string(), Value::Array(kept));
                out.insert("total".to_string(), Value::from(total));
                out.insert(
                    "truncated".to_string(),
                    Value::Bool(total > self.config.max_items),
                );
                Value::Object(out)
            }
            other => self.item(table, other),
        }
    }

    fn item(&self, table: Option<&'static [FieldRule]>, raw: &Value) -> Value {
        match (table, raw) {
            (Some(rules), Value::Object(obj)) => self.entity(rules, obj),
            _ => self.bound(raw),
        }
    }

    fn entity(&self, rules: &'static [FieldRule], obj: &Map<String, Value>) -> Value {
        let mut out = Map::new();
        let mut read: Vec<Vec<&str>> = Vec::new();

        for rule in rules {
            read.extend(rule.sources.iter().map(|source| source.split('.').collect()));
            if out.get(rule.target).map_or(false, |v| !v.is_null()) {
                continue;
            }
            let found = rule
                .sources
                .iter()
                .filter_map(|source| lookup(obj, source))
                .find(|v| !v.is_null());
            let converted = found.map(|v| self.convert(rule, v)).unwrap_or(Value::Null);
            if let Value::Array(_) = &converted {
                if let Some(len) = found.and_then(Value::as_array).map(Vec::len) {
                    if len > self.config.max_array_len {
                        out.insert(format!("{}_len", rule.target), Value::from(len));
                    }
                }
            }
            if !converted.is_null() || rule.required {
                out.insert(rule.target.to_string(), converted);
            }
        }

        let paths: Vec<&[&str]> = read.iter().map(Vec::as_slice).collect();
        let extra = self.unread(obj, &paths);
        if !extra.is_empty() {
            out.insert("extra".to_string(), Value::Object(extra));
        }
        Value::Object(out)
    }

    /// What is left of `obj` once the dotted `paths` are taken out. Objects
    /// that were only partly read keep their remaining keys.
    fn unread(&self, obj: &Map<String, Value>, paths: &[&[&str]]) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in obj {
            let nested = below(paths, key);
            if nested.is_empty() {
                self.put_bounded(&mut out, obj, key, value);
            } else if let Some(rest) = self.unread_value(value, &nested) {
                out.insert(key.clone(), rest);
            }
        }
        out
    }

    fn unread_value(&self, value: &Value, paths: &[&[&str]]) -> Option<Value> {
        if paths.iter().any(|p| p.is_empty()) {
            return None;
        }
        match value {
            Value::Object(map) => {
                let rest = self.unread(map, paths);
                (!rest.is_empty()).then_some(Value::Object(rest))
            }
            Value::Array(items) => {
                let mut kept = false;
                let rest: Vec<Value> = items
                    .iter()
                    .take(self.config.max_array_len)
                    .enumerate()
                    .map(|(i, item)| {
                        let nested = below(paths, &i.to_string());
                        let rest = if nested.is_empty() {
                            Some(self.bound(item))
                        } else {
                            self.unread_value(item, &nested)
                        };
                        kept |= rest.is_some();
                        // consumed elements stay as null so indices line up
                        rest.unwrap_or(Value::Null)
                    })
                    .collect();
                kept.then_some(Value::Array(rest))
            }
            // the path did not resolve, so nothing was read
            other => Some(self.bound(other)),
        }
    }

    fn convert(&self, rule: &FieldRule, value: &Value) -> Value {
        match rule.conv {
            Conv::Raw => self.bound(value),
            Conv::Text => match value {
                Value::String(s) => Value::String(self.truncate(s)),
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                _ => Value::Null,
            },
            Conv::Num => match value {
                Value::Number(_) => value.clone(),
                other => as_f64(other).map(number_value).unwrap_or(Value::Null),
            },
            Conv::Scale(factor) => as_f64(value)
                .map(|x| number_value(round3(x * factor)))
                .unwrap_or(Value::Null),
            Conv::Rows(rows) => match value {
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .take(self.config.max_array_len)
                        .map(|item| self.item(Some(rows), item))
                        .collect(),
                ),
                _ => Value::Null,
            },
        }
    }

    /// Apply string and array ceilings recursively. Arrays nested in objects
    /// record their original length in a sibling `<field>_len`.
    fn bound(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.truncate(s)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .take(self.config.max_array_len)
                    .map(|v| self.bound(v))
                    .collect(),
            ),
            Value::Object(obj) => {
                let mut out = Map::new();
                for (k, v) in obj {
                    self.put_bounded(&mut out, obj, k, v);
                }
                Value::Object(out)
            }
            scalar => scalar.clone(),
        }
    }

    /// Insert a bounded copy of `src[key]`. A capped array gets a sibling
    /// `<key>_len` unless `src` already has a field by that name.
    fn put_bounded(
        &self,
        out: &mut Map<String, Value>,
        src: &Map<String, Value>,
        key: &str,
        value: &Value,
    ) {
        if let Value::Array(items) = value {
            let len_key = format!("{}_len", key);
            if items.len() > self.config.max_array_len && !src.contains_key(&len_key) {
                out.insert(len_key, Value::from(items.len()));
            }
        }
        out.insert(key.to_string(), self.bound(value));
    }

    fn truncate(&self, s: &str) -> String {
        match s.char_indices().nth(self.config.max_string_len) {
            Some((cut, _)) => format!("{}{}", &s[..cut], TRUNCATION_MARKER),
            None => s.to_string(),
        }
    }
}

/// Remainders of the paths whose first segment is `key`.
fn below<'p, 'a>(paths: &[&'p [&'a str]], key: &str) -> Vec<&'p [&'a str]> {
    paths
        .iter()
        .copied()
        .filter_map(|p| match p.split_first() {
            Some((head, rest)) if *head == key => Some(rest),
            _ => None,
        })
        .collect()
}

/// Follow a dotted path; numeric segments index into arrays.
fn lookup<'a>(obj: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = obj.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn round3(x: f64) -> f64 {
    (x * 1_000.0).round() / 1_000.0
}

/// Integral values are emitted as JSON integers.
fn number_value(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < 9.0e15 {
        Value::from(x as i64)
    } else {
        Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn formatter() -> ResponseFormatter {
        ResponseFormatter::default()
    }

    #[test]
    fn activity_distance_is_renamed() {
        let out = formatter().format(
            Operation::GetActivityDetails,
            &json!({"id": 5, "distance": 1000}),
        );
        assert_eq!(out["id"], json!(5));
        assert_eq!(out["distance_m"], json!(1000));
        assert_eq!(out["name"], Value::Null);
        assert_eq!(out["moving_time_s"], Value::Null);
        assert!(out.get("extra").is_none());
        assert!(out.get("average_power_w").is_none());
    }

    #[test]
    fn unknown_fields_go_to_extra() {
        let out = formatter().format(
            Operation::GetActivityDetails,
            &json!({"id": "i9", "icu_new_metric": 3, "distance": "12.5"}),
        );
        assert_eq!(out["extra"], json!({"icu_new_metric": 3}));
        assert_eq!(out["distance_m"], json!(12.5));
    }

    #[test]
    fn malformed_required_field_is_null() {
        let out = formatter().format(
            Operation::GetActivityDetails,
            &json!({"id": 1, "moving_time": "fast", "name": {"nested": true}}),
        );
        assert_eq!(out["moving_time_s"], Value::Null);
        assert_eq!(out["name"], Value::Null);
    }

    #[test]
    fn wind_is_converted_to_mps() {
        let out = formatter().format(
            Operation::GetActivityDetails,
            &json!({"id": 1, "average_wind_speed": 36}),
        );
        assert_eq!(out["average_wind_speed_mps"], json!(10));
    }

    #[test]
    fn lists_are_wrapped_and_capped() {
        let f = ResponseFormatter::new(FormatterConfig {
            max_items: 2,
            ..FormatterConfig::default()
        });
        let out = f.format(
            Operation::GetActivities,
            &json!([{"id": 1}, {"id": 2}, {"id": 3}]),
        );
        assert_eq!(out["total"], json!(3));
        assert_eq!(out["truncated"], json!(true));
        assert_eq!(out["items"].as_array().unwrap().len(), 2);
        assert_eq!(out["items"][1]["id"], json!(2));
    }

    #[test]
    fn long_strings_are_cut_on_char_boundary() {
        let f = ResponseFormatter::new(FormatterConfig {
            max_string_len: 3,
            ..FormatterConfig::default()
        });
        let out = f.format(
            Operation::GetActivityDetails,
            &json!({"id": 1, "description": "ééééé"}),
        );
        assert_eq!(out["description"], json!(format!("ééé{}", TRUNCATION_MARKER)));
    }

    #[test]
    fn stream_data_is_capped_with_length() {
        let f = ResponseFormatter::new(FormatterConfig {
            max_array_len: 3,
            ..FormatterConfig::default()
        });
        let out = f.format(
            Operation::GetActivityStreams,
            &json!([{"type": "watts", "data": [1, 2, 3, 4, 5]}]),
        );
        let stream = &out["items"][0];
        assert_eq!(stream["data"], json!([1, 2, 3]));
        assert_eq!(stream["data_len"], json!(5));
        assert!(stream.get("data2").is_none());
    }

    #[test]
    fn wellness_uses_date_and_units() {
        let out = formatter().format(
            Operation::GetWellnessData,
            &json!([{"id": "2024-05-01", "restingHR": 48, "sleepHours": 7.5, "weight": 70.2}]),
        );
        let day = &out["items"][0];
        assert_eq!(day["date"], json!("2024-05-01"));
        assert_eq!(day["resting_hr_bpm"], json!(48));
        assert_eq!(day["sleep_s"], json!(27000));
        assert_eq!(day["weight_kg"], json!(70.2));
    }

    #[test]
    fn weather_reads_nested_paths() {
        let out = formatter().format(
            Operation::GetWeatherForecast,
            &json!({"forecasts": [{"location": "Home", "daily": [
                {"id": "2024-05-01", "temp": {"min": 8.5, "max": 17}, "weather": [{"description": "rain"}]}
            ]}]}),
        );
        let day = &out["forecasts"][0]["daily"][0];
        assert_eq!(day["temp_min_c"], json!(8.5));
        assert_eq!(day["temp_max_c"], json!(17));
        assert_eq!(day["description"], json!("rain"));
        assert!(day.get("extra").is_none());
    }

    #[test]
    fn partly_read_objects_keep_the_rest() {
        let out = formatter().format(
            Operation::GetWeatherForecast,
            &json!({"forecasts": [{"location": "Home", "daily": [{
                "id": "2024-05-01",
                "temp": {"min": 8.5, "max": 17, "morn": 9.1, "eve": 14.0},
                "weather": [{"description": "rain", "icon": "10d", "main": "Rain"}]
            }]}]}),
        );
        let day = &out["forecasts"][0]["daily"][0];
        assert_eq!(day["temp_min_c"], json!(8.5));
        assert_eq!(day["description"], json!("rain"));
        assert_eq!(day["extra"]["temp"], json!({"morn": 9.1, "eve": 14.0}));
        assert_eq!(day["extra"]["weather"], json!([{"icon": "10d", "main": "Rain"}]));
    }

    #[test]
    fn unread_array_elements_keep_their_index() {
        let out = formatter().format(
            Operation::GetWeatherForecast,
            &json!({"forecasts": [{"daily": [{
                "id": "2024-05-02",
                "weather": [{"description": "sun"}, {"description": "wind"}]
            }]}]}),
        );
        let day = &out["forecasts"][0]["daily"][0];
        assert_eq!(day["extra"]["weather"], json!([null, {"description": "wind"}]));
    }

    #[test]
    fn existing_len_field_is_not_overwritten() {
        let f = ResponseFormatter::new(FormatterConfig {
            max_array_len: 2,
            ..FormatterConfig::default()
        });
        let out = f.format(
            Operation::DeleteEvent,
            &json!({"laps": [1, 2, 3], "laps_len": "service value", "splits": [1, 2, 3]}),
        );
        assert_eq!(out["laps"], json!([1, 2]));
        assert_eq!(out["laps_len"], json!("service value"));
        assert_eq!(out["splits_len"], json!(3));
    }

    #[test]
    fn folders_nest_workouts() {
        let out = formatter().format(
            Operation::GetTrainingPlans,
            &json!([{"id": 7, "name": "Base", "type": "PLAN", "children": [
                {"id": 70, "name": "Z2", "day": 0, "moving_time": 3600}
            ]}]),
        );
        let plan = &out["items"][0];
        assert_eq!(plan["workouts"][0]["moving_time_s"], json!(3600));
    }

    #[test]
    fn generic_and_scalar_payloads_pass_through() {
        let f = formatter();
        assert_eq!(f.format(Operation::DeleteEvent, &json!({"ok": true})), json!({"ok": true}));
        assert_eq!(f.format(Operation::GetActivityDetails, &json!(42)), json!(42));
        assert_eq!(f.format(Operation::GetActivityDetails, &Value::Null), Value::Null);
    }
}
