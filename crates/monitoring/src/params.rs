use std::fmt;

use serde_json::{Map, Value};

/// Parameter object decoded field by field from a JSON payload.
pub trait Params: Default {
    /// Wire names of the fields.
    const FIELDS: &'static [&'static str];

    /// Decode `value` into the field named `field`.
    fn set(&mut self, field: &str, value: Value) -> Result<(), serde_json::Error>;
}

/// Everything that went wrong while decoding a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamsError(Vec<String>);

impl ParamsError {
    /// Individual failures, one per payload or field.
    pub fn failures(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for ParamsError {}

/// Decode `raw` into `P`, keeping the default of every field that is absent
/// or does not decode.
///
/// Keys match case-insensitively; an exact match wins over other spellings.
/// A `null` payload or field value leaves the defaults untouched. Failures are
/// handed back next to the params so the caller can surface them.
pub fn decode<P: Params>(raw: &[u8]) -> (P, Option<ParamsError>) {
    let mut params = P::default();
    let object = match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(object)) => object,
        Ok(Value::Null) => return (params, None),
        Ok(other) => {
            let failure = format!("expected a JSON object, found {}", kind(&other));
            return (params, Some(ParamsError(vec![failure])));
        }
        Err(e) => return (params, Some(ParamsError(vec![e.to_string()]))),
    };

    let mut failures = Vec::new();
    for field in P::FIELDS {
        let Some(value) = lookup(&object, field) else { continue };
        if value.is_null() {
            continue;
        }
        if let Err(e) = params.set(field, value.clone()) {
            failures.push(format!("{}: {}", field, e));
        }
    }
    let err = (!failures.is_empty()).then_some(ParamsError(failures));
    (params, err)
}

fn lookup<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    object.get(field).or_else(|| {
        object.iter().find(|(key, _)| key.eq_ignore_ascii_case(field)).map(|(_, value)| value)
    })
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parameters of `get_sysinfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysinfoParams {
    /// Machine to query.
    pub machine_uuid: String,
    /// Number of samples to return.
    pub limit: i64,
}

impl Params for SysinfoParams {
    const FIELDS: &'static [&'static str] = &["MachineUuid", "Limit"];

    fn set(&mut self, field: &str, value: Value) -> Result<(), serde_json::Error> {
        match field {
            "MachineUuid" => self.machine_uuid = serde_json::from_value(value)?,
            "Limit" => self.limit = serde_json::from_value(value)?,
            _ => {}
        }
        Ok(())
    }
}

/// Parameters of the operations keyed only by machine (`get_netinfo`, `get_planners`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineParams {
    /// Machine to query.
    pub machine_uuid: String,
}

impl Params for MachineParams {
    const FIELDS: &'static [&'static str] = &["MachineUuid"];

    fn set(&mut self, field: &str, value: Value) -> Result<(), serde_json::Error> {
        if field == "MachineUuid" {
            self.machine_uuid = serde_json::from_value(value)?;
        }
        Ok(())
    }
}
