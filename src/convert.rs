//! JSON <-> Value conversion utilities

use crate::value::{Map, Value};

/// Convert serde_json::Value to Value
pub fn from_json(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::array(arr.into_iter().map(from_json)),
        serde_json::Value::Object(obj) => {
            Value::from(obj.into_iter().map(|(k, v)| (k, from_json(v))).collect::<Map>())
        }
    }
}

/// Convert Value to serde_json::Value
pub fn to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(arr) => serde_json::Value::Array(arr.iter().map(to_json).collect()),
        Value::Object(obj) => serde_json::Value::Object(
            obj.iter()
                .map(|(k, v)| (k.to_string(), to_json(v)))
                .collect(),
        ),
    }
}

/// Parse JSON text straight into a Value.
pub fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str::<serde_json::Value>(text).map(from_json)
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        from_json(v)
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        to_json(&v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_member_order_survives() {
        let v = parse_json(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let Value::Object(map) = &v else {
            panic!("expected object");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(to_json(&v).to_string(), r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn integers_and_floats_stay_apart() {
        assert_eq!(parse_json("7").unwrap(), Value::Integer(7));
        assert_eq!(parse_json("7.5").unwrap(), Value::Float(7.5));
    }
}
