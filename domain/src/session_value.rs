use serde::{Deserialize, Serialize};

/// A value in a session's `{string → opaque}` map. Tagged rather than
/// relying on one host language's runtime-typed container, per the design
/// note on dynamic maps as session payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum SessionValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl From<bool> for SessionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SessionValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<String> for SessionValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for SessionValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}
