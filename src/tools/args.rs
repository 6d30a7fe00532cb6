//! Function-call argument decoding

use super::ToolError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode call arguments given either as a JSON object or as a string that
/// itself contains JSON. A missing argument payload decodes like `{}`.
pub fn decode_arguments<T: DeserializeOwned>(arguments: &Value) -> Result<T, ToolError> {
    let result = match arguments {
        Value::String(raw) if raw.trim().is_empty() => serde_json::from_str("{}"),
        Value::String(raw) => serde_json::from_str(raw),
        Value::Null => serde_json::from_value(Value::Object(serde_json::Map::new())),
        other => serde_json::from_value(other.clone()),
    };
    result.map_err(|e| ToolError::ArgumentParse(e.to_string()))
}
