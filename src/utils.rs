use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Serialize a serde-backed enum into its string name (e.g. snake_case).
pub fn serde_enum_name<T: Serialize>(val: &T) -> Option<String> {
    serde_json::to_value(val).ok()?.as_str().map(|s| s.to_string())
}

/// Inverse of [`serde_enum_name`]: parse a stored text column back into its enum.
pub fn parse_serde_enum<T: DeserializeOwned>(name: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(name.to_string()))
        .map_err(|_| format!("unknown enum value {:?}", name))
}

/// Decode a `jsonb` column, reporting the path of the offending field on failure.
pub fn decode_json<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_path_to_error::deserialize(value).map_err(|e| format!("{} at {}", e.inner(), e.path()))
}

/// Trimmed, non-empty text or `None`.
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Snapshot {
        #[allow(dead_code)]
        rooms: Vec<String>,
    }

    #[test]
    fn decode_json_reports_field_path() {
        let err = decode_json::<Snapshot>(serde_json::json!({"rooms": ["Kitchen", 3]})).unwrap_err();
        assert!(err.contains("rooms[1]"), "unexpected error: {err}");
    }

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank("  Pantry "), Some("Pantry"));
        assert_eq!(non_blank("   "), None);
    }
}
