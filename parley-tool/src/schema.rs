//! Parameter schemas: derivation from argument types and structural checks.

use parley_types::{FieldError, ValidationError};
use serde_json::Value;

/// JSON Schema for a tool's argument type, trimmed for the model manifest.
///
/// Drops the `$schema` and `title` keys schemars adds at the root; everything
/// else is passed through unchanged.
#[must_use]
pub fn parameters_schema<A: schemars::JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(A)).unwrap_or_default();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

/// Validate raw arguments against a tool's declared parameter schema.
///
/// Lightweight structural checks, every violation collected:
/// - the arguments must be an object when the schema says `"type": "object"`
/// - every `"required"` field must be present
/// - present properties must match their declared `"type"` (a string or an
///   array of type names)
/// - present properties with an `"enum"` must equal one of its members
pub fn validate_args(tool: &str, args: &Value, schema: &Value) -> Result<(), ValidationError> {
    let Some(schema_obj) = schema.as_object() else {
        return Ok(());
    };

    if let Some(Value::String(ty)) = schema_obj.get("type")
        && ty == "object"
        && !args.is_object()
    {
        return Err(ValidationError::single(
            tool,
            "$",
            format!("expected object, got {}", json_type_name(args)),
        ));
    }

    let Some(args_obj) = args.as_object() else {
        return Ok(());
    };

    let mut fields = Vec::new();

    if let Some(Value::Array(required)) = schema_obj.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !args_obj.contains_key(name) {
                fields.push(FieldError {
                    field: name.to_string(),
                    reason: "missing required field".to_string(),
                });
            }
        }
    }

    if let Some(Value::Object(properties)) = schema_obj.get("properties") {
        for (name, prop) in properties {
            let Some(value) = args_obj.get(name) else {
                continue;
            };
            if let Some(expected) = prop.get("type")
                && !type_matches(value, expected)
            {
                fields.push(FieldError {
                    field: name.clone(),
                    reason: format!(
                        "expected {}, got {}",
                        describe_type(expected),
                        json_type_name(value)
                    ),
                });
                continue;
            }
            if let Some(Value::Array(allowed)) = prop.get("enum")
                && !allowed.contains(value)
            {
                fields.push(FieldError {
                    field: name.clone(),
                    reason: format!("{value} is not one of the allowed values"),
                });
            }
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            tool: tool.to_string(),
            fields,
        })
    }
}

fn type_matches(value: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(ty) => json_type_matches(value, ty),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|ty| json_type_matches(value, ty)),
        _ => true,
    }
}

fn json_type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(ty) => ty.clone(),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
