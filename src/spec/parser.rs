use crate::constants;
use crate::error::Error;
use openapiv3::OpenAPI;
use serde_yaml::{Mapping, Value};

/// Properties that should be boolean but some definitions encode as 0/1
const BOOLEAN_PROPERTIES: &[&str] = &[
    constants::FIELD_DEPRECATED,
    constants::FIELD_REQUIRED,
    constants::FIELD_READ_ONLY,
    constants::FIELD_WRITE_ONLY,
    constants::FIELD_NULLABLE,
    constants::FIELD_UNIQUE_ITEMS,
    constants::FIELD_ALLOW_EMPTY_VALUE,
    constants::FIELD_EXPLODE,
    constants::FIELD_ALLOW_RESERVED,
];

const OPERATION_KEYS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Parses a YAML or JSON definition into an `OpenAPI` document.
///
/// Parsing is lenient: a missing `openapi` version, `info` block, `paths`
/// map or per-operation `responses` is filled in, numeric booleans are
/// normalized, and an empty document yields an empty definition.
///
/// # Errors
///
/// Returns a definition error naming `name` if the content is not valid
/// YAML/JSON or does not describe an `OpenAPI` document.
pub fn parse_definition(name: &str, content: &str) -> Result<OpenAPI, Error> {
    let mut document = if content.trim().is_empty() {
        Value::Mapping(Mapping::new())
    } else {
        serde_yaml::from_str::<Value>(content).map_err(|e| Error::definition(name, e.to_string()))?
    };

    if document.is_null() {
        document = Value::Mapping(Mapping::new());
    }

    let Value::Mapping(root) = &mut document else {
        return Err(Error::definition(name, "document root must be a mapping"));
    };

    fill_missing_sections(root, name);
    normalize_boolean_values(&mut document);

    let is_31 = document
        .get("openapi")
        .and_then(Value::as_str)
        .is_some_and(|v| v.starts_with("3.1"));

    match serde_yaml::from_value::<OpenAPI>(document.clone()) {
        Ok(spec) => Ok(spec),
        Err(e) if is_31 => parse_with_oas3(name, &document).map_err(|fallback| {
            Error::definition(name, format!("{e}; OpenAPI 3.1 fallback: {fallback}"))
        }),
        Err(e) => Err(Error::definition(name, e.to_string())),
    }
}

fn fill_missing_sections(root: &mut Mapping, name: &str) {
    root.entry(Value::from("openapi"))
        .or_insert_with(|| Value::from("3.0.0"));

    let info = root
        .entry(Value::from("info"))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if let Value::Mapping(info) = info {
        info.entry(Value::from("title"))
            .or_insert_with(|| Value::from(name));
        info.entry(Value::from("version"))
            .or_insert_with(|| Value::from("1.0"));
    }

    let paths = root
        .entry(Value::from("paths"))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if paths.is_null() {
        *paths = Value::Mapping(Mapping::new());
    }

    let Value::Mapping(paths) = paths else {
        return;
    };
    for (_, item) in paths.iter_mut() {
        let Value::Mapping(item) = item else {
            continue;
        };
        for key in OPERATION_KEYS {
            if let Some(Value::Mapping(operation)) = item.get_mut(*key) {
                operation
                    .entry(Value::from("responses"))
                    .or_insert_with(|| Value::Mapping(Mapping::new()));
            }
        }
    }
}

fn normalize_boolean_values(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            for (key, entry) in map.iter_mut() {
                let is_boolean_field = key
                    .as_str()
                    .is_some_and(|k| BOOLEAN_PROPERTIES.contains(&k));
                if is_boolean_field {
                    if let Some(n) = entry.as_u64().filter(|n| *n <= 1) {
                        *entry = Value::Bool(n == 1);
                        continue;
                    }
                }
                normalize_boolean_values(entry);
            }
        }
        Value::Sequence(items) => items.iter_mut().for_each(normalize_boolean_values),
        _ => {}
    }
}

/// Re-reads a 3.1 document through `oas3` and converts it to the 3.0 model.
#[cfg(feature = "openapi31")]
fn parse_with_oas3(_name: &str, document: &Value) -> Result<OpenAPI, String> {
    let yaml = serde_yaml::to_string(document).map_err(|e| e.to_string())?;
    let spec = oas3::from_yaml(&yaml).map_err(|e| e.to_string())?;
    let json = oas3::to_json(&spec).map_err(|e| e.to_string())?;
    serde_json::from_str::<OpenAPI>(&json).map_err(|e| e.to_string())
}

#[cfg(not(feature = "openapi31"))]
fn parse_with_oas3(_name: &str, _document: &Value) -> Result<OpenAPI, String> {
    Err("OpenAPI 3.1 support is not enabled, rebuild with --features openapi31".to_string())
}
