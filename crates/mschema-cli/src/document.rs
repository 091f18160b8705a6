//! # Document Loading
//!
//! Reads schema and data files from disk. Data documents are YAML when the
//! extension is `.yaml`/`.yml` and JSON otherwise; YAML is converted to the
//! `serde_json::Value` data model the matcher works on.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use mschema::{CompiledSchema, SchemaCompiler};

/// Read and compile a schema file.
pub fn load_schema(compiler: &SchemaCompiler, path: &Path) -> Result<CompiledSchema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read schema file {}", path.display()))?;
    let schema = compiler
        .compile(&text)
        .with_context(|| format!("cannot compile schema {}", path.display()))?;
    tracing::debug!(path = %path.display(), empty = schema.is_empty(), "loaded schema");
    Ok(schema)
}

/// Read a YAML or JSON data document.
pub fn load_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read document {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let value = match ext {
        "yaml" | "yml" => {
            let yaml_value: serde_yaml::Value = serde_yaml::from_str(&content)
                .with_context(|| format!("invalid YAML in {}", path.display()))?;
            yaml_to_json_value(&yaml_value)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("YAML-to-JSON conversion failed for {}", path.display()))?
        }
        _ => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", path.display()))?,
    };
    tracing::debug!(path = %path.display(), "loaded document");
    Ok(value)
}

/// Convert a YAML document to the JSON data model.
///
/// Scalar mapping keys become strings and YAML tags are dropped. Sequence
/// or mapping keys have no JSON counterpart and are rejected.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => serde_json::to_value(n).map_err(|e| format!("number {n}: {e}"))?,
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(elements) => Value::Array(
            elements
                .iter()
                .map(yaml_to_json_value)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, value)| -> Result<(String, Value), String> {
                    Ok((mapping_key(key)?, yaml_to_json_value(value)?))
                })
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Tagged(tagged) => yaml_to_json_value(&tagged.value)?,
    })
}

fn mapping_key(key: &serde_yaml::Value) -> Result<String, String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        other => Err(format!("mapping key {other:?} cannot be a JSON object key")),
    }
}
