//! Serialization module for writing build output.
//!
//! The manifest (Mode B) can be serialized to JSON or YAML. Every output,
//! including the generated module, is written through [`write_to_file`].

use crate::emitter::ApiManifest;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes a manifest to YAML format.
///
/// Schema expressions are carried as plain strings.
///
/// # Arguments
///
/// * `manifest` - The manifest to serialize
///
/// # Returns
///
/// Returns the YAML string representation of the manifest.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(manifest: &ApiManifest) -> Result<String> {
    debug!("Serializing API manifest to YAML");
    serde_yaml::to_string(manifest).context("Failed to serialize API manifest to YAML")
}

/// Serializes a manifest to JSON format with pretty printing.
///
/// # Arguments
///
/// * `manifest` - The manifest to serialize
///
/// # Returns
///
/// Returns the JSON string representation of the manifest.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(manifest: &ApiManifest) -> Result<String> {
    debug!("Serializing API manifest to JSON");
    let mut json =
        serde_json::to_string_pretty(manifest).context("Failed to serialize API manifest to JSON")?;
    json.push('\n');
    Ok(json)
}

/// Writes string content to a file.
///
/// Parent directories are created as needed. When the file already holds
/// exactly `content` it is left untouched, so rebuilding an unchanged route
/// tree does not bump the output's modification time.
///
/// # Arguments
///
/// * `content` - The string content to write
/// * `path` - The file path to write to
///
/// # Returns
///
/// Returns `true` if the file was written, `false` if it was already current.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<bool> {
    debug!("Writing content to file: {}", path.display());

    if let Ok(existing) = fs::read_to_string(path) {
        if existing == content {
            debug!("{} is up to date", path.display());
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{ApiDefinition, Parameter, ParameterLocation};
    use crate::scanner::HttpMethod;
    use tempfile::TempDir;

    fn create_test_manifest() -> ApiManifest {
        ApiManifest {
            definitions: vec![ApiDefinition {
                alias: Some("getUser".to_string()),
                description: None,
                method: HttpMethod::Get,
                path: "/users/:id".to_string(),
                parameters: vec![Parameter {
                    name: "id".to_string(),
                    location: ParameterLocation::Path,
                    description: None,
                    schema: Some("z.coerce.number()".to_string()),
                }],
                parameters_expression: None,
                response: "_users__id__get__user".to_string(),
                errors: vec!["ResponseSchemas[404]".to_string()],
                extra: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_manifest()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let definition = &value["definitions"][0];
        assert_eq!(definition["alias"], "getUser");
        assert_eq!(definition["method"], "get");
        assert_eq!(definition["path"], "/users/:id");
        assert_eq!(definition["parameters"][0]["location"], "path");
        assert_eq!(definition["errors"][0], "ResponseSchemas[404]");
        assert!(definition.get("description").is_none());
        assert!(definition.get("extra").is_none());
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_manifest()).unwrap();
        assert!(yaml.contains("definitions:"));
        assert!(yaml.contains("method: get"));

        let parsed: ApiManifest = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, create_test_manifest());
    }

    #[test]
    fn test_write_to_file_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dist/api/index.js");

        assert!(write_to_file("export {}\n", &path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "export {}\n");
    }

    #[test]
    fn test_write_to_file_skips_unchanged_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("api.js");

        assert!(write_to_file("a", &path).unwrap());
        assert!(!write_to_file("a", &path).unwrap());
        assert!(write_to_file("b", &path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "b");
    }
}
