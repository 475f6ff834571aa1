//! Build configuration.
//!
//! Settings come from an optional `api-from-routes.toml` next to where the tool
//! is run. Every key has a default, so an empty file (or no file at all)
//! reproduces the stock zodios client module.

use crate::error::{Error, Result};
use anyhow::Context;
use clap::ValueEnum;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "api-from-routes.toml";

/// Materialization target of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Generated JavaScript module with the merged definition list
    #[default]
    Js,
    /// JSON manifest of the definitions
    Json,
    /// YAML manifest of the definitions
    Yaml,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub routes: RoutesSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub catalog: CatalogSection,
    /// Fixed imports placed at the top of the generated module
    #[serde(default = "default_imports")]
    pub imports: Vec<ImportSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            routes: RoutesSection::default(),
            output: OutputSection::default(),
            catalog: CatalogSection::default(),
            imports: default_imports(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutesSection {
    #[serde(default = "default_routes_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for RoutesSection {
    fn default() -> Self {
        Self {
            dir: default_routes_dir(),
            extensions: default_extensions(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Output file; stdout when unset
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_export_name")]
    pub export_name: String,
    #[serde(default = "default_constructor")]
    pub constructor: String,
    #[serde(default = "default_constructor_module")]
    pub constructor_module: String,
    /// Emitted when a definition has no `response`
    #[serde(default = "default_response")]
    pub default_response: String,
    /// Re-emit route file imports used by retained code
    #[serde(default = "default_true")]
    pub carry_imports: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            file: None,
            format: OutputFormat::default(),
            export_name: default_export_name(),
            constructor: default_constructor(),
            constructor_module: default_constructor_module(),
            default_response: default_response(),
            carry_imports: true,
        }
    }
}

/// The shared status code to error schema catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSection {
    #[serde(default = "default_catalog_name")]
    pub name: String,
    #[serde(default = "default_catalog_module")]
    pub module: String,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            name: default_catalog_name(),
            module: default_catalog_module(),
        }
    }
}

/// One `import` statement of the generated module header.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportSpec {
    pub module: String,
    pub default: Option<String>,
    #[serde(default)]
    pub named: Vec<String>,
}

impl ImportSpec {
    /// Local names this import binds.
    pub fn locals(&self) -> impl Iterator<Item = &str> {
        self.default
            .iter()
            .chain(self.named.iter())
            .map(String::as_str)
    }
}

fn default_routes_dir() -> PathBuf {
    PathBuf::from("routes")
}

fn default_extensions() -> Vec<String> {
    vec!["js".to_string(), "mjs".to_string(), "ts".to_string()]
}

fn default_export_name() -> String {
    "apiClient".to_string()
}

fn default_constructor() -> String {
    "makeApi".to_string()
}

fn default_constructor_module() -> String {
    "@zodios/core".to_string()
}

fn default_response() -> String {
    "z.object({}).optional()".to_string()
}

fn default_true() -> bool {
    true
}

fn default_catalog_name() -> String {
    "ResponseSchemas".to_string()
}

fn default_catalog_module() -> String {
    "@zod-schema/response".to_string()
}

fn default_imports() -> Vec<ImportSpec> {
    vec![ImportSpec {
        module: "zod".to_string(),
        default: None,
        named: vec!["z".to_string()],
    }]
}

/// Whether `name` can be used as a JavaScript binding name.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `explicit` if given, otherwise [`DEFAULT_CONFIG_FILE`] from `dir`
    /// when it exists, otherwise the defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Self::load(&candidate);
        }
        debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        let identifiers = [
            ("output.export_name", &self.output.export_name),
            ("output.constructor", &self.output.constructor),
            ("catalog.name", &self.catalog.name),
        ];
        for (key, value) in identifiers {
            if !is_identifier(value) {
                return Err(Error::ConfigError(format!(
                    "{} must be a JavaScript identifier, got `{}`",
                    key, value
                )));
            }
        }
        for import in &self.imports {
            if import.default.is_none() && import.named.is_empty() {
                return Err(Error::ConfigError(format!(
                    "import of `{}` binds no names",
                    import.module
                )));
            }
            if let Some(bad) = import.locals().find(|local| !is_identifier(local)) {
                return Err(Error::ConfigError(format!(
                    "import of `{}` has an invalid name `{}`",
                    import.module, bad
                )));
            }
        }
        if self.routes.extensions.is_empty() {
            return Err(Error::ConfigError(
                "routes.extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.routes.dir, PathBuf::from("routes"));
        assert_eq!(config.routes.extensions, vec!["js", "mjs", "ts"]);
        assert_eq!(config.output.format, OutputFormat::Js);
        assert_eq!(config.output.export_name, "apiClient");
        assert_eq!(config.output.default_response, "z.object({}).optional()");
        assert!(config.output.carry_imports);
        assert_eq!(config.catalog.name, "ResponseSchemas");
        assert_eq!(config.imports, default_imports());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = Config::from_toml_str(
            r#"
            [routes]
            dir = "src/routes"

            [output]
            file = "dist/api.js"
            format = "yaml"
            export_name = "client"

            [catalog]
            name = "Errors"
            module = "./errors.js"

            [[imports]]
            module = "zod"
            default = "z"

            [[imports]]
            module = "@app/schemas"
            named = ["UserSchema", "OrgSchema"]
            "#,
        )
        .unwrap();

        assert_eq!(config.routes.dir, PathBuf::from("src/routes"));
        assert_eq!(config.output.file, Some(PathBuf::from("dist/api.js")));
        assert_eq!(config.output.format, OutputFormat::Yaml);
        assert_eq!(config.output.export_name, "client");
        assert_eq!(config.output.constructor, "makeApi");
        assert_eq!(config.catalog.module, "./errors.js");
        assert_eq!(config.imports.len(), 2);
        let locals: Vec<&str> = config.imports[1].locals().collect();
        assert_eq!(locals, vec!["UserSchema", "OrgSchema"]);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = Config::from_toml_str("[output]\nformt = \"json\"");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_invalid_identifier_is_rejected() {
        let result = Config::from_toml_str("[output]\nexport_name = \"api-client\"");
        match result {
            Err(Error::ConfigError(msg)) => assert!(msg.contains("output.export_name")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_import_without_names_is_rejected() {
        let result = Config::from_toml_str("[[imports]]\nmodule = \"zod\"");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_discover_prefers_file_in_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(DEFAULT_CONFIG_FILE),
            "[output]\nformat = \"json\"",
        )
        .unwrap();

        let config = Config::discover(None, temp_dir.path()).unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::discover(None, temp_dir.path()).unwrap();
        assert_eq!(config.output.format, OutputFormat::Js);
        assert_eq!(config.imports, default_imports());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(Config::discover(Some(&missing), temp_dir.path()).is_err());
    }
}
