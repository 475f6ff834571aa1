//! Materialization of assembled routes.
//!
//! Mode A renders one JavaScript module: header imports, carried route file
//! imports, every retained helper, and the definition list handed to the
//! client constructor. Mode B is the [`ApiManifest`], the same definitions as
//! plain data for in-process consumers and the JSON/YAML serializers.

use crate::assembler::{ApiDefinition, AssembledRoute};
use crate::config::{is_identifier, Config, ImportSpec};
use crate::parser::{ImportBinding, ImportKind};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

/// First line of every generated module.
pub const GENERATED_HEADER: &str = "// Generated by api-from-routes. Do not edit.";

/// Mode B output: the ordered definition list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiManifest {
    pub definitions: Vec<ApiDefinition>,
}

impl ApiManifest {
    pub fn from_routes(routes: &[AssembledRoute]) -> Self {
        Self {
            definitions: routes.iter().map(|r| r.definition.clone()).collect(),
        }
    }
}

/// Settings for rendering the generated module.
#[derive(Debug, Clone)]
pub struct ModuleOptions {
    pub export_name: String,
    pub constructor: String,
    pub constructor_module: String,
    pub catalog_name: String,
    pub catalog_module: String,
    pub imports: Vec<ImportSpec>,
    pub carry_imports: bool,
    /// Absolute route root, used to locate relative import specifiers
    pub route_root: PathBuf,
    /// Absolute directory the module is written to
    pub output_dir: PathBuf,
}

impl ModuleOptions {
    pub fn from_config(config: &Config, route_root: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            export_name: config.output.export_name.clone(),
            constructor: config.output.constructor.clone(),
            constructor_module: config.output.constructor_module.clone(),
            catalog_name: config.catalog.name.clone(),
            catalog_module: config.catalog.module.clone(),
            imports: config.imports.clone(),
            carry_imports: config.output.carry_imports,
            route_root,
            output_dir,
        }
    }

    /// Header imports: the constructor, the configured imports, the catalog.
    fn header(&self) -> Vec<ImportSpec> {
        let mut header = vec![ImportSpec {
            module: self.constructor_module.clone(),
            default: None,
            named: vec![self.constructor.clone()],
        }];
        header.extend(self.imports.iter().cloned());
        header.push(ImportSpec {
            module: self.catalog_module.clone(),
            default: None,
            named: vec![self.catalog_name.clone()],
        });
        header
    }
}

/// Renders the Mode A module.
pub fn render_module(routes: &[AssembledRoute], options: &ModuleOptions) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push('\n');

    let header = options.header();
    for spec in &header {
        out.push_str(&render_import_spec(spec));
        out.push('\n');
    }

    if options.carry_imports {
        let reserved: HashSet<&str> = header.iter().flat_map(|spec| spec.locals()).collect();
        for line in carried_imports(routes, &reserved, options) {
            out.push_str(&line);
            out.push('\n');
        }
    }

    let helpers: Vec<&str> = routes
        .iter()
        .flat_map(|r| r.helpers.iter().map(|h| h.text.as_str()))
        .collect();
    if !helpers.is_empty() {
        out.push('\n');
        for helper in helpers {
            out.push_str(helper);
            out.push('\n');
        }
    }

    out.push('\n');
    out.push_str(&format!(
        "export const {} = {}([\n",
        options.export_name, options.constructor
    ));
    for route in routes {
        out.push_str(&format!("  {},\n", render_definition(&route.definition)));
    }
    out.push_str("])\n");
    out
}

fn quote(s: &str) -> String {
    // serde_json string escaping is a valid JavaScript string literal
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

/// Single-line object literal for one definition. Keys are quoted; schema
/// valued fields are spliced in as expressions.
pub fn render_definition(definition: &ApiDefinition) -> String {
    let mut fields: Vec<(String, String)> = Vec::new();
    if let Some(alias) = &definition.alias {
        fields.push(("alias".to_string(), quote(alias)));
    }
    if let Some(description) = &definition.description {
        fields.push(("description".to_string(), quote(description)));
    }
    fields.push(("method".to_string(), quote(definition.method.as_str())));
    fields.push(("path".to_string(), quote(&definition.path)));

    let parameters = match &definition.parameters_expression {
        Some(expression) => expression.clone(),
        None => {
            let entries: Vec<String> = definition
                .parameters
                .iter()
                .map(|p| {
                    let mut entry = vec![
                        format!("\"name\":{}", quote(&p.name)),
                        format!("\"type\":{}", quote(p.location.zodios_type())),
                    ];
                    if let Some(description) = &p.description {
                        entry.push(format!("\"description\":{}", quote(description)));
                    }
                    if let Some(schema) = &p.schema {
                        entry.push(format!("\"schema\":{}", schema));
                    }
                    format!("{{{}}}", entry.join(","))
                })
                .collect();
            format!("[{}]", entries.join(","))
        }
    };
    fields.push(("parameters".to_string(), parameters));
    fields.push(("response".to_string(), definition.response.clone()));
    fields.push(("errors".to_string(), format!("[{}]", definition.errors.join(","))));
    for extra in &definition.extra {
        fields.push((extra.key.clone(), extra.value.clone()));
    }

    let body: Vec<String> = fields
        .into_iter()
        .map(|(key, value)| format!("{}:{}", quote(&key), value))
        .collect();
    format!("{{{}}}", body.join(","))
}

fn render_import_spec(spec: &ImportSpec) -> String {
    let mut clause = Vec::new();
    if let Some(default) = &spec.default {
        clause.push(default.clone());
    }
    if !spec.named.is_empty() {
        clause.push(format!("{{ {} }}", spec.named.join(", ")));
    }
    format!("import {} from {};", clause.join(", "), quote(&spec.module))
}

/// Import bindings of all routes that survive deduplication, rendered and
/// grouped by module in first-seen order.
fn carried_imports(
    routes: &[AssembledRoute],
    reserved: &HashSet<&str>,
    options: &ModuleOptions,
) -> Vec<String> {
    let mut seen: HashMap<String, (ImportKind, String)> = HashMap::new();
    let mut modules: Vec<(String, Vec<(String, ImportKind)>)> = Vec::new();

    for route in routes {
        for binding in &route.imports {
            if reserved.contains(binding.local.as_str()) {
                continue;
            }
            let module = rebase_specifier(binding, &route.route.relative_path, options);
            if let Some((kind, origin)) = seen.get(&binding.local) {
                if *kind != binding.kind || *origin != module {
                    warn!(
                        "{}: import `{}` from {} conflicts with an earlier import from {}, keeping the earlier one",
                        route.route.relative_path.display(),
                        binding.local,
                        module,
                        origin
                    );
                }
                continue;
            }
            seen.insert(binding.local.clone(), (binding.kind.clone(), module.clone()));
            match modules.iter_mut().find(|(m, _)| *m == module) {
                Some((_, bindings)) => bindings.push((binding.local.clone(), binding.kind.clone())),
                None => modules.push((module, vec![(binding.local.clone(), binding.kind.clone())])),
            }
        }
    }

    let mut lines = Vec::new();
    for (module, bindings) in modules {
        let source = quote(&module);
        let mut defaults = Vec::new();
        let mut named = Vec::new();
        for (local, kind) in bindings {
            match kind {
                ImportKind::Default => defaults.push(local),
                ImportKind::Namespace => lines.push(format!("import * as {} from {};", local, source)),
                ImportKind::Named(imported) if imported == local => named.push(local),
                ImportKind::Named(imported) if is_identifier(&imported) => {
                    named.push(format!("{} as {}", imported, local))
                }
                ImportKind::Named(imported) => named.push(format!("{} as {}", quote(&imported), local)),
            }
        }
        let mut defaults = defaults.into_iter();
        let mut clause = Vec::new();
        if let Some(first) = defaults.next() {
            clause.push(first);
        }
        if !named.is_empty() {
            clause.push(format!("{{ {} }}", named.join(", ")));
        }
        if !clause.is_empty() {
            lines.push(format!("import {} from {};", clause.join(", "), source));
        }
        for extra in defaults {
            lines.push(format!("import {} from {};", extra, source));
        }
    }
    lines
}

/// Re-targets a relative specifier from the route file's directory to the
/// output directory. Bare and absolute specifiers are returned unchanged.
fn rebase_specifier(binding: &ImportBinding, relative_file: &Path, options: &ModuleOptions) -> String {
    let source = &binding.source;
    if !(source.starts_with("./") || source.starts_with("../")) {
        return source.clone();
    }
    let file_dir = options
        .route_root
        .join(relative_file)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| options.route_root.clone());
    let target = normalize(&file_dir.join(source));
    let rebased = relative_to(&target, &normalize(&options.output_dir));
    debug!("Rebased import {} to {}", source, rebased);
    rebased
}

/// Lexically resolves `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Relative module specifier from `base` (a directory) to `target`.
fn relative_to(target: &Path, base: &Path) -> String {
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); base.len() - common];
    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}
