//! Batch orchestration: scan, then per-file parse, rename, resolve and
//! assemble in parallel, then join in route order.

use crate::assembler::{assemble, AssembledRoute, AssemblyOptions};
use crate::config::Config;
use crate::emitter::{render_module, ApiManifest, ModuleOptions};
use crate::error::{Error, FileIssue, Result};
use crate::parser::SourceParser;
use crate::renamer::{PrefixTable, RenameTable};
use crate::resolver::resolve;
use crate::scanner::{FileScanner, HttpMethod, RouteFile};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to one endpoint file.
#[derive(Debug)]
enum FileOutcome {
    Assembled(Box<AssembledRoute>),
    NoDefinition(PathBuf),
    Failed(FileIssue),
}

/// Result of a build run.
#[derive(Debug, Default)]
pub struct BuildOutput {
    /// Absolute route root
    pub route_root: PathBuf,
    /// Assembled routes in relative-path order
    pub routes: Vec<AssembledRoute>,
    /// Endpoint files without an `apiDefinition`
    pub without_definition: Vec<PathBuf>,
    /// File-scoped failures, in relative-path order
    pub issues: Vec<FileIssue>,
    /// Number of endpoint files processed
    pub endpoints: usize,
    /// Number of middleware files seen
    pub middleware: usize,
    /// Number of source files whose name is not a route name
    pub skipped: usize,
}

impl BuildOutput {
    /// Mode B view of the run.
    pub fn manifest(&self) -> ApiManifest {
        ApiManifest::from_routes(&self.routes)
    }

    /// Mode A module for a file written to `output_dir`.
    pub fn render_module(&self, config: &Config, output_dir: PathBuf) -> String {
        let options = ModuleOptions::from_config(config, self.route_root.clone(), output_dir);
        render_module(&self.routes, &options)
    }
}

/// Runs the extraction pipeline over a route tree.
///
/// # Example
///
/// ```no_run
/// use api_from_routes::config::Config;
/// use api_from_routes::pipeline::Pipeline;
///
/// let config = Config::default();
/// let output = Pipeline::new(&config).run().unwrap();
/// println!("{} definitions", output.manifest().definitions.len());
/// ```
pub struct Pipeline<'a> {
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            catalog: self.config.catalog.name.clone(),
            default_response: self.config.output.default_response.clone(),
        }
    }

    /// Scans the configured route directory and processes every endpoint.
    ///
    /// # Errors
    ///
    /// Fails if the route directory cannot be resolved, holds no endpoint
    /// files, or if no endpoint file could be processed. Everything else is
    /// reported through [`BuildOutput::issues`].
    pub fn run(&self) -> anyhow::Result<BuildOutput> {
        let root = &self.config.routes.dir;
        info!("Scanning route directory: {}", root.display());
        let scan = FileScanner::new(root.clone())
            .with_extensions(self.config.routes.extensions.clone())
            .scan()?;

        let middleware = scan.routes.len() - scan.endpoints().count();
        let skipped = scan.skipped.len();
        let route_root = std::path::absolute(root).unwrap_or_else(|_| root.clone());

        let mut output = self.process(&route_root, scan.routes)?;
        output.middleware = middleware;
        output.skipped = skipped;
        Ok(output)
    }

    /// Processes classified route files. The result does not depend on the
    /// order of `routes`.
    pub fn process(&self, route_root: &Path, routes: Vec<RouteFile>) -> Result<BuildOutput> {
        let mut endpoints: Vec<(RouteFile, HttpMethod)> = routes
            .into_iter()
            .filter_map(|route| route.method().map(|method| (route, method)))
            .collect();
        endpoints.sort_by(|a, b| a.0.relative_path.cmp(&b.0.relative_path));

        if endpoints.is_empty() {
            return Err(Error::NoRouteFiles {
                root: route_root.to_path_buf(),
            });
        }
        warn_duplicate_routes(&endpoints);

        let prefixes = PrefixTable::build(endpoints.iter().map(|(route, _)| route));
        debug!("Assigned {} helper prefixes", prefixes.len());
        let options = self.assembly_options();

        let outcomes: Vec<FileOutcome> = endpoints
            .par_iter()
            .map(|(route, method)| {
                let prefix = prefixes.get(route).unwrap_or_default();
                match process_file(route, *method, prefix, &options) {
                    Ok(Some(assembled)) => FileOutcome::Assembled(Box::new(assembled)),
                    Ok(None) => FileOutcome::NoDefinition(route.relative_path.clone()),
                    Err(error) => FileOutcome::Failed(FileIssue {
                        file: route.relative_path.clone(),
                        error,
                    }),
                }
            })
            .collect();

        let mut output = BuildOutput {
            route_root: route_root.to_path_buf(),
            endpoints: endpoints.len(),
            ..BuildOutput::default()
        };
        for outcome in outcomes {
            match outcome {
                FileOutcome::Assembled(route) => output.routes.push(*route),
                FileOutcome::NoDefinition(file) => {
                    debug!("{} has no apiDefinition, skipping", file.display());
                    output.without_definition.push(file);
                }
                FileOutcome::Failed(issue) => {
                    warn!("Skipping {}: {}", issue.file.display(), issue);
                    output.issues.push(issue);
                }
            }
        }

        if output.issues.len() == output.endpoints {
            return Err(Error::NoRouteFiles {
                root: route_root.to_path_buf(),
            });
        }

        info!(
            "Extracted {} definitions from {} endpoint files ({} failed)",
            output.routes.len(),
            output.endpoints,
            output.issues.len()
        );
        Ok(output)
    }
}

fn warn_duplicate_routes(endpoints: &[(RouteFile, HttpMethod)]) {
    let mut by_key: HashMap<String, Vec<&Path>> = HashMap::new();
    for (route, _) in endpoints {
        by_key
            .entry(route.route_key())
            .or_default()
            .push(&route.relative_path);
    }
    let mut duplicates: Vec<(String, Vec<&Path>)> =
        by_key.into_iter().filter(|(_, files)| files.len() > 1).collect();
    duplicates.sort();
    for (key, files) in duplicates {
        let files: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        warn!("Route `{}` is defined by several files: {}", key, files.join(", "));
    }
}

/// Reads one endpoint file and runs it through the per-file stages.
pub fn process_file(
    route: &RouteFile,
    method: HttpMethod,
    prefix: &str,
    options: &AssemblyOptions,
) -> Result<Option<AssembledRoute>> {
    let source = fs::read_to_string(&route.absolute_path)?;
    process_source(route, method, &source, prefix, options)
}

/// Runs parse, rename, resolve and assemble over source text. Returns `None`
/// when the file exports no `apiDefinition`.
pub fn process_source(
    route: &RouteFile,
    method: HttpMethod,
    source: &str,
    prefix: &str,
    options: &AssemblyOptions,
) -> Result<Option<AssembledRoute>> {
    let parsed = SourceParser::parse_source(&route.relative_path, source)?;
    let table = RenameTable::build(prefix, &parsed.declarations);
    let Some(resolution) = resolve(&parsed, &table) else {
        return Ok(None);
    };
    assemble(route, method, resolution, options).map(Some)
}
