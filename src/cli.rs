use crate::config::{Config, OutputFormat};
use crate::pipeline::Pipeline;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// API from routes - Extract API definitions from a file-based route tree
#[derive(Parser, Debug)]
#[command(name = "api-from-routes")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Route directory (overrides `routes.dir` from the config file)
    #[arg(value_name = "ROUTES_DIR")]
    pub routes_dir: Option<PathBuf>,

    /// Output format (js, json or yaml)
    #[arg(short = 'f', long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Config file (defaults to ./api-from-routes.toml when present)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if let Some(ref routes_dir) = args.routes_dir {
        if !routes_dir.exists() {
            anyhow::bail!("Route directory does not exist: {}", routes_dir.display());
        }
        if !routes_dir.is_dir() {
            anyhow::bail!("Route path is not a directory: {}", routes_dir.display());
        }
    }

    Ok(args)
}

/// Loads the config file and applies command line overrides.
pub fn resolve_config(args: &CliArgs) -> Result<Config> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let mut config = Config::discover(args.config_path.as_deref(), &cwd)?;

    if let Some(ref routes_dir) = args.routes_dir {
        config.routes.dir = routes_dir.clone();
    }
    if let Some(format) = args.output_format {
        config.output.format = format;
    }
    if let Some(ref output) = args.output_path {
        config.output.file = Some(output.clone());
    }

    info!("Route directory: {}", config.routes.dir.display());
    info!("Output format: {:?}", config.output.format);
    match config.output.file {
        Some(ref output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }
    Ok(config)
}

fn output_dir(output: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let dir = match output.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
        _ => cwd,
    };
    Ok(dir)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let config = resolve_config(&args)?;

    info!("Starting API definition extraction...");
    let output = Pipeline::new(&config).run()?;

    let content = match config.output.format {
        OutputFormat::Js => {
            let dir = output_dir(config.output.file.as_deref())?;
            output.render_module(&config, dir)
        }
        OutputFormat::Json => serialize_json(&output.manifest())?,
        OutputFormat::Yaml => serialize_yaml(&output.manifest())?,
    };

    if let Some(ref output_path) = config.output.file {
        info!("Writing output to: {}", output_path.display());
        if write_to_file(&content, output_path)? {
            info!("Successfully wrote {}", output_path.display());
        } else {
            info!("{} is already up to date", output_path.display());
        }
    } else {
        print!("{}", content);
    }

    info!("Extraction complete!");
    info!("Summary:");
    info!("  - Endpoint files: {}", output.endpoints);
    info!("  - Definitions: {}", output.routes.len());
    info!("  - Without apiDefinition: {}", output.without_definition.len());
    info!("  - Middleware files: {}", output.middleware);
    info!("  - Failed files: {}", output.issues.len());
    info!(
        "  - Retained helpers: {}",
        output.routes.iter().map(|r| r.helpers.len()).sum::<usize>()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(routes_dir: Option<PathBuf>) -> CliArgs {
        CliArgs {
            routes_dir,
            output_format: None,
            output_path: None,
            config_path: None,
            verbose: false,
        }
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::try_parse_from([
            "api-from-routes",
            "src/routes",
            "-f",
            "yaml",
            "-o",
            "dist/api.yaml",
            "-c",
            "build.toml",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.routes_dir, Some(PathBuf::from("src/routes")));
        assert_eq!(args.output_format, Some(OutputFormat::Yaml));
        assert_eq!(args.output_path, Some(PathBuf::from("dist/api.yaml")));
        assert_eq!(args.config_path, Some(PathBuf::from("build.toml")));
        assert!(args.verbose);
    }

    #[test]
    fn test_missing_routes_dir_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(parse_args_from_parsed(args(Some(missing))).is_err());
    }

    #[test]
    fn test_file_as_routes_dir_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("get.js");
        std::fs::write(&file, "").unwrap();
        assert!(parse_args_from_parsed(args(Some(file))).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("build.toml");
        std::fs::write(&config_path, "[routes]\ndir = \"app/routes\"\n[output]\nformat = \"json\"").unwrap();

        let mut cli = args(Some(PathBuf::from("other")));
        cli.config_path = Some(config_path);
        cli.output_format = Some(OutputFormat::Yaml);

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.routes.dir, PathBuf::from("other"));
        assert_eq!(config.output.format, OutputFormat::Yaml);
    }
}
