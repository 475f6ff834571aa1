//! API from routes - Build-time extraction of API definitions from file-based routes.
//!
//! Every route file of a file-based router exports an `apiDefinition` object
//! that describes its endpoint with schema expressions, often built from
//! private helpers declared in the same file. This library merges all of those
//! definitions into one artifact without ever executing a route file.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Walks the route tree and infers method and URL path per file
//! 2. [`parser`] - Parses a route file and lowers its top level into owned data
//! 3. [`renamer`] - Assigns each file a unique prefix and renames its helpers
//! 4. [`resolver`] - Keeps only helpers reachable from the definition and rewrites references
//! 5. [`assembler`] - Builds the [`assembler::ApiDefinition`] record of a route
//! 6. [`emitter`] - Renders the merged module or the in-memory manifest
//! 7. [`serializer`] - Serializes the manifest to JSON or YAML and writes output
//!
//! [`pipeline`] drives these stages over a whole tree, one route file per
//! parallel unit of work.
//!
//! # Example Usage
//!
//! ```no_run
//! use api_from_routes::{config::Config, pipeline::Pipeline};
//! use std::path::PathBuf;
//!
//! let mut config = Config::default();
//! config.routes.dir = PathBuf::from("./routes");
//!
//! let output = Pipeline::new(&config).run().unwrap();
//! for issue in &output.issues {
//!     eprintln!("skipped {}: {}", issue.file.display(), issue);
//! }
//!
//! // Mode A: one generated module
//! let module = output.render_module(&config, PathBuf::from("./dist"));
//! println!("{}", module);
//!
//! // Mode B: the same definitions as data
//! let manifest = output.manifest();
//! println!("{} definitions", manifest.definitions.len());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod assembler;
pub mod cli;
pub mod config;
pub mod emitter;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod printer;
pub mod references;
pub mod renamer;
pub mod resolver;
pub mod scanner;
pub mod serializer;
