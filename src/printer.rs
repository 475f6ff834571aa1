//! Single-line printing of rewritten expressions with `oxc_codegen`.

use crate::error::{Error, Result};
use crate::parser::source_type_for;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use std::path::Path;

/// Re-parses an expression and prints it minified on one line.
///
/// Comments are dropped and statement boundaries inside function bodies are
/// made explicit, so the result keeps its meaning wherever it is spliced.
///
/// # Arguments
///
/// * `file` - Route file the expression comes from, selects JS or TS syntax
/// * `text` - Expression source, already rewritten
///
/// # Errors
///
/// Returns [`Error::ParseError`] if `text` is not a single expression.
pub fn print_expression(file: &Path, text: &str) -> Result<String> {
    let allocator = Allocator::default();
    let expr = Parser::new(&allocator, text, source_type_for(file))
        .parse_expression()
        .map_err(|errors| Error::ParseError {
            file: file.to_path_buf(),
            message: errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        })?;

    let mut codegen = Codegen::new().with_options(CodegenOptions::minify());
    codegen.print_expression(&expr);
    Ok(codegen.into_source_text())
}
