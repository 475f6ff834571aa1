use crate::error::{Error, Result};
use crate::references::{Reference, ReferenceCollector};
use log::debug;
use oxc_allocator::Allocator;
use oxc_ast::ast;
use oxc_parser::Parser;
use oxc_semantic::{Scoping, SemanticBuilder};
use oxc_span::{GetSpan, SourceType, Span};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Name of the exported object literal that describes a route.
pub const API_DEFINITION_NAME: &str = "apiDefinition";

/// Binding form of a top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Const,
    Let,
    Var,
    Function,
    Class,
}

impl DeclarationKind {
    /// Keyword that has to be re-emitted in front of a variable declarator.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            DeclarationKind::Const => Some("const"),
            DeclarationKind::Let => Some("let"),
            DeclarationKind::Var => Some("var"),
            DeclarationKind::Function | DeclarationKind::Class => None,
        }
    }
}

/// A named top-level binding of a route file other than the API definition.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// Name as declared in the route file
    pub name: String,
    pub kind: DeclarationKind,
    /// Declarator text (`name = init`) for variables, full declaration otherwise
    pub text: String,
    /// Span of the binding name inside `text`
    pub binding: Span,
    /// Free references inside `text`, relative to its start
    pub references: Vec<Reference>,
}

/// Statically known value of a fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Not a literal this tool interprets
    None,
    /// A string literal or a template literal without substitutions
    String(String),
    /// An array of integer literals
    Integers(Vec<i64>),
}

/// Verbatim source text of an expression plus the references inside it.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub text: String,
    pub references: Vec<Reference>,
    pub literal: Literal,
}

/// One entry of an inline `parameters` array.
#[derive(Debug, Clone, Default)]
pub struct ParameterSource {
    pub name: Option<Fragment>,
    /// The `type` field (`Path`, `Query`, `Body`, `Header`)
    pub location: Option<Fragment>,
    pub description: Option<Fragment>,
    pub schema: Option<Fragment>,
}

/// The `apiDefinition` object literal, one fragment per property.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSource {
    /// Properties in source order
    pub properties: Vec<(String, Fragment)>,
    /// Structured view of `parameters` when it is an array of object literals
    pub parameters: Option<Vec<ParameterSource>>,
}

impl DefinitionSource {
    pub fn get(&self, key: &str) -> Option<&Fragment> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, fragment)| fragment)
    }
}

/// What an import binding refers to in its module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportKind {
    Default,
    Namespace,
    Named(String),
}

/// A single local binding introduced by an `import` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportBinding {
    pub local: String,
    pub kind: ImportKind,
    /// Module specifier exactly as written
    pub source: String,
}

/// A route file lowered into owned data: the definition, an arena of helper
/// declarations in source order, and its import bindings.
#[derive(Debug, Clone, Default)]
pub struct ParsedRoute {
    pub definition: Option<DefinitionSource>,
    pub declarations: Vec<Declaration>,
    pub imports: Vec<ImportBinding>,
}

impl ParsedRoute {
    /// Index from original declaration name to arena slot.
    pub fn declaration_index(&self) -> HashMap<&str, usize> {
        self.declarations
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.as_str(), i))
            .collect()
    }
}

/// Route file parser built on `oxc`.
///
/// Only top-level statements are inspected. The syntax tree lives in an arena
/// that is dropped before `parse_source` returns; everything later stages need
/// is copied into a [`ParsedRoute`].
///
/// # Example
///
/// ```no_run
/// use api_from_routes::parser::SourceParser;
/// use std::path::Path;
///
/// let parsed = SourceParser::parse_file(Path::new("routes/users/get.js")).unwrap();
/// println!("{} helper declarations", parsed.declarations.len());
/// ```
pub struct SourceParser;

impl SourceParser {
    /// Reads and parses a route file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has syntax errors, or
    /// declares the same top-level name twice.
    pub fn parse_file(path: &Path) -> Result<ParsedRoute> {
        debug!("Parsing file: {}", path.display());
        let source = fs::read_to_string(path)?;
        Self::parse_source(path, &source)
    }

    /// Parses route source text. `path` selects JavaScript or TypeScript
    /// syntax and is used in error messages.
    pub fn parse_source(path: &Path, source: &str) -> Result<ParsedRoute> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type_for(path)).parse();

        if !ret.errors.is_empty() {
            let message = ret
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::ParseError {
                file: path.to_path_buf(),
                message,
            });
        }

        // Only binding resolution is needed; semantic diagnostics such as
        // redeclarations are reported by the lowering itself.
        let semantic = SemanticBuilder::new().build(&ret.program).semantic;
        let mut lowering = Lowering {
            path,
            source,
            scoping: semantic.scoping(),
            parsed: ParsedRoute::default(),
            seen: HashSet::new(),
        };
        for stmt in &ret.program.body {
            lowering.statement(stmt)?;
        }

        debug!(
            "Parsed {}: definition={}, {} declarations, {} imports",
            path.display(),
            lowering.parsed.definition.is_some(),
            lowering.parsed.declarations.len(),
            lowering.parsed.imports.len()
        );
        Ok(lowering.parsed)
    }
}

pub(crate) fn source_type_for(path: &Path) -> SourceType {
    let typescript = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts" | "mts" | "cts")
    );
    SourceType::default()
        .with_module(true)
        .with_typescript(typescript)
}

struct Lowering<'s> {
    path: &'s Path,
    source: &'s str,
    scoping: &'s Scoping,
    parsed: ParsedRoute,
    seen: HashSet<String>,
}

impl<'s> Lowering<'s> {
    fn statement(&mut self, stmt: &ast::Statement<'_>) -> Result<()> {
        match stmt {
            ast::Statement::ImportDeclaration(import) => self.import(import),
            ast::Statement::VariableDeclaration(var) => self.variable(var)?,
            ast::Statement::FunctionDeclaration(func) => self.function(func)?,
            ast::Statement::ClassDeclaration(class) => self.class(class)?,
            ast::Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(ast::Declaration::VariableDeclaration(var)) => self.variable(var)?,
                Some(ast::Declaration::FunctionDeclaration(func)) => self.function(func)?,
                Some(ast::Declaration::ClassDeclaration(class)) => self.class(class)?,
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn claim(&mut self, name: &str) -> Result<()> {
        if !self.seen.insert(name.to_string()) {
            return Err(Error::AmbiguousDeclaration {
                file: self.path.to_path_buf(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn slice(&self, span: Span) -> &'s str {
        &self.source[span.start as usize..span.end as usize]
    }

    fn import(&mut self, import: &ast::ImportDeclaration<'_>) {
        let source = import.source.value.to_string();
        let Some(specifiers) = &import.specifiers else {
            return;
        };
        for specifier in specifiers {
            let (local, kind) = match specifier {
                ast::ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    let imported = match &s.imported {
                        ast::ModuleExportName::IdentifierName(id) => id.name.to_string(),
                        ast::ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
                        _ => s.local.name.to_string(),
                    };
                    (s.local.name.to_string(), ImportKind::Named(imported))
                }
                ast::ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    (s.local.name.to_string(), ImportKind::Default)
                }
                ast::ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    (s.local.name.to_string(), ImportKind::Namespace)
                }
            };
            self.parsed.imports.push(ImportBinding {
                local,
                kind,
                source: source.clone(),
            });
        }
    }

    fn variable(&mut self, var: &ast::VariableDeclaration<'_>) -> Result<()> {
        let kind = match var.kind {
            ast::VariableDeclarationKind::Const => DeclarationKind::Const,
            ast::VariableDeclarationKind::Let => DeclarationKind::Let,
            ast::VariableDeclarationKind::Var => DeclarationKind::Var,
            _ => {
                debug!("Skipping unsupported declaration kind in {}", self.path.display());
                return Ok(());
            }
        };

        for declarator in &var.declarations {
            let ast::BindingPattern::BindingIdentifier(id) = &declarator.id else {
                debug!(
                    "Skipping destructuring declaration in {}",
                    self.path.display()
                );
                continue;
            };
            let name = id.name.to_string();
            self.claim(&name)?;

            if name == API_DEFINITION_NAME {
                match &declarator.init {
                    Some(ast::Expression::ObjectExpression(object)) => {
                        let definition = self.definition(object);
                        self.parsed.definition = Some(definition);
                    }
                    _ => debug!(
                        "`{}` in {} is not an object literal, ignoring",
                        API_DEFINITION_NAME,
                        self.path.display()
                    ),
                }
                continue;
            }

            let base = declarator.span.start;
            let references = declarator
                .init
                .as_ref()
                .map(|init| ReferenceCollector::collect_expression(self.scoping, base, init))
                .unwrap_or_default();
            let text = self.slice(declarator.span).to_string();
            self.parsed.declarations.push(Declaration {
                name,
                kind,
                text,
                binding: Span::new(id.span.start - base, id.span.end - base),
                references,
            });
        }
        Ok(())
    }

    fn function(&mut self, func: &ast::Function<'_>) -> Result<()> {
        let Some(id) = &func.id else {
            return Ok(());
        };
        let name = id.name.to_string();
        self.claim(&name)?;

        let base = func.span.start;
        let text = self.slice(func.span).to_string();
        self.parsed.declarations.push(Declaration {
            name,
            kind: DeclarationKind::Function,
            text,
            binding: Span::new(id.span.start - base, id.span.end - base),
            references: ReferenceCollector::collect_function(self.scoping, base, func),
        });
        Ok(())
    }

    fn class(&mut self, class: &ast::Class<'_>) -> Result<()> {
        let Some(id) = &class.id else {
            return Ok(());
        };
        let name = id.name.to_string();
        self.claim(&name)?;

        let base = class.span.start;
        let text = self.slice(class.span).to_string();
        self.parsed.declarations.push(Declaration {
            name,
            kind: DeclarationKind::Class,
            text,
            binding: Span::new(id.span.start - base, id.span.end - base),
            references: ReferenceCollector::collect_class(self.scoping, base, class),
        });
        Ok(())
    }

    fn definition(&self, object: &ast::ObjectExpression<'_>) -> DefinitionSource {
        let mut definition = DefinitionSource::default();
        for property in &object.properties {
            let ast::ObjectPropertyKind::ObjectProperty(prop) = property else {
                debug!("Ignoring spread in {} of {}", API_DEFINITION_NAME, self.path.display());
                continue;
            };
            if prop.method {
                continue;
            }
            let Some(key) = property_key(&prop.key) else {
                debug!("Ignoring computed key in {} of {}", API_DEFINITION_NAME, self.path.display());
                continue;
            };
            if key == "parameters" {
                definition.parameters = self.parameters(&prop.value);
            }
            definition.properties.push((key, self.fragment(&prop.value)));
        }
        definition
    }

    fn parameters(&self, expr: &ast::Expression<'_>) -> Option<Vec<ParameterSource>> {
        let ast::Expression::ArrayExpression(array) = expr else {
            return None;
        };
        let mut parameters = Vec::new();
        for element in &array.elements {
            let Some(ast::Expression::ObjectExpression(object)) = element.as_expression() else {
                return None;
            };
            let mut parameter = ParameterSource::default();
            // Entries with any other shape are kept verbatim as a whole list
            for property in &object.properties {
                let ast::ObjectPropertyKind::ObjectProperty(prop) = property else {
                    return None;
                };
                let slot = match property_key(&prop.key).as_deref() {
                    Some("name") => &mut parameter.name,
                    Some("type") => &mut parameter.location,
                    Some("description") => &mut parameter.description,
                    Some("schema") => &mut parameter.schema,
                    _ => return None,
                };
                *slot = Some(self.fragment(&prop.value));
            }
            parameters.push(parameter);
        }
        Some(parameters)
    }

    fn fragment(&self, expr: &ast::Expression<'_>) -> Fragment {
        let span = expr.span();
        Fragment {
            text: self.slice(span).to_string(),
            references: ReferenceCollector::collect_expression(self.scoping, span.start, expr),
            literal: literal(expr),
        }
    }
}

fn property_key(key: &ast::PropertyKey<'_>) -> Option<String> {
    match key {
        ast::PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
        ast::PropertyKey::StringLiteral(lit) => Some(lit.value.to_string()),
        _ => None,
    }
}

fn literal(expr: &ast::Expression<'_>) -> Literal {
    match expr {
        ast::Expression::StringLiteral(lit) => Literal::String(lit.value.to_string()),
        ast::Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() => tpl
            .quasis
            .first()
            .and_then(|q| q.value.cooked.as_ref())
            .map(|cooked| Literal::String(cooked.to_string()))
            .unwrap_or(Literal::None),
        ast::Expression::ArrayExpression(array) => {
            let mut values = Vec::new();
            for element in &array.elements {
                match element.as_expression() {
                    Some(ast::Expression::NumericLiteral(num)) if num.value.fract() == 0.0 => {
                        values.push(num.value as i64)
                    }
                    _ => return Literal::None,
                }
            }
            Literal::Integers(values)
        }
        _ => Literal::None,
    }
}
