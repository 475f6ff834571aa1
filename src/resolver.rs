//! Reachability closure over helper declarations.
//!
//! Starting from the API definition's property values, every helper that is
//! referenced directly or through another retained helper is kept and rewritten
//! into the renamed namespace. Everything else is dropped.

use crate::parser::{
    Declaration, DefinitionSource, Fragment, ImportBinding, Literal, ParameterSource, ParsedRoute,
};
use crate::references::Reference;
use crate::renamer::RenameTable;
use log::debug;
use std::collections::{HashSet, VecDeque};

/// Definition property holding the declared error status codes.
pub const ERROR_STATUSES_FIELD: &str = "errorStatuses";

/// Definition properties whose source values are replaced by the assembler
/// and therefore never contribute references.
pub const OVERRIDDEN_FIELDS: [&str; 3] = ["method", "path", "errors"];

/// Fragment text after renaming.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub text: String,
    pub literal: Literal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedParameter {
    pub name: Option<Resolved>,
    pub location: Option<Resolved>,
    pub description: Option<Resolved>,
    pub schema: Option<Resolved>,
}

/// A helper that survived the closure, rendered as a standalone statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedDeclaration {
    /// Name in the route file
    pub original: String,
    /// Name in the merged output
    pub name: String,
    /// Rewritten statement text, `export` stripped
    pub text: String,
}

/// Result of resolving one route file.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Definition properties in source order, references rewritten
    pub properties: Vec<(String, Resolved)>,
    pub parameters: Option<Vec<ResolvedParameter>>,
    /// Retained helpers in declaration order
    pub helpers: Vec<RetainedDeclaration>,
    /// Import bindings referenced by the definition or a retained helper
    pub imports: Vec<ImportBinding>,
}

impl Resolution {
    pub fn get(&self, key: &str) -> Option<&Resolved> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, resolved)| resolved)
    }
}

/// A pending text replacement, applied back to front.
struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

/// Rewrites every reference to a helper in `text` to its renamed form.
///
/// References that are not helpers (globals, imports, already renamed names)
/// are left alone, which makes the rewrite idempotent. Shorthand properties
/// keep their key: `{ user }` becomes `{ user: __users__get__user }`.
pub fn rewrite(text: &str, references: &[Reference], table: &RenameTable) -> String {
    apply(text, reference_edits(references, table))
}

fn reference_edits(references: &[Reference], table: &RenameTable) -> Vec<Edit> {
    references
        .iter()
        .filter_map(|r| {
            let renamed = table.get(&r.name)?;
            let replacement = if r.shorthand {
                format!("{}: {}", r.name, renamed)
            } else {
                renamed.to_string()
            };
            Some(Edit {
                start: r.span.start as usize,
                end: r.span.end as usize,
                replacement,
            })
        })
        .collect()
}

fn apply(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start));
    let mut result = text.to_string();
    for edit in edits {
        result.replace_range(edit.start..edit.end, &edit.replacement);
    }
    result
}

/// Computes the reachability closure of a definition and rewrites everything
/// that survives it.
pub struct Resolver<'a> {
    parsed: &'a ParsedRoute,
    table: &'a RenameTable,
    used: Vec<bool>,
    queue: VecDeque<usize>,
    imports: HashSet<&'a str>,
}

impl<'a> Resolver<'a> {
    pub fn new(parsed: &'a ParsedRoute, table: &'a RenameTable) -> Self {
        Self {
            parsed,
            table,
            used: vec![false; parsed.declarations.len()],
            queue: VecDeque::new(),
            imports: HashSet::new(),
        }
    }

    /// Resolves `definition` against the file's declaration arena.
    pub fn resolve(mut self, definition: &'a DefinitionSource) -> Resolution {
        for (key, fragment) in &definition.properties {
            if key == ERROR_STATUSES_FIELD || OVERRIDDEN_FIELDS.contains(&key.as_str()) {
                continue;
            }
            self.visit(&fragment.references);
        }

        let parsed = self.parsed;
        while let Some(slot) = self.queue.pop_front() {
            self.visit(&parsed.declarations[slot].references);
        }

        let helpers: Vec<RetainedDeclaration> = self
            .parsed
            .declarations
            .iter()
            .enumerate()
            .filter(|(slot, _)| self.used[*slot])
            .map(|(slot, declaration)| self.retain(slot, declaration))
            .collect();

        debug!(
            "Retained {} of {} helpers with prefix {}",
            helpers.len(),
            self.parsed.declarations.len(),
            self.table.prefix()
        );

        let imports = self
            .parsed
            .imports
            .iter()
            .filter(|import| self.imports.contains(import.local.as_str()))
            .cloned()
            .collect();

        Resolution {
            properties: definition
                .properties
                .iter()
                .map(|(key, fragment)| (key.clone(), self.resolved(fragment)))
                .collect(),
            parameters: definition
                .parameters
                .as_ref()
                .map(|parameters| parameters.iter().map(|p| self.parameter(p)).collect()),
            helpers,
            imports,
        }
    }

    fn visit(&mut self, references: &'a [Reference]) {
        for reference in references {
            match self.table.index_of(&reference.name) {
                Some(slot) => {
                    if !self.used[slot] {
                        self.used[slot] = true;
                        self.queue.push_back(slot);
                    }
                }
                None => {
                    self.imports.insert(reference.name.as_str());
                }
            }
        }
    }

    fn retain(&self, slot: usize, declaration: &Declaration) -> RetainedDeclaration {
        let name = self.table.renamed(slot).to_string();
        let mut edits = reference_edits(&declaration.references, self.table);
        edits.push(Edit {
            start: declaration.binding.start as usize,
            end: declaration.binding.end as usize,
            replacement: name.clone(),
        });

        let body = apply(&declaration.text, edits);
        let text = match declaration.kind.keyword() {
            Some(keyword) => format!("{} {};", keyword, body),
            None => body,
        };
        RetainedDeclaration {
            original: declaration.name.clone(),
            name,
            text,
        }
    }

    fn resolved(&self, fragment: &Fragment) -> Resolved {
        Resolved {
            text: rewrite(&fragment.text, &fragment.references, self.table),
            literal: fragment.literal.clone(),
        }
    }

    fn parameter(&self, parameter: &ParameterSource) -> ResolvedParameter {
        let resolve = |fragment: &Option<Fragment>| fragment.as_ref().map(|f| self.resolved(f));
        ResolvedParameter {
            name: resolve(&parameter.name),
            location: resolve(&parameter.location),
            description: resolve(&parameter.description),
            schema: resolve(&parameter.schema),
        }
    }
}

/// Convenience wrapper around [`Resolver`]. Returns `None` when the file has
/// no API definition.
pub fn resolve(parsed: &ParsedRoute, table: &RenameTable) -> Option<Resolution> {
    let definition = parsed.definition.as_ref()?;
    Some(Resolver::new(parsed, table).resolve(definition))
}
