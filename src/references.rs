//! Identifier reference collection over `oxc` syntax trees.
//!
//! References are taken from `IdentifierReference` nodes only, so property keys
//! and member names (`user.name`, `{ name: ... }`) are never mistaken for
//! helper uses. Binding resolution comes from `oxc_semantic`: an identifier is
//! recorded when it resolves to a module-level symbol or to nothing at all.
//! Anything bound by a parameter, a block, a catch clause or a named function
//! or class expression shadows same-named helpers exactly where JavaScript
//! scoping says it does.

use oxc_ast::ast::{Class, Expression, Function, IdentifierReference, ObjectProperty};
use oxc_ast_visit::{walk, Visit};
use oxc_semantic::Scoping;
use oxc_span::Span;
use oxc_syntax::scope::{ScopeFlags, ScopeId};

/// An identifier reference found inside a source fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Referenced name as written in the source
    pub name: String,
    /// Span of the identifier, relative to the start of its fragment
    pub span: Span,
    /// Whether the identifier is a shorthand property (`{ user }`)
    pub shorthand: bool,
}

/// Collects module-level identifier references below a node.
pub struct ReferenceCollector<'s> {
    base: u32,
    scoping: &'s Scoping,
    root: ScopeId,
    references: Vec<Reference>,
}

impl<'s> ReferenceCollector<'s> {
    /// Creates a collector whose recorded spans are relative to `base`.
    pub fn new(scoping: &'s Scoping, base: u32) -> Self {
        Self {
            base,
            scoping,
            root: scoping.root_scope_id(),
            references: Vec::new(),
        }
    }

    /// References of an expression fragment starting at `base`.
    pub fn collect_expression(scoping: &'s Scoping, base: u32, expr: &Expression<'_>) -> Vec<Reference> {
        let mut collector = Self::new(scoping, base);
        collector.visit_expression(expr);
        collector.references
    }

    /// References of a top-level function declaration. Recursive calls resolve
    /// to the module-level binding and are recorded.
    pub fn collect_function(scoping: &'s Scoping, base: u32, func: &Function<'_>) -> Vec<Reference> {
        let mut collector = Self::new(scoping, base);
        collector.visit_function(func, ScopeFlags::Function);
        collector.references
    }

    /// References of a top-level class declaration.
    pub fn collect_class(scoping: &'s Scoping, base: u32, class: &Class<'_>) -> Vec<Reference> {
        let mut collector = Self::new(scoping, base);
        collector.visit_class(class);
        collector.references
    }

    fn is_module_level(&self, ident: &IdentifierReference<'_>) -> bool {
        let Some(reference_id) = ident.reference_id.get() else {
            return true;
        };
        match self.scoping.get_reference(reference_id).symbol_id() {
            Some(symbol_id) => self.scoping.symbol_scope_id(symbol_id) == self.root,
            None => true,
        }
    }

    fn record(&mut self, ident: &IdentifierReference<'_>, shorthand: bool) {
        if !self.is_module_level(ident) {
            return;
        }
        self.references.push(Reference {
            name: ident.name.to_string(),
            span: Span::new(ident.span.start - self.base, ident.span.end - self.base),
            shorthand,
        });
    }
}

impl<'a, 's> Visit<'a> for ReferenceCollector<'s> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.record(ident, false);
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand {
            if let Expression::Identifier(ident) = &prop.value {
                self.record(ident, true);
                return;
            }
        }
        walk::walk_object_property(self, prop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_ast::ast::{Declaration, Statement};
    use oxc_parser::Parser;
    use oxc_semantic::SemanticBuilder;
    use oxc_span::{GetSpan, SourceType};

    fn names(refs: &[Reference]) -> Vec<&str> {
        refs.iter().map(|r| r.name.as_str()).collect()
    }

    /// References of the initializer of the last top-level `const` in `code`.
    fn init_refs(code: &str) -> Vec<Reference> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, SourceType::default().with_module(true)).parse();
        assert!(ret.errors.is_empty());
        let semantic = SemanticBuilder::new().build(&ret.program).semantic;
        let init = ret
            .program
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::VariableDeclaration(var) => var.declarations[0].init.as_ref(),
                _ => None,
            })
            .last()
            .unwrap();
        ReferenceCollector::collect_expression(semantic.scoping(), init.span().start, init)
    }

    #[test]
    fn test_member_and_key_names_are_not_references() {
        let refs = init_refs("const value = z.object({ id: z.number(), user: user.pick({ id: true }) })");
        assert_eq!(names(&refs), vec!["z", "z", "user"]);
    }

    #[test]
    fn test_shorthand_property_is_flagged() {
        let refs = init_refs("const value = z.object({ organization })");
        assert_eq!(names(&refs), vec!["z", "organization"]);
        assert!(!refs[0].shorthand);
        assert!(refs[1].shorthand);
        assert_eq!(refs[1].span, Span::new(11, 23));
    }

    #[test]
    fn test_element_access_and_call_callee() {
        let refs = init_refs("const value = schemas[key](build())");
        assert_eq!(names(&refs), vec!["schemas", "key", "build"]);
    }

    #[test]
    fn test_arrow_parameters_shadow() {
        let refs = init_refs("const value = (user) => user.id + other");
        assert_eq!(names(&refs), vec!["other"]);
    }

    #[test]
    fn test_function_body_locals_shadow() {
        let refs = init_refs("const value = function () { const user = 1; return user + outer }");
        assert_eq!(names(&refs), vec!["outer"]);
    }

    #[test]
    fn test_nested_function_locals_do_not_leak() {
        let refs = init_refs("const value = () => { const f = () => { const user = 1 }; return user }");
        assert_eq!(names(&refs), vec!["user"]);
    }

    #[test]
    fn test_block_locals_shadow_only_inside_the_block() {
        let refs = init_refs(
            "const user = z.object({})\nconst value = (v) => { if (v) { const user = 1; log(user) } return user }",
        );
        assert_eq!(names(&refs), vec!["log", "user"]);
        assert_eq!(refs[1].span.start as usize, "(v) => { if (v) { const user = 1; log(user) } return ".len());
    }

    #[test]
    fn test_catch_and_loop_bindings_do_not_leak() {
        let refs = init_refs(
            "const value = () => { try { run() } catch (err) { report(err) } for (let i = 0; i < 2; i++) {} return [err, i] }",
        );
        assert_eq!(names(&refs), vec!["run", "report", "err", "i"]);
    }

    #[test]
    fn test_named_function_expression_name_stays_inside() {
        let refs = init_refs("const value = [function build() { return build }, build]");
        assert_eq!(names(&refs), vec!["build"]);
        assert_eq!(refs[0].span.start, 36);
    }

    #[test]
    fn test_top_level_function_keeps_own_name_visible() {
        let code = "function walk(node) { return node.next ? walk(node.next) : base }";
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, SourceType::default().with_module(true)).parse();
        let semantic = SemanticBuilder::new().build(&ret.program).semantic;
        let Statement::FunctionDeclaration(func) = &ret.program.body[0] else {
            panic!("expected a function declaration");
        };
        let refs = ReferenceCollector::collect_function(semantic.scoping(), func.span.start, func);
        assert_eq!(names(&refs), vec!["walk", "base"]);
    }

    #[test]
    fn test_top_level_class_references() {
        let code = "export class Repo extends Base { load() { return fetch(Repo.url) } }";
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, SourceType::default().with_module(true)).parse();
        let semantic = SemanticBuilder::new().build(&ret.program).semantic;
        let Statement::ExportNamedDeclaration(export) = &ret.program.body[0] else {
            panic!("expected an export");
        };
        let Some(Declaration::ClassDeclaration(class)) = &export.declaration else {
            panic!("expected a class declaration");
        };
        let refs = ReferenceCollector::collect_class(semantic.scoping(), class.span.start, class);
        assert_eq!(names(&refs), vec!["Base", "fetch", "Repo"]);
    }
}
