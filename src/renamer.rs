//! Hygiene renaming of helper declarations.
//!
//! Every helper of a route file is renamed to `prefix + name`, where the prefix
//! is derived from the route's path and method. Prefixes are unique across a
//! run, so helpers from different files can share one module scope.

use crate::parser::Declaration;
use crate::scanner::{HttpMethod, RouteFile};
use log::warn;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Builds the hygiene prefix for a route, e.g. `__users__id__get__` for
/// `GET /users/:id`.
///
/// Path separators, parameter markers and hyphens (and anything else that
/// cannot appear in an identifier) become `_`.
pub fn route_prefix(path: &str, method: HttpMethod) -> String {
    let sanitized: String = path
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("_{}__{}__", sanitized, method)
}

/// Prefixes assigned to every endpoint file of a run.
///
/// Built once from the whole file list so that two routes whose prefixes
/// normalize to the same text (`/a-b` and `/a_b`) still get distinct ones: the
/// first file in path order keeps the plain prefix, later ones get a numeric
/// suffix.
#[derive(Debug, Default)]
pub struct PrefixTable {
    prefixes: HashMap<PathBuf, String>,
}

impl PrefixTable {
    pub fn build<'a>(routes: impl IntoIterator<Item = &'a RouteFile>) -> Self {
        let mut ordered: Vec<&RouteFile> = routes
            .into_iter()
            .filter(|r| r.method().is_some())
            .collect();
        ordered.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        let mut taken: HashSet<String> = HashSet::new();
        let mut prefixes = HashMap::new();
        for route in ordered {
            let Some(method) = route.method() else {
                continue;
            };
            let base = route_prefix(&route.path, method);
            let mut prefix = base.clone();
            let mut n = 2;
            while taken.contains(&prefix) {
                prefix = format!("{}{}_", base, n);
                n += 1;
            }
            if prefix != base {
                warn!(
                    "{} shares the helper prefix {} with another route, using {}",
                    route.relative_path.display(),
                    base,
                    prefix
                );
            }
            taken.insert(prefix.clone());
            prefixes.insert(route.relative_path.clone(), prefix);
        }
        Self { prefixes }
    }

    pub fn get(&self, route: &RouteFile) -> Option<&str> {
        self.prefixes.get(&route.relative_path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// Frozen mapping from original helper names to renamed ones for one file.
#[derive(Debug, Clone)]
pub struct RenameTable {
    prefix: String,
    index: HashMap<String, usize>,
    renamed: Vec<String>,
}

impl RenameTable {
    /// Renames every declaration of the arena. Slot `i` of the table matches
    /// slot `i` of `declarations`.
    pub fn build(prefix: &str, declarations: &[Declaration]) -> Self {
        let mut index = HashMap::with_capacity(declarations.len());
        let mut renamed = Vec::with_capacity(declarations.len());
        for (i, declaration) in declarations.iter().enumerate() {
            index.insert(declaration.name.clone(), i);
            renamed.push(format!("{}{}", prefix, declaration.name));
        }
        Self {
            prefix: prefix.to_string(),
            index,
            renamed,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Arena slot of a helper, looked up by its original name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Renamed form of an original helper name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.index_of(name).map(|i| self.renamed[i].as_str())
    }

    pub fn renamed(&self, slot: usize) -> &str {
        &self.renamed[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SourceParser;
    use std::path::Path;

    fn route(relative: &str) -> RouteFile {
        RouteFile::classify(PathBuf::from("/routes").join(relative), PathBuf::from(relative))
            .unwrap()
    }

    #[test]
    fn test_route_prefix() {
        assert_eq!(route_prefix("/users/:id", HttpMethod::Get), "__users__id__get__");
        assert_eq!(route_prefix("/", HttpMethod::Post), "____post__");
        assert_eq!(
            route_prefix("/user-groups/:group_id", HttpMethod::Delete),
            "__user_groups__group_id__delete__"
        );
    }

    #[test]
    fn test_prefixes_differ_by_method_and_path() {
        let routes = vec![route("users/get.js"), route("users/post.js"), route("users/_id/get.js")];
        let table = PrefixTable::build(&routes);
        let prefixes: HashSet<&str> = routes.iter().filter_map(|r| table.get(r)).collect();
        assert_eq!(prefixes.len(), 3);
    }

    #[test]
    fn test_colliding_prefixes_get_a_suffix() {
        let routes = vec![route("a_b/get.js"), route("a-b/get.js")];
        let table = PrefixTable::build(&routes);
        // "a-b" sorts before "a_b"
        assert_eq!(table.get(&routes[1]), Some("__a_b__get__"));
        assert_eq!(table.get(&routes[0]), Some("__a_b__get__2_"));
    }

    #[test]
    fn test_middleware_has_no_prefix() {
        let routes = vec![route("users/middleware.js")];
        let table = PrefixTable::build(&routes);
        assert!(table.is_empty());
    }

    #[test]
    fn test_rename_table() {
        let parsed = SourceParser::parse_source(
            Path::new("users/get.js"),
            "const schema = 1\nfunction build() { return schema }",
        )
        .unwrap();
        let table = RenameTable::build("_users__get__", &parsed.declarations);

        assert_eq!(table.get("schema"), Some("_users__get__schema"));
        assert_eq!(table.index_of("build"), Some(1));
        assert_eq!(table.renamed(1), "_users__get__build");
        assert_eq!(table.get("_users__get__schema"), None);
    }
}
