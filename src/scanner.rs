use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Leading character of a directory segment that turns it into a URL parameter.
pub const PARAMETER_MARKER: char = '_';

/// Base name of files that hold router middleware instead of an endpoint.
pub const MIDDLEWARE_NAME: &str = "middleware";

/// HTTP methods a route file name can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Head,
    Options,
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }

    /// Matches an already lower-cased file stem.
    pub fn from_stem(stem: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == stem)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a route file contributes, as decided by its base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// `get.js`, `post.ts` and so on: an endpoint with an optional `apiDefinition`
    Endpoint(HttpMethod),
    /// `middleware.js`: mounted by the runtime router, never extracted
    Middleware,
}

/// A file under the route root, classified by location and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFile {
    /// Absolute path used for reading the file
    pub absolute_path: PathBuf,
    /// Path relative to the route root, used for ordering and reporting
    pub relative_path: PathBuf,
    /// URL path inferred from the directory portion, e.g. `/users/:id`
    pub path: String,
    /// Inferred HTTP method or the middleware sentinel
    pub kind: RouteKind,
}

impl RouteFile {
    /// Classifies a file by its path relative to the route root.
    ///
    /// Returns `None` when the base name is neither an HTTP method nor
    /// `middleware`; such files are excluded from extraction.
    pub fn classify(absolute_path: PathBuf, relative_path: PathBuf) -> Option<Self> {
        let kind = infer_kind(&relative_path)?;
        let path = infer_path(&relative_path);
        Some(Self {
            absolute_path,
            relative_path,
            path,
            kind,
        })
    }

    pub fn method(&self) -> Option<HttpMethod> {
        match self.kind {
            RouteKind::Endpoint(method) => Some(method),
            RouteKind::Middleware => None,
        }
    }

    /// The normalized "path + method" string, e.g. `/users/:id get`.
    pub fn route_key(&self) -> String {
        match self.kind {
            RouteKind::Endpoint(method) => format!("{} {}", self.path, method),
            RouteKind::Middleware => format!("{} {}", self.path, MIDDLEWARE_NAME),
        }
    }
}

/// Infers the route kind from the lower-cased file stem.
pub fn infer_kind(relative_path: &Path) -> Option<RouteKind> {
    let stem = relative_path.file_stem()?.to_str()?.to_lowercase();
    if stem == MIDDLEWARE_NAME {
        return Some(RouteKind::Middleware);
    }
    HttpMethod::from_stem(&stem).map(RouteKind::Endpoint)
}

/// Infers the URL path from the directory portion of a relative file path.
///
/// Every directory segment starting with [`PARAMETER_MARKER`] becomes a named
/// URL parameter. An empty directory portion yields `/`.
pub fn infer_path(relative_path: &Path) -> String {
    let segments: Vec<String> = relative_path
        .parent()
        .map(|dir| {
            dir.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .map(|segment| match segment.strip_prefix(PARAMETER_MARKER) {
                    Some(name) => format!(":{}", name),
                    None => segment,
                })
                .collect()
        })
        .unwrap_or_default();

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// File scanner for traversing a route tree.
///
/// The `FileScanner` recursively walks the route root and classifies every file
/// with a configured extension. Hidden directories (those starting with `.`) and
/// `node_modules` are skipped.
///
/// # Example
///
/// ```no_run
/// use api_from_routes::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./routes"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} endpoint files", result.endpoints().count());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    extensions: Vec<String>,
}

/// Result of a route tree scan.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Classified route files in relative-path order
    pub routes: Vec<RouteFile>,
    /// Source files whose base name is not a route name
    pub skipped: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl ScanResult {
    /// Route files that carry an HTTP method.
    pub fn endpoints(&self) -> impl Iterator<Item = &RouteFile> {
        self.routes
            .iter()
            .filter(|r| matches!(r.kind, RouteKind::Endpoint(_)))
    }
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            extensions: vec!["js".to_string(), "mjs".to_string(), "ts".to_string()],
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Scans the route tree.
    ///
    /// Directory entries are visited in file-name order, and the classified
    /// routes are additionally sorted by relative path, so the result is a pure
    /// function of the tree's contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be resolved.
    pub fn scan(&self) -> Result<ScanResult> {
        let root = std::path::absolute(&self.root_path).with_context(|| {
            format!("Failed to resolve route root: {}", self.root_path.display())
        })?;
        let mut result = ScanResult::default();

        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "node_modules"
            })
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    result.warnings.push(warning);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !self.has_route_extension(path) {
                continue;
            }

            let relative = match path.strip_prefix(&root) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => continue,
            };

            match RouteFile::classify(path.to_path_buf(), relative.clone()) {
                Some(route) => {
                    debug!("Classified {} as {}", relative.display(), route.route_key());
                    result.routes.push(route);
                }
                None => {
                    debug!("Skipping {}: base name is not a route method", relative.display());
                    result.skipped.push(relative);
                }
            }
        }

        result
            .routes
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(result)
    }

    fn has_route_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "export default () => {}").unwrap();
    }

    #[test]
    fn test_infer_path_with_parameter_segment() {
        assert_eq!(infer_path(Path::new("users/_id/get.js")), "/users/:id");
        assert_eq!(infer_path(Path::new("organizations/post.js")), "/organizations");
    }

    #[test]
    fn test_infer_path_root_file() {
        assert_eq!(infer_path(Path::new("get.js")), "/");
    }

    #[test]
    fn test_infer_path_only_leading_marker_is_replaced() {
        assert_eq!(
            infer_path(Path::new("user_groups/_group_id/put.js")),
            "/user_groups/:group_id"
        );
    }

    #[test]
    fn test_infer_kind() {
        assert_eq!(
            infer_kind(Path::new("users/GET.js")),
            Some(RouteKind::Endpoint(HttpMethod::Get))
        );
        assert_eq!(
            infer_kind(Path::new("users/delete.ts")),
            Some(RouteKind::Endpoint(HttpMethod::Delete))
        );
        assert_eq!(infer_kind(Path::new("users/middleware.js")), Some(RouteKind::Middleware));
        assert_eq!(infer_kind(Path::new("users/helpers.js")), None);
        assert_eq!(infer_kind(Path::new("users/connect.js")), None);
    }

    #[test]
    fn test_same_directory_same_path() {
        let get = RouteFile::classify(PathBuf::from("/r/a/get.js"), PathBuf::from("a/get.js")).unwrap();
        let post = RouteFile::classify(PathBuf::from("/r/a/post.js"), PathBuf::from("a/post.js")).unwrap();
        assert_eq!(get.path, post.path);
        assert_eq!(get.route_key(), "/a get");
        assert_eq!(post.route_key(), "/a post");
    }

    #[test]
    fn test_scan_classifies_route_tree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "get.js");
        write(root, "users/get.js");
        write(root, "users/post.js");
        write(root, "users/_id/get.js");
        write(root, "users/middleware.js");
        write(root, "users/schema.js");
        write(root, "README.md");

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        let keys: Vec<String> = result.routes.iter().map(|r| r.route_key()).collect();
        assert_eq!(
            keys,
            vec![
                "/ get",
                "/users/:id get",
                "/users get",
                "/users middleware",
                "/users post",
            ]
        );
        assert_eq!(result.endpoints().count(), 4);
        assert_eq!(result.skipped, vec![PathBuf::from("users/schema.js")]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_skips_hidden_and_node_modules() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, ".cache/get.js");
        write(root, "node_modules/pkg/get.js");
        write(root, "get.js");

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.routes[0].relative_path, PathBuf::from("get.js"));
    }

    #[test]
    fn test_scan_respects_extensions() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "a/get.js");
        write(root, "b/get.ts");

        let result = FileScanner::new(root.to_path_buf())
            .with_extensions(vec!["js".to_string()])
            .scan()
            .unwrap();

        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.routes[0].path, "/a");
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new(temp_dir.path().to_path_buf()).scan().unwrap();
        assert!(result.routes.is_empty());
        assert!(result.warnings.is_empty());
    }
}
