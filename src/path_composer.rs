//! Folder-based path prefixes.
//!
//! Two conventions map a file's location under a root directory to a path prefix:
//!
//! - **grouped routes** (`--autoroute`): only `route.ts` files participate, their directory
//!   path is the prefix as is, and `_middleware.ts` files in ancestor directories are
//!   reported as middleware scopes;
//! - **folder router** (`--autorouter`): every file participates, `[id]` style segments
//!   become `:id` parameters and the file name is appended unless it is `index` or an
//!   HTTP method name.

use crate::extractor::{HttpMethod, RouteRecord};
use log::debug;
use std::path::{Component, Path, PathBuf};

/// Extensions of route and middleware files under the grouped-routes convention.
pub const ROUTE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mts", "mjs"];

const ROUTE_FILE_STEM: &str = "route";
const MIDDLEWARE_FILE_STEM: &str = "_middleware";
const INDEX_FILE_STEM: &str = "index";

/// The folder convention in effect for a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PathConvention {
    /// Registered paths are used unchanged
    #[default]
    None,
    /// `route.ts` files, prefix is the directory path
    GroupedRoutes { root: PathBuf },
    /// Every file, bracketed segments are parameters
    FolderRouter { root: PathBuf },
}

/// Rewrites route paths according to a [`PathConvention`].
pub struct PathComposer {
    convention: PathConvention,
}

impl PathComposer {
    pub fn new(convention: PathConvention) -> Self {
        Self { convention }
    }

    /// Rewrites every record in place.
    pub fn compose_all(&self, routes: Vec<RouteRecord>) -> Vec<RouteRecord> {
        routes.into_iter().map(|route| self.compose(route)).collect()
    }

    /// Prefixes one record's path and attaches its middleware scopes.
    pub fn compose(&self, route: RouteRecord) -> RouteRecord {
        match &self.convention {
            PathConvention::None => route,
            PathConvention::GroupedRoutes { root } => {
                if !is_route_file(&route.file) {
                    return route;
                }
                let Some(dirs) = relative_dirs(root, &route.file) else {
                    debug!("{} is outside {}", route.file.display(), root.display());
                    return route;
                };
                let prefix = to_path(&dirs);
                let scopes = middleware_scopes(root, &dirs);
                let path = join_paths(&prefix, &route.path);
                debug!("Grouped route {} -> {}", route.path, path);
                let mut route = route.with_path(path);
                route.middleware_scopes = scopes;
                route
            }
            PathConvention::FolderRouter { root } => {
                let Some(mut segments) = relative_dirs(root, &route.file) else {
                    debug!("{} is outside {}", route.file.display(), root.display());
                    return route;
                };
                segments = segments.iter().map(|s| transform_segment(s)).collect();
                if let Some(stem) = file_stem(&route.file) {
                    if stem != INDEX_FILE_STEM && HttpMethod::from_name(&stem).is_none() {
                        segments.push(stem);
                    }
                }
                let path = join_paths(&to_path(&segments), &route.path);
                debug!("Folder route {} -> {}", route.path, path);
                route.with_path(path)
            }
        }
    }
}

/// Joins a prefix and a registered path with exactly one slash between them.
///
/// An empty (or `/`) registered path collapses to the prefix; two empty parts give `/`.
pub fn join_paths(prefix: &str, local: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let local = local.trim_matches('/');
    match (prefix.is_empty(), local.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", local),
        (false, true) => format!("/{}", prefix),
        (false, false) => format!("/{}/{}", prefix, local),
    }
}

/// `[id]` and `[...slug]` become `:id` and `:slug`; `[[...slug]]` is unwrapped first.
pub fn transform_segment(segment: &str) -> String {
    let mut inner = segment;
    if let Some(unwrapped) = inner.strip_prefix("[[").and_then(|s| s.strip_suffix("]]")) {
        inner = unwrapped;
    } else if let Some(unwrapped) = inner.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        inner = unwrapped;
    } else {
        return segment.to_string();
    }
    let name = inner.strip_prefix("...").unwrap_or(inner);
    format!(":{}", name)
}

fn is_route_file(file: &Path) -> bool {
    file_stem(file).as_deref() == Some(ROUTE_FILE_STEM) && has_route_extension(file)
}

fn has_route_extension(file: &Path) -> bool {
    file.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ROUTE_EXTENSIONS.contains(&e))
}

fn file_stem(file: &Path) -> Option<String> {
    file.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

fn to_path(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}

/// Directory names between `root` and `file`, or `None` when `file` is not under `root`.
fn relative_dirs(root: &Path, file: &Path) -> Option<Vec<String>> {
    let relative = match file.strip_prefix(root) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => {
            let root = root.canonicalize().ok()?;
            let file = file.canonicalize().ok()?;
            file.strip_prefix(&root).ok()?.to_path_buf()
        }
    };
    let dir = relative.parent().unwrap_or(Path::new(""));
    let mut segments = Vec::new();
    for component in dir.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(segments)
}

/// Prefixes of `root` and each directory down to `dirs` that contain a middleware file.
fn middleware_scopes(root: &Path, dirs: &[String]) -> Vec<String> {
    let mut scopes = Vec::new();
    let mut dir = root.to_path_buf();
    for depth in 0..=dirs.len() {
        if depth > 0 {
            dir.push(&dirs[depth - 1]);
        }
        let has_middleware = ROUTE_EXTENSIONS
            .iter()
            .any(|ext| dir.join(format!("{}.{}", MIDDLEWARE_FILE_STEM, ext)).is_file());
        if has_middleware {
            scopes.push(to_path(&dirs[..depth]));
        }
    }
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn record(path: &str, file: PathBuf) -> RouteRecord {
        RouteRecord::new(HttpMethod::Get, path, file)
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/users", "/:id"), "/users/:id");
        assert_eq!(join_paths("/users/", "/"), "/users");
        assert_eq!(join_paths("/users", ""), "/users");
        assert_eq!(join_paths("/", "/"), "/");
        assert_eq!(join_paths("", "health"), "/health");
    }

    #[test]
    fn test_transform_segment() {
        assert_eq!(transform_segment("[id]"), ":id");
        assert_eq!(transform_segment("[...slug]"), ":slug");
        assert_eq!(transform_segment("[[...path]]"), ":path");
        assert_eq!(transform_segment("blog"), "blog");
    }

    #[test]
    fn test_folder_router() {
        let root = PathBuf::from("/srv/api");
        let composer = PathComposer::new(PathConvention::FolderRouter { root: root.clone() });

        let route = composer.compose(record("/", root.join("blog/[id]/get.ts")));
        assert_eq!(route.path, "/blog/:id");
        assert_eq!(route.path_params, vec!["id"]);

        let route = composer.compose(record("/", root.join("index.ts")));
        assert_eq!(route.path, "/");

        let route = composer.compose(record("/", root.join("docs/[...slug]/search.ts")));
        assert_eq!(route.path, "/docs/:slug/search");

        let route = composer.compose(record("/raw", PathBuf::from("/elsewhere/app.ts")));
        assert_eq!(route.path, "/raw");
    }

    #[test]
    fn test_grouped_routes_with_middleware() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        fs::create_dir_all(root.join("admin/users")).unwrap();
        fs::write(root.join("_middleware.ts"), "").unwrap();
        fs::write(root.join("admin/_middleware.ts"), "").unwrap();
        fs::write(root.join("admin/users/route.ts"), "").unwrap();

        let composer = PathComposer::new(PathConvention::GroupedRoutes { root: root.clone() });
        let route = composer.compose(record("/:id", root.join("admin/users/route.ts")));
        assert_eq!(route.path, "/admin/users/:id");
        assert_eq!(route.middleware_scopes, vec!["/", "/admin"]);

        let other = composer.compose(record("/x", root.join("admin/helpers.ts")));
        assert_eq!(other.path, "/x");
        assert!(other.middleware_scopes.is_empty());
    }

    #[test]
    fn test_no_convention() {
        let composer = PathComposer::new(PathConvention::None);
        let route = composer.compose(record("/a/:b", PathBuf::from("x/route.ts")));
        assert_eq!(route.path, "/a/:b");
    }
}
