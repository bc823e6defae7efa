//! Route extraction from parsed TypeScript sources.
//!
//! The [`routes::HonoExtractor`] walks every file once and produces one [`RouteRecord`] per
//! route-registration call (`app.get('/users/:id', handler)`). For each registration it hands
//! the handler body to the response extractor ([`responses`]) and the request extractor
//! ([`request`]); validator middleware is interpreted by [`zod`].
//!
//! # Example
//!
//! ```no_run
//! use hono_openapi_from_source::extractor::{RouteExtractor, routes::HonoExtractor};
//! use hono_openapi_from_source::parser::AstParser;
//! use hono_openapi_from_source::type_resolver::TypeResolver;
//! use std::path::Path;
//!
//! let parsed = AstParser::parse_file(Path::new("src/index.ts")).unwrap();
//! let files = vec![parsed];
//! let resolver = TypeResolver::new(&files);
//! let routes = HonoExtractor::new(&resolver).extract_routes(&files);
//! println!("Found {} routes", routes.len());
//! ```

pub mod request;
pub mod responses;
pub mod routes;
pub mod zod;

use crate::parser::ParsedFile;
use crate::schema_generator::Schema;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PATH_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z_$][\w$]*)").unwrap());

/// Trait for extracting route records from parsed source files.
pub trait RouteExtractor {
    /// Extracts all route records from `parsed_files`, in file order and, within a file,
    /// in document order.
    fn extract_routes(&self, parsed_files: &[ParsedFile]) -> Vec<RouteRecord>;
}

/// One statically discovered endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    /// The HTTP method for this route
    pub method: HttpMethod,
    /// The path pattern in `:name` syntax (e.g. "/users/:id")
    pub path: String,
    /// Names of the `:name` segments of `path`, in path order
    pub path_params: Vec<String>,
    /// Text of the handler's declared return type, if any
    pub response_type_text: Option<String>,
    /// Schema of the handler's declared return type, if it could be synthesized
    pub response_schema: Option<Schema>,
    /// Schema of the JSON request body
    pub request_body_schema: Option<Schema>,
    /// Object schema whose properties are the query parameters
    pub query_schema: Option<Schema>,
    /// Responses emitted by the handler body, in discovery order
    pub responses: Vec<ResponseRecord>,
    /// Path prefixes of the middleware files that apply to this route, shallow to deep
    pub middleware_scopes: Vec<String>,
    /// Source file of the registration
    pub file: PathBuf,
}

impl RouteRecord {
    /// Create a new RouteRecord with its path parameters derived from `path`
    pub fn new(method: HttpMethod, path: impl Into<String>, file: PathBuf) -> Self {
        let path = path.into();
        Self {
            method,
            path_params: extract_path_params(&path),
            path,
            response_type_text: None,
            response_schema: None,
            request_body_schema: None,
            query_schema: None,
            responses: Vec::new(),
            middleware_scopes: Vec::new(),
            file,
        }
    }

    /// Replaces the path, re-deriving the path parameters.
    pub fn with_path(mut self, path: String) -> Self {
        self.path_params = extract_path_params(&path);
        self.path = path;
        self
    }
}

/// One response-emission call observed in a handler body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseRecord {
    /// Status code; `None` means the framework default (200)
    pub status: Option<u16>,
    /// Body schema; `None` for responses without content
    pub schema: Option<Schema>,
    /// Media type of the body; `None` means application/json
    pub media_type: Option<String>,
    /// Response headers and their schemas
    pub headers: BTreeMap<String, Schema>,
}

/// HTTP methods recognized as route registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    /// Parses a lowercase method name as used by the router API (`get`, `post`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// The lowercase method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }
}

/// Names of the `:name` segments of a path. A regex constraint (`:id{[0-9]+}`) is dropped.
pub fn extract_path_params(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| PATH_PARAM.captures(segment))
        .map(|caps| caps[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_path_params() {
        assert_eq!(extract_path_params("/users/:id"), vec!["id"]);
        assert_eq!(
            extract_path_params("/orgs/:orgId/repos/:repo"),
            vec!["orgId", "repo"]
        );
        assert!(extract_path_params("/health").is_empty());
    }

    #[test]
    fn test_extract_path_params_with_regex_constraint() {
        assert_eq!(
            extract_path_params("/posts/:id{[0-9]+}/:slug"),
            vec!["id", "slug"]
        );
    }

    #[test]
    fn test_http_method_names() {
        assert_eq!(HttpMethod::from_name("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_name("delete"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::from_name("use"), None);
        assert_eq!(HttpMethod::from_name("GET"), None);
        assert_eq!(HttpMethod::Patch.as_str(), "patch");
    }

    #[test]
    fn test_with_path_recomputes_params() {
        let record = RouteRecord::new(HttpMethod::Get, "/:id", PathBuf::from("a.ts"))
            .with_path("/blog/:slug/:id".to_string());
        assert_eq!(record.path_params, vec!["slug", "id"]);
    }
}
