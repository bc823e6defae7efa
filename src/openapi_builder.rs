use crate::extractor::{HttpMethod, RouteRecord};
use crate::schema_generator::{schema_from_type_text, Schema};
use log::debug;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PATH_PARAM_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z_$][\w$]*)(\{.*\})?(.*)$").unwrap());

const JSON: &str = "application/json";

/// OpenAPI document builder
///
/// Records are collected with [`OpenApiBuilder::add_route`] and folded into one operation
/// per (path, method) by [`OpenApiBuilder::build`].
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    /// Route records grouped by OpenAPI path and method, in insertion order within a group
    groups: BTreeMap<(String, HttpMethod), Vec<RouteRecord>>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    /// The operation slot for `method`.
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }

    fn set_operation(&mut self, method: HttpMethod, operation: Operation) {
        let slot = match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        };
        *slot = Some(operation);
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    /// Middleware scopes of the route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Path parameters, then query parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code
    pub responses: BTreeMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location (path or query)
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter is required
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the request body is required
    pub required: bool,
    /// Content types and their schemas
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

/// OpenAPI Header object
#[derive(Debug, Clone, Serialize)]
pub struct Header {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// Response description
    pub description: String,
    /// Response headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, Header>>,
    /// Response content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// API paths
    pub paths: BTreeMap<String, PathItem>,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info {
                title: "Generated API".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            },
            groups: BTreeMap::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(
        mut self,
        title: String,
        version: String,
        description: Option<String>,
    ) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    /// Add a route to the OpenAPI document
    pub fn add_route(&mut self, route: &RouteRecord) {
        debug!("Adding route: {} {}", route.method.as_str().to_uppercase(), route.path);
        let path = Self::convert_path_format(&route.path);
        self.groups
            .entry((path, route.method))
            .or_default()
            .push(route.clone());
    }

    /// Add every route of a run
    pub fn add_routes(&mut self, routes: &[RouteRecord]) {
        for route in routes {
            self.add_route(route);
        }
    }

    /// Convert path format from `:param` (optionally `:param{regex}`) to OpenAPI `{param}` format
    pub fn convert_path_format(path: &str) -> String {
        path.split('/')
            .map(|part| match PATH_PARAM_SEGMENT.captures(part) {
                Some(caps) => format!("{{{}}}{}", &caps[1], &caps[3]),
                None => part.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> OpenApiDocument {
        debug!("Building final OpenAPI document from {} operations", self.groups.len());

        let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();
        for ((path, method), routes) in self.groups {
            let operation = Self::build_operation(&routes);
            paths.entry(path).or_default().set_operation(method, operation);
        }

        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: self.info,
            paths,
        }
    }

    fn build_operation(routes: &[RouteRecord]) -> Operation {
        let mut path_params: Vec<String> = Vec::new();
        let mut query_properties = BTreeMap::new();
        let mut query_required = std::collections::BTreeSet::new();
        let mut scopes: Vec<String> = Vec::new();
        let mut body = None;

        for route in routes {
            for name in &route.path_params {
                if !path_params.contains(name) {
                    path_params.push(name.clone());
                }
            }
            if let Some(Schema::Object {
                properties,
                required,
                ..
            }) = &route.query_schema
            {
                query_properties.extend(properties.clone());
                query_required.extend(required.iter().cloned());
            }
            for scope in &route.middleware_scopes {
                if !scopes.contains(scope) {
                    scopes.push(scope.clone());
                }
            }
            if let Some(schema) = &route.request_body_schema {
                body = Some(schema.clone());
            }
        }

        let mut parameters: Vec<Parameter> = path_params
            .into_iter()
            .map(|name| Parameter {
                name,
                location: "path".to_string(),
                required: true,
                schema: Schema::string(),
                description: None,
            })
            .collect();
        parameters.extend(query_properties.into_iter().map(|(name, schema)| Parameter {
            required: query_required.contains(&name),
            name,
            location: "query".to_string(),
            schema,
            description: None,
        }));

        let request_body = body.map(|schema| RequestBody {
            description: None,
            required: true,
            content: BTreeMap::from([(JSON.to_string(), MediaType { schema })]),
        });

        let (tags, description) = if scopes.is_empty() {
            (None, None)
        } else {
            let note = format!("Middleware scopes: {}", scopes.join(", "));
            (Some(scopes), Some(note))
        };

        Operation {
            tags,
            description,
            parameters: (!parameters.is_empty()).then_some(parameters),
            request_body,
            responses: Self::build_responses(routes),
        }
    }

    fn build_responses(routes: &[RouteRecord]) -> BTreeMap<String, Response> {
        let mut responses: BTreeMap<String, Response> = BTreeMap::new();

        for record in routes.iter().flat_map(|r| &r.responses) {
            let status = record.status.unwrap_or(200);
            let response = responses.entry(status.to_string()).or_insert_with(|| Response {
                description: reason_phrase(status).unwrap_or("Response").to_string(),
                headers: None,
                content: None,
            });
            if let Some(schema) = &record.schema {
                let media_type = record.media_type.clone().unwrap_or_else(|| JSON.to_string());
                response
                    .content
                    .get_or_insert_with(BTreeMap::new)
                    .insert(media_type, MediaType { schema: schema.clone() });
            }
            for (name, schema) in &record.headers {
                response
                    .headers
                    .get_or_insert_with(BTreeMap::new)
                    .insert(name.clone(), Header { schema: schema.clone() });
            }
        }

        if responses.is_empty() {
            responses.insert("200".to_string(), Self::legacy_response(routes));
        }
        responses
    }

    /// The single 200 response of a group whose handlers emitted no recognized response.
    fn legacy_response(routes: &[RouteRecord]) -> Response {
        let schema = routes.iter().rev().find_map(|route| {
            route.response_schema.clone().or_else(|| {
                route
                    .response_type_text
                    .as_deref()
                    .map(schema_from_type_text)
            })
        });
        Response {
            description: "OK".to_string(),
            headers: None,
            content: schema
                .map(|schema| BTreeMap::from([(JSON.to_string(), MediaType { schema })])),
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard reason phrase of an HTTP status code.
pub fn reason_phrase(status: u16) -> Option<&'static str> {
    let phrase = match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        410 => "Gone",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => return None,
    };
    Some(phrase)
}
