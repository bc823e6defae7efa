//! Route-registration recognizer for the Hono router API.

use super::request::{self, QueryParams};
use super::responses;
use super::zod::ZodSchema;
use super::{HttpMethod, RouteExtractor, RouteRecord};
use crate::parser::ParsedFile;
use crate::schema_generator::{Schema, SchemaGenerator};
use crate::syntax;
use crate::type_resolver::{is_router_type, TypeOracle};
use log::debug;
use tree_sitter::Node;

/// Which receivers of `.get(...)`, `.post(...)`, ... count as routers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverPolicy {
    /// Any receiver with a method of the right name
    #[default]
    Permissive,
    /// Only receivers whose type names the Hono router
    RequireRouter,
}

/// Hono route extractor
pub struct HonoExtractor<'o, O: TypeOracle> {
    oracle: &'o O,
    policy: ReceiverPolicy,
}

/// Schemas contributed by validator middleware (`zValidator('json', schema)`).
#[derive(Default)]
struct ValidatorShapes {
    body: Option<Schema>,
    query: Option<Schema>,
}

impl<'o, O: TypeOracle> HonoExtractor<'o, O> {
    pub fn new(oracle: &'o O) -> Self {
        Self {
            oracle,
            policy: ReceiverPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReceiverPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Extracts the registrations of one file in document order.
    ///
    /// Chained registrations (`app.get(...).post(...)`) are ordered by the position of their
    /// path literal, so they come out in reading order rather than outermost call first.
    pub fn extract_file(&self, file: &ParsedFile) -> Vec<RouteRecord> {
        let mut routes = Vec::new();
        syntax::walk_tree(file.root(), |node| {
            if node.kind() != "call_expression" {
                return;
            }
            if let Some(route) = self.registration(file, node) {
                debug!(
                    "Found route: {} {} in {}",
                    route.method.as_str().to_uppercase(),
                    route.path,
                    file.path.display()
                );
                let position = syntax::call_args(node)
                    .first()
                    .map_or(node.start_byte(), |path| path.start_byte());
                routes.push((position, route));
            }
        });
        routes.sort_by_key(|(position, _)| *position);
        routes.into_iter().map(|(_, route)| route).collect()
    }

    fn registration(&self, file: &ParsedFile, call: Node<'_>) -> Option<RouteRecord> {
        let (receiver, name) = syntax::method_call(file, call)?;
        let method = HttpMethod::from_name(&name)?;
        let args = syntax::call_args(call);
        let path = syntax::string_value(file, *args.first()?)?;

        if self.policy == ReceiverPolicy::RequireRouter && !self.is_router(file, receiver) {
            debug!("Skipping {}: receiver is not a router", file.text(call));
            return None;
        }

        let mut route = RouteRecord::new(method, path, file.path.clone());

        let handler_index = args
            .iter()
            .skip(1)
            .rposition(|arg| syntax::resolve_function(file, *arg).is_some())
            .map(|i| i + 1);
        let middleware_end = handler_index.unwrap_or(args.len());
        let validators = self.validators(file, &args[1..middleware_end]);

        let mut query = QueryParams::default();
        if let Some(schema) = validators.query {
            query.merge(schema);
        }

        match handler_index.and_then(|i| syntax::resolve_function(file, args[i])) {
            Some(handler) => {
                if let Some(annotation) = handler.child_by_field_name("return_type") {
                    let text = file.text(annotation).trim_start_matches(':').trim();
                    route.response_type_text = Some(text.to_string());
                    route.response_schema = self
                        .oracle
                        .type_of_annotation(file, annotation)
                        .map(|ty| SchemaGenerator::new(self.oracle).from_type(&ty));
                }

                if let Some(body) = handler.child_by_field_name("body") {
                    let ctx = syntax::context_param_name(file, handler);
                    let ctx = ctx.as_deref();
                    route.responses = responses::extract_responses(self.oracle, file, body, ctx);
                    let shapes = request::extract_request(self.oracle, file, body, ctx);
                    route.request_body_schema = shapes.body;
                    if let Some(schema) = shapes.query {
                        query.merge(schema);
                    }
                }
            }
            None => debug!("No handler function for {} {}", name, route.path),
        }

        if route.request_body_schema.is_none() {
            route.request_body_schema = validators.body;
        }
        route.query_schema = query.into_schema();
        Some(route)
    }

    fn is_router(&self, file: &ParsedFile, receiver: Node<'_>) -> bool {
        self.oracle
            .type_of(file, receiver)
            .is_some_and(|ty| is_router_type(&self.oracle.display_text(&ty)))
    }

    fn validators(&self, file: &ParsedFile, middleware: &[Node<'_>]) -> ValidatorShapes {
        let mut shapes = ValidatorShapes::default();
        for arg in middleware {
            let arg = syntax::unwrap_expression(*arg);
            if arg.kind() != "call_expression" {
                continue;
            }
            let is_validator = arg
                .child_by_field_name("function")
                .is_some_and(|f| file.text(f) == "zValidator");
            if !is_validator {
                continue;
            }
            let args = syntax::call_args(arg);
            let (Some(target), Some(builder)) = (args.first(), args.get(1)) else {
                continue;
            };
            let schema = ZodSchema::parse(file, *builder).to_schema();
            match syntax::string_value(file, *target).as_deref() {
                Some("json") | Some("form") => shapes.body = Some(schema),
                Some("query") => shapes.query = Some(schema),
                _ => {}
            }
        }
        shapes
    }
}

impl<O: TypeOracle> RouteExtractor for HonoExtractor<'_, O> {
    fn extract_routes(&self, parsed_files: &[ParsedFile]) -> Vec<RouteRecord> {
        let mut routes = Vec::new();
        for file in parsed_files {
            routes.extend(self.extract_file(file));
        }
        debug!("Extracted {} routes from {} files", routes.len(), parsed_files.len());
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use crate::type_resolver::TypeResolver;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    fn extract(code: &str, policy: ReceiverPolicy) -> Vec<RouteRecord> {
        let file = AstParser::parse_source(Path::new("app.ts"), code).unwrap();
        let files = vec![file];
        let resolver = TypeResolver::new(&files);
        HonoExtractor::new(&resolver)
            .with_policy(policy)
            .extract_routes(&files)
    }

    #[test]
    fn test_registrations_in_document_order() {
        let code = r#"
            import { Hono } from 'hono'
            const app = new Hono()
            app.get('/users', (c) => c.json([]))
            app.post('/users', async (c) => c.json({ ok: true }, 201))
            app.delete(`/users/:id`, (c) => c.body(null, 204))
            app.get(dynamicPath, (c) => c.text('skipped'))
            app.use('/admin/*', auth)
        "#;
        let routes = extract(code, ReceiverPolicy::Permissive);
        let summary: Vec<(HttpMethod, &str)> =
            routes.iter().map(|r| (r.method, r.path.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (HttpMethod::Get, "/users"),
                (HttpMethod::Post, "/users"),
                (HttpMethod::Delete, "/users/:id"),
            ]
        );
        assert_eq!(routes[2].path_params, vec!["id"]);
        assert_eq!(routes[1].responses[0].status, Some(201));
    }

    #[test]
    fn test_named_handler_and_middleware() {
        let code = r#"
            async function getUser(c) {
                return c.json({ id: c.req.param('id') })
            }
            app.get('/users/:id', logger(), getUser)
        "#;
        let routes = extract(code, ReceiverPolicy::Permissive);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].responses.len(), 1);
        assert_eq!(
            serde_json::to_value(routes[0].responses[0].schema.as_ref().unwrap()).unwrap(),
            json!({"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]})
        );
    }

    #[test]
    fn test_validator_middleware() {
        let code = r#"
            const Post = z.object({ title: z.string() })
            app.post('/posts', zValidator('json', Post), (c) => c.json({}, 201))
            const Paging = z.object({ page: z.string().optional() })
            app.get('/posts', zValidator('query', Paging), (c) => {
                const q = c.req.query('q')
                return c.json([])
            })
        "#;
        let routes = extract(code, ReceiverPolicy::Permissive);
        assert_eq!(
            serde_json::to_value(routes[0].request_body_schema.as_ref().unwrap()).unwrap(),
            json!({
                "type": "object",
                "properties": {"title": {"type": "string"}},
                "required": ["title"]
            })
        );
        assert_eq!(
            serde_json::to_value(routes[1].query_schema.as_ref().unwrap()).unwrap(),
            json!({
                "type": "object",
                "properties": {"page": {"type": "string"}, "q": {"type": "string"}}
            })
        );
    }

    #[test]
    fn test_declared_return_type() {
        let code = r#"
            interface Health { status: string }
            app.get('/health', (c): Health => load())
        "#;
        let routes = extract(code, ReceiverPolicy::Permissive);
        assert_eq!(routes[0].response_type_text.as_deref(), Some("Health"));
        assert_eq!(
            serde_json::to_value(routes[0].response_schema.as_ref().unwrap()).unwrap(),
            json!({
                "type": "object",
                "properties": {"status": {"type": "string"}},
                "required": ["status"]
            })
        );
    }

    #[test]
    fn test_receiver_policy() {
        let code = r#"
            const app = new Hono()
            const api: Hono = makeRouter()
            const cache = new Map()
            app.get('/a', (c) => c.text('a')).post('/b', (c) => c.text('b'))
            api.put('/c', (c) => c.text('c'))
            cache.get('/not-a-route')
        "#;
        let permissive = extract(code, ReceiverPolicy::Permissive);
        assert_eq!(permissive.len(), 4);

        let strict: Vec<String> = extract(code, ReceiverPolicy::RequireRouter)
            .into_iter()
            .map(|r| r.path)
            .collect();
        assert_eq!(strict, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn test_registration_without_handler() {
        let routes = extract("app.options('/ping')", ReceiverPolicy::Permissive);
        assert_eq!(routes.len(), 1);
        assert!(routes[0].responses.is_empty());
        assert_eq!(routes[0].request_body_schema, None);
    }
}
