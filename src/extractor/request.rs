//! Request body and query recognizer.

use super::zod::{self, ZodSchema};
use crate::parser::ParsedFile;
use crate::schema_generator::{Schema, SchemaGenerator};
use crate::syntax::{self, Declaration};
use crate::type_resolver::TypeOracle;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use tree_sitter::Node;

/// Request shapes recovered from one handler body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestShapes {
    /// Schema of the JSON body
    pub body: Option<Schema>,
    /// Object schema whose properties are the query parameters
    pub query: Option<Schema>,
}

/// Query parameters accumulated across several access sites.
#[derive(Debug, Default)]
pub struct QueryParams {
    properties: BTreeMap<String, Schema>,
    required: BTreeSet<String>,
}

impl QueryParams {
    pub fn insert(&mut self, name: impl Into<String>, schema: Schema, required: bool) {
        let name = name.into();
        if required {
            self.required.insert(name.clone());
        }
        self.properties.insert(name, schema);
    }

    /// Merges the properties of an object schema; other schemas are ignored.
    pub fn merge(&mut self, schema: Schema) {
        if let Schema::Object {
            properties,
            required,
            ..
        } = schema
        {
            self.properties.extend(properties);
            self.required.extend(required);
        }
    }

    pub fn into_schema(self) -> Option<Schema> {
        (!self.properties.is_empty()).then(|| Schema::object(self.properties, self.required))
    }
}

/// Recovers the body and query shapes read by the handler `body`.
pub fn extract_request<O: TypeOracle>(
    oracle: &O,
    file: &ParsedFile,
    body: Node<'_>,
    ctx: Option<&str>,
) -> RequestShapes {
    let schemas = SchemaGenerator::new(oracle);
    let mut body_schema: Option<Schema> = None;
    let mut query = QueryParams::default();

    syntax::walk_tree(body, |node| match node.kind() {
        "variable_declarator" => {
            let value = node.child_by_field_name("value").map(syntax::unwrap_expression);
            let Some(value) = value else {
                return;
            };
            let annotation = node.child_by_field_name("type");

            if is_request_call(file, value, ctx, "json") && body_schema.is_none() {
                let schema = match annotation {
                    Some(a) => oracle
                        .type_of_annotation(file, a)
                        .map(|ty| schemas.from_type(&ty))
                        .unwrap_or_else(|| schemas.from_text(annotation_text(file, a))),
                    None => match oracle.type_of(file, value) {
                        Some(ty) => schemas.from_type(&ty),
                        None => Schema::unparsed("Unparsed type: unknown"),
                    },
                };
                debug!("Found JSON body variable: {}", file.text(node));
                body_schema = Some(schema);
            }

            if is_request_call(file, value, ctx, "query") && syntax::call_args(value).is_empty() {
                if let Some(a) = annotation {
                    let schema = oracle
                        .type_of_annotation(file, a)
                        .map(|ty| schemas.from_type(&ty))
                        .unwrap_or_else(|| schemas.from_text(annotation_text(file, a)));
                    query.merge(schema);
                }
            }
        }
        "call_expression" => {
            if let Some(schema) = validated_body(file, node, ctx) {
                let replace = match &body_schema {
                    Some(existing) => existing.is_unparsed(),
                    None => true,
                };
                if replace {
                    debug!("Found validated body: {}", file.text(node));
                    body_schema = Some(schema);
                }
                return;
            }

            for (method, schema) in [
                ("query", Schema::string()),
                ("queries", Schema::array(Schema::string())),
            ] {
                if !is_request_call(file, node, ctx, method) {
                    continue;
                }
                let name = syntax::call_args(node)
                    .first()
                    .and_then(|arg| syntax::string_value(file, *arg));
                if let Some(name) = name {
                    query.insert(name, schema, false);
                }
            }
        }
        _ => {}
    });

    RequestShapes {
        body: body_schema,
        query: query.into_schema(),
    }
}

/// Whether `call` is `<ctx>.req.<method>(...)`.
fn is_request_call(file: &ParsedFile, call: Node<'_>, ctx: Option<&str>, method: &str) -> bool {
    let Some((receiver, name)) = syntax::method_call(file, call) else {
        return false;
    };
    if name != method {
        return false;
    }
    match syntax::member_chain(file, receiver) {
        Some(chain) => match ctx {
            Some(ctx) => chain.len() == 2 && chain[0] == ctx && chain[1] == "req",
            None => chain.len() >= 2 && chain.last().is_some_and(|p| p == "req"),
        },
        None => false,
    }
}

/// Schema of `<schema>.parse(<json body>)` or `.safeParse(...)` when `<schema>` is a zod builder.
fn validated_body(file: &ParsedFile, call: Node<'_>, ctx: Option<&str>) -> Option<Schema> {
    let (receiver, method) = syntax::method_call(file, call)?;
    if !matches!(method.as_str(), "parse" | "safeParse" | "parseAsync" | "safeParseAsync") {
        return None;
    }
    let argument = syntax::unwrap_expression(*syntax::call_args(call).first()?);
    if !reads_json_body(file, argument, ctx) {
        return None;
    }

    let receiver = syntax::unwrap_expression(receiver);
    let is_builder = match receiver.kind() {
        "identifier" => match syntax::find_declaration(file, receiver, file.text(receiver)) {
            Some(Declaration::Variable(declarator)) => declarator
                .child_by_field_name("value")
                .is_some_and(|v| zod::is_zod_builder(file, v)),
            _ => false,
        },
        _ => zod::is_zod_builder(file, receiver),
    };
    is_builder.then(|| ZodSchema::parse(file, receiver).to_schema())
}

/// `await c.req.json()` itself, or a variable initialized with it.
fn reads_json_body(file: &ParsedFile, node: Node<'_>, ctx: Option<&str>) -> bool {
    if is_request_call(file, node, ctx, "json") {
        return true;
    }
    if node.kind() != "identifier" {
        return false;
    }
    match syntax::find_declaration(file, node, file.text(node)) {
        Some(Declaration::Variable(declarator)) => declarator
            .child_by_field_name("value")
            .is_some_and(|v| is_request_call(file, syntax::unwrap_expression(v), ctx, "json")),
        _ => false,
    }
}

fn annotation_text<'f>(file: &'f ParsedFile, annotation: Node<'_>) -> &'f str {
    file.text(annotation).trim_start_matches(':').trim()
}
