//! Response-emission recognizer.
//!
//! Finds `c.json(...)`, `c.text(...)`, `c.html(...)`, `c.body(...)`, `c.notFound()`,
//! `c.redirect(...)` and `new Response(...)` inside a handler body and turns each into a
//! [`ResponseRecord`].

use super::ResponseRecord;
use crate::parser::ParsedFile;
use crate::schema_generator::{Schema, SchemaGenerator};
use crate::syntax::{self, Declaration, LiteralValue};
use crate::type_resolver::TypeOracle;
use log::debug;
use std::collections::BTreeMap;
use tree_sitter::Node;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain";
const HTML: &str = "text/html";
const OCTET_STREAM: &str = "application/octet-stream";

/// Extracts the responses emitted in `body`, in document order.
///
/// `ctx` is the name of the handler's context parameter; when it is unknown any receiver
/// of a response method is accepted.
pub fn extract_responses<O: TypeOracle>(
    oracle: &O,
    file: &ParsedFile,
    body: Node<'_>,
    ctx: Option<&str>,
) -> Vec<ResponseRecord> {
    let extractor = ResponseExtractor {
        oracle,
        schemas: SchemaGenerator::new(oracle),
        file,
        ctx,
    };
    let content_type = extractor.content_type_override(body);
    if let Some(ct) = &content_type {
        debug!("Content type overridden to {}", ct);
    }

    let mut records = Vec::new();
    syntax::walk_tree(body, |node| match node.kind() {
        "call_expression" => extractor.context_call(node, content_type.as_deref(), &mut records),
        "new_expression" => extractor.new_response(node, content_type.as_deref(), &mut records),
        _ => {}
    });
    records
}

struct ResponseExtractor<'a, 'o, O: TypeOracle> {
    oracle: &'o O,
    schemas: SchemaGenerator<'o, O>,
    file: &'a ParsedFile,
    ctx: Option<&'a str>,
}

impl<'a, 'o, O: TypeOracle> ResponseExtractor<'a, 'o, O> {
    /// Receiver of a `ctx.<method>(...)` call, if the call is made on the context.
    fn context_method(&self, call: Node<'_>) -> Option<String> {
        let (receiver, method) = syntax::method_call(self.file, call)?;
        match self.ctx {
            Some(ctx) => {
                let chain = syntax::member_chain(self.file, receiver)?;
                (chain.len() == 1 && chain[0] == ctx).then_some(method)
            }
            None => Some(method),
        }
    }

    /// Value of the last `ctx.header('content-type', value)` call in the body.
    fn content_type_override(&self, body: Node<'_>) -> Option<String> {
        let mut content_type = None;
        syntax::walk_tree(body, |node| {
            if node.kind() != "call_expression"
                || self.context_method(node).as_deref() != Some("header")
            {
                return;
            }
            let args = syntax::call_args(node);
            let is_content_type = args
                .first()
                .and_then(|name| syntax::string_value(self.file, *name))
                .is_some_and(|name| name.eq_ignore_ascii_case("content-type"));
            if is_content_type {
                if let Some(value) = args.get(1).and_then(|v| self.string_of(*v)) {
                    content_type = Some(value);
                }
            }
        });
        content_type
    }

    fn context_call(
        &self,
        call: Node<'_>,
        content_type: Option<&str>,
        records: &mut Vec<ResponseRecord>,
    ) {
        let Some(method) = self.context_method(call) else {
            return;
        };
        let args = syntax::call_args(call);

        let (schema, default_media, status_arg, default_status, headers) = match method.as_str() {
            "json" => {
                let schema = match syntax::first_type_argument(call) {
                    Some(annotation) => self.annotation_schema(annotation),
                    None => args.first().map(|v| self.value_schema(*v)),
                };
                (schema, Some(JSON), args.get(1), None, BTreeMap::new())
            }
            "text" => (Some(Schema::string()), Some(TEXT), args.get(1), None, BTreeMap::new()),
            "html" => (Some(Schema::string()), Some(HTML), args.get(1), None, BTreeMap::new()),
            "body" => {
                let (schema, media) = match args.first() {
                    Some(v) if syntax::unwrap_expression(*v).kind() == "null" => (None, None),
                    Some(v) if self.is_string_value(*v) => (Some(Schema::string()), Some(TEXT)),
                    Some(_) => (Some(Schema::binary()), Some(OCTET_STREAM)),
                    None => (None, None),
                };
                (schema, media, args.get(1), None, BTreeMap::new())
            }
            "notFound" => (None, None, args.first(), Some(404), BTreeMap::new()),
            "redirect" => {
                let mut headers = BTreeMap::new();
                headers.insert("Location".to_string(), Schema::string());
                (None, None, args.get(1), Some(302), headers)
            }
            _ => return,
        };

        let media_type = match (schema.is_some(), default_media) {
            (true, Some(default)) => Some(content_type.unwrap_or(default).to_string()),
            _ => None,
        };

        for status in self.statuses(status_arg.copied()) {
            debug!("Found c.{} response with status {:?}", method, status.or(default_status));
            records.push(ResponseRecord {
                status: status.or(default_status),
                schema: schema.clone(),
                media_type: media_type.clone(),
                headers: headers.clone(),
            });
        }
    }

    fn new_response(
        &self,
        node: Node<'_>,
        content_type: Option<&str>,
        records: &mut Vec<ResponseRecord>,
    ) {
        let is_response = node
            .child_by_field_name("constructor")
            .is_some_and(|c| self.file.text(c) == "Response");
        if !is_response {
            return;
        }
        let args = syntax::call_args(node);

        let body = args
            .first()
            .copied()
            .filter(|b| !matches!(syntax::unwrap_expression(*b).kind(), "null" | "undefined"));
        let schema = body.map(|b| self.value_schema(b));

        let mut status_node = None;
        let mut headers = BTreeMap::new();
        let mut init_content_type = None;
        let init = args
            .get(1)
            .map(|i| syntax::unwrap_expression(*i))
            .filter(|i| i.kind() == "object");
        if let Some(init) = init {
            status_node = self.init_status(init);
            let mut cursor = init.walk();
            for pair in init.named_children(&mut cursor).filter(|p| p.kind() == "pair") {
                let key = pair
                    .child_by_field_name("key")
                    .and_then(|k| syntax::property_name(self.file, k));
                let Some(value) = pair.child_by_field_name("value") else {
                    continue;
                };
                match key.as_deref() {
                    Some("headers") => {
                        let value = syntax::unwrap_expression(value);
                        if value.kind() != "object" {
                            continue;
                        }
                        let mut inner = value.walk();
                        let pairs = value.named_children(&mut inner).filter(|h| h.kind() == "pair");
                        for header in pairs {
                            let Some(name) = header
                                .child_by_field_name("key")
                                .and_then(|k| syntax::property_name(self.file, k))
                            else {
                                continue;
                            };
                            if name.eq_ignore_ascii_case("content-type") {
                                init_content_type = header
                                    .child_by_field_name("value")
                                    .and_then(|v| self.string_of(v));
                            } else {
                                headers.insert(name, Schema::string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        let media_type = match (&schema, init_content_type) {
            (_, Some(explicit)) => Some(explicit),
            (None, None) => None,
            (Some(_), None) => match content_type {
                Some(ct) => Some(ct.to_string()),
                None => body
                    .filter(|b| self.is_string_value(*b))
                    .map(|_| TEXT.to_string()),
            },
        };

        for status in self.statuses(status_node) {
            debug!("Found new Response with status {:?}", status.or(Some(200)));
            records.push(ResponseRecord {
                status: status.or(Some(200)),
                schema: schema.clone(),
                media_type: media_type.clone(),
                headers: headers.clone(),
            });
        }
    }

    /// Status codes denoted by a status argument: one `None` when absent or unresolvable,
    /// several when the value is a union of numeric literals.
    fn statuses(&self, arg: Option<Node<'_>>) -> Vec<Option<u16>> {
        let Some(arg) = arg.map(syntax::unwrap_expression) else {
            return vec![None];
        };

        if arg.kind() == "object" {
            return self.statuses(self.init_status(arg));
        }

        if let Some(LiteralValue::Number(n)) = syntax::literal_value(self.file, arg) {
            return vec![to_status(n)];
        }

        if arg.kind() == "member_expression" {
            let object = arg.child_by_field_name("object");
            let property = arg.child_by_field_name("property");
            if let (Some(object), Some(property)) = (object, property) {
                let value = syntax::enum_member_value(
                    self.file,
                    self.file.text(object),
                    self.file.text(property),
                );
                if let Some(LiteralValue::Number(n)) = value {
                    return vec![to_status(n)];
                }
            }
        }

        if let Some(ty) = self.oracle.type_of(self.file, arg) {
            if let Some(n) = self.oracle.literal_numeric_value(&ty) {
                return vec![to_status(n)];
            }
            if let Some(members) = self.oracle.union_members(&ty) {
                let statuses: Vec<Option<u16>> = members
                    .iter()
                    .filter_map(|m| self.oracle.literal_numeric_value(m))
                    .map(to_status)
                    .collect();
                if !statuses.is_empty() {
                    return statuses;
                }
            }
        }

        vec![None]
    }

    /// Value of the `status` member of a response-init object. The shorthand `{ status }`
    /// yields the declared name of the `status` binding in scope.
    fn init_status<'t>(&self, init: Node<'t>) -> Option<Node<'t>> {
        let mut cursor = init.walk();
        let members: Vec<Node<'t>> = init.named_children(&mut cursor).collect();
        members.into_iter().find_map(|member| match member.kind() {
            "pair" => {
                let key = member
                    .child_by_field_name("key")
                    .and_then(|k| syntax::property_name(self.file, k));
                if key.as_deref() == Some("status") {
                    member.child_by_field_name("value")
                } else {
                    None
                }
            }
            "shorthand_property_identifier" if self.file.text(member) == "status" => {
                match syntax::find_declaration(self.file, member, "status")? {
                    Declaration::Variable(declarator) => declarator.child_by_field_name("name"),
                    Declaration::Parameter { param, .. } => param.child_by_field_name("pattern"),
                    Declaration::Function(_) => None,
                }
            }
            _ => None,
        })
    }

    fn value_schema(&self, value: Node<'_>) -> Schema {
        match self.oracle.type_of(self.file, value) {
            Some(ty) => self.schemas.from_type(&ty),
            None => Schema::unparsed(format!(
                "Unparsed type: {}",
                self.file.text(syntax::unwrap_expression(value))
            )),
        }
    }

    fn annotation_schema(&self, annotation: Node<'_>) -> Option<Schema> {
        match self.oracle.type_of_annotation(self.file, annotation) {
            Some(ty) => Some(self.schemas.from_type(&ty)),
            None => Some(self.schemas.from_text(self.file.text(annotation))),
        }
    }

    fn is_string_value(&self, value: Node<'_>) -> bool {
        let value = syntax::unwrap_expression(value);
        if matches!(value.kind(), "string" | "template_string") {
            return true;
        }
        self.oracle
            .type_of(self.file, value)
            .is_some_and(|ty| self.oracle.is_string_like(&ty))
    }

    /// A string constant: a literal, or an expression whose type is a string literal.
    fn string_of(&self, value: Node<'_>) -> Option<String> {
        let value = syntax::unwrap_expression(value);
        if let Some(s) = syntax::string_value(self.file, value) {
            return Some(s);
        }
        let ty = self.oracle.type_of(self.file, value)?;
        self.oracle.literal_string_value(&ty)
    }
}

fn to_status(n: f64) -> Option<u16> {
    (n.fract() == 0.0 && (100.0..=999.0).contains(&n)).then_some(n as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use crate::type_resolver::TypeResolver;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    /// Responses of the first arrow function in `code`.
    fn responses(code: &str) -> Vec<ResponseRecord> {
        let file = AstParser::parse_source(Path::new("handler.ts"), code).unwrap();
        let resolver = TypeResolver::new(std::slice::from_ref(&file));
        let mut handler = None;
        syntax::walk_tree(file.root(), |n| {
            if handler.is_none() && n.kind() == "arrow_function" {
                handler = Some(n);
            }
        });
        let handler = handler.unwrap();
        let ctx = syntax::context_param_name(&file, handler);
        extract_responses(
            &resolver,
            &file,
            handler.child_by_field_name("body").unwrap(),
            ctx.as_deref(),
        )
    }

    #[test]
    fn test_json_with_statuses() {
        let code = r#"
            const h = async (c) => {
                if (!ok) {
                    return c.json({ error: 'invalid' }, 422)
                }
                return c.json({ id: 1 }, 200)
            }
        "#;
        let records = responses(code);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, Some(422));
        assert_eq!(records[1].status, Some(200));
        assert_eq!(records[0].media_type.as_deref(), Some("application/json"));
        assert_eq!(
            serde_json::to_value(records[0].schema.as_ref().unwrap()).unwrap(),
            json!({
                "type": "object",
                "properties": {"error": {"type": "string"}},
                "required": ["error"]
            })
        );
    }

    #[test]
    fn test_text_html_and_default_status() {
        let records = responses("const h = (c) => c.text('pong')");
        assert_eq!(
            records,
            vec![ResponseRecord {
                status: None,
                schema: Some(Schema::string()),
                media_type: Some("text/plain".to_string()),
                headers: BTreeMap::new(),
            }]
        );

        let records = responses("const h = (c) => c.html('<p>hi</p>', 201)");
        assert_eq!(records[0].media_type.as_deref(), Some("text/html"));
        assert_eq!(records[0].status, Some(201));
    }

    #[test]
    fn test_other_receivers_are_ignored() {
        let code = r#"
            const h = (c) => {
                const data = res.json()
                return c.json({ ok: true })
            }
        "#;
        assert_eq!(responses(code).len(), 1);
    }

    #[test]
    fn test_any_receiver_without_context_name() {
        let code = "const h = ({ req }) => ctx.json({ ok: true })";
        assert_eq!(responses(code).len(), 1);
    }

    #[test]
    fn test_status_from_enum_and_union() {
        let code = r#"
            enum HttpStatus { Created = 201, Accepted }
            const h = (c) => {
                const code: 400 | 409 = pick()
                c.json({ a: 1 }, HttpStatus.Accepted)
                return c.json({ message: 'no' }, code)
            }
        "#;
        let statuses: Vec<Option<u16>> = responses(code).iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![Some(202), Some(400), Some(409)]);
    }

    #[test]
    fn test_status_in_init_object() {
        let records = responses("const h = (c) => c.json({}, { status: 201 })");
        assert_eq!(records[0].status, Some(201));
    }

    #[test]
    fn test_shorthand_status_in_init_object() {
        let code = r#"
            const h = (c) => {
                const status = 201
                if (draft) {
                    return new Response('queued', { status })
                }
                return c.json({ id: 1 }, { status })
            }
        "#;
        let statuses: Vec<Option<u16>> = responses(code).iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![Some(201), Some(201)]);

        let code = r#"
            const h = (c) => {
                const status: 200 | 202 = pick()
                return c.json({}, { status })
            }
        "#;
        let statuses: Vec<Option<u16>> = responses(code).iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![Some(200), Some(202)]);
    }

    #[test]
    fn test_body_media_types() {
        let code = r#"
            const h = (c) => {
                c.body('raw text')
                c.body(buffer)
                return c.body(null, 204)
            }
        "#;
        let records = responses(code);
        assert_eq!(records[0].media_type.as_deref(), Some("text/plain"));
        assert_eq!(records[0].schema, Some(Schema::string()));
        assert_eq!(records[1].media_type.as_deref(), Some("application/octet-stream"));
        assert_eq!(records[1].schema, Some(Schema::binary()));
        assert_eq!(records[2].status, Some(204));
        assert_eq!(records[2].schema, None);
        assert_eq!(records[2].media_type, None);
    }

    #[test]
    fn test_content_type_header_override() {
        let code = r#"
            const h = (c) => {
                c.header('Content-Type', 'text/csv')
                return c.body('a,b,c')
            }
        "#;
        let records = responses(code);
        assert_eq!(records[0].media_type.as_deref(), Some("text/csv"));
    }

    #[test]
    fn test_not_found_and_redirect() {
        let code = r#"
            const h = (c) => {
                if (missing) return c.notFound()
                return c.redirect('/login')
            }
        "#;
        let records = responses(code);
        assert_eq!(records[0].status, Some(404));
        assert_eq!(records[0].schema, None);
        assert_eq!(records[1].status, Some(302));
        assert_eq!(
            records[1].headers.get("Location"),
            Some(&Schema::string())
        );
    }

    #[test]
    fn test_new_response() {
        let code = r#"
            const h = (c) => {
                return new Response(JSON.stringify({ a: 1 }), {
                    status: 201,
                    headers: { 'Content-Type': 'application/json', 'X-Trace': id },
                })
            }
        "#;
        let records = responses(code);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Some(201));
        assert_eq!(records[0].media_type.as_deref(), Some("application/json"));
        assert_eq!(records[0].schema, Some(Schema::string()));
        assert!(records[0].headers.contains_key("X-Trace"));
    }

    #[test]
    fn test_new_response_defaults() {
        let records = responses("const h = () => new Response('ok')");
        assert_eq!(records[0].status, Some(200));
        assert_eq!(records[0].media_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_json_type_argument() {
        let code = r#"
            interface Item { id: number }
            const h = (c) => c.json<Item[]>(load())
        "#;
        let records = responses(code);
        assert_eq!(
            serde_json::to_value(records[0].schema.as_ref().unwrap()).unwrap(),
            json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {"id": {"type": "number"}},
                    "required": ["id"]
                }
            })
        );
    }
}
