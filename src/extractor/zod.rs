//! Static interpretation of zod schema builders (`z.object({ name: z.string() })`).
//!
//! The grammar is closed: only the builders listed on [`ZodSchema`] are understood, anything
//! else becomes [`ZodSchema::Unrecognized`] and renders as an unparsed leaf.

use crate::parser::ParsedFile;
use crate::schema_generator::Schema;
use crate::syntax::{self, Declaration};
use std::collections::{BTreeMap, BTreeSet};
use tree_sitter::Node;

/// Bound on schema-variable indirections (`const A = B; const B = z.object(...)`).
const MAX_DEPTH: usize = 16;

/// Chained calls that refine a value without changing its shape.
const REFINEMENTS: &[&str] = &[
    "min",
    "max",
    "length",
    "email",
    "url",
    "uuid",
    "int",
    "positive",
    "negative",
    "nonnegative",
    "trim",
    "regex",
    "describe",
];

#[derive(Debug, Clone, PartialEq)]
pub enum ZodSchema {
    /// `z.string()`
    String,
    /// `z.number()`
    Number,
    /// `z.boolean()`
    Boolean,
    /// `z.enum(['a', 'b'])`
    Enum(Vec<String>),
    /// `z.array(inner)` or `inner.array()`
    Array(Box<ZodSchema>),
    /// `z.object({ ... })`, properties in source order
    Object(Vec<(String, ZodSchema)>),
    /// `inner.optional()`
    Optional(Box<ZodSchema>),
    /// `inner.nullable()`
    Nullable(Box<ZodSchema>),
    /// Any other expression, with its source text
    Unrecognized(String),
}

impl ZodSchema {
    /// Interprets a builder expression. Identifiers are followed to their initializer.
    pub fn parse(file: &ParsedFile, node: Node<'_>) -> ZodSchema {
        Self::parse_at(file, node, 0)
    }

    fn parse_at(file: &ParsedFile, node: Node<'_>, depth: usize) -> ZodSchema {
        let node = syntax::unwrap_expression(node);
        let unrecognized = || ZodSchema::Unrecognized(file.text(node).to_string());
        if depth > MAX_DEPTH {
            return unrecognized();
        }

        if node.kind() == "identifier" {
            return match syntax::find_declaration(file, node, file.text(node)) {
                Some(Declaration::Variable(declarator)) => declarator
                    .child_by_field_name("value")
                    .map(|value| Self::parse_at(file, value, depth + 1))
                    .unwrap_or_else(unrecognized),
                _ => unrecognized(),
            };
        }

        let Some((receiver, method)) = syntax::method_call(file, node) else {
            return unrecognized();
        };
        let args = syntax::call_args(node);

        let receiver = syntax::unwrap_expression(receiver);
        if receiver.kind() == "identifier" && file.text(receiver) == "z" {
            return match method.as_str() {
                "string" => ZodSchema::String,
                "number" => ZodSchema::Number,
                "boolean" => ZodSchema::Boolean,
                "array" => match args.first() {
                    Some(inner) => {
                        ZodSchema::Array(Box::new(Self::parse_at(file, *inner, depth + 1)))
                    }
                    None => unrecognized(),
                },
                "object" => match args.first() {
                    Some(shape) if shape.kind() == "object" => {
                        ZodSchema::Object(Self::object_shape(file, *shape, depth))
                    }
                    _ => unrecognized(),
                },
                "enum" => match args.first() {
                    Some(values) if values.kind() == "array" => {
                        let mut cursor = values.walk();
                        let variants: Vec<String> = values
                            .named_children(&mut cursor)
                            .filter_map(|v| syntax::string_value(file, v))
                            .collect();
                        ZodSchema::Enum(variants)
                    }
                    _ => unrecognized(),
                },
                _ => unrecognized(),
            };
        }

        match method.as_str() {
            "optional" => ZodSchema::Optional(Box::new(Self::parse_at(file, receiver, depth + 1))),
            "nullable" => ZodSchema::Nullable(Box::new(Self::parse_at(file, receiver, depth + 1))),
            "nullish" => ZodSchema::Optional(Box::new(ZodSchema::Nullable(Box::new(
                Self::parse_at(file, receiver, depth + 1),
            )))),
            "array" => ZodSchema::Array(Box::new(Self::parse_at(file, receiver, depth + 1))),
            m if REFINEMENTS.contains(&m) => Self::parse_at(file, receiver, depth + 1),
            _ => unrecognized(),
        }
    }

    fn object_shape(file: &ParsedFile, shape: Node<'_>, depth: usize) -> Vec<(String, ZodSchema)> {
        let mut properties = Vec::new();
        let mut cursor = shape.walk();
        for member in shape.named_children(&mut cursor) {
            if member.kind() != "pair" {
                continue;
            }
            let Some(name) = member
                .child_by_field_name("key")
                .and_then(|k| syntax::property_name(file, k))
            else {
                continue;
            };
            let value = match member.child_by_field_name("value") {
                Some(v) => Self::parse_at(file, v, depth + 1),
                None => continue,
            };
            properties.push((name, value));
        }
        properties
    }

    /// `.optional()` anywhere under `.nullable()` still allows a missing key.
    fn is_optional(&self) -> bool {
        match self {
            ZodSchema::Optional(_) => true,
            ZodSchema::Nullable(inner) => inner.is_optional(),
            _ => false,
        }
    }

    /// Converts the builder into a [`Schema`]. Optionality is expressed by the parent object's
    /// `required` set.
    pub fn to_schema(&self) -> Schema {
        match self {
            ZodSchema::String | ZodSchema::Enum(_) => Schema::string(),
            ZodSchema::Number => Schema::number(),
            ZodSchema::Boolean => Schema::boolean(),
            ZodSchema::Array(inner) => Schema::array(inner.to_schema()),
            ZodSchema::Object(fields) => {
                let mut properties = BTreeMap::new();
                let mut required = BTreeSet::new();
                for (name, field) in fields {
                    if !field.is_optional() {
                        required.insert(name.clone());
                    }
                    properties.insert(name.clone(), field.to_schema());
                }
                Schema::object(properties, required)
            }
            ZodSchema::Optional(inner) => inner.to_schema(),
            ZodSchema::Nullable(inner) => inner.to_schema().nullable(),
            ZodSchema::Unrecognized(text) => Schema::unparsed(format!("Unparsed type: {}", text)),
        }
    }
}

/// Whether `node` is a call to the zod namespace or a chain rooted in one.
pub fn is_zod_builder(file: &ParsedFile, node: Node<'_>) -> bool {
    let mut current = syntax::unwrap_expression(node);
    loop {
        match current.kind() {
            "call_expression" => match current.child_by_field_name("function") {
                Some(f) => current = f,
                None => return false,
            },
            "member_expression" => match current.child_by_field_name("object") {
                Some(o) => current = o,
                None => return false,
            },
            "identifier" => return file.text(current) == "z",
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    fn parse_var(code: &str, name: &str) -> ZodSchema {
        let file = AstParser::parse_source(Path::new("schema.ts"), code).unwrap();
        let mut value = None;
        syntax::walk_tree(file.root(), |n| {
            if n.kind() == "variable_declarator"
                && n.child_by_field_name("name").map(|x| file.text(x)) == Some(name)
            {
                value = n.child_by_field_name("value");
            }
        });
        ZodSchema::parse(&file, value.unwrap())
    }

    #[test]
    fn test_object_with_optional_field() {
        let code = r#"
            const CreateUser = z.object({
                name: z.string().min(1),
                age: z.number().int().optional(),
                tags: z.array(z.string()),
            })
        "#;
        let schema = parse_var(code, "CreateUser");
        assert_eq!(
            serde_json::to_value(schema.to_schema()).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "age": {"type": "number"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["name", "tags"]
            })
        );
    }

    #[test]
    fn test_nested_object_and_enum() {
        let code = r#"
            const Address = z.object({ city: z.string() })
            const Person = z.object({
                address: Address,
                role: z.enum(['admin', 'user']),
                nickname: z.string().nullable(),
            })
        "#;
        let schema = parse_var(code, "Person");
        match &schema {
            ZodSchema::Object(fields) => {
                assert_eq!(
                    fields[0].1,
                    ZodSchema::Object(vec![("city".to_string(), ZodSchema::String)])
                );
                assert_eq!(
                    fields[1].1,
                    ZodSchema::Enum(vec!["admin".to_string(), "user".to_string()])
                );
            }
            other => panic!("expected object, got {:?}", other),
        }
        let json = serde_json::to_value(schema.to_schema()).unwrap();
        assert_eq!(json["properties"]["nickname"], json!({"type": "string", "nullable": true}));
    }

    #[test]
    fn test_optional_under_nullable_is_not_required() {
        let code = r#"
            const Profile = z.object({
                nick: z.string().optional().nullable(),
                alias: z.string().nullable().optional(),
                name: z.string(),
            })
        "#;
        let json = serde_json::to_value(parse_var(code, "Profile").to_schema()).unwrap();
        assert_eq!(json["required"], json!(["name"]));
        assert_eq!(json["properties"]["nick"], json!({"type": "string", "nullable": true}));
    }

    #[test]
    fn test_unrecognized_builder() {
        let code = "const S = z.object({ when: z.date(), custom: makeSchema() })";
        let schema = parse_var(code, "S");
        let json = serde_json::to_value(schema.to_schema()).unwrap();
        assert_eq!(
            json["properties"]["when"],
            json!({"description": "Unparsed type: z.date()"})
        );
        assert_eq!(
            json["properties"]["custom"],
            json!({"description": "Unparsed type: makeSchema()"})
        );
    }

    #[test]
    fn test_chained_array() {
        let schema = parse_var("const Ids = z.number().array()", "Ids");
        assert_eq!(schema, ZodSchema::Array(Box::new(ZodSchema::Number)));
    }

    #[test]
    fn test_is_zod_builder() {
        let file = AstParser::parse_source(
            Path::new("a.ts"),
            "f(z.object({}).strict()); f(other.object({}))",
        )
        .unwrap();
        let mut results = Vec::new();
        syntax::walk_tree(file.root(), |n| {
            if n.kind() == "call_expression" && file.text(n).starts_with("f(") {
                results.push(is_zod_builder(&file, syntax::call_args(n)[0]));
            }
        });
        assert_eq!(results, vec![true, false]);
    }
}
