use crate::type_resolver::{NoOracle, TypeOracle};
use log::debug;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

/// Description of the leaf that breaks a recursive type.
pub const RECURSIVE_MARKER: &str = "...recursive...";

/// Description of the leaf emitted once a schema has used up its node budget.
pub const TRUNCATED_MARKER: &str = "...truncated...";

/// Nesting bound for named types that keep producing new identities
/// (`type L<T> = { next: L<L<T>> }`).
const MAX_EXPANSION_DEPTH: usize = 64;

/// Schema nodes synthesized for one root type. Shared references are inlined, so a
/// diamond-shaped type graph would otherwise grow exponentially.
const MAX_SCHEMA_NODES: usize = 4096;

/// Type names rendered as binary payloads.
const BINARY_TYPES: &[&str] = &[
    "Blob",
    "File",
    "ArrayBuffer",
    "Uint8Array",
    "ReadableStream",
    "Buffer",
];

static ARRAY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\[\]$").unwrap());
static ARRAY_GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Readonly)?Array<(.+)>$").unwrap());
static STRING_MAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Record<\s*string\s*,\s*(.+)>$").unwrap());
static INLINE_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\{(.*)\}$").unwrap());
static OBJECT_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^(?:readonly\s+)?([A-Za-z_$][\w$]*|'[^']*'|"[^"]*")(\?)?\s*:\s*(.+)$"#)
        .unwrap()
});
static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(?:'[^']*'|"[^"]*")$"#).unwrap());
static NUMBER_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap());

/// Scalar kinds of a primitive schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    Null,
}

impl PrimitiveKind {
    fn type_name(self) -> Option<&'static str> {
        match self {
            PrimitiveKind::String => Some("string"),
            PrimitiveKind::Number => Some("number"),
            PrimitiveKind::Boolean => Some("boolean"),
            PrimitiveKind::Null => None,
        }
    }
}

/// JSON-Schema-like schema tree produced by the synthesizer.
///
/// Serializes to the OpenAPI 3.0 schema object shape (`nullable`, `anyOf`, `additionalProperties`).
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Primitive {
        kind: PrimitiveKind,
        format: Option<String>,
    },
    Nullable(Box<Schema>),
    Array {
        items: Box<Schema>,
    },
    Object {
        properties: BTreeMap<String, Schema>,
        required: BTreeSet<String>,
        /// Value schema of string-keyed maps
        additional_properties: Option<Box<Schema>>,
    },
    Union {
        variants: Vec<Schema>,
    },
    Unparsed {
        description: String,
    },
}

impl Schema {
    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn number() -> Self {
        Self::primitive(PrimitiveKind::Number)
    }

    pub fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean)
    }

    pub fn null() -> Self {
        Self::primitive(PrimitiveKind::Null)
    }

    /// `{type: string, format: binary}`
    pub fn binary() -> Self {
        Schema::Primitive {
            kind: PrimitiveKind::String,
            format: Some("binary".to_string()),
        }
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Schema::Primitive { kind, format: None }
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array {
            items: Box::new(items),
        }
    }

    pub fn object(properties: BTreeMap<String, Schema>, required: BTreeSet<String>) -> Self {
        Schema::Object {
            properties,
            required,
            additional_properties: None,
        }
    }

    pub fn map(values: Schema) -> Self {
        Schema::Object {
            properties: BTreeMap::new(),
            required: BTreeSet::new(),
            additional_properties: Some(Box::new(values)),
        }
    }

    pub fn unparsed(description: impl Into<String>) -> Self {
        Schema::Unparsed {
            description: description.into(),
        }
    }

    /// Marks the schema nullable; already-nullable schemas are returned unchanged.
    pub fn nullable(self) -> Self {
        match self {
            Schema::Nullable(_) => self,
            other => Schema::Nullable(Box::new(other)),
        }
    }

    pub fn is_unparsed(&self) -> bool {
        matches!(self, Schema::Unparsed { .. })
    }
}

#[derive(Serialize, Default)]
struct SchemaObject<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    schema_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nullable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<&'a Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<&'a BTreeMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<&'a BTreeSet<String>>,
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    additional_properties: Option<&'a Schema>,
    #[serde(rename = "anyOf", skip_serializing_if = "Option::is_none")]
    any_of: Option<&'a [Schema]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl<'a> SchemaObject<'a> {
    fn from_schema(schema: &'a Schema) -> Self {
        match schema {
            Schema::Primitive { kind, format } => SchemaObject {
                schema_type: kind.type_name(),
                format: format.as_deref(),
                nullable: (*kind == PrimitiveKind::Null).then_some(true),
                ..Default::default()
            },
            Schema::Nullable(inner) => SchemaObject {
                nullable: Some(true),
                ..SchemaObject::from_schema(inner)
            },
            Schema::Array { items } => SchemaObject {
                schema_type: Some("array"),
                items: Some(items.as_ref()),
                ..Default::default()
            },
            Schema::Object {
                properties,
                required,
                additional_properties,
            } => SchemaObject {
                schema_type: Some("object"),
                properties: (!properties.is_empty()).then_some(properties),
                required: (!required.is_empty()).then_some(required),
                additional_properties: additional_properties.as_deref(),
                ..Default::default()
            },
            Schema::Union { variants } => SchemaObject {
                any_of: Some(variants.as_slice()),
                ..Default::default()
            },
            Schema::Unparsed { description } => SchemaObject {
                description: Some(description.as_str()),
                ..Default::default()
            },
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SchemaObject::from_schema(self).serialize(serializer)
    }
}

/// A type to synthesize a schema from: either an oracle type or raw annotation text.
#[derive(Debug, Clone)]
pub enum TypeInput<T> {
    FromOracle(T),
    FromDisplayText(String),
}

/// Structural classification shared by both input flavors.
enum TypeShape<T> {
    Union(Vec<TypeInput<T>>),
    Null,
    Primitive(PrimitiveKind),
    Binary,
    Array(TypeInput<T>),
    Map(TypeInput<T>),
    Object(Vec<(String, bool, TypeInput<T>)>),
    Unknown(String),
}

/// Bookkeeping of one synthesis run.
#[derive(Debug)]
pub struct Expansion {
    /// Identities of the named types currently being expanded
    expanding: HashSet<String>,
    /// Schema nodes still allowed
    budget: usize,
}

impl Expansion {
    pub fn new() -> Self {
        Self::with_budget(MAX_SCHEMA_NODES)
    }

    pub fn with_budget(budget: usize) -> Self {
        Self {
            expanding: HashSet::new(),
            budget,
        }
    }
}

impl Default for Expansion {
    fn default() -> Self {
        Self::new()
    }
}

/// Schema generator - converts types into [`Schema`] trees through a [`TypeOracle`].
pub struct SchemaGenerator<'o, O: TypeOracle> {
    oracle: &'o O,
}

impl<'o, O: TypeOracle> SchemaGenerator<'o, O> {
    pub fn new(oracle: &'o O) -> Self {
        Self { oracle }
    }

    /// Schema for an oracle type.
    pub fn from_type(&self, ty: &O::Type) -> Schema {
        debug!("Synthesizing schema for {}", self.oracle.display_text(ty));
        self.synthesize(&TypeInput::FromOracle(ty.clone()), &mut Expansion::new())
    }

    /// Schema for a textual type annotation.
    pub fn from_text(&self, text: &str) -> Schema {
        self.synthesize(
            &TypeInput::FromDisplayText(text.to_string()),
            &mut Expansion::new(),
        )
    }

    /// The recursive synthesizer.
    ///
    /// Meeting a named type that is already being expanded yields the recursion marker
    /// instead of another expansion. Every node spends one unit of the run's budget; an
    /// exhausted budget yields the truncation marker.
    pub fn synthesize(&self, input: &TypeInput<O::Type>, run: &mut Expansion) -> Schema {
        if run.budget == 0 {
            return Schema::unparsed(TRUNCATED_MARKER);
        }
        run.budget -= 1;

        let identity = match input {
            TypeInput::FromOracle(ty) => self.oracle.type_identity(ty),
            TypeInput::FromDisplayText(_) => None,
        };
        if let Some(id) = &identity {
            if run.expanding.contains(id) || run.expanding.len() >= MAX_EXPANSION_DEPTH {
                debug!("Recursive type {} cut off", id);
                return Schema::unparsed(RECURSIVE_MARKER);
            }
            run.expanding.insert(id.clone());
        }

        let schema = match self.classify(input) {
            TypeShape::Union(members) => self.union_schema(members, run),
            TypeShape::Null => Schema::null(),
            TypeShape::Primitive(kind) => Schema::primitive(kind),
            TypeShape::Binary => Schema::binary(),
            TypeShape::Array(element) => Schema::array(self.synthesize(&element, run)),
            TypeShape::Map(values) => Schema::map(self.synthesize(&values, run)),
            TypeShape::Object(members) => {
                let mut properties = BTreeMap::new();
                let mut required = BTreeSet::new();
                for (name, optional, ty) in members {
                    let property = self.synthesize(&ty, run);
                    if !optional {
                        required.insert(name.clone());
                    }
                    properties.insert(name, property);
                }
                Schema::object(properties, required)
            }
            TypeShape::Unknown(text) => Schema::unparsed(format!("Unparsed type: {}", text)),
        };

        if let Some(id) = identity {
            run.expanding.remove(&id);
        }
        schema
    }

    fn union_schema(&self, members: Vec<TypeInput<O::Type>>, run: &mut Expansion) -> Schema {
        let mut has_null = false;
        let mut variants: Vec<Schema> = Vec::new();
        for member in members {
            if self.is_null_like(&member) {
                has_null = true;
                continue;
            }
            let schema = self.synthesize(&member, run);
            if !variants.contains(&schema) {
                variants.push(schema);
            }
        }

        let schema = match variants.len() {
            0 => return Schema::null(),
            1 => variants.remove(0),
            _ => Schema::Union { variants },
        };
        if has_null {
            schema.nullable()
        } else {
            schema
        }
    }

    fn is_null_like(&self, input: &TypeInput<O::Type>) -> bool {
        match input {
            TypeInput::FromOracle(ty) => self.oracle.is_null(ty) || self.oracle.is_undefined(ty),
            TypeInput::FromDisplayText(text) => {
                matches!(text.trim(), "null" | "undefined" | "void")
            }
        }
    }

    fn classify(&self, input: &TypeInput<O::Type>) -> TypeShape<O::Type> {
        match input {
            TypeInput::FromOracle(ty) => self.classify_oracle(ty),
            TypeInput::FromDisplayText(text) => classify_text(text),
        }
    }

    fn classify_oracle(&self, ty: &O::Type) -> TypeShape<O::Type> {
        let oracle = self.oracle;
        if let Some(members) = oracle.union_members(ty) {
            return TypeShape::Union(members.into_iter().map(TypeInput::FromOracle).collect());
        }
        if oracle.is_null(ty) || oracle.is_undefined(ty) {
            return TypeShape::Null;
        }
        if oracle.is_string_like(ty) {
            return TypeShape::Primitive(PrimitiveKind::String);
        }
        if oracle.is_number_like(ty) {
            return TypeShape::Primitive(PrimitiveKind::Number);
        }
        if oracle.is_boolean_like(ty) {
            return TypeShape::Primitive(PrimitiveKind::Boolean);
        }
        let display = oracle.display_text(ty);
        if is_binary_type(&display) {
            return TypeShape::Binary;
        }
        if let Some(element) = oracle.array_element_type(ty) {
            return TypeShape::Array(TypeInput::FromOracle(element));
        }
        if let Some(values) = oracle.index_value_type(ty) {
            return TypeShape::Map(TypeInput::FromOracle(values));
        }
        if let Some(props) = oracle.properties(ty) {
            return TypeShape::Object(
                props
                    .into_iter()
                    .map(|p| (p.name, p.optional, TypeInput::FromOracle(p.ty)))
                    .collect(),
            );
        }
        TypeShape::Unknown(display)
    }
}

/// Schema for a textual type annotation without any oracle.
pub fn schema_from_type_text(text: &str) -> Schema {
    SchemaGenerator::new(&NoOracle).from_text(text)
}

fn is_binary_type(display: &str) -> bool {
    let base = display.split('<').next().unwrap_or(display).trim();
    BINARY_TYPES.contains(&base)
}

fn classify_text<T>(text: &str) -> TypeShape<T> {
    let text = strip_outer_parens(text.trim());

    let members = split_top_level(text, &['|']);
    if members.len() > 1 {
        return TypeShape::Union(
            members
                .into_iter()
                .map(|m| TypeInput::FromDisplayText(m.to_string()))
                .collect(),
        );
    }

    match text {
        "null" | "undefined" | "void" => return TypeShape::Null,
        "string" => return TypeShape::Primitive(PrimitiveKind::String),
        "number" | "bigint" => return TypeShape::Primitive(PrimitiveKind::Number),
        "boolean" | "true" | "false" => return TypeShape::Primitive(PrimitiveKind::Boolean),
        _ => {}
    }
    if STRING_LITERAL.is_match(text) {
        return TypeShape::Primitive(PrimitiveKind::String);
    }
    if NUMBER_LITERAL.is_match(text) {
        return TypeShape::Primitive(PrimitiveKind::Number);
    }
    if is_binary_type(text) {
        return TypeShape::Binary;
    }
    if let Some(caps) = ARRAY_SUFFIX.captures(text) {
        return TypeShape::Array(TypeInput::FromDisplayText(caps[1].to_string()));
    }
    if let Some(caps) = ARRAY_GENERIC.captures(text) {
        return TypeShape::Array(TypeInput::FromDisplayText(caps[1].to_string()));
    }
    if let Some(caps) = STRING_MAP.captures(text) {
        return TypeShape::Map(TypeInput::FromDisplayText(caps[1].to_string()));
    }
    if let Some(caps) = INLINE_OBJECT.captures(text) {
        let body = caps.get(1).map_or("", |m| m.as_str());
        let mut members = Vec::new();
        for member in split_top_level(body, &[';', ',', '\n']) {
            let member = member.trim();
            if member.is_empty() {
                continue;
            }
            if let Some(m) = OBJECT_MEMBER.captures(member) {
                let name = m[1].trim_matches(|c| c == '\'' || c == '"').to_string();
                let optional = m.get(2).is_some();
                members.push((name, optional, TypeInput::FromDisplayText(m[3].trim().to_string())));
            }
        }
        return TypeShape::Object(members);
    }

    TypeShape::Unknown(text.to_string())
}

fn strip_outer_parens(text: &str) -> &str {
    let mut current = text;
    while current.starts_with('(') && current.ends_with(')') {
        let inner = &current[1..current.len() - 1];
        // `(a) | (b)` keeps its parentheses
        if !balanced(inner) {
            break;
        }
        current = inner.trim();
    }
    current
}

fn balanced(text: &str) -> bool {
    let mut depth: i32 = 0;
    let mut prev = ' ';
    for c in text.chars() {
        match c {
            '>' if prev == '=' => {}
            '(' | '<' | '{' | '[' => depth += 1,
            ')' | '>' | '}' | ']' => depth -= 1,
            _ => {}
        }
        prev = c;
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

/// Splits on any of `separators` outside brackets and quotes.
fn split_top_level<'t>(text: &'t str, separators: &[char]) -> Vec<&'t str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut prev = ' ';
    for (i, c) in text.char_indices() {
        let before = std::mem::replace(&mut prev, c);
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '>' if before == '=' => {}
            '(' | '<' | '{' | '[' => depth += 1,
            ')' | '>' | '}' | ']' => depth -= 1,
            c if depth == 0 && separators.contains(&c) => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.retain(|p| !p.is_empty());
    if parts.is_empty() {
        parts.push("");
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{AstParser, ParsedFile};
    use crate::syntax;
    use crate::type_resolver::TypeResolver;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    fn annotation_schema(code: &str, var: &str) -> Schema {
        let file: ParsedFile = AstParser::parse_source(Path::new("test.ts"), code).unwrap();
        let resolver = TypeResolver::new(std::slice::from_ref(&file));
        let mut annotation = None;
        syntax::walk_tree(file.root(), |n| {
            if n.kind() == "variable_declarator"
                && n.child_by_field_name("name").map(|x| file.text(x)) == Some(var)
            {
                annotation = n.child_by_field_name("type");
            }
        });
        let ty = resolver.type_of_annotation(&file, annotation.unwrap()).unwrap();
        SchemaGenerator::new(&resolver).from_type(&ty)
    }

    fn to_json(schema: &Schema) -> serde_json::Value {
        serde_json::to_value(schema).unwrap()
    }

    #[test]
    fn test_primitive_rendering() {
        assert_eq!(to_json(&Schema::string()), json!({"type": "string"}));
        assert_eq!(to_json(&Schema::null()), json!({"nullable": true}));
        assert_eq!(
            to_json(&Schema::binary()),
            json!({"type": "string", "format": "binary"})
        );
    }

    #[test]
    fn test_nullable_collapse() {
        let schema = annotation_schema("let x: string | undefined", "x");
        assert_eq!(schema, Schema::string().nullable());
        assert_eq!(to_json(&schema), json!({"type": "string", "nullable": true}));
    }

    #[test]
    fn test_union_with_null_keeps_variants() {
        let schema = annotation_schema("let x: string | number | null", "x");
        assert_eq!(
            to_json(&schema),
            json!({"anyOf": [{"type": "string"}, {"type": "number"}], "nullable": true})
        );
    }

    #[test]
    fn test_union_dedup_by_structure() {
        let schema = annotation_schema("let x: 'a' | 'b' | 'c'", "x");
        assert_eq!(schema, Schema::string());
    }

    #[test]
    fn test_object_with_optional_property() {
        let code = r#"
            interface User { id: number; name: string; nickname?: string; tags: string[] }
            let u: User
        "#;
        let schema = annotation_schema(code, "u");
        assert_eq!(
            to_json(&schema),
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "number"},
                    "name": {"type": "string"},
                    "nickname": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["id", "name", "tags"]
            })
        );
    }

    #[test]
    fn test_recursive_type_terminates() {
        let code = r#"
            interface TreeNode { value: number; children: TreeNode[] }
            let t: TreeNode
        "#;
        let schema = annotation_schema(code, "t");
        assert_eq!(
            to_json(&schema),
            json!({
                "type": "object",
                "properties": {
                    "value": {"type": "number"},
                    "children": {"type": "array", "items": {"description": "...recursive..."}}
                },
                "required": ["children", "value"]
            })
        );
    }

    #[test]
    fn test_mutually_recursive_types_terminate() {
        let code = r#"
            interface Author { name: string; posts: Post[] }
            interface Post { title: string; author: Author }
            let a: Author
        "#;
        let schema = annotation_schema(code, "a");
        let json = to_json(&schema);
        assert_eq!(
            json["properties"]["posts"]["items"]["properties"]["author"],
            json!({"description": "...recursive..."})
        );
    }

    #[test]
    fn test_sibling_references_are_not_recursive() {
        let code = r#"
            interface Point { x: number; y: number }
            interface Line { from: Point; to: Point }
            let l: Line
        "#;
        let json = to_json(&annotation_schema(code, "l"));
        assert_eq!(json["properties"]["from"], json["properties"]["to"]);
        assert_eq!(json["properties"]["to"]["type"], json!("object"));
    }

    #[test]
    fn test_shared_references_stay_within_budget() {
        let mut code = String::new();
        for level in 0..24 {
            let next = level + 1;
            code.push_str(&format!(
                "interface Level{level} {{ a: Level{next}; b: Level{next}; c: Level{next} }}\n"
            ));
        }
        code.push_str("interface Level24 { leaf: string }\nlet root: Level0\n");

        let json = to_json(&annotation_schema(&code, "root"));
        assert_eq!(json["properties"]["a"]["type"], json!("object"));
        assert_eq!(
            json["properties"]["c"],
            json!({"description": TRUNCATED_MARKER})
        );
        assert!(json.to_string().len() < 1_000_000);
    }

    #[test]
    fn test_budget_counts_every_node() {
        let generator = SchemaGenerator::new(&NoOracle);
        let input = TypeInput::FromDisplayText("{ a: string; b: string; c: string }".to_string());
        let schema = generator.synthesize(&input, &mut Expansion::with_budget(3));
        assert_eq!(
            to_json(&schema),
            json!({
                "type": "object",
                "properties": {
                    "a": {"type": "string"},
                    "b": {"type": "string"},
                    "c": {"description": TRUNCATED_MARKER}
                },
                "required": ["a", "b", "c"]
            })
        );
    }

    #[test]
    fn test_binary_and_map_types() {
        let blob = annotation_schema("let b: Blob", "b");
        assert_eq!(blob, Schema::binary());

        let map = annotation_schema("let m: Record<string, boolean>", "m");
        assert_eq!(
            to_json(&map),
            json!({"type": "object", "additionalProperties": {"type": "boolean"}})
        );
    }

    #[test]
    fn test_unparsed_fallback() {
        let schema = annotation_schema("let f: (x: number) => void", "f");
        assert_eq!(
            schema,
            Schema::unparsed("Unparsed type: (x: number) => void")
        );
    }

    #[test]
    fn test_text_primitives_and_arrays() {
        assert_eq!(schema_from_type_text("string"), Schema::string());
        assert_eq!(schema_from_type_text("number[]"), Schema::array(Schema::number()));
        assert_eq!(
            schema_from_type_text("Array<boolean>"),
            Schema::array(Schema::boolean())
        );
        assert_eq!(
            schema_from_type_text("Record<string, number>"),
            Schema::map(Schema::number())
        );
        assert_eq!(
            schema_from_type_text("string | null"),
            Schema::string().nullable()
        );
    }

    #[test]
    fn test_text_inline_object() {
        let schema = schema_from_type_text("{ id: number; name?: string, tags: string[] }");
        assert_eq!(
            to_json(&schema),
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "number"},
                    "name": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["id", "tags"]
            })
        );
    }

    #[test]
    fn test_text_unknown_name() {
        assert_eq!(
            schema_from_type_text("User"),
            Schema::unparsed("Unparsed type: User")
        );
    }

    #[test]
    fn test_split_top_level_respects_brackets() {
        assert_eq!(
            split_top_level("a | Array<b | c> | { x: d | e }", &['|']),
            vec!["a", "Array<b | c>", "{ x: d | e }"]
        );
    }
}
