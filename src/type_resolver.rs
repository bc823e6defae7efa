use crate::parser::ParsedFile;
use crate::syntax::{self, Declaration, LiteralValue};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use tree_sitter::Node;

/// Bound on nested declaration/initializer lookups; deeper chains resolve to "unknown".
const MAX_DEPTH: usize = 32;

/// Array methods whose first callback parameter receives the element type.
const ITERATION_METHODS: &[&str] = &[
    "map", "filter", "find", "findLast", "forEach", "some", "every", "flatMap", "findIndex",
];

/// A property of an object-like type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeProperty<T> {
    /// Property name
    pub name: String,
    /// Whether the declaration carries an optionality marker (`name?: T`)
    pub optional: bool,
    /// Property type
    pub ty: T,
}

/// Semantic type queries the schema synthesizer and the extractors rely on.
///
/// Implementations decide how much of the type system they model; every query is allowed
/// to answer "don't know" (`None` / `false`), which downstream code degrades gracefully.
pub trait TypeOracle {
    /// The oracle's type handle
    type Type: Clone + fmt::Debug;

    /// Type of an expression node.
    fn type_of(&self, file: &ParsedFile, node: Node<'_>) -> Option<Self::Type>;
    /// Type denoted by a type-annotation node (`: User`, `Array<string>`).
    fn type_of_annotation(&self, file: &ParsedFile, node: Node<'_>) -> Option<Self::Type>;

    fn union_members(&self, ty: &Self::Type) -> Option<Vec<Self::Type>>;
    fn is_string_like(&self, ty: &Self::Type) -> bool;
    fn is_number_like(&self, ty: &Self::Type) -> bool;
    fn is_boolean_like(&self, ty: &Self::Type) -> bool;
    fn is_null(&self, ty: &Self::Type) -> bool;
    fn is_undefined(&self, ty: &Self::Type) -> bool;
    fn array_element_type(&self, ty: &Self::Type) -> Option<Self::Type>;
    /// Value type of a string-keyed map such as `Record<string, T>`.
    fn index_value_type(&self, ty: &Self::Type) -> Option<Self::Type>;
    /// Own properties of an object-like type, `None` when the type is not object-like.
    fn properties(&self, ty: &Self::Type) -> Option<Vec<TypeProperty<Self::Type>>>;
    fn literal_numeric_value(&self, ty: &Self::Type) -> Option<f64>;
    fn literal_string_value(&self, ty: &Self::Type) -> Option<String>;
    /// Human-readable type text.
    fn display_text(&self, ty: &Self::Type) -> String;
    /// Stable identity of a named type; anonymous types have none.
    fn type_identity(&self, ty: &Self::Type) -> Option<String>;
}

/// An oracle that knows nothing. Used when only textual type information is available.
pub struct NoOracle;

impl TypeOracle for NoOracle {
    type Type = std::convert::Infallible;

    fn type_of(&self, _file: &ParsedFile, _node: Node<'_>) -> Option<Self::Type> {
        None
    }
    fn type_of_annotation(&self, _file: &ParsedFile, _node: Node<'_>) -> Option<Self::Type> {
        None
    }
    fn union_members(&self, ty: &Self::Type) -> Option<Vec<Self::Type>> {
        match *ty {}
    }
    fn is_string_like(&self, ty: &Self::Type) -> bool {
        match *ty {}
    }
    fn is_number_like(&self, ty: &Self::Type) -> bool {
        match *ty {}
    }
    fn is_boolean_like(&self, ty: &Self::Type) -> bool {
        match *ty {}
    }
    fn is_null(&self, ty: &Self::Type) -> bool {
        match *ty {}
    }
    fn is_undefined(&self, ty: &Self::Type) -> bool {
        match *ty {}
    }
    fn array_element_type(&self, ty: &Self::Type) -> Option<Self::Type> {
        match *ty {}
    }
    fn index_value_type(&self, ty: &Self::Type) -> Option<Self::Type> {
        match *ty {}
    }
    fn properties(&self, ty: &Self::Type) -> Option<Vec<TypeProperty<Self::Type>>> {
        match *ty {}
    }
    fn literal_numeric_value(&self, ty: &Self::Type) -> Option<f64> {
        match *ty {}
    }
    fn literal_string_value(&self, ty: &Self::Type) -> Option<String> {
        match *ty {}
    }
    fn display_text(&self, ty: &Self::Type) -> String {
        match *ty {}
    }
    fn type_identity(&self, ty: &Self::Type) -> Option<String> {
        match *ty {}
    }
}

/// A TypeScript type as far as this crate models it.
#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    String,
    Number,
    Boolean,
    Null,
    Undefined,
    StringLiteral(String),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    Array(Box<TsType>),
    Object(Vec<TypeProperty<TsType>>),
    /// String-keyed map
    Record(Box<TsType>),
    Union(Vec<TsType>),
    Intersection(Vec<TsType>),
    /// Named type, resolved lazily against the declaration index
    Reference { name: String, args: Vec<TsType> },
    /// Anything not modeled; carries the source text
    Opaque(String),
}

impl TsType {
    /// Builds a flattened, de-duplicated union; a single member is returned as is.
    pub fn union(members: impl IntoIterator<Item = TsType>) -> TsType {
        let mut flat: Vec<TsType> = Vec::new();
        for member in members {
            let parts = match member {
                TsType::Union(inner) => inner,
                other => vec![other],
            };
            for part in parts {
                if !flat.contains(&part) {
                    flat.push(part);
                }
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            TsType::Union(flat)
        }
    }

    fn reference(name: &str) -> TsType {
        TsType::Reference {
            name: name.to_string(),
            args: Vec::new(),
        }
    }
}

impl fmt::Display for TsType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TsType::String => write!(f, "string"),
            TsType::Number => write!(f, "number"),
            TsType::Boolean => write!(f, "boolean"),
            TsType::Null => write!(f, "null"),
            TsType::Undefined => write!(f, "undefined"),
            TsType::StringLiteral(s) => write!(f, "\"{}\"", s),
            TsType::NumberLiteral(n) => write!(f, "{}", n),
            TsType::BooleanLiteral(b) => write!(f, "{}", b),
            TsType::Array(inner) => match inner.as_ref() {
                TsType::Union(_) | TsType::Intersection(_) => write!(f, "({})[]", inner),
                _ => write!(f, "{}[]", inner),
            },
            TsType::Object(props) => {
                if props.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, prop) in props.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    let marker = if prop.optional { "?" } else { "" };
                    write!(f, "{}{}: {}", prop.name, marker, prop.ty)?;
                }
                write!(f, " }}")
            }
            TsType::Record(value) => write!(f, "Record<string, {}>", value),
            TsType::Union(members) => write_joined(f, members, " | "),
            TsType::Intersection(members) => write_joined(f, members, " & "),
            TsType::Reference { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    write_joined(f, args, ", ")?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            TsType::Opaque(text) => write!(f, "{}", text),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter, items: &[TsType], separator: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// An indexed `interface` or `type` alias declaration.
#[derive(Debug, Clone)]
struct TypeDeclaration {
    params: Vec<String>,
    defaults: Vec<Option<TsType>>,
    body: TsType,
    extends: Vec<TsType>,
}

/// Syntactic type resolver - a lossy [`TypeOracle`] built from declarations in the parsed files.
///
/// It is not a type checker: it recognizes the shapes that show up in route handlers
/// (literals, annotated locals, interfaces, aliases, enums and a table of well-known calls)
/// and answers "unknown" for everything else.
pub struct TypeResolver {
    /// `interface` and `type` declarations by name (first declaration wins)
    declarations: HashMap<String, TypeDeclaration>,
    /// Enum members by enum name
    enums: HashMap<String, Vec<(String, LiteralValue)>>,
}

impl TypeResolver {
    /// Indexes every type declaration in `parsed_files`.
    pub fn new(parsed_files: &[ParsedFile]) -> Self {
        debug!("Initializing TypeResolver with {} files", parsed_files.len());

        let mut resolver = Self {
            declarations: HashMap::new(),
            enums: HashMap::new(),
        };

        for file in parsed_files {
            syntax::walk_tree(file.root(), |node| match node.kind() {
                "interface_declaration" | "type_alias_declaration" => {
                    resolver.index_declaration(file, node);
                }
                "enum_declaration" => {
                    if let Some(name) = node.child_by_field_name("name") {
                        resolver
                            .enums
                            .entry(file.text(name).to_string())
                            .or_insert_with(|| syntax::enum_members(file, node));
                    }
                }
                _ => {}
            });
        }

        debug!(
            "Indexed {} type declarations and {} enums",
            resolver.declarations.len(),
            resolver.enums.len()
        );
        resolver
    }

    fn index_declaration(&mut self, file: &ParsedFile, node: Node<'_>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let name = file.text(name).to_string();
        if self.declarations.contains_key(&name) {
            debug!("Type {} declared more than once, keeping the first", name);
            return;
        }

        let (params, defaults) = node
            .child_by_field_name("type_parameters")
            .map(|tp| type_parameters(file, tp))
            .unwrap_or_default();

        let (body, extends) = if node.kind() == "interface_declaration" {
            let body = node
                .child_by_field_name("body")
                .map(|b| type_from_node(file, b))
                .unwrap_or(TsType::Object(Vec::new()));
            let mut extends = Vec::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "extends_type_clause" {
                    let mut inner = child.walk();
                    extends.extend(
                        child
                            .named_children(&mut inner)
                            .map(|t| type_from_node(file, t)),
                    );
                }
            }
            (body, extends)
        } else {
            let body = node
                .child_by_field_name("value")
                .map(|v| type_from_node(file, v))
                .unwrap_or_else(|| TsType::Opaque("unknown".to_string()));
            (body, Vec::new())
        };

        debug!("Indexed type declaration {} from {}", name, file.path.display());
        self.declarations.insert(
            name,
            TypeDeclaration {
                params,
                defaults,
                body,
                extends,
            },
        );
    }

    /// Follows named references until a structural type (or an unresolvable name) is reached.
    pub fn expand(&self, ty: &TsType) -> TsType {
        let mut current = ty.clone();
        for _ in 0..MAX_DEPTH {
            match &current {
                TsType::Reference { name, args } => match self.resolve_reference(name, args) {
                    Some(next) => current = next,
                    None => return current,
                },
                _ => return current,
            }
        }
        current
    }

    fn resolve_reference(&self, name: &str, args: &[TsType]) -> Option<TsType> {
        if let Some(members) = self.enums.get(name) {
            return Some(TsType::union(members.iter().map(|(_, v)| literal_type(v))));
        }

        if let Some(decl) = self.declarations.get(name) {
            let bindings: HashMap<&str, TsType> = decl
                .params
                .iter()
                .enumerate()
                .map(|(i, param)| {
                    let bound = args
                        .get(i)
                        .cloned()
                        .or_else(|| decl.defaults.get(i).cloned().flatten())
                        .unwrap_or_else(|| TsType::Opaque("unknown".to_string()));
                    (param.as_str(), bound)
                })
                .collect();

            let body = substitute(&decl.body, &bindings);
            if decl.extends.is_empty() {
                return Some(body);
            }
            let mut parts: Vec<TsType> =
                decl.extends.iter().map(|e| substitute(e, &bindings)).collect();
            parts.push(body);
            return Some(TsType::Intersection(parts));
        }

        match (name, args) {
            ("Partial", [inner]) => self
                .object_properties(inner, 0)
                .map(|props| TsType::Object(set_optional(props, true))),
            ("Required", [inner]) => self
                .object_properties(inner, 0)
                .map(|props| TsType::Object(set_optional(props, false))),
            _ => None,
        }
    }

    fn object_properties(&self, ty: &TsType, depth: usize) -> Option<Vec<TypeProperty<TsType>>> {
        if depth > MAX_DEPTH {
            return None;
        }
        match self.expand(ty) {
            TsType::Object(props) => Some(props),
            TsType::Intersection(parts) => {
                let mut merged: Vec<TypeProperty<TsType>> = Vec::new();
                let mut any_object = false;
                for part in &parts {
                    if let Some(props) = self.object_properties(part, depth + 1) {
                        any_object = true;
                        for prop in props {
                            upsert_property(&mut merged, prop);
                        }
                    }
                }
                any_object.then_some(merged)
            }
            _ => None,
        }
    }

    fn every_member(&self, ty: &TsType, depth: usize, pred: &dyn Fn(&TsType) -> bool) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        match self.expand(ty) {
            TsType::Union(members) => {
                !members.is_empty() && members.iter().all(|m| self.every_member(m, depth + 1, pred))
            }
            other => pred(&other),
        }
    }

    /// Type of an expression, bounded by `depth`.
    fn expr_type(&self, file: &ParsedFile, node: Node<'_>, depth: usize) -> Option<TsType> {
        if depth > MAX_DEPTH {
            return None;
        }
        let text = file.text(node);
        match node.kind() {
            "string" => syntax::string_value(file, node).map(TsType::StringLiteral),
            "template_string" => Some(TsType::String),
            "number" => syntax::number_value(file, node).map(TsType::NumberLiteral),
            "true" => Some(TsType::BooleanLiteral(true)),
            "false" => Some(TsType::BooleanLiteral(false)),
            "null" => Some(TsType::Null),
            "undefined" => Some(TsType::Undefined),
            "regex" => Some(TsType::reference("RegExp")),
            "identifier" => {
                if text == "undefined" {
                    return Some(TsType::Undefined);
                }
                let decl = syntax::find_declaration(file, node, text)?;
                self.declaration_type(file, decl, depth + 1)
            }
            "object" => Some(self.object_literal_type(file, node, depth)),
            "array" => {
                let mut cursor = node.walk();
                let elements: Vec<TsType> = node
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment")
                    .filter_map(|n| match n.kind() {
                        "spread_element" => n
                            .named_child(0)
                            .and_then(|inner| self.expr_type(file, inner, depth + 1))
                            .and_then(|t| self.array_element(&t)),
                        _ => self.expr_type(file, n, depth + 1),
                    })
                    .map(widen_literal)
                    .collect();
                if elements.is_empty() {
                    Some(TsType::Array(Box::new(TsType::Opaque("unknown".to_string()))))
                } else {
                    Some(TsType::Array(Box::new(TsType::union(elements))))
                }
            }
            "await_expression"
            | "parenthesized_expression"
            | "non_null_expression"
            | "satisfies_expression" => {
                let inner = node.named_child(0)?;
                self.expr_type(file, inner, depth + 1)
            }
            "as_expression" => {
                let expr = node.named_child(0)?;
                match node.named_child(1) {
                    Some(ty) if file.text(ty) != "const" => Some(type_from_node(file, ty)),
                    _ => self.expr_type(file, expr, depth + 1),
                }
            }
            "ternary_expression" => {
                let consequence = node.child_by_field_name("consequence")?;
                let alternative = node.child_by_field_name("alternative")?;
                let types: Vec<TsType> = [consequence, alternative]
                    .iter()
                    .filter_map(|n| self.expr_type(file, *n, depth + 1))
                    .collect();
                (!types.is_empty()).then(|| TsType::union(types))
            }
            "binary_expression" => self.binary_type(file, node, depth),
            "unary_expression" => {
                let operator = node.child_by_field_name("operator")?;
                match file.text(operator) {
                    "!" | "delete" => Some(TsType::Boolean),
                    "typeof" => Some(TsType::String),
                    "void" => Some(TsType::Undefined),
                    _ => match syntax::literal_value(file, node) {
                        Some(LiteralValue::Number(n)) => Some(TsType::NumberLiteral(n)),
                        _ => Some(TsType::Number),
                    },
                }
            }
            "update_expression" => Some(TsType::Number),
            "member_expression" => self.member_type(file, node, depth),
            "subscript_expression" => {
                let object = node.child_by_field_name("object")?;
                let index = node.child_by_field_name("index")?;
                let object_type = self.expr_type(file, object, depth + 1)?;
                if let Some(key) = syntax::string_value(file, index) {
                    if let Some(prop) = self.property_type(&object_type, &key) {
                        return Some(prop);
                    }
                }
                self.array_element(&object_type)
                    .or_else(|| self.record_value(&object_type))
            }
            "new_expression" => {
                let constructor = node.child_by_field_name("constructor")?;
                let args = node
                    .child_by_field_name("type_arguments")
                    .map(|ta| {
                        let mut cursor = ta.walk();
                        let converted: Vec<TsType> = ta
                            .named_children(&mut cursor)
                            .map(|t| type_from_node(file, t))
                            .collect();
                        converted
                    })
                    .unwrap_or_default();
                Some(TsType::Reference {
                    name: file.text(constructor).to_string(),
                    args,
                })
            }
            "call_expression" => self.call_type(file, node, depth),
            "arrow_function" | "function_expression" | "function" => {
                Some(TsType::Opaque("function".to_string()))
            }
            "jsx_element" | "jsx_self_closing_element" | "jsx_fragment" => {
                Some(TsType::reference("JSX.Element"))
            }
            _ => None,
        }
    }

    fn declaration_type(
        &self,
        file: &ParsedFile,
        decl: Declaration<'_>,
        depth: usize,
    ) -> Option<TsType> {
        match decl {
            Declaration::Variable(declarator) => {
                if let Some(annotation) = declarator.child_by_field_name("type") {
                    return Some(type_from_node(file, annotation));
                }
                let value = declarator.child_by_field_name("value")?;
                self.expr_type(file, value, depth + 1)
            }
            Declaration::Function(_) => Some(TsType::Opaque("function".to_string())),
            Declaration::Parameter { param, function, index } => {
                if let Some(annotation) = param.child_by_field_name("type") {
                    return Some(type_from_node(file, annotation));
                }
                self.callback_parameter_type(file, function, index, depth)
            }
        }
    }

    /// Element type for `xs.map(x => ...)` style callback parameters.
    fn callback_parameter_type(
        &self,
        file: &ParsedFile,
        function: Node<'_>,
        index: usize,
        depth: usize,
    ) -> Option<TsType> {
        if index != 0 {
            return None;
        }
        let call = function.parent().filter(|p| p.kind() == "arguments")?.parent()?;
        let (receiver, method) = syntax::method_call(file, call)?;
        if !ITERATION_METHODS.contains(&method.as_str()) {
            return None;
        }
        let receiver_type = self.expr_type(file, receiver, depth + 1)?;
        self.array_element(&receiver_type)
    }

    fn object_literal_type(&self, file: &ParsedFile, node: Node<'_>, depth: usize) -> TsType {
        let mut props: Vec<TypeProperty<TsType>> = Vec::new();

        let mut cursor = node.walk();
        for member in node.named_children(&mut cursor) {
            match member.kind() {
                "pair" => {
                    let Some(name) = member
                        .child_by_field_name("key")
                        .and_then(|k| syntax::property_name(file, k))
                    else {
                        continue;
                    };
                    let ty = member
                        .child_by_field_name("value")
                        .and_then(|v| self.expr_type(file, v, depth + 1))
                        .unwrap_or_else(|| TsType::Opaque("unknown".to_string()));
                    upsert_property(&mut props, TypeProperty { name, optional: false, ty });
                }
                "shorthand_property_identifier" => {
                    let name = file.text(member).to_string();
                    let ty = syntax::find_declaration(file, member, &name)
                        .and_then(|d| self.declaration_type(file, d, depth + 1))
                        .unwrap_or_else(|| TsType::Opaque("unknown".to_string()));
                    upsert_property(&mut props, TypeProperty { name, optional: false, ty });
                }
                "spread_element" => {
                    let spread = member
                        .named_child(0)
                        .and_then(|inner| self.expr_type(file, inner, depth + 1))
                        .and_then(|t| self.object_properties(&t, depth + 1));
                    for prop in spread.unwrap_or_default() {
                        upsert_property(&mut props, prop);
                    }
                }
                _ => {}
            }
        }
        TsType::Object(props)
    }

    fn binary_type(&self, file: &ParsedFile, node: Node<'_>, depth: usize) -> Option<TsType> {
        let operator = node.child_by_field_name("operator")?;
        let left = node.child_by_field_name("left")?;
        let right = node.child_by_field_name("right")?;
        match file.text(operator) {
            "+" => {
                let l = self.expr_type(file, left, depth + 1);
                let r = self.expr_type(file, right, depth + 1);
                let stringy =
                    |t: &Option<TsType>| t.as_ref().is_some_and(|t| self.is_string_like(t));
                if stringy(&l) || stringy(&r) {
                    Some(TsType::String)
                } else {
                    Some(TsType::Number)
                }
            }
            "-" | "*" | "/" | "%" | "**" | "&" | "|" | "^" | "<<" | ">>" | ">>>" => {
                Some(TsType::Number)
            }
            "==" | "===" | "!=" | "!==" | "<" | "<=" | ">" | ">=" | "instanceof" | "in" => {
                Some(TsType::Boolean)
            }
            "&&" => self.expr_type(file, right, depth + 1),
            "||" | "??" => {
                let l = self
                    .expr_type(file, left, depth + 1)
                    .map(|t| self.strip_nullish(&t));
                let r = self.expr_type(file, right, depth + 1);
                match (l, r) {
                    (Some(l), Some(r)) => Some(TsType::union([l, r])),
                    (l, r) => l.or(r),
                }
            }
            _ => None,
        }
    }

    fn member_type(&self, file: &ParsedFile, node: Node<'_>, depth: usize) -> Option<TsType> {
        let object = node.child_by_field_name("object")?;
        let property = file.text(node.child_by_field_name("property")?);

        if object.kind() == "identifier" {
            if let Some(members) = self.enums.get(file.text(object)) {
                if let Some((_, value)) = members.iter().find(|(name, _)| name == property) {
                    return Some(literal_type(value));
                }
            }
        }

        let object_type = self.expr_type(file, object, depth + 1)?;
        if property == "length" {
            let expanded = self.expand(&object_type);
            if matches!(expanded, TsType::Array(_)) || self.is_string_like(&expanded) {
                return Some(TsType::Number);
            }
        }
        self.property_type(&object_type, property)
            .or_else(|| self.record_value(&object_type))
    }

    fn property_type(&self, ty: &TsType, name: &str) -> Option<TsType> {
        let props = self.object_properties(ty, 0)?;
        let prop = props.into_iter().find(|p| p.name == name)?;
        if prop.optional {
            Some(TsType::union([prop.ty, TsType::Undefined]))
        } else {
            Some(prop.ty)
        }
    }

    fn call_type(&self, file: &ParsedFile, node: Node<'_>, depth: usize) -> Option<TsType> {
        let callee = node.child_by_field_name("function")?;
        let args = syntax::call_args(node);

        if callee.kind() == "identifier" {
            return match file.text(callee) {
                "String" | "encodeURIComponent" | "decodeURIComponent" => Some(TsType::String),
                "Number" | "parseInt" | "parseFloat" => Some(TsType::Number),
                "Boolean" | "isNaN" | "isFinite" => Some(TsType::Boolean),
                _ => {
                    let function = syntax::resolve_function(file, callee)?;
                    self.function_return_type(file, function, depth + 1)
                }
            };
        }

        if syntax::is_function_like(syntax::unwrap_expression(callee)) {
            return self.function_return_type(file, syntax::unwrap_expression(callee), depth + 1);
        }

        let (receiver, method) = syntax::method_call(file, node)?;
        let chain = syntax::member_chain(file, receiver);

        if let Some(chain) = &chain {
            if chain.len() >= 2 && chain.last().map(String::as_str) == Some("req") {
                return request_method_type(file, node, &method, !args.is_empty());
            }
            if chain.len() == 1 {
                match (chain[0].as_str(), method.as_str()) {
                    ("JSON", "stringify") => return Some(TsType::String),
                    ("JSON", "parse") => return Some(TsType::Opaque("any".to_string())),
                    ("Date", "now") | ("Math", _) => return Some(TsType::Number),
                    ("Object", "keys") => return Some(TsType::Array(Box::new(TsType::String))),
                    ("Array", "isArray") => return Some(TsType::Boolean),
                    ("Number", m) if m.starts_with("parse") => return Some(TsType::Number),
                    ("Number", m) if m.starts_with("is") => return Some(TsType::Boolean),
                    ("crypto", "randomUUID") => return Some(TsType::String),
                    _ => {}
                }
            }
        }

        if matches!(
            method.as_str(),
            "toString" | "toFixed" | "toISOString" | "toJSON" | "toLocaleString"
        ) {
            return Some(TsType::String);
        }

        let receiver_type = self.expr_type(file, receiver, depth + 1)?;
        let expanded = self.expand(&receiver_type);

        if self.is_string_like(&expanded) {
            return match method.as_str() {
                "split" => Some(TsType::Array(Box::new(TsType::String))),
                "includes" | "startsWith" | "endsWith" => Some(TsType::Boolean),
                "indexOf" | "lastIndexOf" | "charCodeAt" | "localeCompare" => Some(TsType::Number),
                _ => Some(TsType::String),
            };
        }

        if let TsType::Array(element) = &expanded {
            return match method.as_str() {
                "join" => Some(TsType::String),
                "map" | "flatMap" => {
                    let mapped = args
                        .first()
                        .and_then(|cb| syntax::resolve_function(file, *cb))
                        .and_then(|cb| self.function_return_type(file, cb, depth + 1))
                        .unwrap_or_else(|| TsType::Opaque("unknown".to_string()));
                    let mapped = match (method.as_str(), &mapped) {
                        ("flatMap", TsType::Array(inner)) => inner.as_ref().clone(),
                        _ => mapped,
                    };
                    Some(TsType::Array(Box::new(mapped)))
                }
                "filter" | "slice" | "concat" | "reverse" | "sort" | "toSorted" | "toReversed" => {
                    Some(expanded.clone())
                }
                "find" | "findLast" | "at" | "pop" | "shift" => {
                    Some(TsType::union([element.as_ref().clone(), TsType::Undefined]))
                }
                "includes" | "some" | "every" => Some(TsType::Boolean),
                "indexOf" | "findIndex" | "push" | "unshift" => Some(TsType::Number),
                _ => None,
            };
        }

        // Routing calls return the router, so chained registrations keep the receiver type.
        if is_router_type(&receiver_type.to_string()) {
            return Some(receiver_type);
        }

        None
    }

    fn function_return_type(
        &self,
        file: &ParsedFile,
        function: Node<'_>,
        depth: usize,
    ) -> Option<TsType> {
        if depth > MAX_DEPTH {
            return None;
        }
        if let Some(annotation) = function.child_by_field_name("return_type") {
            return Some(type_from_node(file, annotation));
        }
        let body = function.child_by_field_name("body")?;
        if body.kind() != "statement_block" {
            return self.expr_type(file, body, depth + 1);
        }

        let mut returned = Vec::new();
        syntax::walk_tree(body, |n| {
            if n.kind() == "return_statement"
                && enclosing_function(n).map(|f| f.id()) == Some(function.id())
            {
                if let Some(value) = n.named_child(0) {
                    returned.push(value);
                }
            }
        });
        let types: Vec<TsType> = returned
            .into_iter()
            .filter_map(|value| self.expr_type(file, value, depth + 1))
            .collect();
        (!types.is_empty()).then(|| TsType::union(types))
    }

    fn array_element(&self, ty: &TsType) -> Option<TsType> {
        match self.expand(ty) {
            TsType::Array(element) => Some(*element),
            _ => None,
        }
    }

    fn record_value(&self, ty: &TsType) -> Option<TsType> {
        match self.expand(ty) {
            TsType::Record(value) => Some(*value),
            _ => None,
        }
    }

    fn strip_nullish(&self, ty: &TsType) -> TsType {
        match self.expand(ty) {
            TsType::Union(members) => TsType::union(
                members
                    .into_iter()
                    .filter(|m| !matches!(m, TsType::Null | TsType::Undefined)),
            ),
            _ => ty.clone(),
        }
    }
}

impl TypeOracle for TypeResolver {
    type Type = TsType;

    fn type_of(&self, file: &ParsedFile, node: Node<'_>) -> Option<TsType> {
        self.expr_type(file, node, 0)
    }

    fn type_of_annotation(&self, file: &ParsedFile, node: Node<'_>) -> Option<TsType> {
        Some(type_from_node(file, node))
    }

    fn union_members(&self, ty: &TsType) -> Option<Vec<TsType>> {
        match self.expand(ty) {
            TsType::Union(members) => Some(members),
            _ => None,
        }
    }

    fn is_string_like(&self, ty: &TsType) -> bool {
        self.every_member(ty, 0, &|t| matches!(t, TsType::String | TsType::StringLiteral(_)))
    }

    fn is_number_like(&self, ty: &TsType) -> bool {
        self.every_member(ty, 0, &|t| matches!(t, TsType::Number | TsType::NumberLiteral(_)))
    }

    fn is_boolean_like(&self, ty: &TsType) -> bool {
        self.every_member(ty, 0, &|t| matches!(t, TsType::Boolean | TsType::BooleanLiteral(_)))
    }

    fn is_null(&self, ty: &TsType) -> bool {
        matches!(self.expand(ty), TsType::Null)
    }

    fn is_undefined(&self, ty: &TsType) -> bool {
        matches!(self.expand(ty), TsType::Undefined)
    }

    fn array_element_type(&self, ty: &TsType) -> Option<TsType> {
        self.array_element(ty)
    }

    fn index_value_type(&self, ty: &TsType) -> Option<TsType> {
        self.record_value(ty)
    }

    fn properties(&self, ty: &TsType) -> Option<Vec<TypeProperty<TsType>>> {
        self.object_properties(ty, 0)
    }

    fn literal_numeric_value(&self, ty: &TsType) -> Option<f64> {
        match self.expand(ty) {
            TsType::NumberLiteral(n) => Some(n),
            _ => None,
        }
    }

    fn literal_string_value(&self, ty: &TsType) -> Option<String> {
        match self.expand(ty) {
            TsType::StringLiteral(s) => Some(s),
            _ => None,
        }
    }

    fn display_text(&self, ty: &TsType) -> String {
        ty.to_string()
    }

    fn type_identity(&self, ty: &TsType) -> Option<String> {
        match ty {
            TsType::Reference { .. } => Some(ty.to_string()),
            _ => None,
        }
    }
}

/// Whether a type's display text names the Hono router (`Hono`, `Hono<Env>`, `OpenAPIHono`).
pub fn is_router_type(display: &str) -> bool {
    let base = display.split('<').next().unwrap_or(display).trim();
    base.ends_with("Hono")
}

fn request_method_type(
    file: &ParsedFile,
    call: Node<'_>,
    method: &str,
    has_args: bool,
) -> Option<TsType> {
    let string_map = || TsType::Record(Box::new(TsType::String));
    match method {
        "param" if has_args => Some(TsType::String),
        "param" => Some(string_map()),
        "query" | "header" if has_args => Some(TsType::union([TsType::String, TsType::Undefined])),
        "query" | "header" => Some(string_map()),
        "queries" if has_args => Some(TsType::union([
            TsType::Array(Box::new(TsType::String)),
            TsType::Undefined,
        ])),
        "queries" => Some(TsType::Record(Box::new(TsType::Array(Box::new(TsType::String))))),
        "json" => Some(
            syntax::first_type_argument(call)
                .map(|t| type_from_node(file, t))
                .unwrap_or_else(|| TsType::Opaque("any".to_string())),
        ),
        "text" => Some(TsType::String),
        "parseBody" => Some(TsType::Record(Box::new(TsType::union([
            TsType::String,
            TsType::reference("File"),
        ])))),
        "arrayBuffer" => Some(TsType::reference("ArrayBuffer")),
        "blob" => Some(TsType::reference("Blob")),
        "formData" => Some(TsType::reference("FormData")),
        _ => None,
    }
}

fn enclosing_function(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if syntax::is_function_like(n) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

fn literal_type(value: &LiteralValue) -> TsType {
    match value {
        LiteralValue::Number(n) => TsType::NumberLiteral(*n),
        LiteralValue::String(s) => TsType::StringLiteral(s.clone()),
    }
}

/// Literal element types of array literals widen to their primitive (`[1, 2]` is `number[]`).
fn widen_literal(ty: TsType) -> TsType {
    match ty {
        TsType::StringLiteral(_) => TsType::String,
        TsType::NumberLiteral(_) => TsType::Number,
        TsType::BooleanLiteral(_) => TsType::Boolean,
        other => other,
    }
}

/// Later properties replace earlier ones of the same name.
fn upsert_property(props: &mut Vec<TypeProperty<TsType>>, prop: TypeProperty<TsType>) {
    props.retain(|p| p.name != prop.name);
    props.push(prop);
}

fn set_optional(props: Vec<TypeProperty<TsType>>, optional: bool) -> Vec<TypeProperty<TsType>> {
    props
        .into_iter()
        .map(|p| TypeProperty { optional, ..p })
        .collect()
}

fn substitute(ty: &TsType, bindings: &HashMap<&str, TsType>) -> TsType {
    if bindings.is_empty() {
        return ty.clone();
    }
    match ty {
        TsType::Reference { name, args } if args.is_empty() => {
            bindings.get(name.as_str()).cloned().unwrap_or_else(|| ty.clone())
        }
        TsType::Reference { name, args } => TsType::Reference {
            name: name.clone(),
            args: args.iter().map(|a| substitute(a, bindings)).collect(),
        },
        TsType::Array(inner) => TsType::Array(Box::new(substitute(inner, bindings))),
        TsType::Record(inner) => TsType::Record(Box::new(substitute(inner, bindings))),
        TsType::Union(members) => TsType::union(members.iter().map(|m| substitute(m, bindings))),
        TsType::Intersection(members) => {
            TsType::Intersection(members.iter().map(|m| substitute(m, bindings)).collect())
        }
        TsType::Object(props) => TsType::Object(
            props
                .iter()
                .map(|p| TypeProperty {
                    name: p.name.clone(),
                    optional: p.optional,
                    ty: substitute(&p.ty, bindings),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn type_parameters(file: &ParsedFile, node: Node<'_>) -> (Vec<String>, Vec<Option<TsType>>) {
    let mut params = Vec::new();
    let mut defaults = Vec::new();
    let mut cursor = node.walk();
    for param in node.named_children(&mut cursor) {
        if param.kind() != "type_parameter" {
            continue;
        }
        let Some(name) = param.child_by_field_name("name") else {
            continue;
        };
        params.push(file.text(name).to_string());
        defaults.push(
            param
                .child_by_field_name("value")
                .map(|v| type_from_node(file, v)),
        );
    }
    (params, defaults)
}

/// Converts a type node (or a `type_annotation` wrapping one) into a [`TsType`].
pub fn type_from_node(file: &ParsedFile, node: Node<'_>) -> TsType {
    let text = file.text(node).trim();
    match node.kind() {
        "type_annotation"
        | "omitting_type_annotation"
        | "adding_type_annotation"
        | "opting_type_annotation"
        | "parenthesized_type"
        | "readonly_type"
        | "optional_type"
        | "rest_type" => match first_named_type(node) {
            Some(inner) => type_from_node(file, inner),
            None => TsType::Opaque(text.to_string()),
        },
        "predefined_type" => predefined_type(text),
        "literal_type" => match first_named_type(node) {
            Some(lit) => match lit.kind() {
                "string" => syntax::string_value(file, lit)
                    .map(TsType::StringLiteral)
                    .unwrap_or(TsType::String),
                "number" | "unary_expression" => match syntax::literal_value(file, lit) {
                    Some(LiteralValue::Number(n)) => TsType::NumberLiteral(n),
                    _ => TsType::Number,
                },
                "true" => TsType::BooleanLiteral(true),
                "false" => TsType::BooleanLiteral(false),
                "null" => TsType::Null,
                "undefined" => TsType::Undefined,
                _ => TsType::Opaque(text.to_string()),
            },
            None => predefined_type(text),
        },
        "template_literal_type" => TsType::String,
        "type_identifier" | "nested_type_identifier" | "identifier" => named_type(text, Vec::new()),
        "generic_type" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| file.text(n))
                .unwrap_or(text);
            let args = node
                .child_by_field_name("type_arguments")
                .map(|ta| {
                    let mut cursor = ta.walk();
                    let converted: Vec<TsType> = ta
                        .named_children(&mut cursor)
                        .filter(|n| n.kind() != "comment")
                        .map(|t| type_from_node(file, t))
                        .collect();
                    converted
                })
                .unwrap_or_default();
            named_type(name, args)
        }
        "array_type" => match first_named_type(node) {
            Some(element) => TsType::Array(Box::new(type_from_node(file, element))),
            None => TsType::Opaque(text.to_string()),
        },
        "tuple_type" => {
            let mut cursor = node.walk();
            let elements: Vec<TsType> = node
                .named_children(&mut cursor)
                .filter(|n| n.kind() != "comment")
                .map(|n| match n.kind() {
                    "named_tuple_member" => n
                        .child_by_field_name("type")
                        .map(|t| type_from_node(file, t))
                        .unwrap_or_else(|| TsType::Opaque(file.text(n).to_string())),
                    "rest_type" => match type_from_node(file, n) {
                        TsType::Array(inner) => *inner,
                        other => other,
                    },
                    _ => type_from_node(file, n),
                })
                .collect();
            TsType::Array(Box::new(TsType::union(elements)))
        }
        "union_type" => {
            let mut cursor = node.walk();
            let members: Vec<TsType> = node
                .named_children(&mut cursor)
                .filter(|n| n.kind() != "comment")
                .map(|n| type_from_node(file, n))
                .collect();
            TsType::union(members)
        }
        "intersection_type" => {
            let mut cursor = node.walk();
            let members: Vec<TsType> = node
                .named_children(&mut cursor)
                .filter(|n| n.kind() != "comment")
                .map(|n| type_from_node(file, n))
                .collect();
            TsType::Intersection(members)
        }
        "object_type" | "interface_body" => object_type(file, node),
        _ => match text {
            "null" => TsType::Null,
            "undefined" => TsType::Undefined,
            _ => TsType::Opaque(text.to_string()),
        },
    }
}

fn first_named_type(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let first = node
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    first
}

fn predefined_type(text: &str) -> TsType {
    match text {
        "string" => TsType::String,
        "number" | "bigint" => TsType::Number,
        "boolean" => TsType::Boolean,
        "void" | "undefined" => TsType::Undefined,
        "null" => TsType::Null,
        other => TsType::Opaque(other.to_string()),
    }
}

fn named_type(name: &str, mut args: Vec<TsType>) -> TsType {
    match (name, args.len()) {
        ("Array" | "ReadonlyArray" | "Set", 1) => TsType::Array(Box::new(args.remove(0))),
        ("Promise" | "Readonly" | "Awaited", 1) => args.remove(0),
        ("Record", 2) => TsType::Record(Box::new(args.remove(1))),
        ("undefined" | "void", 0) => TsType::Undefined,
        ("null", 0) => TsType::Null,
        ("String", 0) => TsType::String,
        ("Number", 0) => TsType::Number,
        ("Boolean", 0) => TsType::Boolean,
        _ => TsType::Reference {
            name: name.to_string(),
            args,
        },
    }
}

fn object_type(file: &ParsedFile, node: Node<'_>) -> TsType {
    let mut props = Vec::new();
    let mut index_value = None;

    let mut cursor = node.walk();
    for member in node.named_children(&mut cursor) {
        match member.kind() {
            "property_signature" => {
                let Some(name) = member
                    .child_by_field_name("name")
                    .and_then(|n| syntax::property_name(file, n))
                else {
                    continue;
                };
                let mut inner = member.walk();
                let optional = member.children(&mut inner).any(|c| c.kind() == "?");
                let ty = member
                    .child_by_field_name("type")
                    .map(|t| type_from_node(file, t))
                    .unwrap_or_else(|| TsType::Opaque("any".to_string()));
                props.push(TypeProperty { name, optional, ty });
            }
            "index_signature" => {
                index_value = member
                    .child_by_field_name("type")
                    .map(|t| type_from_node(file, t));
            }
            _ => {}
        }
    }

    match index_value {
        Some(value) if props.is_empty() => TsType::Record(Box::new(value)),
        _ => TsType::Object(props),
    }
}
