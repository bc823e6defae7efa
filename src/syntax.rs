//! Small helpers over the tree-sitter TypeScript tree.
//!
//! Every recognizer in the crate works on raw tree-sitter nodes; the functions here keep
//! the node-kind spelling of the grammar in one place.

use crate::parser::ParsedFile;
use tree_sitter::Node;

/// Node kinds that introduce a function scope.
const FUNCTION_KINDS: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
    "function_declaration",
    "generator_function_declaration",
    "method_definition",
];

/// A constant value recovered from source without evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    String(String),
}

/// Where an identifier was declared.
#[derive(Debug, Clone, Copy)]
pub enum Declaration<'t> {
    /// A `variable_declarator` of a `const`/`let`/`var` statement
    Variable(Node<'t>),
    /// A `function_declaration`
    Function(Node<'t>),
    /// The `index`th parameter of `function`
    Parameter {
        param: Node<'t>,
        function: Node<'t>,
        index: usize,
    },
}

pub fn is_function_like(node: Node<'_>) -> bool {
    FUNCTION_KINDS.contains(&node.kind())
}

/// Named children of an `arguments` node, without comments.
pub fn named_args(arguments: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = arguments.walk();
    arguments
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Arguments of a `call_expression` or `new_expression`.
pub fn call_args(call: Node<'_>) -> Vec<Node<'_>> {
    call.child_by_field_name("arguments")
        .filter(|a| a.kind() == "arguments")
        .map(named_args)
        .unwrap_or_default()
}

/// First type argument of a call (`c.req.json<User>()`), if any.
pub fn first_type_argument(call: Node<'_>) -> Option<Node<'_>> {
    let type_args = call.child_by_field_name("type_arguments")?;
    let mut cursor = type_args.walk();
    let first = type_args
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    first
}

/// Value of a string literal or of a template literal without substitutions.
pub fn string_value(file: &ParsedFile, node: Node<'_>) -> Option<String> {
    match node.kind() {
        "string" => strip_delimiters(file.text(node)),
        "template_string" => {
            let mut cursor = node.walk();
            let has_substitution = node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "template_substitution");
            if has_substitution {
                None
            } else {
                strip_delimiters(file.text(node))
            }
        }
        _ => None,
    }
}

fn strip_delimiters(text: &str) -> Option<String> {
    let mut chars = text.chars();
    chars.next()?;
    chars.next_back()?;
    Some(chars.as_str().to_string())
}

/// Parses a numeric literal node (`404`, `1_000`, `0x1F`).
pub fn number_value(file: &ParsedFile, node: Node<'_>) -> Option<f64> {
    if node.kind() != "number" {
        return None;
    }
    parse_number(file.text(node))
}

pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned = text.replace('_', "");
    if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    cleaned.parse::<f64>().ok()
}

/// Strips wrappers that do not change which value an expression denotes:
/// `await`, parentheses, `!`, `satisfies T` and `as T`.
pub fn unwrap_expression(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    loop {
        match current.kind() {
            "await_expression"
            | "parenthesized_expression"
            | "non_null_expression"
            | "satisfies_expression"
            | "as_expression" => match first_named(current) {
                Some(inner) => current = inner,
                None => return current,
            },
            _ => return current,
        }
    }
}

fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let first = node
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    first
}

/// Identifier path of a member expression: `c.req` becomes `["c", "req"]`.
///
/// Returns `None` when any link is not a plain identifier or property name.
pub fn member_chain(file: &ParsedFile, node: Node<'_>) -> Option<Vec<String>> {
    let node = unwrap_expression(node);
    match node.kind() {
        "identifier" | "this" => Some(vec![file.text(node).to_string()]),
        "member_expression" => {
            let object = node.child_by_field_name("object")?;
            let property = node.child_by_field_name("property")?;
            let mut chain = member_chain(file, object)?;
            chain.push(file.text(property).to_string());
            Some(chain)
        }
        _ => None,
    }
}

/// Callee of a call whose function is `receiver.property`, as `(receiver, property)`.
pub fn method_call<'t>(file: &ParsedFile, call: Node<'t>) -> Option<(Node<'t>, String)> {
    if call.kind() != "call_expression" {
        return None;
    }
    let callee = call.child_by_field_name("function")?;
    if callee.kind() != "member_expression" {
        return None;
    }
    let object = callee.child_by_field_name("object")?;
    let property = callee.child_by_field_name("property")?;
    Some((object, file.text(property).to_string()))
}

/// Depth-first, pre-order traversal of every node under `root` (inclusive), in document order.
pub fn walk_tree<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    let mut depth = 0usize;
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        loop {
            if depth == 0 {
                return;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            cursor.goto_parent();
            depth -= 1;
        }
    }
}

/// Name bound to the first parameter of a function node, when it is a plain identifier.
pub fn context_param_name(file: &ParsedFile, function: Node<'_>) -> Option<String> {
    if let Some(param) = function.child_by_field_name("parameter") {
        return (param.kind() == "identifier").then(|| file.text(param).to_string());
    }
    let params = function.child_by_field_name("parameters")?;
    let mut cursor = params.walk();
    let first = params
        .named_children(&mut cursor)
        .find(|n| matches!(n.kind(), "required_parameter" | "optional_parameter"))?;
    let pattern = first.child_by_field_name("pattern")?;
    (pattern.kind() == "identifier").then(|| file.text(pattern).to_string())
}

/// Resolves `node` to a function node: inline functions directly, identifiers through
/// the declaration they refer to.
pub fn resolve_function<'t>(file: &ParsedFile, node: Node<'t>) -> Option<Node<'t>> {
    let node = unwrap_expression(node);
    if is_function_like(node) {
        return Some(node);
    }
    if node.kind() != "identifier" {
        return None;
    }
    match find_declaration(file, node, file.text(node))? {
        Declaration::Function(decl) => Some(decl),
        Declaration::Variable(declarator) => {
            let value = unwrap_expression(declarator.child_by_field_name("value")?);
            is_function_like(value).then_some(value)
        }
        Declaration::Parameter { .. } => None,
    }
}

/// Finds the declaration of `name` visible from `from`, searching enclosing scopes outwards.
pub fn find_declaration<'t>(
    file: &ParsedFile,
    from: Node<'t>,
    name: &str,
) -> Option<Declaration<'t>> {
    let mut current = Some(from);
    while let Some(scope) = current {
        if is_function_like(scope) {
            if let Some(found) = parameter_declaration(file, scope, name) {
                return Some(found);
            }
        }
        if matches!(scope.kind(), "program" | "statement_block" | "switch_body" | "class_body") {
            let mut cursor = scope.walk();
            for statement in scope.named_children(&mut cursor) {
                if let Some(found) = declaration_in_statement(file, statement, name) {
                    return Some(found);
                }
            }
        }
        current = scope.parent();
    }
    None
}

fn parameter_declaration<'t>(
    file: &ParsedFile,
    function: Node<'t>,
    name: &str,
) -> Option<Declaration<'t>> {
    if let Some(param) = function.child_by_field_name("parameter") {
        if file.text(param) == name {
            return Some(Declaration::Parameter {
                param,
                function,
                index: 0,
            });
        }
        return None;
    }
    let params = function.child_by_field_name("parameters")?;
    let mut cursor = params.walk();
    let found = params
        .named_children(&mut cursor)
        .filter(|n| matches!(n.kind(), "required_parameter" | "optional_parameter"))
        .enumerate()
        .find(|(_, p)| {
            p.child_by_field_name("pattern")
                .is_some_and(|pattern| pattern.kind() == "identifier" && file.text(pattern) == name)
        })
        .map(|(index, param)| Declaration::Parameter {
            param,
            function,
            index,
        });
    found
}

fn declaration_in_statement<'t>(
    file: &ParsedFile,
    statement: Node<'t>,
    name: &str,
) -> Option<Declaration<'t>> {
    match statement.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = statement.walk();
            let found = statement
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "variable_declarator")
                .find(|d| {
                    d.child_by_field_name("name")
                        .is_some_and(|n| n.kind() == "identifier" && file.text(n) == name)
                })
                .map(Declaration::Variable);
            found
        }
        "function_declaration" | "generator_function_declaration" => statement
            .child_by_field_name("name")
            .filter(|n| file.text(*n) == name)
            .map(|_| Declaration::Function(statement)),
        "export_statement" => statement
            .child_by_field_name("declaration")
            .and_then(|d| declaration_in_statement(file, d, name)),
        _ => None,
    }
}

/// Finds a top-level (optionally exported) `enum` declaration by name.
pub fn find_enum<'t>(file: &'t ParsedFile, name: &str) -> Option<Node<'t>> {
    let mut found = None;
    walk_tree(file.root(), |node| {
        if found.is_none()
            && node.kind() == "enum_declaration"
            && node
                .child_by_field_name("name")
                .is_some_and(|n| file.text(n) == name)
        {
            found = Some(node);
        }
    });
    found
}

/// Members of an `enum_declaration` with their constant values.
///
/// Members without an initializer continue numbering from the previous numeric member.
pub fn enum_members(file: &ParsedFile, declaration: Node<'_>) -> Vec<(String, LiteralValue)> {
    let mut members = Vec::new();
    let Some(body) = declaration.child_by_field_name("body") else {
        return members;
    };

    let mut next_auto = Some(0.0);
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        let (name_node, value_node) = match member.kind() {
            "enum_assignment" => (
                member.child_by_field_name("name"),
                member.child_by_field_name("value"),
            ),
            "property_identifier" | "string" => (Some(member), None),
            _ => continue,
        };
        let Some(name_node) = name_node else { continue };
        let name =
            string_value(file, name_node).unwrap_or_else(|| file.text(name_node).to_string());

        let value = match value_node {
            Some(v) => literal_value(file, v),
            None => next_auto.map(LiteralValue::Number),
        };
        next_auto = match &value {
            Some(LiteralValue::Number(n)) => Some(n + 1.0),
            _ => None,
        };
        if let Some(value) = value {
            members.push((name, value));
        }
    }
    members
}

/// Value of `Enum.Member` when `Enum` is declared in the same file.
pub fn enum_member_value(file: &ParsedFile, enum_name: &str, member: &str) -> Option<LiteralValue> {
    let declaration = find_enum(file, enum_name)?;
    enum_members(file, declaration)
        .into_iter()
        .find(|(name, _)| name == member)
        .map(|(_, value)| value)
}

/// Constant value of a literal expression node (`42`, `-1`, `'text'`).
pub fn literal_value(file: &ParsedFile, node: Node<'_>) -> Option<LiteralValue> {
    let node = unwrap_expression(node);
    match node.kind() {
        "number" => number_value(file, node).map(LiteralValue::Number),
        "string" | "template_string" => string_value(file, node).map(LiteralValue::String),
        "unary_expression" => {
            let operator = node.child_by_field_name("operator")?;
            let argument = node.child_by_field_name("argument")?;
            let value = number_value(file, argument)?;
            match file.text(operator) {
                "-" => Some(LiteralValue::Number(-value)),
                "+" => Some(LiteralValue::Number(value)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Property name of an object-literal key or a type member name.
pub fn property_name(file: &ParsedFile, key: Node<'_>) -> Option<String> {
    match key.kind() {
        "property_identifier" | "identifier" | "private_property_identifier" | "number" => {
            Some(file.text(key).to_string())
        }
        "string" => string_value(file, key),
        _ => None,
    }
}
