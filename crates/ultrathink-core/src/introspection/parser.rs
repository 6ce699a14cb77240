//! Python source parsing on top of tree-sitter.
//!
//! Turns one `.py` file into a [`ModuleSource`]: the module docstring, its
//! `__all__`, and every name bound at module level (classes, functions,
//! assignments, imports). Definitions nested inside top-level `if`/`try`/
//! `with` blocks count as module-level bindings, the way they do at runtime.
//! Nothing is executed.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser, Tree};

use crate::errors::{UltrathinkError, UltrathinkResult};
use crate::introspection::docstring::cleandoc;
use crate::models::{Parameter, ParameterKind};

/// Compound statements whose bodies still bind names in the enclosing scope.
const TRANSPARENT_BLOCKS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "else_clause",
    "try_statement",
    "except_clause",
    "except_group_clause",
    "finally_clause",
    "with_statement",
    "block",
];

// ---------------------------------------------------------------------------
// Parsed definitions
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub line: usize,
    pub is_async: bool,
    pub is_generator: bool,
    pub parameters: Vec<Parameter>,
    pub return_annotation: Option<String>,
    /// Decorator expressions without the leading `@`.
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
}

impl FunctionDef {
    /// Signature rendered the way `str(inspect.signature(f))` prints it.
    pub fn signature(&self) -> String {
        render_signature(&self.parameters, self.return_annotation.as_deref())
    }

    /// Signature with the leading positional parameter (`self`/`cls`) dropped.
    pub fn bound_signature(&self) -> String {
        render_signature(self.bound_parameters(), self.return_annotation.as_deref())
    }

    pub fn bound_parameters(&self) -> &[Parameter] {
        match self.parameters.first() {
            Some(p)
                if matches!(
                    p.kind,
                    ParameterKind::PositionalOnly | ParameterKind::PositionalOrKeyword
                ) =>
            {
                &self.parameters[1..]
            }
            _ => &self.parameters,
        }
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        has_decorator(&self.decorators, name)
    }

    /// `@property` and accessor decorators such as `@x.setter`.
    pub fn is_property(&self) -> bool {
        self.decorators.iter().any(|d| {
            let bare = decorator_name(d);
            bare == "property"
                || bare.ends_with(".setter")
                || bare.ends_with(".getter")
                || bare.ends_with(".deleter")
        })
    }

    /// `@cached_property` or `@functools.cached_property`.
    pub fn is_cached_property(&self) -> bool {
        has_decorator(&self.decorators, "cached_property")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClassMember {
    Function(FunctionDef),
    Attribute {
        line: usize,
        annotation: Option<String>,
        value: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub line: usize,
    /// Base class expressions as written; keyword arguments are dropped.
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
    pub members: IndexMap<String, ClassMember>,
}

impl ClassDef {
    pub fn has_decorator(&self, name: &str) -> bool {
        has_decorator(&self.decorators, name)
    }

    pub fn method(&self, name: &str) -> Option<&FunctionDef> {
        match self.members.get(name) {
            Some(ClassMember::Function(f)) => Some(f),
            _ => None,
        }
    }

    /// Defines `__get__` or `__set__` in its own body.
    pub fn implements_descriptor(&self) -> bool {
        self.method("__get__").is_some() || self.method("__set__").is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentDef {
    pub line: usize,
    pub annotation: Option<String>,
    /// Right-hand side source text, if any.
    pub value: Option<String>,
    /// Decoded value when the right-hand side is a plain string literal.
    pub literal: Option<String>,
    /// Set when the right-hand side is a bare (possibly dotted) name.
    pub alias_of: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportBinding {
    pub line: usize,
    /// Dotted module path as written, without leading dots.
    pub module: String,
    /// Number of leading dots of a relative import.
    pub level: usize,
    /// Imported attribute for `from m import name`; `None` for `import m`.
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    Class(ClassDef),
    Function(FunctionDef),
    Assignment(AssignmentDef),
    Import(ImportBinding),
}

impl Binding {
    pub fn line(&self) -> usize {
        match self {
            Binding::Class(c) => c.line,
            Binding::Function(f) => f.line,
            Binding::Assignment(a) => a.line,
            Binding::Import(i) => i.line,
        }
    }
}

/// Static view of one Python module.
#[derive(Clone, Debug)]
pub struct ModuleSource {
    /// Dotted module name, e.g. `pkg.sub.mod`.
    pub name: String,
    pub path: PathBuf,
    /// True for `__init__.py`.
    pub is_package: bool,
    pub docstring: Option<String>,
    pub all: Option<Vec<String>>,
    pub bindings: IndexMap<String, Binding>,
    /// `from x import *` targets as `(module, level)`.
    pub star_imports: Vec<(String, usize)>,
    pub line_count: usize,
    pub has_syntax_errors: bool,
}

impl ModuleSource {
    pub fn parse(
        name: &str,
        path: &Path,
        source: &str,
        is_package: bool,
    ) -> UltrathinkResult<Self> {
        let tree = parse_source(source)?;
        let root = tree.root_node();

        let mut module = ModuleSource {
            name: name.to_string(),
            path: path.to_path_buf(),
            is_package,
            docstring: block_docstring(&root, source),
            all: None,
            bindings: IndexMap::new(),
            star_imports: Vec::new(),
            line_count: source.lines().count(),
            has_syntax_errors: root.has_error(),
        };
        collect_module_statements(&root, source, &mut module);
        Ok(module)
    }

    /// The package this module belongs to (itself for `__init__.py`).
    pub fn package(&self) -> Option<String> {
        if self.is_package {
            return Some(self.name.clone());
        }
        self.name.rsplit_once('.').map(|(parent, _)| parent.to_string())
    }

    /// Value of a module-level `__version__ = "..."` assignment.
    pub fn version(&self) -> Option<String> {
        match self.bindings.get("__version__") {
            Some(Binding::Assignment(a)) => a.literal.clone(),
            _ => None,
        }
    }

    /// Sorted names bound at module level that do not start with `_`.
    pub fn public_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .bindings
            .keys()
            .filter(|n| !n.starts_with('_'))
            .cloned()
            .collect();
        names.sort();
        names
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn parse_source(source: &str) -> UltrathinkResult<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| UltrathinkError::Parse(format!("Failed to set Python language: {e}")))?;
    parser
        .parse(source, None)
        .ok_or_else(|| UltrathinkError::Parse("Failed to parse Python source".to_string()))
}

// ---------------------------------------------------------------------------
// Node helpers
// ---------------------------------------------------------------------------

pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

fn line_of(node: &Node) -> usize {
    node.start_position().row + 1
}

fn field_text(node: &Node, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| node_text(&n, source).to_string())
}

fn named_children<'a>(node: &Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Decorator without call arguments, e.g. `dataclass(frozen=True)` -> `dataclass`.
fn decorator_name(decorator: &str) -> &str {
    decorator.split('(').next().unwrap_or(decorator).trim()
}

fn has_decorator(decorators: &[String], name: &str) -> bool {
    decorators.iter().any(|d| {
        let bare = decorator_name(d);
        bare == name || bare.rsplit('.').next() == Some(name)
    })
}

/// Decode a Python string literal. Bytes and f-strings yield `None`.
pub fn string_literal_value(text: &str) -> Option<String> {
    let quote_at = text.find(['"', '\''])?;
    let prefix = text[..quote_at].to_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }
    let body = &text[quote_at..];
    let inner = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        if body.len() < 6 {
            return None;
        }
        body.get(3..body.len() - 3)?
    } else {
        if body.len() < 2 {
            return None;
        }
        body.get(1..body.len() - 1)?
    };
    if prefix.contains('r') {
        Some(inner.to_string())
    } else {
        Some(unescape(inner))
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn literal_string(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "string" => string_literal_value(node_text(node, source)),
        "concatenated_string" => {
            let mut joined = String::new();
            for part in named_children(node) {
                joined.push_str(&string_literal_value(node_text(&part, source))?);
            }
            Some(joined)
        }
        _ => None,
    }
}

/// Docstring of a module root or a `block`: the first statement, when it is a
/// bare string literal, cleaned like `inspect.cleandoc`.
fn block_docstring(block: &Node, source: &str) -> Option<String> {
    let first = named_children(block)
        .into_iter()
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    literal_string(&expr, source).map(|doc| cleandoc(&doc))
}

/// `["a", 'b']` or `("a", "b")` -> names. Non-string items are ignored.
fn string_sequence(node: &Node, source: &str) -> Option<Vec<String>> {
    match node.kind() {
        "list" | "tuple" => Some(
            named_children(node)
                .iter()
                .filter_map(|n| literal_string(n, source))
                .collect(),
        ),
        "parenthesized_expression" => node
            .named_child(0)
            .and_then(|inner| string_sequence(&inner, source)),
        _ => None,
    }
}

fn contains_yield(node: &Node) -> bool {
    if node.kind() == "yield" {
        return true;
    }
    for child in named_children(node) {
        if matches!(
            child.kind(),
            "function_definition" | "class_definition" | "lambda"
        ) {
            continue;
        }
        if contains_yield(&child) {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// Render parameters like `inspect.Signature.__str__`, inserting `/` after
/// positional-only parameters and a bare `*` before keyword-only ones.
pub fn render_signature(params: &[Parameter], return_annotation: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(params.len() + 1);
    let mut needs_star = true;

    for (i, param) in params.iter().enumerate() {
        match param.kind {
            ParameterKind::VarPositional => needs_star = false,
            ParameterKind::KeywordOnly if needs_star => {
                parts.push("*".to_string());
                needs_star = false;
            }
            _ => {}
        }

        let mut rendered = match param.kind {
            ParameterKind::VarPositional => format!("*{}", param.name),
            ParameterKind::VarKeyword => format!("**{}", param.name),
            _ => param.name.clone(),
        };
        if let Some(annotation) = &param.annotation {
            rendered.push_str(": ");
            rendered.push_str(annotation);
        }
        if let Some(default) = &param.default {
            if param.annotation.is_some() {
                rendered.push_str(" = ");
            } else {
                rendered.push('=');
            }
            rendered.push_str(default);
        }
        parts.push(rendered);

        let next_positional_only = params
            .get(i + 1)
            .is_some_and(|next| next.kind == ParameterKind::PositionalOnly);
        if param.kind == ParameterKind::PositionalOnly && !next_positional_only {
            parts.push("/".to_string());
        }
    }

    let mut out = format!("({})", parts.join(", "));
    if let Some(ret) = return_annotation {
        out.push_str(" -> ");
        out.push_str(ret);
    }
    out
}

fn parse_parameters(node: &Node, source: &str) -> Vec<Parameter> {
    let mut params: Vec<Parameter> = Vec::new();
    let mut keyword_only = false;

    let positional_kind = |keyword_only: bool| {
        if keyword_only {
            ParameterKind::KeywordOnly
        } else {
            ParameterKind::PositionalOrKeyword
        }
    };

    for child in named_children(node) {
        match child.kind() {
            "identifier" => params.push(Parameter {
                name: node_text(&child, source).to_string(),
                kind: positional_kind(keyword_only),
                annotation: None,
                default: None,
                has_default: false,
            }),
            "typed_parameter" => {
                let annotation = field_text(&child, "type", source);
                let Some(inner) = child.named_child(0) else {
                    continue;
                };
                let (name, kind) = match inner.kind() {
                    "list_splat_pattern" => {
                        keyword_only = true;
                        (splat_name(&inner, source), ParameterKind::VarPositional)
                    }
                    "dictionary_splat_pattern" => {
                        (splat_name(&inner, source), ParameterKind::VarKeyword)
                    }
                    _ => (
                        node_text(&inner, source).to_string(),
                        positional_kind(keyword_only),
                    ),
                };
                params.push(Parameter {
                    name,
                    kind,
                    annotation,
                    default: None,
                    has_default: false,
                });
            }
            "default_parameter" | "typed_default_parameter" => {
                let default = field_text(&child, "value", source);
                params.push(Parameter {
                    name: field_text(&child, "name", source).unwrap_or_default(),
                    kind: positional_kind(keyword_only),
                    annotation: field_text(&child, "type", source),
                    has_default: default.is_some(),
                    default,
                });
            }
            "list_splat_pattern" => {
                keyword_only = true;
                params.push(Parameter {
                    name: splat_name(&child, source),
                    kind: ParameterKind::VarPositional,
                    annotation: None,
                    default: None,
                    has_default: false,
                });
            }
            "dictionary_splat_pattern" => params.push(Parameter {
                name: splat_name(&child, source),
                kind: ParameterKind::VarKeyword,
                annotation: None,
                default: None,
                has_default: false,
            }),
            "keyword_separator" => keyword_only = true,
            "positional_separator" => {
                for param in params.iter_mut() {
                    if param.kind == ParameterKind::PositionalOrKeyword {
                        param.kind = ParameterKind::PositionalOnly;
                    }
                }
            }
            _ => {}
        }
    }
    params
}

fn splat_name(node: &Node, source: &str) -> String {
    node.named_child(0)
        .map(|n| node_text(&n, source).to_string())
        .unwrap_or_else(|| node_text(node, source).trim_start_matches('*').to_string())
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

fn parse_decorators(node: &Node, source: &str) -> Vec<String> {
    named_children(node)
        .iter()
        .filter(|c| c.kind() == "decorator")
        .map(|c| node_text(c, source).trim_start_matches('@').trim().to_string())
        .collect()
}

fn parse_function(node: &Node, source: &str, decorators: Vec<String>, line: usize) -> FunctionDef {
    let mut cursor = node.walk();
    let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");
    let body = node.child_by_field_name("body");

    FunctionDef {
        name: field_text(node, "name", source).unwrap_or_default(),
        line,
        is_async,
        is_generator: body.as_ref().is_some_and(contains_yield),
        parameters: node
            .child_by_field_name("parameters")
            .map(|p| parse_parameters(&p, source))
            .unwrap_or_default(),
        return_annotation: field_text(node, "return_type", source),
        decorators,
        docstring: body.and_then(|b| block_docstring(&b, source)),
    }
}

fn parse_class(node: &Node, source: &str, decorators: Vec<String>, line: usize) -> ClassDef {
    let bases = node
        .child_by_field_name("superclasses")
        .map(|args| {
            named_children(&args)
                .iter()
                .filter(|a| {
                    !matches!(
                        a.kind(),
                        "keyword_argument" | "comment" | "dictionary_splat" | "list_splat"
                    )
                })
                .map(|a| node_text(a, source).to_string())
                .collect()
        })
        .unwrap_or_default();

    let mut class = ClassDef {
        name: field_text(node, "name", source).unwrap_or_default(),
        line,
        bases,
        decorators,
        docstring: None,
        members: IndexMap::new(),
    };

    if let Some(body) = node.child_by_field_name("body") {
        class.docstring = block_docstring(&body, source);
        collect_class_statements(&body, source, &mut class);
    }
    class
}

enum Definition {
    Class(ClassDef),
    Function(FunctionDef),
}

fn parse_definition(node: &Node, source: &str) -> Option<Definition> {
    match node.kind() {
        "class_definition" => Some(Definition::Class(parse_class(
            node,
            source,
            Vec::new(),
            line_of(node),
        ))),
        "function_definition" => Some(Definition::Function(parse_function(
            node,
            source,
            Vec::new(),
            line_of(node),
        ))),
        "decorated_definition" => {
            let decorators = parse_decorators(node, source);
            let inner = node.child_by_field_name("definition")?;
            match inner.kind() {
                "class_definition" => Some(Definition::Class(parse_class(
                    &inner,
                    source,
                    decorators,
                    line_of(node),
                ))),
                "function_definition" => Some(Definition::Function(parse_function(
                    &inner,
                    source,
                    decorators,
                    line_of(node),
                ))),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `(targets, annotation, value_node)` for an `assignment`, following chains
/// such as `a = b = 1`.
fn assignment_parts<'a>(
    node: &Node<'a>,
    source: &str,
) -> (Vec<String>, Option<String>, Option<Node<'a>>) {
    let mut targets = Vec::new();
    let annotation = field_text(node, "type", source);
    let mut current = *node;
    loop {
        if let Some(left) = current.child_by_field_name("left") {
            match left.kind() {
                "identifier" => targets.push(node_text(&left, source).to_string()),
                "pattern_list" | "tuple_pattern" | "list_pattern" => {
                    for item in named_children(&left) {
                        if item.kind() == "identifier" {
                            targets.push(node_text(&item, source).to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        match current.child_by_field_name("right") {
            Some(right) if right.kind() == "assignment" => current = right,
            right => return (targets, annotation, right),
        }
    }
}

// ---------------------------------------------------------------------------
// Definition scan
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Class,
    Function,
}

/// A `class` or `def` found anywhere in a file, nested ones included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefinitionSite {
    pub name: String,
    pub kind: DefinitionKind,
    pub line: usize,
    pub docstring: Option<String>,
}

/// Every class and function definition in `source`, in source order.
pub fn scan_definitions(source: &str) -> UltrathinkResult<Vec<DefinitionSite>> {
    let tree = parse_source(source)?;
    let mut sites = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        let kind = match node.kind() {
            "class_definition" => Some(DefinitionKind::Class),
            "function_definition" => Some(DefinitionKind::Function),
            _ => None,
        };
        if let (Some(kind), Some(name)) = (kind, field_text(&node, "name", source)) {
            let docstring = node
                .child_by_field_name("body")
                .and_then(|body| block_docstring(&body, source));
            sites.push(DefinitionSite {
                name,
                kind,
                line: line_of(&node),
                docstring,
            });
        }
        let mut children = named_children(&node);
        children.reverse();
        stack.extend(children);
    }
    Ok(sites)
}

// ---------------------------------------------------------------------------
// Statement collection
// ---------------------------------------------------------------------------

fn collect_module_statements(node: &Node, source: &str, module: &mut ModuleSource) {
    for stmt in named_children(node) {
        let kind = stmt.kind();
        if TRANSPARENT_BLOCKS.contains(&kind) {
            collect_module_statements(&stmt, source, module);
            continue;
        }
        match kind {
            "class_definition" | "function_definition" | "decorated_definition" => {
                match parse_definition(&stmt, source) {
                    Some(Definition::Class(c)) => {
                        module.bindings.insert(c.name.clone(), Binding::Class(c));
                    }
                    Some(Definition::Function(f)) => {
                        module.bindings.insert(f.name.clone(), Binding::Function(f));
                    }
                    None => {}
                }
            }
            "import_statement" => collect_import(&stmt, source, module),
            "import_from_statement" => collect_from_import(&stmt, source, module),
            "expression_statement" => {
                let Some(expr) = stmt.named_child(0) else {
                    continue;
                };
                match expr.kind() {
                    "assignment" => collect_module_assignment(&expr, source, module),
                    "augmented_assignment" => {
                        let target = field_text(&expr, "left", source);
                        if target.as_deref() == Some("__all__") {
                            if let Some(extra) = expr
                                .child_by_field_name("right")
                                .and_then(|r| string_sequence(&r, source))
                            {
                                module.all.get_or_insert_with(Vec::new).extend(extra);
                            }
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

fn collect_module_assignment(node: &Node, source: &str, module: &mut ModuleSource) {
    let (targets, annotation, value) = assignment_parts(node, source);
    for target in targets {
        if target == "__all__" {
            if let Some(names) = value.as_ref().and_then(|v| string_sequence(v, source)) {
                module.all = Some(names);
            }
        }
        let assignment = AssignmentDef {
            line: line_of(node),
            annotation: annotation.clone(),
            value: value.as_ref().map(|v| node_text(v, source).to_string()),
            literal: value.as_ref().and_then(|v| literal_string(v, source)),
            alias_of: value
                .as_ref()
                .filter(|v| matches!(v.kind(), "identifier" | "attribute"))
                .map(|v| node_text(v, source).to_string()),
        };
        module.bindings.insert(target, Binding::Assignment(assignment));
    }
}

fn collect_import(node: &Node, source: &str, module: &mut ModuleSource) {
    let mut cursor = node.walk();
    let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
    for name in names {
        let (dotted, bound) = match name.kind() {
            "aliased_import" => {
                let dotted = field_text(&name, "name", source).unwrap_or_default();
                let alias = field_text(&name, "alias", source).unwrap_or_else(|| dotted.clone());
                (dotted.clone(), alias)
            }
            _ => {
                let dotted = node_text(&name, source).to_string();
                // `import a.b.c` binds `a`.
                let head = dotted.split('.').next().unwrap_or(&dotted).to_string();
                (head.clone(), head)
            }
        };
        module.bindings.insert(
            bound,
            Binding::Import(ImportBinding {
                line: line_of(node),
                module: dotted,
                level: 0,
                name: None,
            }),
        );
    }
}

fn collect_from_import(node: &Node, source: &str, module: &mut ModuleSource) {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };
    let (from_module, level) = match module_node.kind() {
        "relative_import" => {
            let text = node_text(&module_node, source);
            let level = text.chars().take_while(|c| *c == '.').count();
            (text[level..].to_string(), level)
        }
        _ => (node_text(&module_node, source).to_string(), 0),
    };

    if named_children(node)
        .iter()
        .any(|c| c.kind() == "wildcard_import")
    {
        module.star_imports.push((from_module, level));
        return;
    }

    let mut cursor = node.walk();
    let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
    for name in names {
        let (imported, bound) = match name.kind() {
            "aliased_import" => {
                let imported = field_text(&name, "name", source).unwrap_or_default();
                let alias = field_text(&name, "alias", source).unwrap_or_else(|| imported.clone());
                (imported, alias)
            }
            _ => {
                let imported = node_text(&name, source).to_string();
                (imported.clone(), imported)
            }
        };
        module.bindings.insert(
            bound,
            Binding::Import(ImportBinding {
                line: line_of(node),
                module: from_module.clone(),
                level,
                name: Some(imported),
            }),
        );
    }
}

fn collect_class_statements(node: &Node, source: &str, class: &mut ClassDef) {
    for stmt in named_children(node) {
        let kind = stmt.kind();
        if TRANSPARENT_BLOCKS.contains(&kind) {
            collect_class_statements(&stmt, source, class);
            continue;
        }
        match kind {
            "class_definition" | "function_definition" | "decorated_definition" => {
                match parse_definition(&stmt, source) {
                    Some(Definition::Function(f)) => {
                        let accessor = f.decorators.iter().any(|d| {
                            let bare = decorator_name(d);
                            bare.ends_with(".setter") || bare.ends_with(".deleter")
                        });
                        // The getter keeps the property's docstring.
                        if accessor && class.members.contains_key(&f.name) {
                            continue;
                        }
                        class.members.insert(f.name.clone(), ClassMember::Function(f));
                    }
                    Some(Definition::Class(nested)) => {
                        class.members.insert(
                            nested.name.clone(),
                            ClassMember::Attribute {
                                line: nested.line,
                                annotation: None,
                                value: None,
                            },
                        );
                    }
                    None => {}
                }
            }
            "expression_statement" => {
                let Some(expr) = stmt.named_child(0) else {
                    continue;
                };
                if expr.kind() != "assignment" {
                    continue;
                }
                let (targets, annotation, value) = assignment_parts(&expr, source);
                for target in targets {
                    class.members.insert(
                        target,
                        ClassMember::Attribute {
                            line: line_of(&expr),
                            annotation: annotation.clone(),
                            value: value.as_ref().map(|v| node_text(v, source).to_string()),
                        },
                    );
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ModuleSource {
        ModuleSource::parse("pkg.mod", Path::new("pkg/mod.py"), source, false).unwrap()
    }

    #[test]
    fn test_scan_definitions_includes_nested() {
        let sites = scan_definitions(
            concat!(
                "class Outer:\n    \"\"\"Outer doc.\"\"\"\n    def inner(self):\n        pass\n\n",
                "def top():\n    def helper():\n        '''Helper.'''\n",
            ),
        )
        .unwrap();
        let names: Vec<&str> = sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Outer", "inner", "top", "helper"]);
        assert_eq!(sites[0].docstring.as_deref(), Some("Outer doc."));
        assert_eq!(sites[1].docstring, None);
        assert_eq!(sites[2].kind, DefinitionKind::Function);
        assert_eq!(sites[2].line, 6);
        assert_eq!(sites[3].docstring.as_deref(), Some("Helper."));
    }

    #[test]
    fn test_module_docstring_and_all() {
        let module = parse(
            r#""""Data collection helpers.

    Longer description.
"""
__all__ = ["collect", 'Fetcher']
__all__ += ["extra"]
__version__ = "2.1.1"
"#,
        );
        assert_eq!(
            module.docstring.as_deref(),
            Some("Data collection helpers.\n\nLonger description.")
        );
        assert_eq!(
            module.all,
            Some(vec![
                "collect".to_string(),
                "Fetcher".to_string(),
                "extra".to_string()
            ])
        );
        assert_eq!(module.version().as_deref(), Some("2.1.1"));
    }

    #[test]
    fn test_function_parameters_and_kinds() {
        let module = parse(
            "def fetch(a, b: int, /, c='x', *args, d: bool = True, **kw) -> list:\n    pass\n",
        );
        let Some(Binding::Function(f)) = module.bindings.get("fetch") else {
            panic!("fetch not parsed");
        };
        let kinds: Vec<ParameterKind> = f.parameters.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParameterKind::PositionalOnly,
                ParameterKind::PositionalOnly,
                ParameterKind::PositionalOrKeyword,
                ParameterKind::VarPositional,
                ParameterKind::KeywordOnly,
                ParameterKind::VarKeyword,
            ]
        );
        assert_eq!(f.parameters[1].annotation.as_deref(), Some("int"));
        assert_eq!(f.parameters[2].default.as_deref(), Some("'x'"));
        assert!(f.parameters[4].has_default);
        assert_eq!(
            f.signature(),
            "(a, b: int, /, c='x', *args, d: bool = True, **kw) -> list"
        );
    }

    #[test]
    fn test_bare_star_marks_keyword_only() {
        let module = parse("def run(x, *, limit=10):\n    return x\n");
        let Some(Binding::Function(f)) = module.bindings.get("run") else {
            panic!("run not parsed");
        };
        assert_eq!(f.parameters[1].kind, ParameterKind::KeywordOnly);
        assert_eq!(f.signature(), "(x, *, limit=10)");
    }

    #[test]
    fn test_async_and_generator_detection() {
        let module = parse(
            r#"
async def load():
    """Load things."""
    return 1

def rows():
    def inner():
        yield 1
    yield from inner()

def plain():
    def inner():
        yield 1
    return inner
"#,
        );
        let get = |name: &str| match module.bindings.get(name) {
            Some(Binding::Function(f)) => f.clone(),
            _ => panic!("{name} missing"),
        };
        assert!(get("load").is_async);
        assert_eq!(get("load").docstring.as_deref(), Some("Load things."));
        assert!(get("rows").is_generator);
        assert!(!get("plain").is_generator);
    }

    #[test]
    fn test_class_members_and_bases() {
        let module = parse(
            r#"
@dataclass(frozen=True)
class Collector(Base, metaclass=Meta):
    """Collects rows."""
    limit: int = 10

    def run(self, n: int) -> None:
        """Run it."""

    @classmethod
    def create(cls, name):
        pass

    @staticmethod
    def helper(x):
        pass

    @property
    def size(self):
        """Current size."""
        return 1

    @size.setter
    def size(self, value):
        pass
"#,
        );
        let Some(Binding::Class(c)) = module.bindings.get("Collector") else {
            panic!("class not parsed");
        };
        assert_eq!(c.bases, vec!["Base".to_string()]);
        assert!(c.has_decorator("dataclass"));
        assert_eq!(c.line, 2);
        assert_eq!(c.docstring.as_deref(), Some("Collects rows."));
        assert!(matches!(
            c.members.get("limit"),
            Some(ClassMember::Attribute { annotation: Some(a), .. }) if a == "int"
        ));
        assert_eq!(c.method("run").unwrap().bound_signature(), "(n: int) -> None");
        assert!(c.method("create").unwrap().has_decorator("classmethod"));
        let size = c.method("size").unwrap();
        assert!(size.is_property());
        assert_eq!(size.docstring.as_deref(), Some("Current size."));
    }

    #[test]
    fn test_imports_bind_names() {
        let module = parse(
            r#"
import os
import numpy as np
from .collector import Collector as C, run
from . import utils
from ..shared import *
try:
    from fast import speedup
except ImportError:
    speedup = None
"#,
        );
        assert!(matches!(
            module.bindings.get("C"),
            Some(Binding::Import(ImportBinding { module, level: 1, name: Some(n), .. }))
                if module == "collector" && n == "Collector"
        ));
        assert!(matches!(
            module.bindings.get("utils"),
            Some(Binding::Import(ImportBinding { module, level: 1, .. })) if module.is_empty()
        ));
        assert!(matches!(
            module.bindings.get("np"),
            Some(Binding::Import(ImportBinding { module, name: None, .. })) if module == "numpy"
        ));
        assert!(module.bindings.contains_key("os"));
        assert_eq!(module.star_imports, vec![("shared".to_string(), 2)]);
        // The except branch rebinds `speedup` after the try branch.
        assert!(matches!(
            module.bindings.get("speedup"),
            Some(Binding::Assignment(_))
        ));
    }

    #[test]
    fn test_string_literal_value_handles_prefixes() {
        assert_eq!(string_literal_value(r#""a\nb""#).as_deref(), Some("a\nb"));
        assert_eq!(string_literal_value(r#"r"a\nb""#).as_deref(), Some("a\\nb"));
        assert_eq!(string_literal_value("'''x'''").as_deref(), Some("x"));
        assert_eq!(string_literal_value("b'x'"), None);
        assert_eq!(string_literal_value("f'{x}'"), None);
    }

    #[test]
    fn test_public_names_sorted_without_private() {
        let module = parse("b = 1\n_hidden = 2\na = 3\n");
        assert_eq!(module.public_names(), vec!["a".to_string(), "b".to_string()]);
    }
}
