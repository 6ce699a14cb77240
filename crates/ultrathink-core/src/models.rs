//! Shared typed models for extracted API data.
//!
//! Everything the extractor produces and the snapshot store persists lives
//! here. The serialized field names are the on-disk snapshot format, so
//! renames must go through `#[serde(rename)]`.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Format constants
// ---------------------------------------------------------------------------

/// Version tag written into every snapshot's metadata block.
pub const SNAPSHOT_FORMAT_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// 1. ElementKind
// ---------------------------------------------------------------------------

/// What kind of object an exported name refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Class,
    Function,
    Method,
    Module,
    Builtin,
    Callable,
    Variable,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Class => "class",
            ElementKind::Function => "function",
            ElementKind::Method => "method",
            ElementKind::Module => "module",
            ElementKind::Builtin => "builtin",
            ElementKind::Callable => "callable",
            ElementKind::Variable => "variable",
        }
    }

    /// Functions and methods share the callable comparison and hashing paths.
    pub fn is_function_like(&self) -> bool {
        matches!(self, ElementKind::Function | ElementKind::Method)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// 2. Parameter
// ---------------------------------------------------------------------------

/// Parameter kinds, named the way `inspect.Parameter.kind` names them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::PositionalOnly => "POSITIONAL_ONLY",
            ParameterKind::PositionalOrKeyword => "POSITIONAL_OR_KEYWORD",
            ParameterKind::VarPositional => "VAR_POSITIONAL",
            ParameterKind::KeywordOnly => "KEYWORD_ONLY",
            ParameterKind::VarKeyword => "VAR_KEYWORD",
        }
    }
}

/// A single function parameter. Annotation and default are kept as source text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub annotation: Option<String>,
    pub default: Option<String>,
    pub has_default: bool,
}

// ---------------------------------------------------------------------------
// 3. Kind-specific detail
// ---------------------------------------------------------------------------

/// One member of a class (method, property, class variable, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub name: String,
    pub doc: String,
    /// Name of the first class in the MRO that declares this member.
    pub defined_in: String,
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub base_classes: Vec<String>,
    pub mro: Vec<String>,
    #[serde(default)]
    pub methods: BTreeMap<String, MemberInfo>,
    #[serde(default)]
    pub class_methods: BTreeMap<String, MemberInfo>,
    #[serde(default)]
    pub static_methods: BTreeMap<String, MemberInfo>,
    #[serde(default)]
    pub properties: BTreeMap<String, MemberInfo>,
    #[serde(default)]
    pub descriptors: BTreeMap<String, MemberInfo>,
    #[serde(default)]
    pub class_variables: BTreeMap<String, MemberInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub is_async: bool,
    pub is_generator: bool,
    pub parameters: Vec<Parameter>,
    pub return_annotation: Option<String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    pub var_positional: Option<String>,
    pub var_keyword: Option<String>,
}

impl FunctionInfo {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub file: Option<String>,
    pub package: Option<String>,
    pub all: Vec<String>,
    pub members: Vec<String>,
}

// ---------------------------------------------------------------------------
// 4. ApiElement
// ---------------------------------------------------------------------------

/// One public symbol of the target package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiElement {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub module: String,
    pub qualname: String,
    pub doc: String,
    pub signature: Option<String>,
    pub source_file: Option<String>,
    pub line_number: Option<usize>,
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_info: Option<ClassInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_info: Option<FunctionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_info: Option<ModuleInfo>,
}

impl ApiElement {
    /// A bare element with no kind-specific detail attached.
    pub fn new(name: &str, kind: ElementKind, module: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            module: module.to_string(),
            qualname: name.to_string(),
            doc: String::new(),
            signature: None,
            source_file: None,
            line_number: None,
            is_public: !name.starts_with('_'),
            class_info: None,
            function_info: None,
            module_info: None,
        }
    }
}

// ---------------------------------------------------------------------------
// 5. Derived per-package maps
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub file: Option<String>,
    pub doc: String,
    pub all: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeHints {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameter_hints: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_hint: Option<String>,
}

impl TypeHints {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.parameter_hints.is_empty() && self.return_hint.is_none()
    }
}

/// A docstring with its summary line and recognised sections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocstringInfo {
    pub raw: String,
    pub summary: String,
    pub sections: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceInfo {
    pub bases: Vec<String>,
    pub mro: Vec<String>,
    pub subclasses: Vec<String>,
}

// ---------------------------------------------------------------------------
// 6. ApiData
// ---------------------------------------------------------------------------

/// Complete extractor output for one package.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiData {
    pub package_info: PackageInfo,
    pub public_api: IndexMap<String, ApiElement>,
    #[serde(default)]
    pub signatures: BTreeMap<String, String>,
    #[serde(default)]
    pub type_hints: BTreeMap<String, TypeHints>,
    #[serde(default)]
    pub docstrings: BTreeMap<String, DocstringInfo>,
    #[serde(default)]
    pub inheritance: BTreeMap<String, InheritanceInfo>,
    #[serde(default)]
    pub decorators: BTreeMap<String, Vec<String>>,
}

impl ApiData {
    pub fn element(&self, name: &str) -> Option<&ApiElement> {
        self.public_api.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ElementKind::Class).unwrap();
        assert_eq!(json, "\"class\"");
        assert_eq!(ElementKind::Variable.to_string(), "variable");
    }

    #[test]
    fn parameter_kind_uses_inspect_names() {
        let json = serde_json::to_string(&ParameterKind::VarKeyword).unwrap();
        assert_eq!(json, "\"VAR_KEYWORD\"");
        let back: ParameterKind = serde_json::from_str("\"KEYWORD_ONLY\"").unwrap();
        assert_eq!(back, ParameterKind::KeywordOnly);
    }

    #[test]
    fn element_type_field_is_renamed() {
        let element = ApiElement::new("run", ElementKind::Function, "pkg.core");
        let value = serde_json::to_value(&element).unwrap();
        assert_eq!(value["type"], "function");
        assert!(value.get("class_info").is_none());
        assert!(element.is_public);
        assert!(!ApiElement::new("_hidden", ElementKind::Variable, "pkg").is_public);
    }
}
