//! Public API extraction.
//!
//! Walks the package namespace the way `dir(package)` / `__all__` would see
//! it, resolves each exported name through imports and aliases to its
//! definition, and builds an [`ApiData`] record. Everything is derived from
//! source; package code is never executed.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::UltrathinkConfig;
use crate::errors::{UltrathinkError, UltrathinkResult};
use crate::introspection::docstring::{parse_sections, summary_line};
use crate::introspection::package::PackageSources;
use crate::introspection::parser::{
    render_signature, AssignmentDef, Binding, ClassDef, ClassMember, FunctionDef, ModuleSource,
};
use crate::models::{
    ApiData, ApiElement, ClassInfo, DocstringInfo, ElementKind, FunctionInfo, InheritanceInfo,
    MemberInfo, ModuleInfo, PackageInfo, Parameter, ParameterKind, TypeHints,
};

/// Upper bound on alias/import hops when resolving a name.
const MAX_RESOLVE_DEPTH: usize = 16;

const OBJECT: &str = "object";

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

pub struct ApiExtractor {
    package: String,
    source_dir: PathBuf,
}

impl ApiExtractor {
    pub fn new(package: &str, source_dir: &Path) -> Self {
        Self {
            package: package.to_string(),
            source_dir: source_dir.to_path_buf(),
        }
    }

    pub fn from_config(config: &UltrathinkConfig) -> UltrathinkResult<Self> {
        let package = config.package.name.as_deref().ok_or_else(|| {
            UltrathinkError::Config("[package].name is required for extraction".to_string())
        })?;
        Ok(Self::new(package, &config.package.source_directory))
    }

    pub fn package_name(&self) -> &str {
        &self.package
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Load the package and extract every public element.
    pub fn extract_complete_api(&self) -> UltrathinkResult<ApiData> {
        let sources = PackageSources::load(&self.source_dir, &self.package)?;
        let data = extract_from_sources(&sources);
        info!(
            "API extraction completed for {}: {} elements",
            self.package,
            data.public_api.len()
        );
        Ok(data)
    }
}

/// Extract API data from already-loaded sources.
pub fn extract_from_sources(sources: &PackageSources) -> ApiData {
    Extraction { sources }.run()
}

// ---------------------------------------------------------------------------
// Name resolution
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum Resolved<'a> {
    Class(&'a ModuleSource, &'a ClassDef),
    Function(&'a ModuleSource, &'a FunctionDef),
    Variable(&'a ModuleSource, &'a AssignmentDef),
    Module(&'a ModuleSource),
    /// Imported from outside the package; carries the source module.
    External(String),
    /// `import x` of a module outside the package.
    ExternalModule(String),
}

/// One entry of a method resolution order.
#[derive(Clone, Debug)]
struct MroEntry<'a> {
    key: String,
    name: String,
    class: Option<(&'a ModuleSource, &'a ClassDef)>,
}

impl<'a> MroEntry<'a> {
    fn internal(module: &'a ModuleSource, class: &'a ClassDef) -> Self {
        Self {
            key: format!("{}:{}", module.name, class.name),
            name: class.name.clone(),
            class: Some((module, class)),
        }
    }

    fn object() -> Self {
        Self {
            key: OBJECT.to_string(),
            name: OBJECT.to_string(),
            class: None,
        }
    }

    fn is_object(&self) -> bool {
        self.key == OBJECT
    }
}

struct Extraction<'a> {
    sources: &'a PackageSources,
}

impl<'a> Extraction<'a> {
    fn resolve_in(
        &self,
        module: &'a ModuleSource,
        name: &str,
        depth: usize,
    ) -> Option<Resolved<'a>> {
        if depth > MAX_RESOLVE_DEPTH {
            debug!("Resolution depth exceeded for {name} in {}", module.name);
            return None;
        }
        if let Some((head, rest)) = name.split_once('.') {
            return match self.resolve_in(module, head, depth + 1)? {
                Resolved::Module(m) => self.resolve_in(m, rest, depth + 1),
                Resolved::External(source) | Resolved::ExternalModule(source) => {
                    Some(Resolved::External(source))
                }
                _ => None,
            };
        }

        match module.bindings.get(name) {
            Some(Binding::Class(c)) => Some(Resolved::Class(module, c)),
            Some(Binding::Function(f)) => Some(Resolved::Function(module, f)),
            Some(Binding::Assignment(a)) => {
                if let Some(target) = a.alias_of.as_deref().filter(|t| *t != name) {
                    if let Some(resolved) = self.resolve_in(module, target, depth + 1) {
                        return Some(resolved);
                    }
                }
                Some(Resolved::Variable(module, a))
            }
            Some(Binding::Import(import)) => {
                let target =
                    PackageSources::resolve_import_target(module, &import.module, import.level);
                let internal = import.level > 0 || self.sources.is_internal(&target);
                match &import.name {
                    None => match self.sources.module(&target) {
                        Some(m) => Some(Resolved::Module(m)),
                        None if internal => None,
                        None => Some(Resolved::ExternalModule(target)),
                    },
                    Some(_) if !internal => Some(Resolved::External(target)),
                    Some(attr) => {
                        let m = self.sources.module(&target)?;
                        self.resolve_in(m, attr, depth + 1)
                    }
                }
            }
            None => self.resolve_fallback(module, name, depth),
        }
    }

    /// Names not bound directly: star imports, then submodules of a package.
    fn resolve_fallback(
        &self,
        module: &'a ModuleSource,
        name: &str,
        depth: usize,
    ) -> Option<Resolved<'a>> {
        for (star_module, level) in &module.star_imports {
            let target = PackageSources::resolve_import_target(module, star_module, *level);
            let Some(m) = self.sources.module(&target) else {
                continue;
            };
            let exported = match &m.all {
                Some(all) => all.iter().any(|n| n == name),
                None => !name.starts_with('_'),
            };
            if exported {
                if let Some(resolved) = self.resolve_in(m, name, depth + 1) {
                    return Some(resolved);
                }
            }
        }
        if module.is_package {
            return self
                .sources
                .module(&format!("{}.{name}", module.name))
                .map(Resolved::Module);
        }
        None
    }

    /// Names visible on the package: `__all__`, or every public binding plus
    /// submodules bound by relative imports and star-imported names.
    fn export_names(&self) -> Vec<String> {
        let init = self.sources.init_module();
        if let Some(all) = init.all.as_ref().filter(|all| !all.is_empty()) {
            return all.clone();
        }

        let mut names = BTreeSet::new();
        for (name, binding) in &init.bindings {
            if name.starts_with('_') {
                continue;
            }
            if let Binding::Import(import) = binding {
                if import.level > 0 {
                    if let Some(sub) = import.module.split('.').next().filter(|s| !s.is_empty()) {
                        if import.level == 1 && !sub.starts_with('_') {
                            names.insert(sub.to_string());
                        }
                    }
                }
            }
            names.insert(name.clone());
        }

        for (star_module, level) in &init.star_imports {
            let target = PackageSources::resolve_import_target(init, star_module, *level);
            if let Some(m) = self.sources.module(&target) {
                match &m.all {
                    Some(all) => names.extend(all.iter().cloned()),
                    None => names.extend(m.public_names()),
                }
                if *level == 1 {
                    if let Some(sub) = star_module.split('.').next().filter(|s| !s.is_empty()) {
                        names.insert(sub.to_string());
                    }
                }
            }
        }
        names.into_iter().collect()
    }

    // -----------------------------------------------------------------------
    // Classes
    // -----------------------------------------------------------------------

    fn base_entries(&self, module: &'a ModuleSource, class: &'a ClassDef) -> Vec<MroEntry<'a>> {
        class
            .bases
            .iter()
            .map(|expr| {
                let bare = expr.split('[').next().unwrap_or(expr).trim();
                let short = bare.rsplit('.').next().unwrap_or(bare).to_string();
                if bare == OBJECT {
                    return MroEntry::object();
                }
                match self.resolve_in(module, bare, 0) {
                    Some(Resolved::Class(m, c)) => MroEntry::internal(m, c),
                    Some(Resolved::External(source)) => MroEntry {
                        key: format!("{source}.{short}"),
                        name: short,
                        class: None,
                    },
                    _ => MroEntry {
                        key: format!("?{bare}"),
                        name: short,
                        class: None,
                    },
                }
            })
            .collect()
    }

    /// C3 linearization over in-package classes. Bases defined outside the
    /// package are treated as `[base, object]`.
    fn linearize(
        &self,
        module: &'a ModuleSource,
        class: &'a ClassDef,
        depth: usize,
    ) -> Vec<MroEntry<'a>> {
        let this = MroEntry::internal(module, class);
        if depth > MAX_RESOLVE_DEPTH {
            return vec![this, MroEntry::object()];
        }
        let bases = self.base_entries(module, class);
        if bases.is_empty() {
            return vec![this, MroEntry::object()];
        }

        let mut sequences: Vec<Vec<MroEntry<'a>>> = bases
            .iter()
            .map(|base| match base.class {
                Some((m, c)) => self.linearize(m, c, depth + 1),
                None if base.is_object() => vec![MroEntry::object()],
                None => vec![base.clone(), MroEntry::object()],
            })
            .collect();
        sequences.push(bases);

        let mut mro = vec![this];
        match c3_merge(sequences.clone()) {
            Some(merged) => mro.extend(merged),
            None => {
                warn!(
                    "Inconsistent MRO for {}.{}, using depth-first order",
                    module.name, class.name
                );
                let mut seen = HashSet::new();
                seen.insert(mro[0].key.clone());
                for entry in sequences.into_iter().flatten() {
                    if !entry.is_object() && seen.insert(entry.key.clone()) {
                        mro.push(entry);
                    }
                }
                mro.push(MroEntry::object());
            }
        }
        mro
    }

    fn class_info(&self, mro: &[MroEntry<'a>], bases: &[MroEntry<'a>]) -> ClassInfo {
        let mut info = ClassInfo {
            base_classes: if bases.is_empty() {
                vec![OBJECT.to_string()]
            } else {
                bases.iter().map(|b| b.name.clone()).collect()
            },
            mro: mro.iter().map(|e| e.name.clone()).collect(),
            ..ClassInfo::default()
        };

        let mut seen: HashSet<&str> = HashSet::new();
        for (idx, entry) in mro.iter().enumerate() {
            let Some((owner_module, owner)) = entry.class else {
                continue;
            };
            for (name, member) in &owner.members {
                if name.starts_with('_') || !seen.insert(name.as_str()) {
                    continue;
                }
                match member {
                    ClassMember::Function(f) => {
                        let doc = f
                            .docstring
                            .clone()
                            .or_else(|| inherited_member_doc(&mro[idx + 1..], name))
                            .unwrap_or_default();
                        let mut member_info = MemberInfo {
                            name: name.clone(),
                            doc,
                            defined_in: owner.name.clone(),
                            signature: None,
                        };
                        if f.is_cached_property() {
                            info.descriptors.insert(name.clone(), member_info);
                        } else if f.is_property() {
                            info.properties.insert(name.clone(), member_info);
                        } else if f.has_decorator("classmethod") {
                            member_info.signature = Some(f.bound_signature());
                            info.class_methods.insert(name.clone(), member_info);
                        } else if f.has_decorator("staticmethod") {
                            member_info.signature = Some(f.signature());
                            info.static_methods.insert(name.clone(), member_info);
                        } else {
                            member_info.signature = Some(f.signature());
                            info.methods.insert(name.clone(), member_info);
                        }
                    }
                    // Annotation-only fields are not class attributes.
                    ClassMember::Attribute { annotation: Some(_), value: None, .. } => {}
                    ClassMember::Attribute { value, .. } => {
                        let descriptor_doc = value
                            .as_deref()
                            .and_then(|v| self.descriptor_doc(owner_module, v));
                        let member_info = MemberInfo {
                            name: name.clone(),
                            doc: descriptor_doc.clone().unwrap_or_default(),
                            defined_in: owner.name.clone(),
                            signature: None,
                        };
                        if descriptor_doc.is_some() {
                            info.descriptors.insert(name.clone(), member_info);
                        } else {
                            info.class_variables.insert(name.clone(), member_info);
                        }
                    }
                }
            }
        }
        info
    }

    /// Docstring of the descriptor a class-body value instantiates: a
    /// `cached_property(...)` call, or a call to an in-package class whose
    /// MRO implements `__get__` or `__set__`.
    fn descriptor_doc(&self, module: &'a ModuleSource, value: &str) -> Option<String> {
        let target = call_target(value)?;
        if target.rsplit('.').next() == Some("cached_property") {
            return Some(String::new());
        }
        let Resolved::Class(m, class) = self.resolve_in(module, target, 0)? else {
            return None;
        };
        self.linearize(m, class, 0)
            .iter()
            .filter_map(|e| e.class)
            .any(|(_, c)| c.implements_descriptor())
            .then(|| class.docstring.clone().unwrap_or_default())
    }

    /// What `inspect.signature(cls)` reports: `__init__` without `self`, a
    /// synthesized dataclass initializer, or a generic fallback.
    fn class_signature(&self, mro: &[MroEntry<'a>]) -> String {
        for entry in mro {
            let Some((_, class)) = entry.class else {
                continue;
            };
            if let Some(init) = class.method("__init__") {
                return init.bound_signature();
            }
            if class.has_decorator("dataclass") {
                return dataclass_signature(mro);
            }
        }
        if mro.iter().any(|e| e.class.is_none() && !e.is_object()) {
            "(*args, **kwargs)".to_string()
        } else {
            "()".to_string()
        }
    }

    /// Direct subclasses of `target` anywhere in the package, sorted.
    fn subclasses_of(&self, target: &MroEntry<'a>) -> Vec<String> {
        let mut subclasses = BTreeSet::new();
        for module in self.sources.modules.values() {
            for binding in module.bindings.values() {
                let Binding::Class(candidate) = binding else {
                    continue;
                };
                if self
                    .base_entries(module, candidate)
                    .iter()
                    .any(|b| b.key == target.key)
                {
                    subclasses.insert(candidate.name.clone());
                }
            }
        }
        subclasses.into_iter().collect()
    }

    // -----------------------------------------------------------------------
    // Assembly
    // -----------------------------------------------------------------------

    fn run(&self) -> ApiData {
        let init = self.sources.init_module();
        let version = self
            .resolve_in(init, "__version__", 0)
            .and_then(|r| match r {
                Resolved::Variable(_, a) => a.literal.clone(),
                _ => None,
            })
            .unwrap_or_else(|| "unknown".to_string());

        let mut data = ApiData {
            package_info: PackageInfo {
                name: self.sources.name.clone(),
                version,
                file: Some(init.path.to_string_lossy().to_string()),
                doc: init.docstring.clone().unwrap_or_default(),
                all: init.all.clone().unwrap_or_default(),
            },
            ..ApiData::default()
        };

        for name in self.export_names() {
            let Some(resolved) = self.resolve_in(init, &name, 0) else {
                warn!("API element {name} not found in package");
                continue;
            };
            self.record(&name, resolved, &mut data);
        }
        data
    }

    fn record(&self, name: &str, resolved: Resolved<'a>, data: &mut ApiData) {
        let element = match resolved {
            Resolved::Class(module, class) => {
                let mro = self.linearize(module, class, 0);
                let bases = self.base_entries(module, class);
                let class_info = self.class_info(&mro, &bases);

                let mut element = ApiElement::new(name, ElementKind::Class, &module.name);
                element.qualname = class.name.clone();
                element.doc = class
                    .docstring
                    .clone()
                    .or_else(|| {
                        mro.iter()
                            .skip(1)
                            .find_map(|e| e.class.and_then(|(_, c)| c.docstring.clone()))
                    })
                    .unwrap_or_default();
                element.source_file = Some(module.path.to_string_lossy().to_string());
                element.line_number = Some(class.line);

                data.signatures.insert(name.to_string(), self.class_signature(&mro));
                let annotations: BTreeMap<String, String> = class
                    .members
                    .iter()
                    .filter_map(|(field, member)| match member {
                        ClassMember::Attribute { annotation: Some(a), .. } => {
                            Some((field.clone(), a.clone()))
                        }
                        _ => None,
                    })
                    .collect();
                insert_hints(data, name, TypeHints { annotations, ..TypeHints::default() });
                data.inheritance.insert(
                    name.to_string(),
                    InheritanceInfo {
                        bases: class_info.base_classes.clone(),
                        mro: class_info.mro.clone(),
                        subclasses: self.subclasses_of(&mro[0]),
                    },
                );
                if !class.decorators.is_empty() {
                    data.decorators.insert(name.to_string(), class.decorators.clone());
                }
                element.class_info = Some(class_info);
                element
            }
            Resolved::Function(module, function) => {
                let mut element = ApiElement::new(name, ElementKind::Function, &module.name);
                element.qualname = function.name.clone();
                element.doc = function.docstring.clone().unwrap_or_default();
                element.signature = Some(function.signature());
                element.source_file = Some(module.path.to_string_lossy().to_string());
                element.line_number = Some(function.line);
                element.function_info = Some(function_info(function));

                data.signatures.insert(name.to_string(), function.signature());
                insert_hints(data, name, function_hints(function));
                if !function.decorators.is_empty() {
                    data.decorators.insert(name.to_string(), function.decorators.clone());
                }
                element
            }
            Resolved::Module(module) => {
                let mut element = ApiElement::new(name, ElementKind::Module, &module.name);
                element.doc = module.docstring.clone().unwrap_or_default();
                element.source_file = Some(module.path.to_string_lossy().to_string());
                element.module_info = Some(ModuleInfo {
                    file: Some(module.path.to_string_lossy().to_string()),
                    package: module.package(),
                    all: module.all.clone().unwrap_or_default(),
                    members: module.public_names(),
                });
                let annotations: BTreeMap<String, String> = module
                    .bindings
                    .iter()
                    .filter_map(|(var, binding)| match binding {
                        Binding::Assignment(AssignmentDef { annotation: Some(a), .. }) => {
                            Some((var.clone(), a.clone()))
                        }
                        _ => None,
                    })
                    .collect();
                insert_hints(data, name, TypeHints { annotations, ..TypeHints::default() });
                element
            }
            Resolved::Variable(module, _) => {
                ApiElement::new(name, ElementKind::Variable, &module.name)
            }
            Resolved::External(source) => ApiElement::new(name, ElementKind::Variable, &source),
            Resolved::ExternalModule(source) => ApiElement::new(name, ElementKind::Module, &source),
        };

        if !element.doc.is_empty() {
            data.docstrings.insert(
                name.to_string(),
                DocstringInfo {
                    raw: element.doc.clone(),
                    summary: summary_line(&element.doc),
                    sections: parse_sections(&element.doc),
                },
            );
        }
        debug!("Extracted {} {name} from {}", element.kind, element.module);
        data.public_api.insert(name.to_string(), element);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn c3_merge<'a>(mut sequences: Vec<Vec<MroEntry<'a>>>) -> Option<Vec<MroEntry<'a>>> {
    let mut merged = Vec::new();
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Some(merged);
        }
        let candidate = sequences
            .iter()
            .map(|s| &s[0])
            .find(|head| {
                !sequences
                    .iter()
                    .any(|s| s[1..].iter().any(|e| e.key == head.key))
            })?
            .clone();
        for seq in sequences.iter_mut() {
            if seq[0].key == candidate.key {
                seq.remove(0);
            }
        }
        merged.push(candidate);
    }
}

/// Callee of a call expression such as `Field(int, default=0)`.
fn call_target(value: &str) -> Option<&str> {
    let (head, _) = value.split_once('(')?;
    let head = head.trim();
    let is_name = !head.is_empty()
        && !head.starts_with('.')
        && head.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    is_name.then_some(head)
}

fn inherited_member_doc(rest: &[MroEntry<'_>], name: &str) -> Option<String> {
    rest.iter()
        .filter_map(|e| e.class)
        .find_map(|(_, c)| c.method(name).and_then(|f| f.docstring.clone()))
}

fn dataclass_signature(mro: &[MroEntry<'_>]) -> String {
    let mut fields: IndexMap<String, Parameter> = IndexMap::new();
    for entry in mro.iter().rev() {
        let Some((_, class)) = entry.class else {
            continue;
        };
        if !class.has_decorator("dataclass") {
            continue;
        }
        for (name, member) in &class.members {
            if let ClassMember::Attribute { annotation: Some(annotation), value, .. } = member {
                if annotation.starts_with("ClassVar") || annotation.contains(".ClassVar") {
                    continue;
                }
                fields.insert(
                    name.clone(),
                    Parameter {
                        name: name.clone(),
                        kind: ParameterKind::PositionalOrKeyword,
                        annotation: Some(annotation.clone()),
                        default: value.clone(),
                        has_default: value.is_some(),
                    },
                );
            }
        }
    }
    let params: Vec<Parameter> = fields.into_values().collect();
    render_signature(&params, Some("None"))
}

fn function_info(function: &FunctionDef) -> FunctionInfo {
    let mut info = FunctionInfo {
        is_async: function.is_async,
        is_generator: function.is_generator,
        parameters: function.parameters.clone(),
        return_annotation: function.return_annotation.clone(),
        ..FunctionInfo::default()
    };
    for param in &function.parameters {
        match param.kind {
            ParameterKind::VarPositional => info.var_positional = Some(param.name.clone()),
            ParameterKind::VarKeyword => info.var_keyword = Some(param.name.clone()),
            _ => {}
        }
        if let Some(default) = &param.default {
            info.defaults.insert(param.name.clone(), default.clone());
        }
    }
    info
}

fn function_hints(function: &FunctionDef) -> TypeHints {
    let parameter_hints: BTreeMap<String, String> = function
        .parameters
        .iter()
        .filter_map(|p| p.annotation.clone().map(|a| (p.name.clone(), a)))
        .collect();
    let mut annotations = parameter_hints.clone();
    if let Some(ret) = &function.return_annotation {
        annotations.insert("return".to_string(), ret.clone());
    }
    TypeHints {
        annotations,
        parameter_hints,
        return_hint: function.return_annotation.clone(),
    }
}

fn insert_hints(data: &mut ApiData, name: &str, hints: TypeHints) {
    if !hints.is_empty() {
        data.type_hints.insert(name.to_string(), hints);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn extract(files: &[(&str, &str)]) -> ApiData {
        let dir = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            write(dir.path(), &format!("src/demo/{rel}"), content);
        }
        ApiExtractor::new("demo", &dir.path().join("src"))
            .extract_complete_api()
            .unwrap()
    }

    #[test]
    fn test_all_is_honoured_and_missing_names_skipped() {
        let data = extract(&[(
            "__init__.py",
            concat!(
                "__all__ = ['run', 'ghost']\n__version__ = '1.2.0'\n\ndef run():\n    pass\n\n",
                "def hidden():\n    pass\n",
            ),
        )]);
        let names: Vec<&str> = data.public_api.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["run"]);
        assert_eq!(data.package_info.version, "1.2.0");
        assert_eq!(data.package_info.all, vec!["run".to_string(), "ghost".to_string()]);
    }

    #[test]
    fn test_relative_reexports_resolve_to_defining_module() {
        let data = extract(&[
            ("__init__.py", "from .core import fetch as get_rows\nfrom .models import Row\n"),
            (
                "core.py",
                concat!(
                    "async def fetch(limit: int = 10, *, strict=False) -> list:\n",
                    "    \"\"\"Fetch rows.\n\n    Args:\n        limit: max rows\n    \"\"\"\n",
                ),
            ),
            ("models.py", "from .base import Record as Row\n"),
            ("base.py", "class Record:\n    \"\"\"A record.\"\"\"\n"),
        ]);
        let fetch = data.element("get_rows").unwrap();
        assert_eq!(fetch.kind, ElementKind::Function);
        assert_eq!(fetch.module, "demo.core");
        assert_eq!(fetch.qualname, "fetch");
        let info = fetch.function_info.as_ref().unwrap();
        assert!(info.is_async);
        assert_eq!(info.parameters[1].kind, ParameterKind::KeywordOnly);
        assert_eq!(info.defaults["limit"], "10");
        assert_eq!(
            data.signatures["get_rows"],
            "(limit: int = 10, *, strict=False) -> list"
        );
        assert_eq!(data.docstrings["get_rows"].summary, "Fetch rows.");
        assert!(data.docstrings["get_rows"].sections.contains_key("args"));
        assert_eq!(data.type_hints["get_rows"].return_hint.as_deref(), Some("list"));

        let row = data.element("Row").unwrap();
        assert_eq!(row.kind, ElementKind::Class);
        assert_eq!(row.module, "demo.base");
        assert_eq!(data.signatures["Row"], "()");
        // `from .core import ...` binds the submodule on the package.
        assert_eq!(data.element("core").unwrap().kind, ElementKind::Module);
    }

    #[test]
    fn test_class_members_and_c3_mro() {
        let data = extract(&[(
            "__init__.py",
            r#"
__all__ = ["A", "B", "C", "D"]

class A:
    """Root."""
    def run(self, x):
        """Run A."""

class B(A):
    def run(self, x):
        pass

    @classmethod
    def build(cls, name: str) -> "B":
        pass

class C(A):
    @staticmethod
    def helper(v):
        pass

    @property
    def size(self):
        """Size."""
        return 0

    LIMIT = 5

class D(B, C):
    def __init__(self, path, *, verbose=False):
        self.path = path
"#,
        )]);
        let d = data.element("D").unwrap();
        let info = d.class_info.as_ref().unwrap();
        assert_eq!(info.mro, vec!["D", "B", "C", "A", "object"]);
        assert_eq!(info.base_classes, vec!["B", "C"]);
        assert_eq!(info.methods["run"].defined_in, "B");
        assert_eq!(info.methods["run"].doc, "Run A.");
        assert_eq!(info.methods["run"].signature.as_deref(), Some("(self, x)"));
        assert_eq!(info.class_methods["build"].signature.as_deref(), Some("(name: str) -> \"B\""));
        assert_eq!(info.static_methods["helper"].defined_in, "C");
        assert!(info.properties.contains_key("size"));
        assert!(info.class_variables.contains_key("LIMIT"));
        assert!(!info.methods.contains_key("__init__"));
        assert_eq!(data.signatures["D"], "(path, *, verbose=False)");
        assert_eq!(d.doc, "Root.");
        assert_eq!(data.inheritance["A"].subclasses, vec!["B", "C"]);
        assert_eq!(data.inheritance["A"].bases, vec!["object"]);
    }

    #[test]
    fn test_external_bases_and_reexports() {
        let data = extract(&[(
            "__init__.py",
            concat!(
                "from typing import Optional\nimport json\nimport os.path\n",
                "import numpy.linalg as la\nfrom abc import ABC\n\nclass Base(ABC):\n    pass\n\n",
                "class Failure(Exception):\n    pass\n",
            ),
        )]);
        let names: Vec<&str> = data.public_api.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["ABC", "Base", "Failure", "Optional", "json", "la", "os"]);
        assert_eq!(data.element("Optional").unwrap().kind, ElementKind::Variable);
        assert_eq!(data.element("Optional").unwrap().module, "typing");
        let json = data.element("json").unwrap();
        assert_eq!(json.kind, ElementKind::Module);
        assert_eq!(json.module, "json");
        assert!(json.module_info.is_none());
        assert_eq!(data.element("os").unwrap().module, "os");
        assert_eq!(data.element("la").unwrap().module, "numpy.linalg");
        let base = data.element("Base").unwrap().class_info.clone().unwrap();
        assert_eq!(base.mro, vec!["Base", "ABC", "object"]);
        assert_eq!(data.signatures["Failure"], "(*args, **kwargs)");
    }

    #[test]
    fn test_descriptors_are_split_from_properties() {
        let data = extract(&[
            (
                "__init__.py",
                r#"
import functools
from functools import cached_property
from .fields import Typed, Plain

__all__ = ["Model"]

class Model:
    name = Typed(str)
    label = Plain()
    total = functools.cached_property(lambda self: 0)
    LIMIT = 5

    @cached_property
    def heavy(self):
        """Computed once."""
        return 1

    @functools.cached_property
    def other(self):
        return 2

    @property
    def size(self):
        return 0
"#,
            ),
            (
                "fields.py",
                r#"
class Base:
    def __get__(self, obj, objtype=None):
        return self

class Typed(Base):
    """Type-checked attribute."""
    def __init__(self, kind):
        self.kind = kind

class Plain:
    pass
"#,
            ),
        ]);
        let info = data.element("Model").unwrap().class_info.clone().unwrap();
        let descriptors: Vec<&str> = info.descriptors.keys().map(String::as_str).collect();
        assert_eq!(descriptors, vec!["heavy", "name", "other", "total"]);
        assert_eq!(info.descriptors["heavy"].doc, "Computed once.");
        assert_eq!(info.descriptors["name"].doc, "Type-checked attribute.");
        let properties: Vec<&str> = info.properties.keys().map(String::as_str).collect();
        assert_eq!(properties, vec!["size"]);
        let variables: Vec<&str> = info.class_variables.keys().map(String::as_str).collect();
        assert_eq!(variables, vec!["LIMIT", "label"]);
        assert!(!info.methods.contains_key("heavy"));
    }

    #[test]
    fn test_generator_and_dataclass_signature() {
        let data = extract(&[(
            "__init__.py",
            r#"
from dataclasses import dataclass

__all__ = ["Settings", "rows"]

@dataclass
class Settings:
    path: str
    retries: int = 3

def rows(n):
    for i in range(n):
        yield i
"#,
        )]);
        assert_eq!(
            data.signatures["Settings"],
            "(path: str, retries: int = 3) -> None"
        );
        assert_eq!(data.decorators["Settings"], vec!["dataclass".to_string()]);
        let info = data.element("rows").unwrap().function_info.clone().unwrap();
        assert!(info.is_generator);
        assert!(!info.is_async);
        let settings = data.element("Settings").unwrap().class_info.clone().unwrap();
        assert!(settings.class_variables.contains_key("retries"));
        assert!(!settings.class_variables.contains_key("path"));
    }

    #[test]
    fn test_missing_package_fails_with_import_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ApiExtractor::new("demo", dir.path())
            .extract_complete_api()
            .unwrap_err();
        assert!(matches!(err, UltrathinkError::Import(_)));
    }
}
