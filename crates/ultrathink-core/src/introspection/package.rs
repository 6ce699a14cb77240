//! Package discovery and structural analysis.
//!
//! [`PackageSources`] locates a Python package on disk, parses every module
//! in it and answers name lookups across modules. [`PackageSources::analyze`]
//! produces the structural overview used by the documentation build
//! (module tree, file layout, import dependencies).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::{UltrathinkError, UltrathinkResult};
use crate::introspection::parser::{Binding, ModuleSource};

/// Top-level standard library modules recognised when grouping imports.
const STDLIB_MODULES: &[&str] = &[
    "abc", "argparse", "ast", "asyncio", "base64", "collections", "concurrent", "contextlib",
    "copy", "csv", "dataclasses", "datetime", "decimal", "enum", "functools", "glob", "gzip",
    "hashlib", "heapq", "importlib", "inspect", "io", "itertools", "json", "logging", "math",
    "multiprocessing", "operator", "os", "pathlib", "pickle", "platform", "queue", "random", "re",
    "shutil", "signal", "socket", "sqlite3", "statistics", "string", "struct", "subprocess", "sys",
    "tempfile", "textwrap", "threading", "time", "traceback", "types", "typing", "unittest",
    "urllib", "uuid", "warnings", "weakref", "zipfile", "zoneinfo",
];

/// All parsed modules of one package.
#[derive(Debug, Clone)]
pub struct PackageSources {
    pub name: String,
    pub source_dir: PathBuf,
    /// Directory holding the package's `__init__.py`.
    pub root: PathBuf,
    /// Modules keyed by dotted name, sorted.
    pub modules: IndexMap<String, ModuleSource>,
}

impl PackageSources {
    /// Locate `package` under `source_dir` and parse every module in it.
    ///
    /// Accepts either `<source_dir>/<package>/__init__.py` or a `source_dir`
    /// that is itself the package directory.
    pub fn load(source_dir: &Path, package: &str) -> UltrathinkResult<Self> {
        let root = locate_package(source_dir, package).ok_or_else(|| {
            UltrathinkError::Import(format!(
                "No module named '{package}' under {}",
                source_dir.display()
            ))
        })?;

        let mut modules = IndexMap::new();
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                e.depth() == 0 || !(name.starts_with('.') || name == "__pycache__")
            });

        for entry in walker {
            let entry = entry.map_err(|e| UltrathinkError::Io(std::io::Error::other(e)))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "py") {
                continue;
            }
            let Some((module_name, is_package)) = module_name_for(&root, path, package) else {
                continue;
            };
            let source = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Skipping unreadable module {}: {e}", path.display());
                    continue;
                }
            };
            let module = ModuleSource::parse(&module_name, path, &source, is_package)?;
            if module.has_syntax_errors {
                debug!("Module {module_name} contains syntax errors; parsed partially");
            }
            modules.insert(module_name, module);
        }

        if !modules.contains_key(package) {
            return Err(UltrathinkError::Import(format!(
                "Package '{package}' has no __init__.py at {}",
                root.display()
            )));
        }
        modules.sort_keys();

        info!("Loaded package {package}: {} modules", modules.len());
        Ok(Self {
            name: package.to_string(),
            source_dir: source_dir.to_path_buf(),
            root,
            modules,
        })
    }

    /// The package's `__init__` module.
    pub fn init_module(&self) -> &ModuleSource {
        // `load` guarantees the entry exists.
        &self.modules[self.name.as_str()]
    }

    pub fn module(&self, name: &str) -> Option<&ModuleSource> {
        self.modules.get(name)
    }

    /// Absolute dotted name for an import written inside `from_module`.
    pub fn resolve_import_target(from_module: &ModuleSource, module: &str, level: usize) -> String {
        if level == 0 {
            return module.to_string();
        }
        let mut base = from_module.package().unwrap_or_default();
        for _ in 1..level {
            base = match base.rsplit_once('.') {
                Some((parent, _)) => parent.to_string(),
                None => String::new(),
            };
        }
        match (base.is_empty(), module.is_empty()) {
            (true, _) => module.to_string(),
            (false, true) => base,
            (false, false) => format!("{base}.{module}"),
        }
    }

    /// Whether a dotted name is this package or one of its modules.
    pub fn is_internal(&self, dotted: &str) -> bool {
        dotted == self.name || dotted.starts_with(&format!("{}.", self.name))
    }

    /// Source file path relative to the source directory, for display.
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.source_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    // -----------------------------------------------------------------------
    // Structural analysis
    // -----------------------------------------------------------------------

    /// Structural overview: package info, module tree, file layout,
    /// dependencies and metadata.
    pub fn analyze(&self) -> Value {
        let init = self.init_module();
        json!({
            "package_info": {
                "name": self.name,
                "version": init.version().unwrap_or_else(|| "unknown".to_string()),
                "file": init.path.to_string_lossy(),
                "package_dir": self.root.to_string_lossy(),
                "docstring": init.docstring.clone().unwrap_or_default(),
                "all_exports": init.all.clone().unwrap_or_default(),
            },
            "module_tree": self.module_tree(),
            "file_structure": self.file_structure(),
            "dependencies": self.dependencies(),
            "metadata": {
                "analysis_timestamp": chrono::Local::now().to_rfc3339(),
                "package_location": self.root.to_string_lossy(),
                "total_modules": self.modules.len(),
                "total_lines_of_code": self.modules.values().map(|m| m.line_count).sum::<usize>(),
            },
        })
    }

    fn module_tree(&self) -> Value {
        let mut tree = Map::new();
        for (name, module) in &self.modules {
            let leaf = name.rsplit('.').next().unwrap_or(name);
            if leaf.starts_with('_') && !module.is_package {
                continue;
            }
            let mut classes = Vec::new();
            let mut functions = Vec::new();
            let mut constants = Vec::new();
            for (bound, binding) in &module.bindings {
                match binding {
                    Binding::Class(c) => classes.push(json!({
                        "name": c.name,
                        "docstring": c.docstring.clone().unwrap_or_default(),
                        "line_number": c.line,
                        "is_public": !c.name.starts_with('_'),
                    })),
                    Binding::Function(f) => functions.push(json!({
                        "name": f.name,
                        "docstring": f.docstring.clone().unwrap_or_default(),
                        "line_number": f.line,
                        "is_public": !f.name.starts_with('_'),
                        "is_async": f.is_async,
                    })),
                    Binding::Assignment(a)
                        if bound.chars().any(|c| c.is_ascii_uppercase())
                            && !bound.chars().any(|c| c.is_ascii_lowercase()) =>
                    {
                        constants.push(json!({"name": bound, "line_number": a.line}));
                    }
                    _ => {}
                }
            }
            tree.insert(
                name.clone(),
                json!({
                    "file_path": module.path.to_string_lossy(),
                    "docstring": module.docstring.clone().unwrap_or_default(),
                    "classes": classes,
                    "functions": functions,
                    "constants": constants,
                    "all_exports": module.all.clone().unwrap_or_default(),
                    "line_count": module.line_count,
                }),
            );
        }
        debug!("Built module tree with {} modules", tree.len());
        Value::Object(tree)
    }

    fn file_structure(&self) -> Value {
        let mut total_files = 0usize;
        let mut python_files = 0usize;
        let mut directories = 0usize;
        let mut file_sizes = Map::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                e.depth() == 0 || !(name.starts_with('.') || name == "__pycache__")
            })
            .filter_map(Result::ok);

        for entry in walker.filter(|e| e.depth() > 0) {
            if entry.file_type().is_dir() {
                directories += 1;
                continue;
            }
            total_files += 1;
            if entry.path().extension().is_some_and(|ext| ext == "py") {
                python_files += 1;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            file_sizes.insert(rel, json!(size));
        }

        json!({
            "total_files": total_files,
            "python_files": python_files,
            "directories": directories,
            "file_sizes": file_sizes,
        })
    }

    fn dependencies(&self) -> Value {
        let mut stdlib = BTreeSet::new();
        let mut third_party = BTreeSet::new();
        let mut internal = BTreeSet::new();

        for module in self.modules.values() {
            for binding in module.bindings.values() {
                let Binding::Import(import) = binding else {
                    continue;
                };
                let target = Self::resolve_import_target(module, &import.module, import.level);
                if target.is_empty() {
                    continue;
                }
                let top = target.split('.').next().unwrap_or(&target);
                if import.level > 0 || self.is_internal(&target) {
                    internal.insert(target);
                } else if STDLIB_MODULES.contains(&top) {
                    stdlib.insert(target);
                } else {
                    third_party.insert(target);
                }
            }
        }

        json!({
            "standard_library": stdlib,
            "third_party": third_party,
            "internal": internal,
        })
    }
}

fn locate_package(source_dir: &Path, package: &str) -> Option<PathBuf> {
    let nested = package
        .split('.')
        .fold(source_dir.to_path_buf(), |acc, part| acc.join(part));
    if nested.join("__init__.py").is_file() {
        return Some(nested);
    }
    let last = package.rsplit('.').next().unwrap_or(package);
    let is_package_dir = source_dir
        .file_name()
        .is_some_and(|name| name.to_string_lossy() == last);
    if is_package_dir && source_dir.join("__init__.py").is_file() {
        return Some(source_dir.to_path_buf());
    }
    None
}

/// Dotted module name for a file under the package root, plus whether the
/// file is a package `__init__`.
fn module_name_for(root: &Path, path: &Path, package: &str) -> Option<(String, bool)> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    let file = parts.pop()?;
    let stem = file.strip_suffix(".py")?;
    let is_package = stem == "__init__";
    if !is_package {
        parts.push(stem.to_string());
    }
    let mut name = package.to_string();
    for part in parts {
        name.push('.');
        name.push_str(&part);
    }
    Some((name, is_package))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/demo/__init__.py",
            concat!(
                "\"\"\"Demo package.\"\"\"\nfrom .core import run\nimport json\n",
                "__version__ = \"0.3.0\"\n",
            ),
        );
        write(dir.path(), "src/demo/core.py", "import numpy\n\ndef run():\n    pass\n");
        write(dir.path(), "src/demo/sub/__init__.py", "");
        write(dir.path(), "src/demo/sub/tools.py", "from ..core import run\nMAX_ROWS = 10\n");
        write(dir.path(), "src/demo/__pycache__/core.cpython-312.py", "garbage(");
        dir
    }

    #[test]
    fn test_load_names_modules() {
        let dir = fixture();
        let sources = PackageSources::load(&dir.path().join("src"), "demo").unwrap();
        let names: Vec<&str> = sources.modules.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["demo", "demo.core", "demo.sub", "demo.sub.tools"]);
        assert!(sources.init_module().is_package);
        assert_eq!(sources.init_module().version().as_deref(), Some("0.3.0"));
    }

    #[test]
    fn test_source_dir_may_be_package_dir() {
        let dir = fixture();
        let sources = PackageSources::load(&dir.path().join("src/demo"), "demo").unwrap();
        assert_eq!(sources.modules.len(), 4);
    }

    #[test]
    fn test_missing_package_is_import_error() {
        let dir = fixture();
        let err = PackageSources::load(&dir.path().join("src"), "absent").unwrap_err();
        assert!(matches!(err, UltrathinkError::Import(_)));
    }

    #[test]
    fn test_relative_import_targets() {
        let dir = fixture();
        let sources = PackageSources::load(&dir.path().join("src"), "demo").unwrap();
        let tools = sources.module("demo.sub.tools").unwrap();
        assert_eq!(PackageSources::resolve_import_target(tools, "core", 2), "demo.core");
        assert_eq!(PackageSources::resolve_import_target(tools, "", 1), "demo.sub");
        let init = sources.init_module();
        assert_eq!(PackageSources::resolve_import_target(init, "core", 1), "demo.core");
    }

    #[test]
    fn test_analyze_groups_dependencies() {
        let dir = fixture();
        let sources = PackageSources::load(&dir.path().join("src"), "demo").unwrap();
        let analysis = sources.analyze();
        assert_eq!(analysis["package_info"]["version"], "0.3.0");
        assert_eq!(analysis["dependencies"]["standard_library"], json!(["json"]));
        assert_eq!(analysis["dependencies"]["third_party"], json!(["numpy"]));
        assert!(analysis["dependencies"]["internal"]
            .as_array()
            .unwrap()
            .contains(&json!("demo.core")));
        assert_eq!(analysis["file_structure"]["python_files"], 4);
        assert_eq!(
            analysis["module_tree"]["demo.sub.tools"]["constants"][0]["name"],
            "MAX_ROWS"
        );
    }
}
