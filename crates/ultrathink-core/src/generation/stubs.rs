//! Markdown reference pages for API elements.
//!
//! One page per element at `generated_docs/api_reference/<safe_name>_<type>.md`.
//! The example placeholders carry a `# TODO:` marker, which the doctest
//! collector treats as "do not execute".

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::config::UltrathinkConfig;
use crate::errors::UltrathinkResult;
use crate::generation::Markdown;
use crate::introspection::docstring::parse_detailed_sections;
use crate::models::{ApiData, ApiElement, ElementKind, MemberInfo};
use crate::persist::now_iso;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").unwrap());

/// `name` with every character outside `[A-Za-z0-9_.-]` replaced by `_`.
pub fn safe_name(name: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(name, "_").into_owned()
}

pub struct StubGenerator {
    reference_dir: PathBuf,
}

impl StubGenerator {
    /// Pages go under `<storage_root>/generated_docs/api_reference`.
    pub fn new(storage_root: &Path) -> Self {
        Self {
            reference_dir: storage_root.join("generated_docs").join("api_reference"),
        }
    }

    pub fn from_config(config: &UltrathinkConfig) -> Self {
        Self::new(config.storage_root())
    }

    pub fn reference_dir(&self) -> &Path {
        &self.reference_dir
    }

    pub fn stub_path(&self, name: &str, kind: ElementKind) -> PathBuf {
        self.reference_dir
            .join(format!("{}_{}.md", safe_name(name), kind.as_str()))
    }

    /// Pages for the named elements only. Names missing from `api_data` are
    /// logged and skipped.
    pub fn generate_stubs_for_new_elements(
        &self,
        names: &[String],
        api_data: &ApiData,
    ) -> UltrathinkResult<BTreeMap<String, PathBuf>> {
        std::fs::create_dir_all(&self.reference_dir)?;
        let mut generated = BTreeMap::new();
        for name in names {
            let Some(element) = api_data.element(name) else {
                warn!("Element {name} not found in API data");
                continue;
            };
            if let Some(path) = self.write_stub(name, element) {
                generated.insert(name.clone(), path);
            }
        }
        Ok(generated)
    }

    /// Pages for every element, skipping existing files unless `force`.
    pub fn regenerate_all_stubs(
        &self,
        api_data: &ApiData,
        force: bool,
    ) -> UltrathinkResult<BTreeMap<String, PathBuf>> {
        std::fs::create_dir_all(&self.reference_dir)?;
        let mut generated = BTreeMap::new();
        for (name, element) in &api_data.public_api {
            let path = self.stub_path(name, element.kind);
            if path.exists() && !force {
                debug!("Skipping existing stub: {}", path.display());
                continue;
            }
            if let Some(path) = self.write_stub(name, element) {
                generated.insert(name.clone(), path);
            }
        }
        Ok(generated)
    }

    fn write_stub(&self, name: &str, element: &ApiElement) -> Option<PathBuf> {
        let path = self.stub_path(name, element.kind);
        match std::fs::write(&path, render_stub(name, element)) {
            Ok(()) => {
                info!("Generated stub for {name}: {}", path.display());
                Some(path)
            }
            Err(e) => {
                error!("Failed to generate stub for {name}: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the reference page for one element.
pub fn render_stub(name: &str, element: &ApiElement) -> String {
    let sections = parse_detailed_sections(&element.doc);
    let timestamp = now_iso();
    let mut md = Markdown::new();
    match element.kind {
        ElementKind::Class => render_class(&mut md, name, element, &sections),
        ElementKind::Function | ElementKind::Method | ElementKind::Callable => {
            render_function(&mut md, name, element, &sections)
        }
        ElementKind::Module => render_module(&mut md, name, element, &sections),
        ElementKind::Variable => render_variable(&mut md, name, element),
        ElementKind::Builtin => render_default(&mut md, name, element),
    }
    md.footer(Some(&timestamp));
    md.finish()
}

fn header(md: &mut Markdown, name: &str, type_label: &str, element: &ApiElement) {
    md.line(format!("# {name}"))
        .blank()
        .line(format!("**Type:** {type_label}"))
        .line(format!("**Module:** `{}`", element.module));
    if let Some(source) = &element.source_file {
        match element.line_number {
            Some(line) => md.line(format!("**Source:** {source}:{line}")),
            None => md.line(format!("**Source:** {source}")),
        };
    }
    md.blank();
}

fn overview(
    md: &mut Markdown,
    element: &ApiElement,
    sections: &BTreeMap<String, String>,
    fallback: &str,
) {
    let text = sections
        .get("description")
        .filter(|d| !d.is_empty())
        .map(String::as_str)
        .or_else(|| Some(element.doc.as_str()).filter(|d| !d.is_empty()))
        .unwrap_or(fallback);
    md.heading(2, "Overview").para(text);
}

fn optional_section(
    md: &mut Markdown,
    sections: &BTreeMap<String, String>,
    key: &str,
    title: &str,
) {
    if let Some(body) = sections.get(key).filter(|b| !b.is_empty()) {
        md.heading(2, title).para(body);
    }
}

fn member_list(
    md: &mut Markdown,
    title: &str,
    members: &BTreeMap<String, MemberInfo>,
    fallback: &str,
    with_signature: bool,
) {
    if members.is_empty() {
        return;
    }
    md.heading(2, title);
    for (member_name, member) in members {
        md.heading(3, member_name);
        md.para(if member.doc.is_empty() { fallback } else { member.doc.as_str() });
        if with_signature {
            if let Some(signature) = &member.signature {
                md.code("python", format!("def {member_name}{signature}"));
            }
        }
    }
}

fn render_class(
    md: &mut Markdown,
    name: &str,
    element: &ApiElement,
    sections: &BTreeMap<String, String>,
) {
    header(md, name, "Class", element);
    overview(md, element, sections, "TODO: Add class description");

    let info = element.class_info.clone().unwrap_or_default();
    let bases = if info.base_classes.is_empty() {
        String::new()
    } else {
        format!("({})", info.base_classes.join(", "))
    };
    md.heading(2, "Class Signature")
        .code("python", format!("class {name}{bases}:\n    ..."));
    if let Some(signature) = &element.signature {
        md.para(format!("Constructor: `{name}{signature}`"));
    }

    optional_section(md, sections, "args", "Parameters");
    member_list(md, "Methods", &info.methods, "TODO: Add method description", true);
    member_list(md, "Properties", &info.properties, "TODO: Add property description", false);
    member_list(md, "Descriptors", &info.descriptors, "TODO: Add descriptor description", false);
    let class_method_fallback = "TODO: Add class method description";
    member_list(md, "Class Methods", &info.class_methods, class_method_fallback, true);
    let static_method_fallback = "TODO: Add static method description";
    member_list(md, "Static Methods", &info.static_methods, static_method_fallback, true);

    md.heading(2, "Examples").para(example_placeholder(name, element));
    optional_section(md, sections, "notes", "Notes");
    optional_section(md, sections, "see_also", "See Also");
}

fn render_function(
    md: &mut Markdown,
    name: &str,
    element: &ApiElement,
    sections: &BTreeMap<String, String>,
) {
    let info = element.function_info.clone().unwrap_or_default();
    let kind_label = if element.kind == ElementKind::Method { "Method" } else { "Function" };
    let type_label = if info.is_async {
        format!("Async {kind_label}")
    } else {
        kind_label.to_string()
    };
    header(md, name, &type_label, element);
    overview(md, element, sections, "TODO: Add function description");

    let prefix = if info.is_async { "async " } else { "" };
    let signature = element.signature.as_deref().unwrap_or("(...)");
    md.heading(2, "Signature")
        .code("python", format!("{prefix}def {name}{signature}:\n    ..."));

    if !info.parameters.is_empty() {
        md.heading(2, "Parameters");
        for param in &info.parameters {
            let mut line = format!("- **{}**", param.name);
            if let Some(annotation) = &param.annotation {
                line.push_str(&format!(" (`{annotation}`)"));
            }
            if let Some(default) = &param.default {
                line.push_str(&format!(" = `{default}`"));
            }
            line.push_str(": TODO: Add parameter description");
            md.line(line);
        }
        md.blank();
    }
    if let Some(ret) = &info.return_annotation {
        md.heading(2, "Returns")
            .para(format!("**`{ret}`**: TODO: Add return description"));
    }
    optional_section(md, sections, "raises", "Raises");
    optional_section(md, sections, "yields", "Yields");

    md.heading(2, "Examples").para(example_placeholder(name, element));
    optional_section(md, sections, "notes", "Notes");
    optional_section(md, sections, "see_also", "See Also");
}

fn render_module(
    md: &mut Markdown,
    name: &str,
    element: &ApiElement,
    sections: &BTreeMap<String, String>,
) {
    let info = element.module_info.clone().unwrap_or_default();
    md.line(format!("# {name}"))
        .blank()
        .line("**Type:** Module")
        .line(format!(
            "**Package:** `{}`",
            info.package.as_deref().unwrap_or(&element.module)
        ));
    if let Some(file) = &info.file {
        md.line(format!("**File:** {file}"));
    }
    md.blank();
    overview(md, element, sections, "TODO: Add module description");

    if !info.all.is_empty() {
        md.heading(2, "Public API")
            .para("The following elements are exported by this module:");
        for export in &info.all {
            md.line(format!("- `{export}`"));
        }
        md.blank();
    }
    if !info.members.is_empty() {
        md.heading(2, "Members");
        for member in &info.members {
            md.line(format!("- `{member}`"));
        }
        md.blank();
    }

    let root = element.module.split('.').next().unwrap_or(&element.module);
    md.heading(2, "Examples").code(
        "python",
        format!(
            "# Import the module\nfrom {root} import {name}\n\n# TODO: Add specific usage examples"
        ),
    );
    optional_section(md, sections, "notes", "Notes");
}

fn render_variable(md: &mut Markdown, name: &str, element: &ApiElement) {
    header(md, name, "Variable/Constant", element);
    let doc = if element.doc.is_empty() {
        "TODO: Add variable description"
    } else {
        element.doc.as_str()
    };
    md.heading(2, "Overview").para(doc);
    md.heading(2, "Usage").code(
        "python",
        format!("from {} import {name}\n\n# TODO: Add usage examples", element.module),
    );
}

fn render_default(md: &mut Markdown, name: &str, element: &ApiElement) {
    header(md, name, element.kind.as_str(), element);
    let doc = if element.doc.is_empty() { "TODO: Add description" } else { element.doc.as_str() };
    md.heading(2, "Overview").para(doc);
    md.heading(2, "Usage").para(example_placeholder(name, element));
}

fn example_placeholder(name: &str, element: &ApiElement) -> String {
    if element.kind == ElementKind::Class {
        return format!(
            "```python\n# Create an instance of {name}\n{} = {name}()\n\n# TODO: Add specific usage examples\n```",
            name.to_lowercase()
        );
    }
    if element.kind.is_function_like() || element.kind == ElementKind::Callable {
        let params: Vec<String> = element
            .function_info
            .as_ref()
            .map(|f| {
                f.parameters
                    .iter()
                    .map(|p| p.name.as_str())
                    .filter(|p| *p != "self" && *p != "cls")
                    .take(3)
                    .map(|p| format!("{p}=..."))
                    .collect()
            })
            .unwrap_or_default();
        if !params.is_empty() {
            return format!(
                "```python\n# Example usage of {name}\nresult = {name}({})\n\n# TODO: Add specific usage examples\n```",
                params.join(", ")
            );
        }
    }
    format!("```python\n# Example usage of {name}\n# TODO: Add specific usage examples\n```")
}
