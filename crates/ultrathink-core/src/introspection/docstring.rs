//! Docstring cleaning, summaries and section parsing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

static DETAILED_SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(args?|arguments?|parameters?|returns?|raises?|except|examples?|notes?|see also|attributes?|yields?):\s*$",
    )
    .unwrap()
});

/// Headers recognised when extracting API data. Anything else stays inside
/// the current section.
const EXTRACTION_SECTIONS: &[(&str, &str)] = &[
    ("args:", "args"),
    ("arguments:", "args"),
    ("parameters:", "args"),
    ("returns:", "returns"),
    ("return:", "returns"),
    ("raises:", "raises"),
    ("except:", "raises"),
    ("examples:", "examples"),
    ("example:", "examples"),
    ("note:", "note"),
    ("notes:", "note"),
];

/// Normalisation for the wider header set used by generated pages.
const DETAILED_SECTIONS: &[(&str, &str)] = &[
    ("arg", "args"),
    ("args", "args"),
    ("argument", "args"),
    ("arguments", "args"),
    ("parameter", "args"),
    ("parameters", "args"),
    ("return", "returns"),
    ("returns", "returns"),
    ("raise", "raises"),
    ("raises", "raises"),
    ("except", "raises"),
    ("example", "examples"),
    ("examples", "examples"),
    ("note", "notes"),
    ("notes", "notes"),
    ("see also", "see_also"),
    ("attribute", "attributes"),
    ("attributes", "attributes"),
    ("yield", "yields"),
    ("yields", "yields"),
];

/// Strip indentation the way `inspect.cleandoc` does.
///
/// Tabs are expanded to 8 columns, the first line loses its leading
/// whitespace, the common margin of the remaining lines is removed, and
/// blank lines at either end are dropped.
pub fn cleandoc(raw: &str) -> String {
    let expanded = raw.replace('\t', "        ");
    let mut lines: Vec<&str> = expanded.split('\n').collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim_start().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    if let Some(first) = lines.first() {
        cleaned.push(first.trim_start().to_string());
    }
    for line in lines.drain(..).skip(1) {
        match line.get(margin..) {
            Some(rest) => cleaned.push(rest.trim_end().to_string()),
            None => cleaned.push(line.trim().to_string()),
        }
    }

    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    let leading_blank = cleaned.iter().take_while(|l| l.is_empty()).count();
    cleaned.drain(..leading_blank);
    cleaned.join("\n")
}

/// First line of the stripped docstring.
pub fn summary_line(doc: &str) -> String {
    doc.trim()
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .unwrap_or_default()
}

/// First sentence of the first line, used as the hashed documentation summary.
pub fn doc_summary(doc: &str) -> String {
    let first_line = summary_line(doc);
    SENTENCE_END
        .split(&first_line)
        .next()
        .map(|s| s.trim().to_string())
        .unwrap_or(first_line)
}

/// Split a docstring into `args` / `returns` / `raises` / `examples` / `note`.
///
/// Lines before the first recognised header are ignored, and a trailing
/// section with no content is dropped.
pub fn parse_sections(doc: &str) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    if doc.is_empty() {
        return sections;
    }

    let mut current: Option<&str> = None;
    let mut content: Vec<&str> = Vec::new();

    for line in doc.split('\n') {
        let header = line.trim().to_lowercase();
        let matched = EXTRACTION_SECTIONS
            .iter()
            .find(|(h, _)| *h == header)
            .map(|(_, name)| *name);
        match (matched, current) {
            (Some(name), previous) => {
                if let Some(prev) = previous {
                    sections.insert(prev.to_string(), content.join("\n"));
                }
                current = Some(name);
                content.clear();
            }
            (None, Some(_)) => content.push(line),
            (None, None) => {}
        }
    }

    if let Some(name) = current {
        if !content.is_empty() {
            sections.insert(name.to_string(), content.join("\n"));
        }
    }
    sections
}

/// Like [`parse_sections`] but keeps the leading text as `description` and
/// recognises `See Also`, `Attributes` and `Yields`. Section bodies are trimmed.
pub fn parse_detailed_sections(doc: &str) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    if doc.is_empty() {
        return sections;
    }

    let mut current = "description".to_string();
    let mut content: Vec<&str> = Vec::new();

    for line in doc.split('\n') {
        let stripped = line.trim();
        if DETAILED_SECTION_HEADER.is_match(stripped) {
            if !content.is_empty() {
                sections.insert(current.clone(), content.join("\n").trim().to_string());
            }
            current = normalize_section_name(stripped);
            content.clear();
        } else {
            content.push(line);
        }
    }

    if !content.is_empty() {
        sections.insert(current, content.join("\n").trim().to_string());
    }
    sections
}

fn normalize_section_name(header: &str) -> String {
    let lowered = header.to_lowercase();
    let key = lowered.trim_end_matches(':').trim();
    DETAILED_SECTIONS
        .iter()
        .find(|(h, _)| *h == key)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleandoc_strips_common_margin() {
        let raw = "Fetch rows.\n\n    Args:\n        limit: max rows\n    ";
        assert_eq!(cleandoc(raw), "Fetch rows.\n\nArgs:\n    limit: max rows");
    }

    #[test]
    fn cleandoc_drops_leading_blank_lines() {
        let raw = "\n    Summary here.\n\n    More text.\n";
        assert_eq!(cleandoc(raw), "Summary here.\n\nMore text.");
    }

    #[test]
    fn doc_summary_cuts_at_sentence_end() {
        assert_eq!(doc_summary("Collect data! Then more."), "Collect data");
        assert_eq!(doc_summary("  Plain line\nsecond"), "Plain line");
        assert_eq!(doc_summary(""), "");
    }

    #[test]
    fn parse_sections_maps_aliases() {
        let doc = "Summary.\n\nArguments:\n    x: value\nReturn:\n    int\nNotes:\n    careful";
        let sections = parse_sections(doc);
        assert_eq!(sections["args"], "    x: value");
        assert_eq!(sections["returns"], "    int");
        assert_eq!(sections["note"], "    careful");
        assert!(!sections.contains_key("description"));
    }

    #[test]
    fn parse_sections_drops_empty_trailing_section() {
        let sections = parse_sections("Summary.\nRaises:");
        assert!(sections.is_empty());
    }

    #[test]
    fn detailed_sections_keep_description_and_extras() {
        let doc = "Do things.\n\nSee Also:\n    other()\nYields:\n    rows";
        let sections = parse_detailed_sections(doc);
        assert_eq!(sections["description"], "Do things.");
        assert_eq!(sections["see_also"], "other()");
        assert_eq!(sections["yields"], "rows");
    }
}
