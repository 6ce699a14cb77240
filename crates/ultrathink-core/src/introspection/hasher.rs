//! Signature normalization and hashing.
//!
//! Each element is reduced to a normalized JSON record whose contents depend
//! on the [`Sensitivity`] level, serialized canonically (sorted keys, no
//! whitespace) and digested with SHA-256.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::errors::{UltrathinkError, UltrathinkResult};
use crate::introspection::docstring::doc_summary;
use crate::models::{ApiData, ApiElement, ElementKind, MemberInfo};

/// Hash recorded for an element whose record could not be built.
pub const ERROR_HASH: &str = "error";

/// How much of an element contributes to its hash.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Signatures, parameters, docs summaries and function flags.
    #[default]
    Strict,
    /// Signatures and type information, no documentation.
    Moderate,
    /// Names and signatures only.
    Relaxed,
}

impl Sensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::Strict => "strict",
            Sensitivity::Moderate => "moderate",
            Sensitivity::Relaxed => "relaxed",
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sensitivity {
    type Err = UltrathinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Sensitivity::Strict),
            "moderate" => Ok(Sensitivity::Moderate),
            "relaxed" => Ok(Sensitivity::Relaxed),
            other => Err(UltrathinkError::Value(format!(
                "Unknown sensitivity level '{other}' (expected strict, moderate or relaxed)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total_changes: usize,
    pub breaking_changes: usize,
    pub non_breaking_changes: usize,
}

/// Set-level difference between two hash maps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureComparison {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
    pub summary: ComparisonSummary,
}

#[derive(Clone, Debug, Default)]
pub struct SignatureHasher {
    sensitivity: Sensitivity,
}

impl SignatureHasher {
    pub fn new(sensitivity: Sensitivity) -> Self {
        Self { sensitivity }
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    /// Hash every element of `api_data.public_api`.
    pub fn hash_api_signature(&self, api_data: &ApiData) -> BTreeMap<String, String> {
        let mut hashes = BTreeMap::new();
        for (name, element) in &api_data.public_api {
            let hash = match self.hash_element(name, element) {
                Ok(hash) => {
                    debug!("Created hash for {name}: {}...", &hash[..8]);
                    hash
                }
                Err(e) => {
                    warn!("Failed to hash element {name}: {e}");
                    ERROR_HASH.to_string()
                }
            };
            hashes.insert(name.clone(), hash);
        }
        info!("Generated {} signature hashes", hashes.len());
        hashes
    }

    pub fn hash_element(&self, name: &str, element: &ApiElement) -> UltrathinkResult<String> {
        let record = self.normalize_element(name, element);
        let canonical = canonical_json(&record)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// The record that is hashed for `element`.
    pub fn normalize_element(&self, name: &str, element: &ApiElement) -> Value {
        match element.kind {
            ElementKind::Class => self.normalize_class(name, element),
            kind if kind.is_function_like() => self.normalize_function(name, element),
            ElementKind::Module => self.normalize_module(name, element),
            kind => json!({"name": name, "type": kind.as_str()}),
        }
    }

    fn normalize_class(&self, name: &str, element: &ApiElement) -> Value {
        let mut record = Map::new();
        record.insert("name".into(), json!(name));
        record.insert("type".into(), json!("class"));

        let Some(info) = &element.class_info else {
            return Value::Object(record);
        };
        let mut bases = info.base_classes.clone();
        bases.sort();
        record.insert("base_classes".into(), json!(bases));
        record.insert("mro".into(), json!(info.mro));

        match self.sensitivity {
            Sensitivity::Strict => {
                record.insert("methods".into(), normalize_methods(&info.methods));
                record.insert("class_methods".into(), normalize_methods(&info.class_methods));
                record.insert("static_methods".into(), normalize_methods(&info.static_methods));
                record.insert("properties".into(), normalize_properties(&info.properties));
                if !info.descriptors.is_empty() {
                    record.insert("descriptors".into(), normalize_properties(&info.descriptors));
                }
                if !element.doc.is_empty() {
                    record.insert("doc_summary".into(), json!(doc_summary(&element.doc)));
                }
            }
            Sensitivity::Moderate => {
                record.insert("method_signatures".into(), method_signatures(&info.methods));
                record.insert(
                    "class_method_signatures".into(),
                    method_signatures(&info.class_methods),
                );
                record.insert(
                    "static_method_signatures".into(),
                    method_signatures(&info.static_methods),
                );
            }
            Sensitivity::Relaxed => {
                record.insert("method_names".into(), json!(sorted_keys(&info.methods)));
                record.insert("class_method_names".into(), json!(sorted_keys(&info.class_methods)));
                record.insert(
                    "static_method_names".into(),
                    json!(sorted_keys(&info.static_methods)),
                );
            }
        }
        Value::Object(record)
    }

    fn normalize_function(&self, name: &str, element: &ApiElement) -> Value {
        let mut record = Map::new();
        record.insert("name".into(), json!(name));
        record.insert("type".into(), json!(element.kind.as_str()));
        record.insert("signature".into(), json!(element.signature));

        let Some(info) = &element.function_info else {
            return Value::Object(record);
        };
        match self.sensitivity {
            Sensitivity::Strict => {
                let mut params = Map::new();
                for param in &info.parameters {
                    let mut entry = Map::new();
                    entry.insert("name".into(), json!(param.name));
                    entry.insert("kind".into(), json!(param.kind.as_str()));
                    entry.insert("has_default".into(), json!(param.has_default));
                    if let Some(annotation) = param.annotation.as_ref().filter(|a| !a.is_empty()) {
                        entry.insert("annotation".into(), json!(annotation));
                    }
                    if let Some(default) = &param.default {
                        entry.insert("default".into(), json!(default));
                    }
                    params.insert(param.name.clone(), Value::Object(entry));
                }
                record.insert("parameters".into(), Value::Object(params));
                record.insert("return_annotation".into(), json!(info.return_annotation));
                if !element.doc.is_empty() {
                    record.insert("doc_summary".into(), json!(doc_summary(&element.doc)));
                }
                record.insert("is_async".into(), json!(info.is_async));
                record.insert("is_generator".into(), json!(info.is_generator));
            }
            Sensitivity::Moderate => {
                let types: Map<String, Value> = info
                    .parameters
                    .iter()
                    .map(|p| {
                        let annotation = p.annotation.clone().unwrap_or_else(|| "Any".to_string());
                        (p.name.clone(), json!(annotation))
                    })
                    .collect();
                record.insert("parameter_types".into(), Value::Object(types));
                record.insert("return_annotation".into(), json!(info.return_annotation));
            }
            Sensitivity::Relaxed => {}
        }
        Value::Object(record)
    }

    fn normalize_module(&self, name: &str, element: &ApiElement) -> Value {
        let mut record = Map::new();
        record.insert("name".into(), json!(name));
        record.insert("type".into(), json!("module"));

        let Some(info) = &element.module_info else {
            return Value::Object(record);
        };
        let sorted = |items: &[String]| {
            let mut v = items.to_vec();
            v.sort();
            v
        };
        match self.sensitivity {
            Sensitivity::Strict => {
                record.insert("all".into(), json!(sorted(&info.all)));
                record.insert("members".into(), json!(sorted(&info.members)));
                if !element.doc.is_empty() {
                    record.insert("doc_summary".into(), json!(doc_summary(&element.doc)));
                }
            }
            Sensitivity::Moderate => {
                record.insert("all".into(), json!(sorted(&info.all)));
            }
            Sensitivity::Relaxed => {}
        }
        Value::Object(record)
    }
}

/// Set difference and hash equality between two hash maps.
pub fn compare_signatures(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
) -> SignatureComparison {
    let old_names: BTreeSet<&String> = old.keys().collect();
    let new_names: BTreeSet<&String> = new.keys().collect();

    let mut comparison = SignatureComparison {
        added: new_names.difference(&old_names).map(|s| s.to_string()).collect(),
        removed: old_names.difference(&new_names).map(|s| s.to_string()).collect(),
        ..SignatureComparison::default()
    };
    for name in old_names.intersection(&new_names) {
        if old[*name] != new[*name] {
            comparison.modified.push(name.to_string());
        } else {
            comparison.unchanged.push(name.to_string());
        }
    }

    comparison.summary = ComparisonSummary {
        total_changes: comparison.added.len()
            + comparison.removed.len()
            + comparison.modified.len(),
        breaking_changes: comparison.removed.len() + comparison.modified.len(),
        non_breaking_changes: comparison.added.len(),
    };
    info!(
        "Change detection completed: {} total, {} breaking",
        comparison.summary.total_changes, comparison.summary.breaking_changes
    );
    comparison
}

/// Compact JSON with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> UltrathinkResult<String> {
    Ok(serde_json::to_string(&sort_keys(value))?)
}

/// Rebuild `value` with every object's keys in sorted order.
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sort_keys(v))).collect();
            let mut out = Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

fn normalize_methods(methods: &BTreeMap<String, MemberInfo>) -> Value {
    let mut out = Map::new();
    for (name, member) in methods {
        let mut entry = Map::new();
        entry.insert("name".into(), json!(name));
        if let Some(signature) = &member.signature {
            entry.insert("signature".into(), json!(signature));
        }
        if !member.doc.is_empty() {
            entry.insert("doc_summary".into(), json!(doc_summary(&member.doc)));
        }
        out.insert(name.clone(), Value::Object(entry));
    }
    Value::Object(out)
}

fn normalize_properties(properties: &BTreeMap<String, MemberInfo>) -> Value {
    let mut out = Map::new();
    for (name, member) in properties {
        let mut entry = Map::new();
        entry.insert("name".into(), json!(name));
        if !member.doc.is_empty() {
            entry.insert("doc_summary".into(), json!(doc_summary(&member.doc)));
        }
        out.insert(name.clone(), Value::Object(entry));
    }
    Value::Object(out)
}

fn method_signatures(methods: &BTreeMap<String, MemberInfo>) -> Value {
    let out: Map<String, Value> = methods
        .iter()
        .map(|(name, member)| {
            let signature = member.signature.clone().unwrap_or_else(|| "unknown".to_string());
            (name.clone(), json!(signature))
        })
        .collect();
    Value::Object(out)
}

fn sorted_keys(methods: &BTreeMap<String, MemberInfo>) -> Vec<String> {
    methods.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassInfo, FunctionInfo, Parameter, ParameterKind};

    fn function(name: &str, signature: &str, doc: &str) -> ApiElement {
        let mut element = ApiElement::new(name, ElementKind::Function, "pkg.core");
        element.signature = Some(signature.to_string());
        element.doc = doc.to_string();
        element.function_info = Some(FunctionInfo {
            parameters: vec![Parameter {
                name: "limit".to_string(),
                kind: ParameterKind::PositionalOrKeyword,
                annotation: Some("int".to_string()),
                default: Some("10".to_string()),
                has_default: true,
            }],
            ..FunctionInfo::default()
        });
        element
    }

    fn data(elements: Vec<ApiElement>) -> ApiData {
        let mut data = ApiData::default();
        for element in elements {
            data.public_api.insert(element.name.clone(), element);
        }
        data
    }

    #[test]
    fn test_hashes_are_order_independent() {
        let a = function("a", "(limit: int = 10)", "Fetch.");
        let b = function("b", "()", "");
        let forward =
            SignatureHasher::default().hash_api_signature(&data(vec![a.clone(), b.clone()]));
        let reverse = SignatureHasher::default().hash_api_signature(&data(vec![b, a]));
        assert_eq!(forward, reverse);
        assert_eq!(forward["a"].len(), 64);
    }

    #[test]
    fn test_doc_changes_only_matter_when_strict() {
        let before = function("f", "(limit: int = 10)", "Fetch rows.");
        let after = function("f", "(limit: int = 10)", "Load rows.");
        let strict = SignatureHasher::new(Sensitivity::Strict);
        let moderate = SignatureHasher::new(Sensitivity::Moderate);
        assert_ne!(
            strict.hash_element("f", &before).unwrap(),
            strict.hash_element("f", &after).unwrap()
        );
        assert_eq!(
            moderate.hash_element("f", &before).unwrap(),
            moderate.hash_element("f", &after).unwrap()
        );
    }

    #[test]
    fn test_relaxed_class_uses_method_names() {
        let mut element = ApiElement::new("Store", ElementKind::Class, "pkg");
        let mut info = ClassInfo {
            base_classes: vec!["b".to_string(), "a".to_string()],
            mro: vec!["Store".to_string(), "object".to_string()],
            ..ClassInfo::default()
        };
        info.methods.insert(
            "save".to_string(),
            MemberInfo {
                name: "save".to_string(),
                doc: String::new(),
                defined_in: "Store".to_string(),
                signature: Some("(self)".to_string()),
            },
        );
        element.class_info = Some(info);

        let record =
            SignatureHasher::new(Sensitivity::Relaxed).normalize_element("Store", &element);
        assert_eq!(record["method_names"], json!(["save"]));
        assert_eq!(record["base_classes"], json!(["a", "b"]));
        assert!(record.get("methods").is_none());

        let moderate =
            SignatureHasher::new(Sensitivity::Moderate).normalize_element("Store", &element);
        assert_eq!(moderate["method_signatures"]["save"], "(self)");
    }

    #[test]
    fn test_strict_class_record_lists_descriptors() {
        let mut element = ApiElement::new("Model", ElementKind::Class, "pkg");
        element.class_info = Some(ClassInfo::default());
        let plain = SignatureHasher::new(Sensitivity::Strict).normalize_element("Model", &element);
        assert!(plain.get("descriptors").is_none());

        let mut info = ClassInfo::default();

        info.descriptors.insert(
            "heavy".to_string(),
            MemberInfo {
                name: "heavy".to_string(),
                doc: "Computed once.".to_string(),
                defined_in: "Model".to_string(),
                signature: None,
            },
        );
        element.class_info = Some(info);
        let record = SignatureHasher::new(Sensitivity::Strict).normalize_element("Model", &element);
        assert_eq!(record["descriptors"]["heavy"]["doc_summary"], "Computed once.");
    }

    #[test]
    fn test_variables_hash_name_and_type_only() {
        let mut element = ApiElement::new("LIMIT", ElementKind::Variable, "pkg");
        element.doc = "ignored".to_string();
        let record = SignatureHasher::default().normalize_element("LIMIT", &element);
        assert_eq!(record, json!({"name": "LIMIT", "type": "variable"}));
    }

    #[test]
    fn test_compare_signatures_scenario() {
        let old = BTreeMap::from([("foo".to_string(), "sig_a".to_string())]);
        let new = BTreeMap::from([
            ("foo".to_string(), "sig_b".to_string()),
            ("bar".to_string(), "sig_c".to_string()),
        ]);
        let cmp = compare_signatures(&old, &new);
        assert_eq!(cmp.added, vec!["bar"]);
        assert!(cmp.removed.is_empty());
        assert_eq!(cmp.modified, vec!["foo"]);
        assert_eq!(cmp.summary.total_changes, 2);
        assert_eq!(cmp.summary.breaking_changes, 1);
        assert_eq!(cmp.summary.non_breaking_changes, 1);

        let same = compare_signatures(&new, &new);
        assert!(same.added.is_empty() && same.removed.is_empty() && same.modified.is_empty());
        assert_eq!(same.unchanged, vec!["bar", "foo"]);
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"b": {"z": 1, "a": 2}, "a": [ {"y": 1, "x": 2} ]});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn test_sensitivity_parses_case_insensitively() {
        assert_eq!("Moderate".parse::<Sensitivity>().unwrap(), Sensitivity::Moderate);
        assert!(matches!(
            "loose".parse::<Sensitivity>(),
            Err(UltrathinkError::Value(_))
        ));
    }
}
