//! `_ultrathink_core` Python extension module. Structured results cross the
//! boundary as JSON strings.

use std::path::Path;
use std::str::FromStr;

use pyo3::prelude::*;
use pyo3::wrap_pyfunction;
use serde::Serialize;

use crate::diffing::{ApiDiffer, ChangeClassifier};
use crate::errors::UltrathinkResult;
use crate::introspection::{ApiExtractor, Sensitivity};
use crate::validation::CompletenessChecker;

fn to_json<T: Serialize>(value: &T) -> UltrathinkResult<String> {
    Ok(serde_json::to_string(value)?)
}

#[pyfunction]
pub fn extract_api(package: &str, source_dir: &str) -> PyResult<String> {
    let api = ApiExtractor::new(package, Path::new(source_dir)).extract_complete_api()?;
    Ok(to_json(&api)?)
}

#[pyfunction]
#[pyo3(signature = (package, source_dir, storage_root, version, sensitivity="strict"))]
pub fn create_api_snapshot(
    package: &str,
    source_dir: &str,
    storage_root: &str,
    version: &str,
    sensitivity: &str,
) -> PyResult<String> {
    let api = ApiExtractor::new(package, Path::new(source_dir)).extract_complete_api()?;
    let differ = ApiDiffer::new(Path::new(storage_root), Sensitivity::from_str(sensitivity)?)?;
    let path = differ.create_api_snapshot(&api, version)?;
    Ok(path.display().to_string())
}

#[pyfunction]
#[pyo3(signature = (storage_root, old_version, new_version, sensitivity="strict"))]
pub fn compare_versions(
    storage_root: &str,
    old_version: &str,
    new_version: &str,
    sensitivity: &str,
) -> PyResult<String> {
    let differ = ApiDiffer::new(Path::new(storage_root), Sensitivity::from_str(sensitivity)?)?;
    let diff = differ.compare_versions(old_version, new_version)?;
    let classified = ChangeClassifier::new().classify_changes(diff);
    Ok(to_json(&classified)?)
}

#[pyfunction]
pub fn parse_version(version: &str) -> PyResult<String> {
    Ok(to_json(&crate::diffing::parse_version(version))?)
}

#[pyfunction]
pub fn next_version(current: &str, bump: &str) -> PyResult<String> {
    Ok(crate::diffing::next_version(current, bump)?)
}

#[pyfunction]
#[pyo3(signature = (package, source_dir, storage_root, threshold=0.8))]
pub fn check_completeness(
    package: &str,
    source_dir: &str,
    storage_root: &str,
    threshold: f64,
) -> PyResult<String> {
    let api = ApiExtractor::new(package, Path::new(source_dir)).extract_complete_api()?;
    let result = CompletenessChecker::new(package, Path::new(storage_root))
        .check_documentation_completeness(&api, threshold)?;
    Ok(to_json(&result)?)
}

#[pymodule]
fn _ultrathink_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(extract_api, m)?)?;
    m.add_function(wrap_pyfunction!(create_api_snapshot, m)?)?;
    m.add_function(wrap_pyfunction!(compare_versions, m)?)?;
    m.add_function(wrap_pyfunction!(parse_version, m)?)?;
    m.add_function(wrap_pyfunction!(next_version, m)?)?;
    m.add_function(wrap_pyfunction!(check_completeness, m)?)?;
    Ok(())
}
