//! Static introspection of a Python package: parsing, API extraction,
//! docstring handling and signature hashing.

pub mod docstring;
pub mod extractor;
pub mod hasher;
pub mod package;
pub mod parser;

pub use extractor::ApiExtractor;
pub use hasher::{compare_signatures, Sensitivity, SignatureComparison, SignatureHasher};
pub use package::PackageSources;
