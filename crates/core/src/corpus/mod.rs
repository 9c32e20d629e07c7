//! Reference corpus: the registry of testable cases and its on-disk manifest.

mod manifest;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::model::{Category, ReferenceCase, SignatureError, TypeParseError};

pub use manifest::{find_manifest, load_corpus, MANIFEST_NAMES};

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("case '{0}' is already registered")]
    DuplicateName(String),
    #[error("case '{case}' has an invalid signature: {source}")]
    InvalidSignature { case: String, source: SignatureError },
    #[error("case '{case}', parameter '{param}': {source}")]
    InvalidType { case: String, param: String, source: TypeParseError },
    #[error("no corpus manifest ({}) found in {}", MANIFEST_NAMES.join(", "), .0.display())]
    MissingManifest(PathBuf),
    #[error("failed to parse manifest {}: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },
    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("source for case '{case}' not found at {}", .path.display())]
    MissingSource { case: String, path: PathBuf },
    #[error("no decompiled counterpart for case '{case}' (expected {})", .path.display())]
    MissingDecompiled { case: String, path: PathBuf },
}

/// Every case of one run, in registration order.
#[derive(Debug, Default, Clone)]
pub struct CorpusRegistry {
    cases: Vec<ReferenceCase>,
    by_name: HashMap<String, usize>,
}

impl CorpusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a case. Names are unique across the registry.
    pub fn register(&mut self, case: ReferenceCase) -> Result<(), CorpusError> {
        case.signature
            .validate()
            .map_err(|source| CorpusError::InvalidSignature { case: case.name().to_string(), source })?;
        if self.by_name.contains_key(case.name()) {
            return Err(CorpusError::DuplicateName(case.name().to_string()));
        }
        debug!(case = case.name(), category = %case.category, "registered case");
        self.by_name.insert(case.name().to_string(), self.cases.len());
        self.cases.push(case);
        Ok(())
    }

    /// Lazy iterator in registration order; clone it to restart.
    pub fn all_cases(&self) -> std::slice::Iter<'_, ReferenceCase> {
        self.cases.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceCase> {
        self.by_name.get(name).map(|&idx| &self.cases[idx])
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Number of cases per category, sorted by category name.
    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for case in &self.cases {
            *counts.entry(case.category).or_insert(0) += 1;
        }
        counts
    }
}

/// A case together with the two translation units that implement it.
#[derive(Debug, Clone)]
pub struct CasePair {
    pub case: ReferenceCase,
    pub original: PathBuf,
    pub decompiled: PathBuf,
}

/// Pair every case with `decompiled_dir/<source path relative to the corpus>`.
pub fn pair_cases(
    registry: &CorpusRegistry,
    corpus_dir: &Path,
    decompiled_dir: &Path,
) -> Result<Vec<CasePair>, CorpusError> {
    registry
        .all_cases()
        .map(|case| {
            let original = corpus_dir.join(&case.source);
            let decompiled = decompiled_dir.join(&case.source);
            if !decompiled.is_file() {
                return Err(CorpusError::MissingDecompiled { case: case.name().to_string(), path: decompiled });
            }
            Ok(CasePair { case: case.clone(), original, decompiled })
        })
        .collect()
}

/// Pair every case with its own original source (original vs original).
pub fn self_check_pairs(registry: &CorpusRegistry, corpus_dir: &Path) -> Vec<CasePair> {
    registry
        .all_cases()
        .map(|case| {
            let original = corpus_dir.join(&case.source);
            CasePair { case: case.clone(), decompiled: original.clone(), original }
        })
        .collect()
}
