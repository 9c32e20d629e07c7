use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use super::{CorpusError, CorpusRegistry};
use crate::model::{
    parse_return_type, parse_value_type, ByteRange, Category, ExplicitValue, FunctionSignature, ParamDecl, ReferenceCase,
    ValueRange,
};

/// Manifest file names looked up in a corpus directory, in priority order.
pub const MANIFEST_NAMES: [&str; 3] = ["corpus.yaml", "corpus.yml", "corpus.json"];

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    cases: Vec<ManifestCase>,
}

#[derive(Debug, Deserialize)]
struct ManifestCase {
    name: String,
    source: PathBuf,
    category: Category,
    #[serde(default = "default_returns")]
    returns: String,
    #[serde(default)]
    params: Vec<ManifestParam>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    explicit: Vec<Vec<ExplicitValue>>,
}

#[derive(Debug, Deserialize)]
struct ManifestParam {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    range: Option<[i64; 2]>,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    ignore: Vec<ByteRange>,
}

fn default_returns() -> String {
    "void".to_string()
}

/// Locate the manifest inside `dir`.
pub fn find_manifest(dir: &Path) -> Result<PathBuf, CorpusError> {
    MANIFEST_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| CorpusError::MissingManifest(dir.to_path_buf()))
}

fn parse_manifest(path: &Path) -> Result<ManifestFile, CorpusError> {
    let text = fs::read_to_string(path).map_err(|source| CorpusError::Io { path: path.to_path_buf(), source })?;
    let is_json = path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("json")).unwrap_or(false);
    let parsed = if is_json {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&text).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| CorpusError::Manifest { path: path.to_path_buf(), message })
}

fn build_case(raw: ManifestCase) -> Result<ReferenceCase, CorpusError> {
    let ret = parse_return_type(&raw.returns).map_err(|source| CorpusError::InvalidType {
        case: raw.name.clone(),
        param: "<return>".to_string(),
        source,
    })?;

    let mut params = Vec::with_capacity(raw.params.len());
    for p in raw.params {
        let ty = parse_value_type(&p.ty).map_err(|source| CorpusError::InvalidType {
            case: raw.name.clone(),
            param: p.name.clone(),
            source,
        })?;
        params.push(ParamDecl {
            name: p.name,
            ty,
            range: p.range.map(|[min, max]| ValueRange::new(min, max)),
            nullable: p.nullable,
            ignore: p.ignore,
        });
    }

    let mut case = ReferenceCase::new(FunctionSignature::new(raw.name, params, ret), raw.category, raw.source);
    for tag in raw.tags {
        case = case.with_tag(tag);
    }
    case.explicit = raw.explicit;
    Ok(case)
}

/// Load and register every case listed in the manifest of `dir`, in file order.
pub fn load_corpus(dir: &Path) -> Result<CorpusRegistry, CorpusError> {
    let manifest_path = find_manifest(dir)?;
    let manifest = parse_manifest(&manifest_path)?;

    let mut registry = CorpusRegistry::new();
    for raw in manifest.cases {
        let case = build_case(raw)?;
        let source = dir.join(&case.source);
        if !source.is_file() {
            return Err(CorpusError::MissingSource { case: case.name().to_string(), path: source });
        }
        registry.register(case)?;
    }

    info!(manifest = %manifest_path.display(), cases = registry.len(), "loaded corpus");
    Ok(registry)
}
