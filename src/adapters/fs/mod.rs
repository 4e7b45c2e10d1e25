//! Filesystem artifact store.
//!
//! Reads `model.json`, `preprocessing.json` and `metadata.json` from a
//! model directory. An optional `manifest.json` binds each file to its
//! SHA-256 digest; when present, every artifact loaded must be listed and
//! match.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::estimators::ModelDocument;
use crate::domain::{ModelMetadata, PreprocessError, PreprocessingArtifacts};
use crate::ports::{ArtifactStore, ModelError, SeverityModel};

pub const MODEL_FILE: &str = "model.json";
pub const PREPROCESSING_FILE: &str = "preprocessing.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Error type for artifact loading.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("File hash mismatch for {0}")]
    HashMismatch(String),

    #[error("{0} is not bound by manifest.json")]
    Unbound(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
}

/// `manifest.json`: file name to lowercase hex SHA-256.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "manifest_version")]
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

fn manifest_version() -> u32 {
    1
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

// Constant-time compare for ASCII hex digests.
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Artifact store backed by a model directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
    manifest: Option<Manifest>,
}

impl FsArtifactStore {
    /// Open a model directory, reading its manifest if there is one.
    ///
    /// # Errors
    /// Returns `ArtifactError::Manifest` if the manifest is required but
    /// absent, empty, or does not bind all three artifacts.
    pub fn open(dir: impl Into<PathBuf>, require_manifest: bool) -> Result<Self, ArtifactError> {
        let dir = dir.into();
        let manifest_path = dir.join(MANIFEST_FILE);

        let manifest = if manifest_path.exists() {
            let bytes = read(&manifest_path)?;
            let manifest: Manifest = parse(MANIFEST_FILE, &bytes)?;
            if manifest.files.is_empty() {
                return Err(ArtifactError::Manifest("manifest.json contains no files".into()));
            }
            for name in [MODEL_FILE, PREPROCESSING_FILE, METADATA_FILE] {
                if !manifest.files.contains_key(name) {
                    return Err(ArtifactError::Unbound(name.into()));
                }
            }
            Some(manifest)
        } else if require_manifest {
            return Err(ArtifactError::Manifest(format!(
                "manifest.json required but missing in {dir:?}"
            )));
        } else {
            tracing::warn!("No manifest in {:?}; artifact hashes are not checked", dir);
            None
        };

        Ok(Self { dir, manifest })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.manifest.is_some()
    }

    /// Read an artifact, checking it against the manifest when bound.
    fn read_verified(&self, name: &str) -> Result<Vec<u8>, ArtifactError> {
        let bytes = read(&self.dir.join(name))?;
        if let Some(manifest) = &self.manifest {
            let expected = manifest
                .files
                .get(name)
                .ok_or_else(|| ArtifactError::Unbound(name.into()))?;
            if !constant_time_eq_str(&sha256_hex(&bytes), &expected.to_ascii_lowercase()) {
                return Err(ArtifactError::HashMismatch(name.into()));
            }
        }
        Ok(bytes)
    }

    fn load_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArtifactError> {
        let bytes = self.read_verified(name)?;
        parse(name, &bytes)
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: DeserializeOwned>(file: &str, bytes: &[u8]) -> Result<T, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
        file: file.into(),
        source,
    })
}

impl ArtifactStore for FsArtifactStore {
    type Error = ArtifactError;

    fn load_model(&self) -> Result<SeverityModel, ArtifactError> {
        let document: ModelDocument = self.load_json(MODEL_FILE)?;
        let model = document.into_model()?;
        tracing::info!("Loaded {} from {:?}", model.describe(), self.dir);
        Ok(model)
    }

    fn load_preprocessing(&self) -> Result<PreprocessingArtifacts, ArtifactError> {
        let artifacts: PreprocessingArtifacts = self.load_json(PREPROCESSING_FILE)?;
        artifacts.check_layout()?;
        tracing::info!(
            "Loaded preprocessing ({} features, version {:?})",
            artifacts.n_features(),
            artifacts.feature_version
        );
        Ok(artifacts)
    }

    fn load_metadata(&self) -> Result<ModelMetadata, ArtifactError> {
        self.load_json(METADATA_FILE)
    }

    fn describe(&self) -> String {
        let binding = if self.is_bound() { "manifest-bound" } else { "unbound" };
        format!("{} ({binding})", self.dir.display())
    }
}

/// Direct three-class linear model over `n_features` inputs.
#[cfg(test)]
pub(crate) fn sample_document(n_features: usize) -> ModelDocument {
    use crate::adapters::estimators::{EstimatorSpec, LinearModel, LinearTask};

    let row = |scale: f64| (0..n_features).map(|i| scale * (i as f64 + 1.0) / 10.0).collect();
    ModelDocument::Direct {
        model: EstimatorSpec::Linear(LinearModel {
            task: LinearTask::Multinomial,
            n_features,
            coefficients: vec![row(-1.0), row(0.2), row(1.0)],
            intercepts: vec![0.5, 0.0, -0.5],
        }),
    }
}

/// Write a complete model directory and return the manifest it would bind.
#[cfg(test)]
pub(crate) fn write_model_dir(dir: &Path, document: &ModelDocument) -> Manifest {
    use crate::domain::{sample_metadata, training_records, FeatureVersion};

    let artifacts = PreprocessingArtifacts::fit(&training_records(), FeatureVersion::V1)
        .expect("fit preprocessing");
    let files = [
        (MODEL_FILE, serde_json::to_vec(document).expect("serialize model")),
        (PREPROCESSING_FILE, serde_json::to_vec(&artifacts).expect("serialize preprocessing")),
        (METADATA_FILE, serde_json::to_vec(&sample_metadata(3)).expect("serialize metadata")),
    ];
    let mut hashes = BTreeMap::new();
    for (name, bytes) in &files {
        fs::write(dir.join(name), bytes).expect("write artifact");
        hashes.insert((*name).to_string(), sha256_hex(bytes));
    }
    Manifest {
        version: 1,
        files: hashes,
    }
}
