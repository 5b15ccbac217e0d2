//! On-disk LoRA directory: staged installs, metadata sidecars, catalogue.
//!
//! # Design
//! - Weights stream into a temporary file inside the destination directory
//!   and are renamed into place only once complete. An abandoned
//!   [`PendingAsset`] deletes its temporary file on drop.
//! - Sidecars are `<stem>.json` next to a `.safetensors` weights file and
//!   never replace a file that does not parse as a sidecar.

use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::civitai::AssetRecord;
use crate::error::{FetchError, FetchResult};

const WEIGHTS_EXTENSION: &str = "safetensors";
const SIDECAR_EXTENSION: &str = "json";

/// Descriptive metadata persisted next to an installed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Identifier the asset was requested by.
    pub model_id: String,
    /// Version identifier, when known.
    pub version_id: Option<u64>,
    /// Model display name.
    pub name: Option<String>,
    /// Model description.
    pub description: Option<String>,
    /// Model tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Words that activate the LoRA in prompts.
    #[serde(default)]
    pub trigger_words: Vec<String>,
    /// Base model the LoRA was trained against.
    pub base_model: Option<String>,
    /// Installed weights file name.
    pub file_name: String,
    /// When the install completed.
    pub downloaded_at: DateTime<Utc>,
}

impl AssetMetadata {
    /// Metadata for `record`, stamped now.
    #[must_use]
    pub fn from_record(record: &AssetRecord) -> Self {
        Self {
            model_id: record.id.clone(),
            version_id: record.version_id,
            name: record.model_name.clone(),
            description: record.description.clone(),
            tags: record.tags.clone(),
            trigger_words: record.trained_words.clone(),
            base_model: record.base_model.clone(),
            file_name: record.file_name.clone(),
            downloaded_at: Utc::now(),
        }
    }
}

/// A weights file present in the LoRA directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledAsset {
    /// File name within the directory.
    pub file_name: String,
    /// Full path.
    pub path: PathBuf,
    /// Size on disk.
    pub size_bytes: u64,
    /// Sidecar contents, when present and readable.
    pub metadata: Option<AssetMetadata>,
}

/// Download in progress; committed by rename or discarded on drop.
#[derive(Debug)]
pub struct PendingAsset {
    file: NamedTempFile,
    destination: PathBuf,
}

impl PendingAsset {
    /// Append `chunk` to the staged file.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> FetchResult<()> {
        let path = self.file.path().to_path_buf();
        self.file
            .write_all(chunk)
            .map_err(|err| FetchError::io("store.write", path, err))
    }

    /// Final location once committed.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Flush and atomically move the staged file to its destination,
    /// replacing any existing file of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error when flushing or renaming fails; the staged file is
    /// removed in that case.
    pub fn commit(mut self) -> FetchResult<PathBuf> {
        let staged = self.file.path().to_path_buf();
        self.file
            .flush()
            .map_err(|err| FetchError::io("store.flush", &staged, err))?;
        self.file
            .persist(&self.destination)
            .map_err(|err| FetchError::io("store.commit", &self.destination, err.error))?;
        Ok(self.destination)
    }
}

/// Directory that receives LoRA weights.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    /// Store rooted at `root`; nothing is created until needed.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory the store writes into.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn ensure_dir(&self) -> FetchResult<()> {
        fs::create_dir_all(&self.root).map_err(|err| FetchError::io("store.create_dir", &self.root, err))
    }

    /// Stage a new download destined for `file_name`.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary file cannot be created.
    pub fn begin(&self, file_name: &str) -> FetchResult<PendingAsset> {
        let file = tempfile::Builder::new()
            .prefix(".comfypod-")
            .suffix(".part")
            .tempfile_in(&self.root)
            .map_err(|err| FetchError::io("store.begin", &self.root, err))?;
        Ok(PendingAsset {
            file,
            destination: self.root.join(file_name),
        })
    }

    /// Write the metadata sidecar for `metadata.file_name`.
    ///
    /// Only `.safetensors` weights get a sidecar. Returns `None` without
    /// writing when the asset has another extension, or when a file that is
    /// not a sidecar already occupies `<stem>.json`.
    ///
    /// # Errors
    ///
    /// Returns an error when encoding or writing fails.
    pub fn write_sidecar(&self, metadata: &AssetMetadata) -> FetchResult<Option<PathBuf>> {
        let weights = self.root.join(&metadata.file_name);
        if weights.extension() != Some(OsStr::new(WEIGHTS_EXTENSION)) {
            warn!(file = %weights.display(), "no sidecar for non-safetensors asset");
            return Ok(None);
        }
        let sidecar = weights.with_extension(SIDECAR_EXTENSION);
        if sidecar.exists() && read_sidecar(&sidecar).is_none() {
            warn!(sidecar = %sidecar.display(), "existing file is not a sidecar; skipping");
            return Ok(None);
        }
        let body = serde_json::to_vec_pretty(metadata)
            .map_err(|err| FetchError::json("store.sidecar.encode", &sidecar, err))?;
        fs::write(&sidecar, body).map_err(|err| FetchError::io("store.sidecar.write", &sidecar, err))?;
        debug!(sidecar = %sidecar.display(), "metadata written");
        Ok(Some(sidecar))
    }

    /// Installed `.safetensors` files sorted by name, with sidecars when
    /// readable. A missing directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory exists but cannot be walked.
    pub fn list_installed(&self) -> FetchResult<Vec<InstalledAsset>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut assets = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|err| {
                let path = err.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                FetchError::io("store.list", path, err.into())
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension() != Some(OsStr::new(WEIGHTS_EXTENSION))
            {
                continue;
            }
            let size_bytes = entry
                .metadata()
                .map_err(|err| FetchError::io("store.list.metadata", path, err.into()))?
                .len();
            assets.push(InstalledAsset {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                path: path.to_path_buf(),
                size_bytes,
                metadata: read_sidecar(&path.with_extension(SIDECAR_EXTENSION)),
            });
        }
        assets.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(assets)
    }
}

fn read_sidecar(path: &Path) -> Option<AssetMetadata> {
    let body = fs::read(path).ok()?;
    match serde_json::from_slice(&body) {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            warn!(sidecar = %path.display(), error = %err, "ignoring unreadable sidecar");
            None
        }
    }
}
