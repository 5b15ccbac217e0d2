//! Batch workflow: look up each identifier, then install its weights.
//!
//! Items are processed strictly in order. A failing item is recorded and the
//! batch moves on; only a missing credential aborts the whole run.

use tracing::{info, warn};

use crate::batch::{Batch, BatchReport, FailureReason, ItemOutcome};
use crate::civitai::{AssetRecord, CivitaiClient};
use crate::error::{FetchError, FetchResult};
use crate::store::{AssetMetadata, AssetStore, InstalledAsset};

/// Ties the API client to a destination directory.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: CivitaiClient,
    store: AssetStore,
}

impl Fetcher {
    /// Fetcher installing into `store`.
    #[must_use]
    pub const fn new(client: CivitaiClient, store: AssetStore) -> Self {
        Self { client, store }
    }

    /// Underlying API client.
    #[must_use]
    pub const fn client(&self) -> &CivitaiClient {
        &self.client
    }

    /// Destination store.
    #[must_use]
    pub const fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Download every identifier in `batch` using `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MissingCredential`] when `credential` is blank;
    /// no request is made in that case. Every later failure, including an
    /// unusable destination directory, is reported per item in the
    /// [`BatchReport`].
    pub async fn download_batch(&self, batch: &Batch, credential: &str) -> FetchResult<BatchReport> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(FetchError::MissingCredential);
        }

        let mut outcomes = Vec::with_capacity(batch.len());
        for id in batch.ids() {
            let outcome = self.fetch_one(id, credential).await;
            match &outcome {
                ItemOutcome::Downloaded { id, path, .. } => {
                    info!(id = %id, path = %path.display(), "lora installed");
                }
                ItemOutcome::Failed { id, reason } => {
                    warn!(id = %id, reason = %reason, "lora failed");
                }
            }
            outcomes.push(outcome);
        }
        Ok(BatchReport { outcomes })
    }

    /// Installed weights in the destination directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory exists but cannot be read.
    pub fn list_installed(&self) -> FetchResult<Vec<InstalledAsset>> {
        self.store.list_installed()
    }

    async fn fetch_one(&self, id: &str, credential: &str) -> ItemOutcome {
        let failed = |reason| ItemOutcome::Failed {
            id: id.to_string(),
            reason,
        };

        let record = match self.client.lookup(id, credential).await {
            Ok(record) => record,
            Err(err) => return failed(FailureReason::Lookup(err.detail())),
        };
        let Some(download_url) = record.download_url.as_deref() else {
            return failed(FailureReason::NoDownloadUrl);
        };

        match self.install(&record, download_url, credential).await {
            Ok(path) => {
                self.record_metadata(&record);
                ItemOutcome::Downloaded {
                    id: id.to_string(),
                    file_name: record.file_name,
                    path,
                }
            }
            Err(err) => failed(FailureReason::Transfer(err.detail())),
        }
    }

    async fn install(
        &self,
        record: &AssetRecord,
        download_url: &str,
        credential: &str,
    ) -> FetchResult<std::path::PathBuf> {
        self.store.ensure_dir()?;
        let mut pending = self.store.begin(&record.file_name)?;
        let bytes = self
            .client
            .download(download_url, credential, &mut pending)
            .await?;
        let path = pending.commit()?;
        info!(id = %record.id, bytes, "download complete");
        Ok(path)
    }

    fn record_metadata(&self, record: &AssetRecord) {
        if let Err(err) = self.store.write_sidecar(&AssetMetadata::from_record(record)) {
            warn!(id = %record.id, error = %err.detail(), "metadata sidecar not written");
        }
    }
}
