use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::api::client::ApiClient;
use crate::domain::bulk_upload::{BulkUploadJob, JobStatus};
use crate::services::validation::{self, CsvInspection, UploadValidator};
use crate::utils::CancelToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct BulkImportConfig {
    pub poll_interval: Duration,
    pub max_file_bytes: u64,
}

impl Default for BulkImportConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_file_bytes: validation::MAX_UPLOAD_BYTES,
        }
    }
}

/// Progress events surfaced while an import runs. `Completed` is emitted at
/// most once per job, and only for a `completed` terminal status.
#[derive(Debug, Clone)]
pub enum ImportEvent {
    Accepted { job_id: String },
    Snapshot(BulkUploadJob),
    Completed(BulkUploadJob),
    Failed(BulkUploadJob),
}

/// Terminal result of one import run.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub job: BulkUploadJob,
}

impl ImportOutcome {
    pub fn succeeded(&self) -> bool {
        self.job.status == JobStatus::Completed
    }

    /// True once the server has rows itemized in its error CSV.
    pub fn error_report_available(&self) -> bool {
        self.job.failed_count > 0 || self.job.status == JobStatus::Failed
    }

    /// The strings the results panel shows.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self.job.status {
            JobStatus::Completed => {
                lines.push(format!(
                    "{} user(s) created successfully.",
                    self.job.success_count
                ));
                if self.job.failed_count > 0 {
                    lines.push(format!("{} user(s) failed.", self.job.failed_count));
                }
            }
            JobStatus::Cancelled => lines.push("Import cancelled.".to_string()),
            _ => lines.push("Import failed.".to_string()),
        }
        lines
    }
}

/// Drives a CSV file from local selection through server-side processing to
/// a terminal outcome. The server owns the job; this service uploads, then
/// reconciles by polling.
pub struct BulkImportService {
    api: Arc<ApiClient>,
    config: BulkImportConfig,
}

impl BulkImportService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            config: BulkImportConfig::default(),
        }
    }

    pub fn with_config(api: Arc<ApiClient>, config: BulkImportConfig) -> Self {
        Self { api, config }
    }

    /// File-picker gate: extension and size only, no upload, no file read.
    pub fn validate_file(&self, file_name: &str, size_bytes: u64) -> Result<()> {
        UploadValidator::validate_file(file_name, size_bytes, self.config.max_file_bytes)
    }

    /// Optional pre-flight inspection against the template contract so the
    /// user can fix rows before burning an upload.
    pub fn inspect(&self, bytes: &[u8]) -> Result<CsvInspection> {
        validation::inspect_csv(bytes)
    }

    /// Upload the file and poll the resulting job to a terminal status.
    /// Upload rejection surfaces the server's message verbatim and never
    /// enters polling mode.
    pub async fn start_import(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        events: mpsc::Sender<ImportEvent>,
        cancel: CancelToken,
    ) -> Result<ImportOutcome> {
        self.validate_file(file_name, bytes.len() as u64)?;

        let accepted = self.api.start_bulk_upload(file_name, bytes).await?;
        info!(job_id = %accepted.job_id, file_name, "bulk upload accepted");
        let _ = events
            .send(ImportEvent::Accepted {
                job_id: accepted.job_id.clone(),
            })
            .await;

        self.poll_job(&accepted.job_id, events, cancel).await
    }

    /// Reconcile a job by polling its status endpoint: an immediate first
    /// poll, then one fetch per tick. The loop is single-flight - a tick
    /// only fires after the previous fetch resolved - and stops the instant
    /// a terminal status is observed or a fetch fails. Fetch failures are
    /// not retried; the last known-good snapshot stays with the caller.
    pub async fn poll_job(
        &self,
        job_id: &str,
        events: mpsc::Sender<ImportEvent>,
        cancel: CancelToken,
    ) -> Result<ImportOutcome> {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if cancel.is_cancelled() {
                debug!(job_id, "import polling cancelled before fetch");
                anyhow::bail!("import polling cancelled");
            }

            let job = self.api.bulk_upload_status(job_id).await?;
            if cancel.is_cancelled() {
                debug!(job_id, "dropping status snapshot that arrived after cancel");
                anyhow::bail!("import polling cancelled");
            }

            let _ = events.send(ImportEvent::Snapshot(job.clone())).await;
            if !job.is_terminal() {
                continue;
            }

            info!(job_id, status = ?job.status, "import reached terminal status");
            if job.status == JobStatus::Completed {
                let _ = events.send(ImportEvent::Completed(job.clone())).await;
            } else {
                let _ = events.send(ImportEvent::Failed(job.clone())).await;
            }
            return Ok(ImportOutcome { job });
        }
    }

    /// Fetch the server's error CSV and write it to `dest`. Only offered
    /// once the job is terminal, so this never touches polling state.
    pub async fn download_error_report(&self, job_id: &str, dest: &Path) -> Result<PathBuf> {
        let bytes = self.api.bulk_upload_errors(job_id).await?;
        tokio::fs::write(dest, &bytes).await?;
        info!(job_id, dest = %dest.display(), "error report saved");
        Ok(dest.to_path_buf())
    }

    pub async fn download_template(&self, dest: &Path) -> Result<PathBuf> {
        let bytes = self.api.bulk_upload_template().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(dest.to_path_buf())
    }

    pub async fn cancel_job(&self, job_id: &str) -> Result<()> {
        if let Err(e) = self.api.cancel_bulk_upload(job_id).await {
            warn!(job_id, error = %e, "job cancellation request failed");
            return Err(e);
        }
        Ok(())
    }
}
