use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side lifecycle of one CSV import attempt. The server owns the job;
/// the client only ever holds a read-only, eventually-consistent snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Validating,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Transitions are monotonic through
    /// pending -> validating -> processing -> (completed | failed | cancelled).
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            JobStatus::Pending => true,
            JobStatus::Validating => next != JobStatus::Pending,
            JobStatus::Processing => next.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkUploadJob {
    pub job_id: String,
    pub status: JobStatus,
    pub file_name: String,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub success_count: u64,
    pub failed_count: u64,
    pub progress_percentage: f64,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl BulkUploadJob {
    /// Count invariants every snapshot must satisfy. A snapshot that fails
    /// this check is rejected at the API boundary like any other corrupt
    /// response.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.processed_rows > self.total_rows {
            return Err(format!(
                "job {}: processed_rows {} exceeds total_rows {}",
                self.job_id, self.processed_rows, self.total_rows
            ));
        }
        if self.success_count + self.failed_count > self.processed_rows {
            return Err(format!(
                "job {}: success_count {} + failed_count {} exceeds processed_rows {}",
                self.job_id, self.success_count, self.failed_count, self.processed_rows
            ));
        }
        if !(0.0..=100.0).contains(&self.progress_percentage) {
            return Err(format!(
                "job {}: progress_percentage {} outside 0-100",
                self.job_id, self.progress_percentage
            ));
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: JobStatus) -> BulkUploadJob {
        BulkUploadJob {
            job_id: "job-1".to_string(),
            status,
            file_name: "users.csv".to_string(),
            total_rows: 10,
            processed_rows: 10,
            success_count: 8,
            failed_count: 2,
            progress_percentage: 100.0,
            validation_errors: vec![],
            started_at: None,
            completed_at: None,
            created_at: None,
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Validating.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_transitions_are_monotonic() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Validating));
        assert!(JobStatus::Validating.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));

        assert!(!JobStatus::Validating.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn test_consistency_accepts_valid_counts() {
        assert!(job(JobStatus::Completed).check_consistency().is_ok());
    }

    #[test]
    fn test_consistency_rejects_impossible_counts() {
        let mut bad = job(JobStatus::Processing);
        bad.processed_rows = 11;
        assert!(bad.check_consistency().is_err());

        let mut bad = job(JobStatus::Processing);
        bad.success_count = 9;
        bad.failed_count = 2;
        assert!(bad.check_consistency().is_err());
    }

    #[test]
    fn test_status_decodes_from_wire_strings() {
        let status: JobStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(status, JobStatus::Processing);
    }
}
