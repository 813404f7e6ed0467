use thiserror::Error;

use crate::domain::bulk_upload::JobStatus;

/// Crate error taxonomy. Validation errors are caught before any network
/// call; request failures carry the server's message verbatim when present;
/// a terminal job failure is distinct from a request failure (the request
/// succeeded, the job's own outcome is negative); a stuck call is a
/// client-inferred failure with its own diagnostic.
#[derive(Error, Debug)]
pub enum CanvassError {
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Import job {job_id} ended as {status:?}")]
    JobFailed { job_id: String, status: JobStatus },

    #[error("Call {call_id} timed out: status never progressed past 'initiated' within {deadline_secs} seconds")]
    StuckCall { call_id: String, deadline_secs: u64 },

    #[error("Inconsistent snapshot from server: {reason}")]
    InvalidSnapshot { reason: String },

    #[error("Insufficient permissions: {action}")]
    PermissionDenied { action: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// User-friendly error messages for inline panels and toasts. Raw server
/// messages are preserved; everything else gets a readable fallback.
pub struct UserErrorFormatter;

impl UserErrorFormatter {
    pub fn format_for_ui(error: &anyhow::Error) -> String {
        if let Some(canvass_error) = error.downcast_ref::<CanvassError>() {
            return Self::format_canvass_error(canvass_error);
        }

        let error_str = error.to_string();

        if error_str.contains("network") || error_str.contains("connection") {
            return "Network connection error. Please check your internet connection and try again."
                .to_string();
        }

        if error_str.contains("timed out") || error_str.contains("timeout") {
            return "The operation timed out. Please try again.".to_string();
        }

        "An unexpected error occurred. Please try again.".to_string()
    }

    fn format_canvass_error(error: &CanvassError) -> String {
        match error {
            CanvassError::Validation { field, reason } => {
                format!("Invalid {}: {}", field, reason)
            }
            CanvassError::Api { message, .. } => message.clone(),
            CanvassError::JobFailed { status, .. } => match status {
                JobStatus::Cancelled => "The import was cancelled.".to_string(),
                _ => "The import failed. Download the error report for details.".to_string(),
            },
            CanvassError::StuckCall { deadline_secs, .. } => format!(
                "The call timed out after {} seconds without connecting. \
                 Check the voice provider configuration and try again.",
                deadline_secs
            ),
            CanvassError::PermissionDenied { action } => {
                format!("You don't have permission to {}.", action)
            }
            _ => error.to_string(),
        }
    }
}
