use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;

use crate::domain::user::Role;
use crate::services::error_handling::CanvassError;

pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_UPLOAD_ROWS: usize = 10_000;

/// Template contract for the bulk user upload.
pub const REQUIRED_COLUMNS: [&str; 5] = ["name", "email", "role", "city", "constituency"];
pub const TEMPLATE_COLUMNS: [&str; 6] = ["name", "email", "role", "phone", "city", "constituency"];

/// Pre-flight validation for user-provided uploads. Everything here runs
/// before any network call; the server remains authoritative.
pub struct UploadValidator;

impl UploadValidator {
    /// Accepts only `.csv` under the size ceiling. Does not read the file.
    pub fn validate_file(file_name: &str, size_bytes: u64, max_bytes: u64) -> Result<()> {
        let lower = file_name.to_lowercase();
        if !lower.ends_with(".csv") {
            return Err(anyhow::Error::new(CanvassError::Validation {
                field: "file".to_string(),
                reason: "only .csv files are accepted".to_string(),
            }));
        }
        if size_bytes > max_bytes {
            return Err(anyhow::Error::new(CanvassError::Validation {
                field: "file".to_string(),
                reason: format!(
                    "file is {} bytes, the limit is {} bytes",
                    size_bytes, max_bytes
                ),
            }));
        }
        Ok(())
    }

    pub fn validate_email(email: &str) -> bool {
        let pattern = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
        pattern.is_match(email.trim())
    }

    pub fn validate_phone(phone: &str) -> bool {
        let pattern = Regex::new(r"^\+?[0-9][0-9 \-()]{6,18}$").unwrap();
        pattern.is_match(phone.trim())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    /// 1-indexed data row, matching how the server itemizes its error CSV.
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct CsvInspection {
    pub total_rows: usize,
    pub issues: Vec<RowIssue>,
}

impl CsvInspection {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Client-side check of an upload against the documented template contract:
/// required columns `name,email,role,city,constituency`, optional `phone`,
/// role one of the fixed set, no duplicate emails, at most 10,000 rows.
/// Structural problems (missing headers, row cap) are hard errors; per-row
/// problems come back as itemized issues the user can fix before uploading.
pub fn inspect_csv(bytes: &[u8]) -> Result<CsvInspection> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let header_names: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    for required in REQUIRED_COLUMNS {
        if !header_names.iter().any(|h| h == required) {
            return Err(anyhow::Error::new(CanvassError::Validation {
                field: "file".to_string(),
                reason: format!("missing required column: {}", required),
            }));
        }
    }

    let column = |name: &str| header_names.iter().position(|h| h == name);
    let name_idx = column("name");
    let email_idx = column("email");
    let role_idx = column("role");
    let phone_idx = column("phone");

    let mut inspection = CsvInspection::default();
    let mut seen_emails: HashSet<String> = HashSet::new();

    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        inspection.total_rows += 1;
        if inspection.total_rows > MAX_UPLOAD_ROWS {
            return Err(anyhow::Error::new(CanvassError::Validation {
                field: "file".to_string(),
                reason: format!("more than {} rows", MAX_UPLOAD_ROWS),
            }));
        }

        let record = record?;
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("").to_string();

        if field(name_idx).is_empty() {
            inspection.issues.push(RowIssue {
                row,
                message: format!("Row {}: missing name", row),
            });
        }

        let email = field(email_idx).to_lowercase();
        if email.is_empty() || !UploadValidator::validate_email(&email) {
            inspection.issues.push(RowIssue {
                row,
                message: format!("Row {}: invalid email", row),
            });
        } else if !seen_emails.insert(email) {
            inspection.issues.push(RowIssue {
                row,
                message: format!("Row {}: duplicate email", row),
            });
        }

        let role = field(role_idx);
        if role.parse::<Role>().is_err() {
            inspection.issues.push(RowIssue {
                row,
                message: format!("Row {}: invalid role", row),
            });
        }

        let phone = field(phone_idx);
        if !phone.is_empty() && !UploadValidator::validate_phone(&phone) {
            inspection.issues.push(RowIssue {
                row,
                message: format!("Row {}: invalid phone", row),
            });
        }
    }

    Ok(inspection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_validation() {
        assert!(UploadValidator::validate_file("users.csv", 1024, MAX_UPLOAD_BYTES).is_ok());
        assert!(UploadValidator::validate_file("USERS.CSV", 1024, MAX_UPLOAD_BYTES).is_ok());
        assert!(UploadValidator::validate_file("users.xlsx", 1024, MAX_UPLOAD_BYTES).is_err());
        assert!(
            UploadValidator::validate_file("users.csv", MAX_UPLOAD_BYTES + 1, MAX_UPLOAD_BYTES)
                .is_err()
        );
    }

    #[test]
    fn test_clean_template_rows_pass() {
        let csv = "name,email,role,phone,city,constituency\n\
                   Ada Perez,ada@example.com,admin,+15550100,Springfield,North\n\
                   Ben Ito,ben@example.com,volunteer,,Springfield,South\n";
        let inspection = inspect_csv(csv.as_bytes()).unwrap();
        assert_eq!(inspection.total_rows, 2);
        assert!(inspection.is_clean());
    }

    #[test]
    fn test_invalid_role_is_itemized() {
        let csv = "name,email,role,phone,city,constituency\n\
                   Ada,ada@example.com,admin,,Springfield,North\n\
                   Ben,ben@example.com,wizard,,Springfield,South\n\
                   Cal,cal@example.com,viewer,,Springfield,East\n";
        let inspection = inspect_csv(csv.as_bytes()).unwrap();
        assert_eq!(inspection.total_rows, 3);
        assert_eq!(inspection.issues, vec![RowIssue {
            row: 2,
            message: "Row 2: invalid role".to_string(),
        }]);
    }

    #[test]
    fn test_duplicate_emails_are_flagged() {
        let csv = "name,email,role,phone,city,constituency\n\
                   Ada,ada@example.com,admin,,Springfield,North\n\
                   Ada Again,ADA@example.com,viewer,,Springfield,North\n";
        let inspection = inspect_csv(csv.as_bytes()).unwrap();
        assert_eq!(inspection.issues.len(), 1);
        assert!(inspection.issues[0].message.contains("duplicate email"));
    }

    #[test]
    fn test_missing_required_column_is_a_hard_error() {
        let csv = "name,email,phone,city,constituency\nAda,ada@example.com,,X,Y\n";
        assert!(inspect_csv(csv.as_bytes()).is_err());
    }
}
