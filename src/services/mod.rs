pub mod analytics;
pub mod bulk_import;
pub mod error_handling;
pub mod validation;

pub use analytics::DashboardService;
pub use bulk_import::{BulkImportService, ImportEvent, ImportOutcome};
pub use call_test::{CallTestService, CallTestState};
pub use error_handling::{CanvassError, UserErrorFormatter};
