pub mod bulk_upload;
pub mod call;
pub mod constituency;
pub mod feedback;
pub mod organization;
pub mod permissions;
pub mod user;
pub mod voter;
