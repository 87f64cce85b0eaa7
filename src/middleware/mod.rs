pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::{require_admin, require_super_admin};
pub use rate_limit::{limit_applications, limit_contact};
pub use response::{ApiResponse, ApiResult, ListResponse};
