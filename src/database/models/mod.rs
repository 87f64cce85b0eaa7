pub mod announcement;
pub mod audit_log;
pub mod notification;
pub mod user;

pub use announcement::Announcement;
pub use audit_log::AuditLog;
pub use notification::Notification;
pub use user::{AccountRecord, User};
