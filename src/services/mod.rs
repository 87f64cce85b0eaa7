pub mod announcement_service;
pub mod audit_service;
pub mod intake_service;
pub mod notification_service;
pub mod user_service;

pub use announcement_service::{AnnouncementService, NewAnnouncement};
pub use audit_service::{AuditEntry, AuditReceipt, AuditWriter};
pub use intake_service::{ApplicationForm, ContactForm, IntakeService, Submitted};
pub use notification_service::{NotificationError, NotificationService};
pub use user_service::{RoleChange, StatusChange, UserService};
