// handlers/elevated/mod.rs - Elevated handlers (super-admin credential required)
pub mod audit_logs;
pub mod users;

pub use audit_logs::list_audit_logs;
pub use users::set_role;
