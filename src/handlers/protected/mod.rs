// handlers/protected/mod.rs - Protected handlers (admin credential required)
//
// Every route here runs behind `require_admin`, so handlers can take the
// resolved `Principal` from request extensions.
pub mod announcements;
pub mod list;
pub mod me;
pub mod notifications;
pub mod users;

pub use list::list_admin;
pub use me::me;
