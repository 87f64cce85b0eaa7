// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Read-only lists for the marketing site plus the two intake forms.
// The intake routes sit behind the rate limiter.
pub mod intake;
pub mod list;

pub use intake::{submit_application, submit_contact};
pub use list::list_public;
