pub mod entities;
pub mod password;
pub mod users;

pub use users::{UserError, UserManager};

// Re-export tracing for use in this crate
pub use tracing;
