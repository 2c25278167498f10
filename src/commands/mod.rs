pub mod serve;
pub mod task;

// Re-export command functions for convenience
pub use serve::{serve, ServeParams};
pub use task::{task, TaskCommand};
