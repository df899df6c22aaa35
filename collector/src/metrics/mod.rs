pub mod datapoint;
pub mod event;

// Re-export the main types for easy access
pub use datapoint::*;
pub use event::*;
