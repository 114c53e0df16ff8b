// Core modules
pub mod api;
pub mod config;
pub mod execution;
pub mod models;
pub mod profile;
pub mod scheduler;
pub mod strategy;
pub mod window;

// Re-export commonly used types
pub use models::*;
pub use profile::{compute_volume_profile, VolumeProfile};

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
