//! Platform-specific functionality: drive presence and elevation checks.
//!
//! The Windows implementations go through the Win32 API; other platforms
//! fall back to plain filesystem checks so the pipeline stays testable.
pub mod drives;
pub mod permissions;

pub use drives::drive_present;
pub use permissions::is_elevated;
