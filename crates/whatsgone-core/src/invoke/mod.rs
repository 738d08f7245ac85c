//! Scanner invocation: argument construction, launch, and completion waits.
pub mod elevate;
pub mod tool;
pub mod wait;

pub use tool::{ScanInvocation, ScanTool, WizTree};
pub use wait::{CancelToken, WaitError, WaitOptions};
