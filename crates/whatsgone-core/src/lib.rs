//! WhatsGone Core — scan orchestration and snapshot bookkeeping.
//!
//! This crate contains all business logic with zero CLI dependencies.
//! The binary only parses arguments, wires up logging, and renders the
//! progress events emitted by [`run`].
//!
//! # Modules
//!
//! - [`config`] — Scan specifications and tool settings loaded from TOML.
//! - [`invoke`] — External scanner invocation, elevation, and completion waits.
//! - [`export`] — Rewrites a WizTree CSV export into a bare path list.
//! - [`platform`] — Drive presence and process elevation checks.
//! - [`snapshot`] — Missing-drive log, `_whats_gone` preservation, backups.
//! - [`run`] — Sequential orchestrator and its background-thread handle.
pub mod config;
pub mod error;
pub mod export;
pub mod invoke;
pub mod platform;
pub mod run;
pub mod snapshot;

pub use error::{ScanError, ScanResult};
