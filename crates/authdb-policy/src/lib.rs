//! Enables the `allow-root` flag of `system.privilege.taskport` in the macOS
//! authorization policy, so that root processes can attach to simulator apps.
//!
//! The flag is found by walking the property-list markup, and the edit is a
//! splice of the boolean element alone. A backup is written before the diff
//! is shown, and the file is only replaced after the operator confirms.

pub mod backup;
pub mod config;
pub mod console;
pub mod diff;
pub mod document;
mod error;
pub mod patcher;
pub mod persist;

pub use backup::Backup;
pub use config::PatcherConfig;
pub use console::{Console, TermConsole};
pub use document::{EntryMatch, FlagState, PolicyDocument, locate_entry};
pub use error::{PolicyError, Result};
pub use patcher::{CheckReport, Outcome, Patcher};
