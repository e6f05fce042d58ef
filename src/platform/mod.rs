//! Platform interfaces.
//!
//! Process spawning and program lookup for external check tools.

pub mod process;
