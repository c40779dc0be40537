//! Core data structures for Extforge.
//!
//! This module contains the foundational types used throughout Extforge:
//! - Dependency declarations (archive, npm, NuGet v2)
//! - Externals files and task module copy instructions

pub mod declaration;
pub mod externals;

pub use declaration::{DependencyDeclaration, DependencyKind};
pub use externals::{discover_externals, ExternalsFile, TaskModuleSpec, EXTERNALS_FILE_NAME};
