//! High-level operations.
//!
//! This module contains the implementation of the pipeline steps behind
//! the extforge commands.

pub mod build;
pub mod clean;
pub mod compile;
pub mod externals;
pub mod loc;
pub mod nuget_package;
pub mod package;

pub use build::{build, BuildOptions, BuildSummary, BuildTools};
pub use clean::clean;
pub use compile::{
    compile_tasks, compile_ui_extensions, copy_sources, install_artifact_engine,
    parse_area_filter, CompileError, CompileJob, Compiler, TscCompiler,
};
pub use externals::{cache_externals, collect_dependencies, copy_task_modules, load_externals};
pub use loc::generate_loc;
pub use nuget_package::{nuget_package, NuGetOptions, NuSpec};
pub use package::{package, PackageError, PackageOptions, Packager, TfxPackager};
