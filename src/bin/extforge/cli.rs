//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

/// extforge - build, cache and package Azure DevOps extensions
#[derive(Parser)]
#[command(name = "extforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Dependency cache directory (default: <project>/_temp)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full build pipeline
    Build(BuildArgs),

    /// Remove build and package outputs
    Clean,

    /// Cache the declared externals without building
    Fetch(FetchArgs),

    /// Generate localization resources from messages.json files
    Loc,

    /// Package built extensions as VSIX files
    Package(PackageArgs),

    /// Wrap a packaged extension into a NuGet package
    NugetPackage(NugetPackageArgs),

    /// Inspect and manage the dependency cache
    Cache(CacheArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Only build these extension areas (comma separated)
    #[arg(long, value_name = "LIST")]
    pub test_area_path: Option<String>,

    /// Never touch the network; missing dependencies are an error
    #[arg(long)]
    pub offline: bool,

    /// Number of concurrent dependency fetches
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Never touch the network; missing dependencies are an error
    #[arg(long)]
    pub offline: bool,

    /// Number of concurrent dependency fetches
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct PackageArgs {
    /// Package only this extension
    #[arg(long)]
    pub extension: Option<String>,

    /// Publisher to write into the extension manifests
    #[arg(long)]
    pub publisher: Option<String>,
}

#[derive(Args)]
pub struct NugetPackageArgs {
    /// Package version (semver)
    #[arg(long)]
    pub version: String,

    /// Packaged extension to wrap
    #[arg(long)]
    pub extension: String,

    /// Feed to push the package to
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Print the cache directory
    Path,

    /// List committed cache entries
    List,

    /// Remove cache contents
    Clean(CacheCleanArgs),
}

#[derive(Args)]
pub struct CacheCleanArgs {
    /// Only remove partial (incomplete) entries
    #[arg(long)]
    pub partial: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
