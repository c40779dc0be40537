//! extforge CLI - build pipeline and dependency cache for extension repositories

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use extforge::sources::CacheError;
use extforge::util::diagnostic::emit;
use extforge::util::shell::ColorChoice;
use extforge::util::{Config, GlobalContext, Shell};

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Arc<Shell>,
    pub ctx: GlobalContext,
    pub config: Config,
    /// `--cache-dir` override
    pub cache_dir: Option<PathBuf>,
}

impl GlobalOptions {
    /// Resolved dependency cache root.
    pub fn cache_root(&self) -> PathBuf {
        self.ctx.cache_root(self.cache_dir.as_deref(), &self.config)
    }
}

fn main() {
    let cli = Cli::parse();
    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, color));

    if let Err(e) = run(cli, Arc::clone(&shell)) {
        report(&e, &shell);
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: Arc<Shell>) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("extforge=debug")
    } else if cli.quiet {
        EnvFilter::new("extforge=error")
    } else {
        EnvFilter::new("extforge=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(shell.use_color());
    let config = ctx.load_config();

    let global_opts = GlobalOptions {
        shell,
        ctx,
        config,
        cache_dir: cli.cache_dir,
    };

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &global_opts),
        Commands::Clean => commands::clean::execute(&global_opts),
        Commands::Fetch(args) => commands::fetch::execute(args, &global_opts),
        Commands::Loc => commands::loc::execute(&global_opts),
        Commands::Package(args) => commands::package::execute(args, &global_opts),
        Commands::NugetPackage(args) => commands::nuget::execute(args, &global_opts),
        Commands::Cache(args) => commands::cache::execute(args, &global_opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print an error, rendering cache errors as diagnostics.
fn report(e: &anyhow::Error, shell: &Shell) {
    let cache_error = e.chain().find_map(|cause| cause.downcast_ref::<CacheError>());

    match cache_error {
        Some(err) => {
            let mut diagnostic = err.to_diagnostic();
            for cause in e.chain().take_while(|c| c.downcast_ref::<CacheError>().is_none()) {
                diagnostic = diagnostic.with_context(cause.to_string());
            }
            emit(&diagnostic, shell.use_color());
        }
        None => eprintln!("error: {:#}", e),
    }
}
