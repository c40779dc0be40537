//! `extforge nuget-package` command

use anyhow::Result;

use crate::cli::NugetPackageArgs;
use crate::GlobalOptions;
use extforge::ops::{nuget_package, NuGetOptions};
use extforge::util::process::SystemRunner;
use extforge::util::Status;

pub fn execute(args: NugetPackageArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let config = &global_opts.config;

    let options = NuGetOptions {
        extension: args.extension,
        version: args.version,
        server: args.server,
    };

    shell.status(
        Status::Packaging,
        format!("{} v{}", options.extension, options.version),
    );
    let nupkg = nuget_package(
        &global_opts.ctx,
        &SystemRunner,
        config.nuget(),
        &config.nuget,
        &options,
    )?;
    shell.status(Status::Created, nupkg.display());

    if let Some(server) = &options.server {
        shell.status(Status::Publishing, format!("pushed to {}", server));
    }

    Ok(())
}
