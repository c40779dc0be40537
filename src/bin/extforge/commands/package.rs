//! `extforge package` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::PackageArgs;
use crate::GlobalOptions;
use extforge::ops::{package, PackageOptions, TfxPackager};
use extforge::util::process::SystemRunner;
use extforge::util::Status;

pub fn execute(args: PackageArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;

    let packager = TfxPackager::new(global_opts.config.tfx(), Arc::new(SystemRunner));
    let options = PackageOptions {
        extension: args.extension,
        publisher: args.publisher,
    };

    let span = shell.span(Status::Packaging, "extensions");
    let outputs = package(&global_opts.ctx, &packager, &options)?;

    for output in &outputs {
        shell.status(Status::Created, output.display());
    }
    span.finish_with_message(format!("{} extensions packaged", outputs.len()));

    Ok(())
}
