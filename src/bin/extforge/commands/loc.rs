//! `extforge loc` command

use anyhow::Result;

use crate::GlobalOptions;
use extforge::ops::generate_loc;
use extforge::util::fs::relative_path;
use extforge::util::Status;

pub fn execute(global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ctx = &global_opts.ctx;

    let written = generate_loc(&ctx.extensions_src())?;
    if written.is_empty() {
        shell.note("No messages.json files found");
    }
    for path in written {
        shell.status(Status::Generated, relative_path(ctx.cwd(), &path).display());
    }

    Ok(())
}
