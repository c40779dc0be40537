//! `extforge clean` command

use anyhow::Result;

use crate::GlobalOptions;
use extforge::ops::clean;
use extforge::util::Status;

pub fn execute(global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;

    let removed = clean(&global_opts.ctx)?;
    if removed.is_empty() {
        shell.note("Nothing to clean");
    }
    for dir in removed {
        shell.status(Status::Removed, dir.display());
    }

    Ok(())
}
