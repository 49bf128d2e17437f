use crate::cli::{GlobalFlags, resolve_project};
use clap::Args;
use std::io::{IsTerminal, Write};

/// Run a command in a service container
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Service to run the command in
    #[arg(short, long, default_value = "web")]
    pub service: String,

    /// Command and arguments to run
    #[arg(index = 1, trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

pub async fn execute(args: ExecArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let workspace = global.workspace()?;
    let project = resolve_project(&workspace, None).await?;

    // A terminal on stdin gets an attached session; pipes get captured output.
    let interactive = std::io::stdin().is_terminal();
    let output = project
        .exec(&args.service, &args.command, interactive)
        .await?;

    if !output.stdout.is_empty() {
        print!("{}", output.stdout);
        std::io::stdout().flush()?;
    }
    if !output.stderr.is_empty() {
        eprint!("{}", output.stderr);
        std::io::stderr().flush()?;
    }
    Ok(())
}
