use crate::cli::{GlobalFlags, resolve_project};
use clap::Args;

/// Stop and start the project
#[derive(Args, Debug)]
pub struct RestartArgs {
    /// Project name (defaults to the project enclosing the current directory)
    #[arg(index = 1)]
    pub project: Option<String>,
}

pub async fn execute(args: RestartArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let workspace = global.workspace()?;
    let project = resolve_project(&workspace, args.project.as_deref()).await?;

    println!("Restarting {}...", project.name());
    let report = project.restart().await?;
    crate::commands::start::print_report(&report);
    Ok(())
}
