use crate::cli::{GlobalFlags, resolve_project};
use clap::Args;

/// Stop the project's containers, keeping them for a later start
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Project name (defaults to the project enclosing the current directory)
    #[arg(index = 1)]
    pub project: Option<String>,
}

pub async fn execute(args: StopArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let workspace = global.workspace()?;
    let project = resolve_project(&workspace, args.project.as_deref()).await?;

    project.stop().await?;
    println!("Project {} stopped", project.name());
    Ok(())
}
