use crate::cli::{GlobalFlags, resolve_project};
use clap::Args;

/// Remove the project's containers
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Project name (defaults to the project enclosing the current directory)
    #[arg(index = 1)]
    pub project: Option<String>,

    /// Also delete stored project data (database contents, staged imports)
    #[arg(long)]
    pub remove_data: bool,
}

pub async fn execute(args: RemoveArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let workspace = global.workspace()?;
    let project = resolve_project(&workspace, args.project.as_deref()).await?;

    project.remove(args.remove_data).await?;
    if args.remove_data {
        println!("Project {} removed along with its stored data", project.name());
    } else {
        println!("Project {} removed (stored data kept)", project.name());
    }
    Ok(())
}
