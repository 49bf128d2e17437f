use crate::cli::{GlobalFlags, resolve_project};
use clap::Args;
use std::path::PathBuf;

/// Replace uploaded user files from an archive or directory
#[derive(Args, Debug)]
pub struct ImportFilesArgs {
    /// Project name (defaults to the project enclosing the current directory)
    #[arg(index = 1)]
    pub project: Option<String>,

    /// Archive or directory holding the files (pulled from the hosting
    /// provider when omitted)
    #[arg(long)]
    pub src: Option<PathBuf>,

    /// Subdirectory of the source to import instead of its root
    #[arg(long)]
    pub extract_path: Option<String>,
}

pub async fn execute(args: ImportFilesArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let workspace = global.workspace()?;
    let project = resolve_project(&workspace, args.project.as_deref()).await?;

    project
        .import_files(args.src.as_deref(), args.extract_path.as_deref())
        .await?;
    println!("Files import complete for {}", project.name());
    Ok(())
}
