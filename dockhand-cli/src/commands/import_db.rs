use crate::cli::{GlobalFlags, resolve_project};
use clap::Args;
use std::path::PathBuf;

/// Load a database dump into the db service
#[derive(Args, Debug)]
pub struct ImportDbArgs {
    /// Project name (defaults to the project enclosing the current directory)
    #[arg(index = 1)]
    pub project: Option<String>,

    /// Dump file, archive, or directory to load (pulled from the hosting
    /// provider when omitted)
    #[arg(long)]
    pub src: Option<PathBuf>,

    /// Path of the dump inside an archive or directory holding several files
    #[arg(long)]
    pub extract_path: Option<String>,
}

pub async fn execute(args: ImportDbArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let workspace = global.workspace()?;
    let project = resolve_project(&workspace, args.project.as_deref()).await?;

    project
        .import_db(args.src.as_deref(), args.extract_path.as_deref())
        .await?;
    println!("Database import complete for {}", project.name());
    Ok(())
}
