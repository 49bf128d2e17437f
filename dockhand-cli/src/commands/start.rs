use crate::cli::{GlobalFlags, resolve_project};
use clap::Args;
use dockhand::StartReport;

/// Start the project and route traffic to it
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Project name (defaults to the project enclosing the current directory)
    #[arg(index = 1)]
    pub project: Option<String>,
}

pub async fn execute(args: StartArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let workspace = global.workspace()?;
    let project = resolve_project(&workspace, args.project.as_deref()).await?;

    println!("Starting {}...", project.name());
    let report = project.start().await?;
    print_report(&report);
    Ok(())
}

/// Shared with restart, which ends in the same place.
pub(crate) fn print_report(report: &StartReport) {
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
    match &report.status.url {
        Some(url) => println!("Project {} is running at {}", report.status.name, url),
        None => println!("Project {} is running", report.status.name),
    }
}
