use crate::cli::GlobalFlags;
use crate::formatter::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use dockhand::ProjectStatus;

/// List projects
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show project names
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format (table, json, yaml)
    #[arg(long, default_value = "table")]
    pub format: String,
}

pub async fn execute(args: ListArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let format = OutputFormat::from_str(&args.format)?;
    let workspace = global.workspace()?;
    let projects = workspace.list().await?;

    if args.quiet {
        for project in &projects {
            println!("{}", project.name);
        }
        return Ok(());
    }

    let mut stdout = std::io::stdout();
    formatter::print_output(&mut stdout, &projects, format, print_table)
}

fn print_table<W: std::io::Write>(out: &mut W, projects: &Vec<ProjectStatus>) -> Result<()> {
    if projects.is_empty() {
        writeln!(out, "No projects found. Run 'dockhand config' in a project directory.")?;
        return Ok(());
    }

    let mut table = formatter::create_table(&["NAME", "TYPE", "LOCATION", "URL", "STATUS"]);
    for project in projects {
        table.add_row(vec![
            project.name.clone(),
            project
                .app_type
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            project
                .approot
                .as_deref()
                .map(formatter::shorten_home)
                .unwrap_or_default(),
            project.url.clone().unwrap_or_default(),
            status_cell(project),
        ]);
    }
    writeln!(out, "{table}")?;
    Ok(())
}

/// State plus the degradation note, when one exists.
fn status_cell(project: &ProjectStatus) -> String {
    match &project.problem {
        Some(problem) => format!("{} ({})", project.state.as_str(), problem),
        None => project.state.as_str().to_string(),
    }
}
