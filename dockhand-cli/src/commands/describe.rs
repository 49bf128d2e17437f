use crate::cli::{GlobalFlags, resolve_project};
use crate::formatter::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use dockhand::ProjectStatus;

/// Show one project in detail
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Project name (defaults to the project enclosing the current directory)
    #[arg(index = 1)]
    pub project: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(long, default_value = "table")]
    pub format: String,
}

pub async fn execute(args: DescribeArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let format = OutputFormat::from_str(&args.format)?;
    let workspace = global.workspace()?;
    let project = resolve_project(&workspace, args.project.as_deref()).await?;
    let status = project.describe().await?;

    let mut stdout = std::io::stdout();
    formatter::print_output(&mut stdout, &status, format, print_table)
}

fn print_table<W: std::io::Write>(out: &mut W, status: &ProjectStatus) -> Result<()> {
    writeln!(out, "Name:     {}", status.name)?;
    if let Some(app_type) = status.app_type {
        writeln!(out, "Type:     {}", app_type.as_str())?;
    }
    if let Some(approot) = &status.approot {
        writeln!(out, "Location: {}", formatter::shorten_home(approot))?;
    }
    if let Some(url) = &status.url {
        writeln!(out, "URL:      {}", url)?;
    }
    writeln!(out, "Status:   {}", status.state.as_str())?;
    if let Some(problem) = &status.problem {
        writeln!(out, "Problem:  {}", problem)?;
    }

    if !status.services.is_empty() {
        let mut table = formatter::create_table(&["SERVICE", "CONTAINER", "STATE", "PORTS"]);
        for service in &status.services {
            table.add_row(vec![
                service.service.clone(),
                service.container_name.clone(),
                service.state.as_str().to_string(),
                format_ports(service),
            ]);
        }
        writeln!(out, "\n{table}")?;
    }
    Ok(())
}

fn format_ports(service: &dockhand::status::ServiceStatus) -> String {
    service
        .published_ports
        .iter()
        .map(|p| format!("{}->{}", p.host_port, p.container_port))
        .collect::<Vec<_>>()
        .join(", ")
}
