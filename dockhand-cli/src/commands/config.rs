use crate::cli::GlobalFlags;
use clap::Args;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use dockhand::{AppType, DockhandError, ProjectConfig, ProviderKind, Workspace};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Create or update the project configuration
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Project directory (defaults to the current directory)
    #[arg(index = 1)]
    pub path: Option<PathBuf>,

    /// Project name, used for the hostname and container names
    #[arg(long)]
    pub sitename: Option<String>,

    /// Web-served directory, relative to the project root
    #[arg(long)]
    pub docroot: Option<String>,

    /// Application type (drupal6, drupal7, drupal8, wordpress, generic)
    #[arg(long)]
    pub apptype: Option<String>,

    /// Hosting provider backing import pulls (default, pantheon, acquia)
    #[arg(long)]
    pub provider: Option<String>,

    /// Accept detected defaults without prompting
    #[arg(long)]
    pub non_interactive: bool,
}

pub async fn execute(args: ConfigArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let workspace = global.workspace()?;

    let approot = match &args.path {
        Some(path) => std::fs::canonicalize(path)
            .map_err(|e| anyhow::anyhow!("project directory {}: {}", path.display(), e))?,
        None => std::env::current_dir()?,
    };

    let mut config = load_or_new(&workspace, &approot)?;
    apply_flags(&mut config, &args)?;

    let prompt = !args.non_interactive && std::io::stdin().is_terminal();
    if prompt {
        prompt_for_basics(&workspace, &mut config, &args)?;
    } else if args.apptype.is_none() {
        config.app_type = workspace.registry().detect(&config.docroot_abs());
    }

    config.validate()?;
    config.save(workspace.registry())?;

    println!(
        "Configuration written to {}",
        ProjectConfig::config_path(&approot).display()
    );
    println!("Run 'dockhand start' to bring the project up.");
    Ok(())
}

/// Reuse an existing descriptor so a re-run updates in place; anything else
/// starts from defaults derived from the directory.
fn load_or_new(workspace: &Workspace, approot: &std::path::Path) -> anyhow::Result<ProjectConfig> {
    match ProjectConfig::load(approot, workspace.layout()) {
        Ok(config) => Ok(config),
        Err(DockhandError::ConfigNotFound { .. }) => Ok(workspace.new_project_config(approot)),
        Err(e) => Err(e.into()),
    }
}

fn apply_flags(config: &mut ProjectConfig, args: &ConfigArgs) -> anyhow::Result<()> {
    if let Some(name) = &args.sitename {
        config.name = name.clone();
    }
    if let Some(docroot) = &args.docroot {
        config.docroot = docroot.clone();
    }
    if let Some(apptype) = &args.apptype {
        config.app_type = apptype.parse::<AppType>()?;
    }
    if let Some(provider) = &args.provider {
        config.provider = provider.parse::<ProviderKind>()?;
    }
    Ok(())
}

/// Interactive pass over name, docroot, and type. Flags already answered a
/// question skip its prompt; detection supplies the type default.
fn prompt_for_basics(
    workspace: &Workspace,
    config: &mut ProjectConfig,
    args: &ConfigArgs,
) -> anyhow::Result<()> {
    let theme = ColorfulTheme::default();

    if args.sitename.is_none() {
        config.name = Input::with_theme(&theme)
            .with_prompt("Project name")
            .default(config.name.clone())
            .interact_text()?;
    }

    if args.docroot.is_none() {
        config.docroot = Input::with_theme(&theme)
            .with_prompt("Docroot location (relative to the project root)")
            .default(config.docroot.clone())
            .allow_empty(true)
            .interact_text()?;
    }

    if args.apptype.is_none() {
        let detected = workspace.registry().detect(&config.docroot_abs());
        let names = AppType::names();
        let default_idx = names
            .iter()
            .position(|n| *n == detected.as_str())
            .unwrap_or(names.len() - 1);
        let idx = Select::with_theme(&theme)
            .with_prompt("Application type")
            .items(names)
            .default(default_idx)
            .interact()?;
        config.app_type = names[idx].parse::<AppType>()?;
    }

    Ok(())
}
