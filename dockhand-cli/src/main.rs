mod cli;
mod commands;
mod formatter;

use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.global.debug);

    match cli.command {
        cli::Commands::Config(args) => commands::config::execute(args, &cli.global).await?,
        cli::Commands::Start(args) => commands::start::execute(args, &cli.global).await?,
        cli::Commands::Stop(args) => commands::stop::execute(args, &cli.global).await?,
        cli::Commands::Restart(args) => commands::restart::execute(args, &cli.global).await?,
        cli::Commands::Remove(args) => commands::remove::execute(args, &cli.global).await?,
        cli::Commands::Describe(args) => commands::describe::execute(args, &cli.global).await?,
        cli::Commands::List(args) => commands::list::execute(args, &cli.global).await?,
        cli::Commands::Exec(args) => commands::exec::execute(args, &cli.global).await?,
        cli::Commands::Logs(args) => commands::logs::execute(args, &cli.global).await?,
        cli::Commands::ImportDb(args) => commands::import_db::execute(args, &cli.global).await?,
        cli::Commands::ImportFiles(args) => {
            commands::import_files::execute(args, &cli.global).await?
        }
        cli::Commands::Offline(args) => commands::offline::execute(args, &cli.global).await?,
        cli::Commands::Completion(args) => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cli::generate_completion(&args.shell, &mut cmd, "dockhand", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Logging goes to stderr so command output stays pipeable. `RUST_LOG`
/// wins when set; otherwise --debug widens the default filter.
fn init_tracing(debug: bool) {
    let fallback = if debug {
        "dockhand=debug,dockhand_cli=debug"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
