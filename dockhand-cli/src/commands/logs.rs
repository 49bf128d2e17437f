use crate::cli::{GlobalFlags, resolve_project};
use clap::Args;
use dockhand::runtime::LogOptions;
use futures::StreamExt;
use std::io::Write;
use tokio::select;

/// Show service logs
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Project name (defaults to the project enclosing the current directory)
    #[arg(index = 1)]
    pub project: Option<String>,

    /// Service whose logs to show
    #[arg(short, long, default_value = "web")]
    pub service: String,

    /// Follow the log stream until interrupted
    #[arg(short, long)]
    pub follow: bool,

    /// Number of trailing lines to show
    #[arg(long)]
    pub tail: Option<u64>,

    /// Prefix lines with timestamps
    #[arg(short = 't', long)]
    pub timestamps: bool,
}

pub async fn execute(args: LogsArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let workspace = global.workspace()?;
    let project = resolve_project(&workspace, args.project.as_deref()).await?;

    let options = LogOptions {
        follow: args.follow,
        timestamps: args.timestamps,
        tail: args.tail,
    };
    let mut stream = project.logs(&args.service, &options).await?;
    let mut stdout = std::io::stdout();

    if args.follow {
        // Ctrl-C ends the stream, not the terminal session.
        loop {
            select! {
                chunk = stream.next() => match chunk {
                    Some(chunk) => {
                        stdout.write_all(&chunk?)?;
                        stdout.flush()?;
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    } else {
        while let Some(chunk) = stream.next().await {
            stdout.write_all(&chunk?)?;
        }
        stdout.flush()?;
    }
    Ok(())
}
