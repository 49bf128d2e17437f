use crate::cli::GlobalFlags;
use clap::{Args, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug)]
#[value(rename_all = "lower")]
pub enum OfflineMode {
    On,
    Off,
    Status,
}

/// Turn offline mode on or off, or show it
#[derive(Args, Debug)]
pub struct OfflineArgs {
    /// on, off, or status
    #[arg(value_enum, default_value = "status")]
    pub mode: OfflineMode,
}

pub async fn execute(args: OfflineArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let workspace = global.workspace()?;

    match args.mode {
        OfflineMode::On => {
            workspace.set_offline(true)?;
            println!("Offline mode is on; provider pulls are disabled");
        }
        OfflineMode::Off => {
            workspace.set_offline(false)?;
            println!("Offline mode is off");
        }
        OfflineMode::Status => {
            let state = if workspace.is_offline() { "on" } else { "off" };
            println!("Offline mode is {}", state);
        }
    }
    Ok(())
}
