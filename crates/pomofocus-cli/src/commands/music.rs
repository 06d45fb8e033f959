use clap::Subcommand;
use pomofocus_core::Config;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum MusicAction {
    /// List the configured tracks
    List,
}

pub fn run(action: MusicAction) -> CliResult {
    let config = Config::load()?;
    match action {
        MusicAction::List => {
            if config.music.tracks.is_empty() {
                eprintln!("no tracks configured (add [[music.tracks]] entries to config.toml)");
            }
            print_json(&config.music.tracks)?;
        }
    }
    Ok(())
}
