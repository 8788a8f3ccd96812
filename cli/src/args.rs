//! Command line parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Converts mailed attachments to PDF and uploads them to a reMarkable tablet.
///
/// Without arguments, watches the inbox until Ctrl-C.
#[derive(Parser, Debug)]
#[command(name = "mailpaper", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Convert FILE to PDF next to it and exit
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// JSON config file (default ./mailpaper.json)
    #[arg(long, env = "MAILPAPER_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Set up Gmail and reMarkable credentials and exit
    Authorize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Monitor,
    Convert(PathBuf),
    Authorize,
}

impl Cli {
    pub fn action(&self) -> Command {
        match (&self.command, &self.file) {
            (Some(Commands::Authorize), _) => Command::Authorize,
            (None, Some(file)) => Command::Convert(file.clone()),
            (None, None) => Command::Monitor,
        }
    }
}
