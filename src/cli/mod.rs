// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Command line interface.

mod config;
mod copy;
mod remove;
mod set;
mod show;

use crate::{Config, TagCache};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::path::PathBuf;

/// Command line Arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Show debug information.
    #[arg(short, long)]
    verbose: bool,
    /// Path to configuration file.
    #[arg(short, long, required = false)]
    config_path: Option<PathBuf>,
    /// Command to run.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Show the tags of a file.
    Show(show::Args),
    /// Set tags of a file.
    Set(set::Args),
    /// Remove tags from a file.
    Remove(remove::Args),
    /// Copy all tags from one file to another.
    Copy(copy::Args),
    /// Print the effective configuration.
    Config(config::Args),
}

impl Args {
    /// Get the desired log level, depending on the verbose flag passed on the command line.
    fn log_level_filter(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    /// Get the current configuration.
    fn config(&self) -> crate::Result<Config> {
        let path = self.config_path.clone().or_else(Config::default_path);
        match path {
            Some(path) => {
                log::debug!("Loading configuration from {}", path.display());
                Ok(Config::load_from_path(path)?.with_defaults()?)
            }
            None => Ok(Config::load_default()?),
        }
    }
}

/// Main entry point.
///
/// # Errors
///
/// Can returns errors if the command line arguments are incorrect or the executed command leads to
/// an error.
pub fn main() -> crate::Result<()> {
    let args = Args::parse();

    let log_config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    if TermLogger::init(
        args.log_level_filter(),
        log_config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .is_err()
    {
        eprintln!("Warning: Logger already initialized");
    }

    let config = args.config()?;
    if TagCache::install_global(TagCache::from_config(&config)).is_err() {
        log::warn!("Tag cache already initialized, ignoring configuration");
    }

    match args.command {
        Command::Show(cmd_args) => show::run(cmd_args),
        Command::Set(cmd_args) => set::run(cmd_args),
        Command::Remove(cmd_args) => remove::run(cmd_args),
        Command::Copy(cmd_args) => copy::run(cmd_args),
        Command::Config(cmd_args) => config::run(&config, cmd_args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::ffi::OsStr;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_set_command() {
        let args = Args::try_parse_from([
            "tagcache",
            "-v",
            "set",
            "track.mp3",
            "artist=Miles Davis",
            "genre=Jazz",
        ])
        .unwrap();
        assert!(args.verbose);
        assert_eq!(args.log_level_filter(), LevelFilter::Debug);
        let Command::Set(set_args) = args.command else {
            panic!("expected set command");
        };
        assert_eq!(set_args.path, PathBuf::from("track.mp3"));
        assert_eq!(set_args.tags.len(), 2);
    }

    #[test]
    fn test_config_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\ncapacity = 16\n").unwrap();

        let args = Args::try_parse_from([
            OsStr::new("tagcache"),
            OsStr::new("--config-path"),
            path.as_os_str(),
            OsStr::new("config"),
        ])
        .unwrap();
        let config = args.config().unwrap();
        assert_eq!(config.cache.capacity(), 16);
        assert_eq!(config.id3.version(), crate::config::Id3Version::default());
    }
}
