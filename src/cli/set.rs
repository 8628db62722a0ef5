// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Module for the `set` CLI subcommand.

use crate::tag::{Artwork, TagError, ARTWORK_TAG};
use crate::Tags;
use clap::Parser;
use std::path::PathBuf;

/// Command line arguments for the `set` CLI command.
#[derive(Parser, Debug)]
pub struct Args {
    /// File to set the tags of.
    pub(super) path: PathBuf,
    /// Tags to set, as `name=value`. Repeat a name to set several values.
    #[arg(value_parser = parse_assignment)]
    pub(super) tags: Vec<(String, String)>,
    /// Image file to embed as front cover.
    #[arg(long)]
    artwork: Option<PathBuf>,
}

/// Parse a `name=value` argument.
fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {arg:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing tag name in {arg:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Collect the values of repeated names, keeping the order of first appearance.
fn group_values(assignments: Vec<(String, String)>) -> Vec<(String, Vec<String>)> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (name, value) in assignments {
        match grouped.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, values)) => values.push(value),
            None => grouped.push((name, vec![value])),
        }
    }
    grouped
}

/// Run the `set` command.
pub fn run(args: Args) -> crate::Result<()> {
    let tags = Tags::open(&args.path)?;

    if let Some(path) = args.artwork {
        let artwork = Artwork::open(path).map_err(|source| TagError::Artwork {
            path: tags.path().to_path_buf(),
            source,
        })?;
        tags.set_tag(ARTWORK_TAG, artwork)?;
    }

    if tags.update_tags(group_values(args.tags))? {
        log::info!("Updated tags of {}", tags.path().display());
    } else {
        log::info!("Tags of {} unchanged", tags.path().display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("artist=Miles Davis"),
            Ok(("artist".to_string(), "Miles Davis".to_string()))
        );
        assert_eq!(
            parse_assignment("comment=a=b"),
            Ok(("comment".to_string(), "a=b".to_string()))
        );
        assert!(parse_assignment("artist").is_err());
        assert!(parse_assignment("=value").is_err());
    }

    #[test]
    fn test_group_values() {
        let grouped = group_values(vec![
            ("artist".to_string(), "Miles Davis".to_string()),
            ("genre".to_string(), "Jazz".to_string()),
            ("artist".to_string(), "John Coltrane".to_string()),
        ]);
        assert_eq!(
            grouped,
            vec![
                (
                    "artist".to_string(),
                    vec!["Miles Davis".to_string(), "John Coltrane".to_string()]
                ),
                ("genre".to_string(), vec!["Jazz".to_string()]),
            ]
        );
    }
}
