// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Module for the `show` CLI subcommand.

use crate::Tags;
use clap::Parser;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::PathBuf;

/// Command line arguments for the `show` CLI command.
#[derive(Parser, Debug)]
pub struct Args {
    /// File to show the tags of.
    path: PathBuf,
    /// Print the tags as a JSON object.
    #[arg(long)]
    json: bool,
    /// Also list native fields that have no canonical name.
    #[arg(long)]
    unknown: bool,
}

/// Tags in display order, serialized as a JSON object.
#[derive(Debug)]
struct OrderedTags<'a>(&'a [(String, String)]);

impl Serialize for OrderedTags<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (tag, value) in self.0 {
            map.serialize_entry(tag, value)?;
        }
        map.end()
    }
}

/// Render tags as aligned `name: value` lines.
fn format_plain(items: &[(String, String)]) -> String {
    let width = items.iter().map(|(tag, _)| tag.len()).max().unwrap_or(0);
    items
        .iter()
        .map(|(tag, value)| format!("{tag:<width$}: {value}\n"))
        .collect()
}

/// Run the `show` command.
#[expect(clippy::needless_pass_by_value)]
pub fn run(args: Args) -> crate::Result<()> {
    let tags = Tags::open(&args.path)?;
    let items = tags.items();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&OrderedTags(&items))?);
    } else {
        print!("{}", format_plain(&items));
        if let Some(artwork) = tags.artwork() {
            println!(
                "(artwork: {}, {} bytes)",
                artwork.mime_type().unwrap_or("unknown"),
                artwork.data().map_or(0, <[u8]>::len)
            );
        }
    }

    if args.unknown {
        for field in tags.unknown_tags() {
            println!("(unknown: {field})");
        }
    }

    Ok(())
}
