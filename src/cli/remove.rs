// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Module for the `remove` CLI subcommand.

use crate::Tags;
use clap::Parser;
use std::path::PathBuf;

/// Command line arguments for the `remove` CLI command.
#[derive(Parser, Debug)]
pub struct Args {
    /// File to remove tags from.
    path: PathBuf,
    /// Names of the tags to remove.
    tags: Vec<String>,
    /// Also remove all native fields that have no canonical name.
    #[arg(long)]
    unknown: bool,
}

/// Run the `remove` command.
#[expect(clippy::needless_pass_by_value)]
pub fn run(args: Args) -> crate::Result<()> {
    let tags = Tags::open(&args.path)?;

    let mut written = tags.remove_tags(&args.tags)?;
    if args.unknown {
        for field in tags.unknown_tags() {
            log::debug!("Removing unknown field {field}");
        }
        written |= tags.remove_unknown_tags()?;
    }

    if written {
        log::info!("Removed tags from {}", tags.path().display());
    } else {
        log::info!("No matching tags in {}", tags.path().display());
    }

    Ok(())
}
