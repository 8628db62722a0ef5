// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Module for the `copy` CLI subcommand.

use crate::Tags;
use clap::Parser;
use std::path::PathBuf;

/// Command line arguments for the `copy` CLI command.
#[derive(Parser, Debug)]
pub struct Args {
    /// File to copy the tags from.
    source: PathBuf,
    /// File to copy the tags to.
    destination: PathBuf,
}

/// Run the `copy` command.
#[expect(clippy::needless_pass_by_value)]
pub fn run(args: Args) -> crate::Result<()> {
    let source = Tags::open(&args.source)?;
    let destination = Tags::open(&args.destination)?;

    if destination.copy_from(&source)? {
        log::info!(
            "Copied tags from {} to {}",
            source.path().display(),
            destination.path().display()
        );
    } else {
        log::info!("Tags of {} are up to date", destination.path().display());
    }

    Ok(())
}
