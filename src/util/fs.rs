// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Filesystem-related utility functions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Turn a path into its canonical, absolute form with all symlinks resolved.
///
/// Relative paths are resolved against the current working directory. Fails if the path does not
/// exist.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
    let normalized = fs::canonicalize(&path)?;
    if normalized != path.as_ref() {
        log::trace!(
            "Normalized {} to {}",
            path.as_ref().display(),
            normalized.display()
        );
    }
    Ok(normalized)
}

/// Last modification time of the file.
pub fn modified_time<P: AsRef<Path>>(path: P) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_relative_path() {
        let cwd = std::env::current_dir().unwrap();
        let normalized = normalize_path("Cargo.toml").unwrap();
        assert!(normalized.is_absolute());
        assert_eq!(normalized, fs::canonicalize(cwd.join("Cargo.toml")).unwrap());
    }

    #[test]
    fn test_normalize_dot_segments() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("track.flac");
        fs::write(&file, b"").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let indirect = dir.path().join("sub").join("..").join("track.flac");
        assert_eq!(
            normalize_path(indirect).unwrap(),
            normalize_path(&file).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("track.flac");
        fs::write(&file, b"").unwrap();
        let link = dir.path().join("link.flac");
        std::os::unix::fs::symlink(&file, &link).unwrap();

        assert_eq!(
            normalize_path(link).unwrap(),
            normalize_path(&file).unwrap()
        );
    }

    #[test]
    fn test_normalize_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(normalize_path(dir.path().join("missing.flac")).is_err());
    }

    #[test]
    fn test_modified_time() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(modified_time(file.path()).unwrap() <= SystemTime::now());
    }
}
