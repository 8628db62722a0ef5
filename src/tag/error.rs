// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Errors raised while loading, reading, writing and saving tags.

use crate::format::Codec;
use crate::tag::artwork::ArtworkError;
use crate::tag::numbering::CoercionError;
use std::io;
use std::path::PathBuf;
use std::str::Utf8Error;
use thiserror::Error;

/// Error raised by a native (format-specific) tag implementation.
#[derive(Error, Debug)]
pub enum NativeTagError {
    /// I/O Error.
    #[error("Input/Output error ({:?})", .0)]
    Io(#[from] io::Error),
    /// Errors raised by the [`id3`] crate.
    #[cfg(feature = "id3")]
    #[error("ID3 tag error: {0}")]
    Id3(#[from] id3::Error),
    /// Errors raised by the [`metaflac`] crate.
    #[cfg(feature = "flac")]
    #[error("FLAC tag error: {0}")]
    Flac(#[from] metaflac::Error),
    /// The native tag does not support the operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}

/// Tag error.
///
/// Every variant names the file it occurred for. Errors that concern a single tag also name the
/// canonical tag, so that callers can skip the tag and continue with the others.
#[derive(Error, Debug)]
pub enum TagError {
    /// The file does not exist.
    #[error("No such file: {}", .0.display())]
    NoSuchFile(PathBuf),
    /// The file extension does not belong to a known audio codec.
    #[error("Unsupported audio file: {}", .0.display())]
    UnsupportedFile(PathBuf),
    /// The file is a metadata file (cover image, playlist, ...), not an audio file.
    #[error("Attempting to load audio tags from metadata file: {}", .0.display())]
    MetadataFile(PathBuf),
    /// The codec is known, but there is no tag implementation for it.
    #[error("No tag parser available for {codec} file: {}", .path.display())]
    NoTagParser {
        /// Codec of the file.
        codec: Codec,
        /// Path of the file.
        path: PathBuf,
    },
    /// The native tag could not be loaded.
    #[error("Failed to load tags from {}: {source}", .path.display())]
    Load {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        source: NativeTagError,
    },
    /// The tag is not present.
    #[error("No such tag {tag} in {}", .path.display())]
    NoSuchTag {
        /// Canonical tag name.
        tag: String,
        /// Path of the file.
        path: PathBuf,
    },
    /// The tag is present, but has no text value.
    #[error("No such string tag {tag} in {}", .path.display())]
    NotText {
        /// Canonical tag name.
        tag: String,
        /// Path of the file.
        path: PathBuf,
    },
    /// A binary tag value is not valid UTF-8.
    #[error("Error decoding {tag} tag in {}: {source}", .path.display())]
    Decode {
        /// Canonical tag name.
        tag: String,
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        source: Utf8Error,
    },
    /// A value could not be coerced to the type that the tag requires.
    #[error("Invalid value for {tag} tag in {}: {source}", .path.display())]
    Coercion {
        /// Canonical tag name.
        tag: String,
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        source: CoercionError,
    },
    /// Artwork could not be imported or encoded.
    #[error("Error setting artwork for {}: {source}", .path.display())]
    Artwork {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        source: ArtworkError,
    },
    /// The native tag could not be written back to the file.
    #[error("Failed to save tags to {}: {source}", .path.display())]
    Save {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        source: NativeTagError,
    },
    /// The cached tag instance is not (or no longer) loaded.
    #[error("Tags for {} are not loaded", .0.display())]
    NotLoaded(PathBuf),
}

impl TagError {
    /// Returns the canonical tag name if this error is scoped to a single tag.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::NoSuchTag { tag, .. }
            | Self::NotText { tag, .. }
            | Self::Decode { tag, .. }
            | Self::Coercion { tag, .. } => Some(tag),
            _ => None,
        }
    }
}
