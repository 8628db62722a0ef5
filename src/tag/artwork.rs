// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Embedded artwork (cover images).

use base64::Engine as _;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Artwork error.
#[derive(Error, Debug)]
pub enum ArtworkError {
    /// The artwork payload has not been loaded.
    #[error("Artwork is not loaded with image data")]
    NotLoaded,
    /// The payload is not an image.
    #[error("Artwork must be an image, got MIME type {0}")]
    NotAnImage(String),
    /// The image format could not be detected.
    #[error("Unsupported image format")]
    UnsupportedFormat,
    /// I/O Error.
    #[error("Input/Output error ({:?})", .0)]
    Io(#[from] io::Error),
}

/// Image formats that can be detected from their magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG image.
    Jpeg,
    /// PNG image.
    Png,
    /// GIF image.
    Gif,
    /// Windows bitmap.
    Bmp,
    /// WebP image.
    WebP,
}

impl ImageFormat {
    /// Detect the image format from the first bytes of the data.
    #[must_use]
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match data {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n', ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'B', b'M', ..] => Some(Self::Bmp),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::WebP),
            _ => None,
        }
    }

    /// The MIME type of the image format.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::WebP => "image/webp",
        }
    }
}

/// An artwork payload, which may or may not be loaded yet.
#[derive(Clone, PartialEq, Eq)]
pub struct Artwork {
    /// File the image is loaded from, if any.
    source: Option<PathBuf>,
    /// MIME type of the image data.
    mime_type: Option<String>,
    /// The image data, once loaded.
    data: Option<Vec<u8>>,
}

impl fmt::Debug for Artwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artwork")
            .field("source", &self.source)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.as_ref().map(Vec::len))
            .finish()
    }
}

impl Artwork {
    /// Wrap image data with a known MIME type (e.g. a picture read from a tag).
    #[must_use]
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            source: None,
            mime_type: Some(mime_type.into()),
            data: Some(data),
        }
    }

    /// Create artwork from image data, detecting its format.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not in a known image format.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ArtworkError> {
        let format = ImageFormat::sniff(&data).ok_or(ArtworkError::UnsupportedFormat)?;
        Ok(Self::new(format.mime_type(), data))
    }

    /// Create artwork for an image file without loading it yet.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            mime_type: None,
            data: None,
        }
    }

    /// Create artwork from an image file and load it right away.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not in a known image format.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ArtworkError> {
        let mut artwork = Self::from_path(path);
        artwork.load()?;
        Ok(artwork)
    }

    /// Load the image data from the source file.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no source file, it cannot be read, or it is not in a known
    /// image format. The artwork is left unchanged on error.
    pub fn load(&mut self) -> Result<(), ArtworkError> {
        let path = self.source.as_deref().ok_or(ArtworkError::NotLoaded)?;
        let data = fs::read(path)?;
        let format = ImageFormat::sniff(&data).ok_or(ArtworkError::UnsupportedFormat)?;
        log::debug!("Loaded {} artwork from {}", format.mime_type(), path.display());
        self.mime_type = Some(format.mime_type().to_string());
        self.data = Some(data);
        Ok(())
    }

    /// Returns `true` if the image data is loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// The MIME type, if known.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// The image data, if loaded.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// The file the image is loaded from, if any.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// The artwork of a track, with its own modification flag.
///
/// The flag is independent of the text tag modification flag of the owning parser.
#[derive(Debug, Clone, Default)]
pub struct TrackArtwork {
    /// The current artwork.
    artwork: Option<Artwork>,
    /// Whether the artwork was imported since the last save.
    modified: bool,
}

impl TrackArtwork {
    /// Create track artwork from the picture currently embedded in the file.
    #[must_use]
    pub fn new(embedded: Option<Artwork>) -> Self {
        Self {
            artwork: embedded,
            modified: false,
        }
    }

    /// Returns `true` if an artwork payload is loaded.
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.artwork.as_ref().is_some_and(Artwork::is_loaded)
    }

    /// Returns `true` if artwork was imported since the last save.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// The current artwork.
    #[must_use]
    pub fn get(&self) -> Option<&Artwork> {
        self.artwork.as_ref()
    }

    /// Replace the artwork.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the artwork is not loaded or not an image.
    pub fn import(&mut self, artwork: Artwork) -> Result<(), ArtworkError> {
        if !artwork.is_loaded() {
            return Err(ArtworkError::NotLoaded);
        }
        match artwork.mime_type() {
            Some(mime_type) if mime_type.starts_with("image/") => (),
            other => {
                return Err(ArtworkError::NotAnImage(
                    other.unwrap_or("unknown").to_string(),
                ))
            }
        }
        self.artwork = Some(artwork);
        self.modified = true;
        Ok(())
    }

    /// Base64-encode the image data, for formats that store artwork as text.
    ///
    /// # Errors
    ///
    /// Returns an error if no artwork is loaded.
    pub fn as_base64(&self) -> Result<String, ArtworkError> {
        self.artwork
            .as_ref()
            .and_then(Artwork::data)
            .map(|data| base64::engine::general_purpose::STANDARD.encode(data))
            .ok_or(ArtworkError::NotLoaded)
    }

    /// Drop the artwork. Returns `true` if there was any.
    pub fn remove(&mut self) -> bool {
        let removed = self.artwork.take().is_some();
        self.modified |= removed;
        removed
    }

    /// Reset the modification flag after a successful save.
    pub(crate) fn mark_saved(&mut self) {
        self.modified = false;
    }
}
