// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Resolution of audio codecs and their tag implementations.

use crate::config::{Config, Id3Version};
#[cfg(feature = "flac")]
use crate::tag::FlacTag;
#[cfg(feature = "id3")]
use crate::tag::ID3v2Tag;
use crate::tag::{NativeTag, NativeTagError, TagError};
use std::fmt;
use std::path::Path;

/// Audio codecs that can be recognized by their file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// MPEG-1 Audio Layer III.
    Mp3,
    /// Free Lossless Audio Codec.
    Flac,
    /// Advanced Audio Coding (in an MP4 container).
    Aac,
    /// Ogg Vorbis.
    Vorbis,
    /// Ogg Opus.
    Opus,
    /// Waveform Audio File Format.
    Wav,
    /// Audio Interchange File Format.
    Aiff,
}

impl Codec {
    /// All known codecs.
    pub const ALL: [Codec; 7] = [
        Codec::Mp3,
        Codec::Flac,
        Codec::Aac,
        Codec::Vorbis,
        Codec::Opus,
        Codec::Wav,
        Codec::Aiff,
    ];

    /// File extensions (lower case, without dot) of the codec.
    #[must_use]
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Mp3 => &["mp3"],
            Self::Flac => &["flac"],
            Self::Aac => &["m4a", "aac", "mp4"],
            Self::Vorbis => &["ogg", "oga"],
            Self::Opus => &["opus"],
            Self::Wav => &["wav"],
            Self::Aiff => &["aif", "aiff"],
        }
    }

    /// Find the codec for a file extension (case-insensitive).
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|codec| codec.extensions().contains(&extension.as_str()))
    }

    /// Short, lower-case name of the codec.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Aac => "aac",
            Self::Vorbis => "vorbis",
            Self::Opus => "opus",
            Self::Wav => "wav",
            Self::Aiff => "aiff",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a path was resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// An audio file of the given codec.
    Audio(Codec),
    /// A non-audio file that accompanies audio files (cover, playlist, log, ...).
    Metadata,
    /// Neither.
    Unknown,
}

/// Resolves paths to codecs and loads native tags.
pub trait FormatRegistry: Send + Sync + fmt::Debug {
    /// Determine what kind of file the path is.
    fn resolve(&self, path: &Path) -> Resolution;

    /// Load the native tag of an audio file.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::NoTagParser`] if there is no tag implementation for the codec and
    /// [`TagError::Load`] if the tag cannot be read.
    fn load_native(&self, codec: Codec, path: &Path) -> Result<Box<dyn NativeTag>, TagError>;
}

/// Extensions of non-audio files that are commonly found next to audio files.
pub const METADATA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "txt", "log", "cue", "m3u", "m3u8", "pls", "nfo", "pdf",
    "xml", "json",
];

/// Registry that resolves files by their extension.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    /// Additional metadata extensions (lower case).
    metadata_extensions: Vec<String>,
    /// ID3 version that MP3 tags are written with.
    #[cfg_attr(not(feature = "id3"), allow(dead_code))]
    id3_version: Id3Version,
}

impl ExtensionRegistry {
    /// Create a registry from the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            metadata_extensions: config
                .formats
                .metadata_extensions()
                .iter()
                .map(|extension| extension.to_ascii_lowercase())
                .collect(),
            id3_version: config.id3.version(),
        }
    }

    /// Returns `true` if the (lower case) extension belongs to a metadata file.
    fn is_metadata_extension(&self, extension: &str) -> bool {
        METADATA_EXTENSIONS.contains(&extension)
            || self
                .metadata_extensions
                .iter()
                .any(|candidate| candidate == extension)
    }
}

impl FormatRegistry for ExtensionRegistry {
    fn resolve(&self, path: &Path) -> Resolution {
        let Some(extension) = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
        else {
            return Resolution::Unknown;
        };

        if let Some(codec) = Codec::from_extension(&extension) {
            Resolution::Audio(codec)
        } else if self.is_metadata_extension(&extension) {
            Resolution::Metadata
        } else {
            Resolution::Unknown
        }
    }

    fn load_native(&self, codec: Codec, path: &Path) -> Result<Box<dyn NativeTag>, TagError> {
        let load_error = |source: NativeTagError| TagError::Load {
            path: path.to_path_buf(),
            source,
        };
        match codec {
            #[cfg(feature = "id3")]
            Codec::Mp3 => ID3v2Tag::read_from_path(path, self.id3_version)
                .map(|tag| Box::new(tag) as Box<dyn NativeTag>)
                .map_err(load_error),
            #[cfg(feature = "flac")]
            Codec::Flac => FlacTag::read_from_path(path)
                .map(|tag| Box::new(tag) as Box<dyn NativeTag>)
                .map_err(load_error),
            #[allow(unreachable_patterns)]
            _ => Err(TagError::NoTagParser {
                codec,
                path: path.to_path_buf(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_codec_from_extension() {
        assert_eq!(Codec::from_extension("MP3"), Some(Codec::Mp3));
        assert_eq!(Codec::from_extension("flac"), Some(Codec::Flac));
        assert_eq!(Codec::from_extension("m4a"), Some(Codec::Aac));
        assert_eq!(Codec::from_extension("exe"), None);
    }

    #[test]
    fn test_resolve() {
        let registry = ExtensionRegistry::default();
        assert_eq!(
            registry.resolve(Path::new("/music/01 So What.flac")),
            Resolution::Audio(Codec::Flac)
        );
        assert_eq!(
            registry.resolve(Path::new("/music/Cover.JPG")),
            Resolution::Metadata
        );
        assert_eq!(
            registry.resolve(Path::new("/music/notes.doc")),
            Resolution::Unknown
        );
        assert_eq!(
            registry.resolve(Path::new("/music/README")),
            Resolution::Unknown
        );
    }

    #[test]
    fn test_resolve_extra_metadata_extensions() {
        let mut config = Config::default();
        config.formats.metadata_extensions = Some(vec!["SFV".to_string()]);
        let registry = ExtensionRegistry::from_config(&config);
        assert_eq!(
            registry.resolve(Path::new("/music/album.sfv")),
            Resolution::Metadata
        );
    }

    #[test]
    fn test_no_tag_parser() {
        let registry = ExtensionRegistry::default();
        let path = PathBuf::from("/music/track.ogg");
        assert!(matches!(
            registry.load_native(Codec::Vorbis, &path),
            Err(TagError::NoTagParser { codec: Codec::Vorbis, .. })
        ));
    }
}
