// Copyright (c) 2022 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Tags and tag-related functions.

mod artwork;
mod error;
#[cfg(feature = "flac")]
mod flac;
#[cfg(feature = "id3")]
mod id3;
mod map;
mod numbering;
mod parser;

use crate::format::Codec;
use std::borrow::Cow;
use std::fmt;
use std::str::Utf8Error;

pub use artwork::{Artwork, ArtworkError, ImageFormat, TrackArtwork};
pub use error::{NativeTagError, TagError};
#[cfg(feature = "flac")]
pub use flac::FlacTag;
#[cfg(feature = "id3")]
pub use id3::ID3v2Tag;
pub use map::{TagMap, ID3_TAG_MAP, STANDARD_TAG_ORDER, VORBIS_TAG_MAP};
pub use numbering::{CoercionError, NumberingKind, NumberingPart, NumberingTag};
pub use parser::TagParser;

/// Canonical name of the artwork tag.
pub const ARTWORK_TAG: &str = "artwork";

/// A single value as stored in a native tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeValue {
    /// Text value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Binary value.
    Binary(Vec<u8>),
}

impl NativeValue {
    /// Render the value as text.
    ///
    /// Integers are rendered in decimal, binary data is decoded as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if binary data is not valid UTF-8.
    pub fn to_text(&self) -> Result<Cow<'_, str>, Utf8Error> {
        match self {
            Self::Text(text) => Ok(Cow::Borrowed(text.as_str())),
            Self::Integer(number) => Ok(Cow::Owned(number.to_string())),
            Self::Binary(data) => std::str::from_utf8(data).map(Cow::Borrowed),
        }
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Vec<u8>> for NativeValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

/// A value assigned to a canonical tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// One or more text values.
    Text(Vec<String>),
    /// An artwork payload.
    Artwork(Artwork),
    /// A numbering (position and optional total).
    Numbering {
        /// The position.
        value: Option<u32>,
        /// The total count.
        total: Option<u32>,
    },
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        Self::Text(vec![value.to_string()])
    }
}

impl From<&String> for TagValue {
    fn from(value: &String) -> Self {
        Self::Text(vec![value.clone()])
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        Self::Text(vec![value])
    }
}

impl From<Vec<String>> for TagValue {
    fn from(values: Vec<String>) -> Self {
        Self::Text(values)
    }
}

impl From<&[&str]> for TagValue {
    fn from(values: &[&str]) -> Self {
        Self::Text(values.iter().map(ToString::to_string).collect())
    }
}

impl From<u32> for TagValue {
    fn from(value: u32) -> Self {
        Self::Text(vec![value.to_string()])
    }
}

impl From<Artwork> for TagValue {
    fn from(artwork: Artwork) -> Self {
        Self::Artwork(artwork)
    }
}

impl From<NumberingTag> for TagValue {
    fn from(numbering: NumberingTag) -> Self {
        Self::Numbering {
            value: numbering.value(),
            total: numbering.total(),
        }
    }
}

/// Where a codec stores the parts of a numbering tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingLayout {
    /// Position and total share a single field (`3/12`).
    Combined(&'static str),
    /// Position and total are stored in separate fields.
    Split {
        /// Field of the position.
        value: &'static str,
        /// Fields of the total count; the first one is written.
        total: &'static [&'static str],
    },
}

impl NumberingLayout {
    /// All native fields involved in the numbering.
    #[must_use]
    pub fn fields(self) -> Vec<&'static str> {
        match self {
            Self::Combined(field) => vec![field],
            Self::Split { value, total } => std::iter::once(value)
                .chain(total.iter().copied())
                .collect(),
        }
    }
}

/// A native, format-specific tag block of a single file.
///
/// Implementations give raw access to their fields and define how canonical tags, numbering and
/// artwork are written to them.
pub trait NativeTag: Send + fmt::Debug {
    /// The codec whose tag format this is.
    fn codec(&self) -> Codec;

    /// Mapping between canonical names and the native fields of this format.
    fn tag_map(&self) -> &'static TagMap;

    /// Names of the native fields present, in the order they are stored.
    fn fields(&self) -> Vec<String>;

    /// Get all values of a native field.
    fn get(&self, field: &str) -> Option<Vec<NativeValue>>;

    /// Returns `true` if the native field is present.
    fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Replace all values of a native field.
    fn set(&mut self, field: &str, values: Vec<NativeValue>);

    /// Remove a native field. Returns `true` if it was present.
    fn remove(&mut self, field: &str) -> bool;

    /// Write the tag back to the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&mut self) -> Result<(), NativeTagError>;

    /// The front cover embedded in the tag, if any.
    fn artwork(&self) -> Option<Artwork>;

    /// Embed the artwork as front cover, replacing the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if the format cannot store the artwork.
    fn embed_artwork(&mut self, artwork: &Artwork) -> Result<(), NativeTagError>;

    /// Remove the embedded front cover. Returns `true` if there was one.
    fn remove_artwork(&mut self) -> bool;

    /// Write a canonical tag.
    ///
    /// The values go to the first native field of the tag; other fields that also back the tag
    /// are removed so that no stale value is left behind.
    fn write_tag(&mut self, tag: &str, values: &[String]) {
        let fields = self.tag_map().resolve_read(tag);
        if let Some((primary, aliases)) = fields.split_first() {
            for alias in aliases {
                let _ = self.remove(alias);
            }
            self.set(
                primary,
                values.iter().cloned().map(NativeValue::Text).collect(),
            );
        }
    }

    /// Native fields of a numbering tag.
    ///
    /// If the map has a separate canonical tag for the total, position and total are split,
    /// otherwise they share the field of the position.
    fn numbering_layout(&self, kind: NumberingKind) -> NumberingLayout {
        let map = self.tag_map();
        let value = map.resolve_write(kind.value_tag());
        match map.native_fields(kind.total_tag()) {
            Some(total) => NumberingLayout::Split { value, total },
            None => NumberingLayout::Combined(value),
        }
    }
}
