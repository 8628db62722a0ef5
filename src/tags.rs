// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Shared handle to the cached tags of one file.

use crate::cache::{lock, ParserSlot, TagCache};
use crate::format::Codec;
use crate::tag::{
    Artwork, NumberingKind, NumberingPart, NumberingTag, TagError, TagParser, TagValue, ARTWORK_TAG,
};
use crate::util::modified_time;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Tags of an audio file.
///
/// All handles for the same file share one [`TagParser`], so changes made through one handle are
/// visible through every other. Each method locks the parser for its duration, use
/// [`Tags::edit`] to run several operations atomically.
#[derive(Debug, Clone)]
pub struct Tags {
    /// Canonical path of the file.
    path: PathBuf,
    /// The shared parser.
    parser: ParserSlot,
}

impl Tags {
    /// Get the tags of a file from the global [`TagCache`].
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist, is not a supported audio file or its tags cannot be
    /// loaded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TagError> {
        TagCache::global().get(path)
    }

    /// Wrap a loaded parser slot.
    pub(crate) fn new(path: PathBuf, parser: ParserSlot) -> Self {
        Self { path, parser }
    }

    /// Canonical path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if both handles refer to the same cached instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Tags) -> bool {
        Arc::ptr_eq(&self.parser, &other.parser)
    }

    /// Run `f` with exclusive access to the parser.
    ///
    /// The file stays locked while `f` runs. Calling methods of a handle to the same file from
    /// within `f` deadlocks, so `f` must only use the parser it is given. Handles to other files
    /// can be used.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or [`TagError::NotLoaded`] if the file is not loaded.
    pub fn edit<T, F>(&self, f: F) -> Result<T, TagError>
    where
        F: FnOnce(&mut TagParser) -> Result<T, TagError>,
    {
        let mut guard = lock(&self.parser);
        let parser = guard
            .as_mut()
            .ok_or_else(|| TagError::NotLoaded(self.path.clone()))?;
        f(parser)
    }

    /// Run `f` with shared access to the parser, or return `default` if the file is not loaded.
    fn read<T>(&self, default: T, f: impl FnOnce(&TagParser) -> T) -> T {
        lock(&self.parser).as_ref().map_or(default, f)
    }

    /// First value of a tag.
    ///
    /// # Errors
    ///
    /// Fails if the tag is missing, has no text value or cannot be decoded.
    pub fn get_tag(&self, tag: &str) -> Result<String, TagError> {
        self.edit(|parser| parser.get_tag(tag))
    }

    /// All values of a tag.
    ///
    /// # Errors
    ///
    /// Fails if the tag is missing or cannot be decoded.
    pub fn get_values(&self, tag: &str) -> Result<Vec<String>, TagError> {
        self.edit(|parser| parser.get(tag))
    }

    /// Set a tag. The change is kept in memory until [`Tags::save`].
    ///
    /// # Errors
    ///
    /// Fails if the value cannot be coerced to what the tag requires. The tags are unchanged in
    /// that case.
    pub fn set_tag(&self, tag: &str, value: impl Into<TagValue>) -> Result<(), TagError> {
        self.edit(|parser| parser.set(tag, value))
    }

    /// Returns `true` if the tag is present.
    #[must_use]
    pub fn has_key(&self, tag: &str) -> bool {
        self.read(false, |parser| parser.has(tag))
    }

    /// Names of all present tags, standard tags first.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.read(Vec::new(), TagParser::keys)
    }

    /// First value of every tag with a text value, ordered like [`Tags::keys`].
    #[must_use]
    pub fn items(&self) -> Vec<(String, String)> {
        self.read(Vec::new(), TagParser::items)
    }

    /// Values of [`Tags::items`].
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        self.read(Vec::new(), TagParser::values)
    }

    /// Set several tags and save them if anything changed. Returns whether the file was written.
    ///
    /// # Errors
    ///
    /// Fails if a value cannot be set or the file cannot be written.
    pub fn update_tags<I, K, V>(&self, tags: I) -> Result<bool, TagError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<TagValue>,
    {
        self.edit(|parser| {
            if parser.update(tags)? {
                parser.save()
            } else {
                Ok(false)
            }
        })
    }

    /// Remove tags and save them if anything changed. Returns whether the file was written.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn remove_tags<I, K>(&self, tags: I) -> Result<bool, TagError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.edit(|parser| {
            for tag in tags {
                let _ = parser.remove(tag.as_ref());
            }
            if parser.is_modified() {
                parser.save()
            } else {
                Ok(false)
            }
        })
    }

    /// Native fields without a canonical name.
    #[must_use]
    pub fn unknown_tags(&self) -> Vec<String> {
        self.read(Vec::new(), TagParser::unknown_tags)
    }

    /// Remove native fields without a canonical name and save if anything was removed.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn remove_unknown_tags(&self) -> Result<bool, TagError> {
        self.edit(|parser| {
            if parser.remove_unknown_tags() {
                parser.save()
            } else {
                Ok(false)
            }
        })
    }

    /// Write pending changes. Returns `false` if there was nothing to write.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written. Pending changes are kept in that case.
    pub fn save(&self) -> Result<bool, TagError> {
        self.edit(TagParser::save)
    }

    /// Returns `true` if there are unsaved changes.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.read(false, TagParser::is_modified)
    }

    /// The codec of the file.
    ///
    /// # Errors
    ///
    /// Fails if the file is not loaded.
    pub fn codec(&self) -> Result<Codec, TagError> {
        self.edit(|parser| Ok(parser.codec()))
    }

    /// The front cover, if any.
    #[must_use]
    pub fn artwork(&self) -> Option<Artwork> {
        self.read(None, |parser| parser.artwork().get().cloned())
    }

    /// Track or disk numbering.
    ///
    /// # Errors
    ///
    /// Fails if the stored numbering is not numeric.
    pub fn numbering(&self, kind: NumberingKind) -> Result<NumberingTag, TagError> {
        self.edit(|parser| parser.numbering(kind))
    }

    /// Modification time of the file on disk.
    ///
    /// # Errors
    ///
    /// Fails if the file metadata cannot be read.
    pub fn modified_time(&self) -> io::Result<SystemTime> {
        modified_time(&self.path)
    }

    /// Copy all text tags and the artwork of `source` to this file and save if anything changed.
    /// Returns whether this file was written.
    ///
    /// # Errors
    ///
    /// Fails if a value cannot be set or the file cannot be written.
    pub fn copy_from(&self, source: &Tags) -> Result<bool, TagError> {
        if self.ptr_eq(source) {
            return Ok(false);
        }

        let (items, artwork) = source.edit(|parser| {
            Ok((parser.items(), parser.artwork().get().cloned()))
        })?;
        log::debug!(
            "Copying {} tags from {} to {}",
            items.len(),
            source.path.display(),
            self.path.display()
        );

        self.edit(|parser| {
            for (tag, value) in items {
                if !holds_value(parser, &tag, &value) {
                    parser.set(&tag, value)?;
                }
            }
            if let Some(artwork) = artwork {
                let unchanged = parser.artwork().get().is_some_and(|current| {
                    current.data() == artwork.data()
                });
                if !unchanged {
                    parser.set(ARTWORK_TAG, artwork)?;
                }
            }
            parser.save()
        })
    }
}

/// Returns `true` if setting `tag` to `value` would not change anything.
fn holds_value(parser: &TagParser, tag: &str, value: &str) -> bool {
    let Some((kind, part)) = NumberingKind::from_tag(tag) else {
        return parser.get(tag).is_ok_and(|current| current == [value]);
    };
    let Ok(current) = parser.numbering(kind) else {
        return false;
    };
    match part {
        NumberingPart::Value => NumberingTag::parse(kind, value).is_ok_and(|parsed| {
            parsed.value() == current.value()
                && parsed.total().is_none_or(|total| Some(total) == current.total())
        }),
        NumberingPart::Total => value.parse::<u32>().ok() == current.total(),
    }
}
