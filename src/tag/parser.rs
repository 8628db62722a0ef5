// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Codec-agnostic access to the tags of a single file.

use crate::format::{Codec, FormatRegistry, Resolution};
use crate::tag::{
    Artwork, CoercionError, NativeTag, NumberingKind, NumberingLayout, NumberingPart,
    NumberingTag, TagError, TagMap, TagValue, TrackArtwork, ARTWORK_TAG, STANDARD_TAG_ORDER,
};
use base64::Engine as _;
use itertools::Itertools;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Reads and writes canonical tags on top of a native tag.
///
/// Text tag edits go straight into the native tag. Numbering edits and artwork imports are kept
/// aside and only serialized by [`TagParser::save`], which writes nothing unless something has
/// changed since the last save.
#[derive(Debug)]
pub struct TagParser {
    /// The file the tags belong to.
    path: PathBuf,
    /// The native tag.
    native: Box<dyn NativeTag>,
    /// Whether a text tag was changed since the last save.
    modified: bool,
    /// The artwork, with its own modification flag.
    artwork: TrackArtwork,
    /// Numbering edits that have not been saved yet.
    numbering: BTreeMap<NumberingKind, NumberingTag>,
    /// Numberings whose total was removed, so it is not written equal to the position.
    cleared_totals: BTreeSet<NumberingKind>,
}

impl TagParser {
    /// Wrap a loaded native tag.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, native: Box<dyn NativeTag>) -> Self {
        let artwork = TrackArtwork::new(native.artwork());
        Self {
            path: path.into(),
            native,
            modified: false,
            artwork,
            numbering: BTreeMap::new(),
            cleared_totals: BTreeSet::new(),
        }
    }

    /// Resolve the codec of the file and load its native tag.
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist, is not an audio file, or if there is no tag
    /// implementation for its codec.
    pub fn open(path: &Path, registry: &dyn FormatRegistry) -> Result<Self, TagError> {
        if !path.is_file() {
            return Err(TagError::NoSuchFile(path.to_path_buf()));
        }
        match registry.resolve(path) {
            Resolution::Audio(codec) => {
                log::debug!("Loading {codec} tags from {}", path.display());
                let native = registry.load_native(codec, path)?;
                Ok(Self::new(path, native))
            }
            Resolution::Metadata => Err(TagError::MetadataFile(path.to_path_buf())),
            Resolution::Unknown => Err(TagError::UnsupportedFile(path.to_path_buf())),
        }
    }

    /// The file the tags belong to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The codec of the file.
    #[must_use]
    pub fn codec(&self) -> Codec {
        self.native.codec()
    }

    /// Canonical map of the codec.
    fn tag_map(&self) -> &'static TagMap {
        self.native.tag_map()
    }

    /// Error for a missing tag.
    fn no_such_tag(&self, tag: &str) -> TagError {
        TagError::NoSuchTag {
            tag: tag.to_string(),
            path: self.path.clone(),
        }
    }

    /// Error for a value that does not fit the tag.
    fn coercion_error(&self, tag: &str, source: CoercionError) -> TagError {
        TagError::Coercion {
            tag: tag.to_string(),
            path: self.path.clone(),
            source,
        }
    }

    /// Current numbering, including unsaved edits.
    ///
    /// # Errors
    ///
    /// Fails if the numbering stored in the file is not numeric.
    pub fn numbering(&self, kind: NumberingKind) -> Result<NumberingTag, TagError> {
        if let Some(numbering) = self.numbering.get(&kind) {
            return Ok(*numbering);
        }
        NumberingTag::read_from(kind, self.native.numbering_layout(kind), self.native.as_ref())
            .map_err(|source| self.coercion_error(kind.value_tag(), source))
    }

    /// Current position and total, each read on its own so that editing one part does not
    /// depend on the other being readable.
    fn numbering_parts(
        &self,
        kind: NumberingKind,
    ) -> (Result<Option<u32>, TagError>, Result<Option<u32>, TagError>) {
        if let Some(numbering) = self.numbering.get(&kind) {
            return (Ok(numbering.value()), Ok(numbering.total()));
        }
        let (value, total) =
            NumberingTag::read_parts(self.native.numbering_layout(kind), self.native.as_ref());
        (
            value.map_err(|source| self.coercion_error(kind.value_tag(), source)),
            total.map_err(|source| self.coercion_error(kind.total_tag(), source)),
        )
    }

    /// Replace the numbering. The change is written on the next save.
    pub fn set_numbering(&mut self, numbering: NumberingTag) {
        let _ = self.cleared_totals.remove(&numbering.kind());
        let _ = self.numbering.insert(numbering.kind(), numbering);
    }

    /// The numbering part as text, if the numbering is kept in the parser or has to be split from
    /// a combined field. Returns `None` if the native fields can be read as they are.
    fn numbering_text(
        &self,
        tag: &str,
        kind: NumberingKind,
        part: NumberingPart,
    ) -> Option<Result<Vec<String>, TagError>> {
        let combined = matches!(
            self.native.numbering_layout(kind),
            NumberingLayout::Combined(_)
        );
        if !self.numbering.contains_key(&kind) && (part == NumberingPart::Value || !combined) {
            return None;
        }
        let text = self.numbering(kind).and_then(|numbering| match part {
            NumberingPart::Value if combined => {
                numbering.render().map_err(|_| self.no_such_tag(tag))
            }
            NumberingPart::Value => numbering
                .value()
                .map(|value| value.to_string())
                .ok_or_else(|| self.no_such_tag(tag)),
            NumberingPart::Total => numbering
                .total()
                .map(|total| total.to_string())
                .ok_or_else(|| self.no_such_tag(tag)),
        });
        Some(text.map(|text| vec![text]))
    }

    /// All values of a tag, as text.
    ///
    /// # Errors
    ///
    /// Fails with [`TagError::NoSuchTag`] if the tag is not present and with
    /// [`TagError::Decode`] if a binary value is not valid UTF-8.
    pub fn get(&self, tag: &str) -> Result<Vec<String>, TagError> {
        if let Some((kind, part)) = NumberingKind::from_tag(tag) {
            if let Some(text) = self.numbering_text(tag, kind, part) {
                return text;
            }
        }

        let values = self
            .tag_map()
            .resolve_read(tag)
            .into_iter()
            .find_map(|field| self.native.get(field).filter(|values| !values.is_empty()))
            .ok_or_else(|| self.no_such_tag(tag))?;
        values
            .iter()
            .map(|value| {
                value
                    .to_text()
                    .map(Cow::into_owned)
                    .map_err(|source| TagError::Decode {
                        tag: tag.to_string(),
                        path: self.path.clone(),
                        source,
                    })
            })
            .collect()
    }

    /// The first value of a tag.
    ///
    /// # Errors
    ///
    /// Fails like [`TagParser::get`], and with [`TagError::NotText`] if the tag holds artwork.
    pub fn get_tag(&self, tag: &str) -> Result<String, TagError> {
        if tag == ARTWORK_TAG {
            return Err(if self.has(tag) {
                TagError::NotText {
                    tag: tag.to_string(),
                    path: self.path.clone(),
                }
            } else {
                self.no_such_tag(tag)
            });
        }
        self.get(tag)?
            .into_iter()
            .next()
            .ok_or_else(|| self.no_such_tag(tag))
    }

    /// Returns `true` if the tag is present.
    #[must_use]
    pub fn has(&self, tag: &str) -> bool {
        if tag == ARTWORK_TAG {
            return self.artwork.is_defined();
        }
        if let Some((kind, part)) = NumberingKind::from_tag(tag) {
            if let Some(text) = self.numbering_text(tag, kind, part) {
                return text.is_ok();
            }
        }
        self.tag_map()
            .resolve_read(tag)
            .into_iter()
            .any(|field| self.native.contains(field))
    }

    /// Names of all tags present.
    ///
    /// Tags from [`STANDARD_TAG_ORDER`] come first and in that order, the remaining ones follow in
    /// the order they are stored in.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let map = self.tag_map();
        let numbering_tags = NumberingKind::ALL
            .into_iter()
            .flat_map(|kind| [kind.value_tag(), kind.total_tag()]);
        self.native
            .fields()
            .iter()
            .map(|field| map.reverse(field).to_string())
            .chain(numbering_tags.map(ToString::to_string))
            .chain(std::iter::once(ARTWORK_TAG.to_string()))
            .unique()
            .filter(|tag| self.has(tag))
            .sorted_by_key(|tag| {
                STANDARD_TAG_ORDER
                    .iter()
                    .position(|name| *name == tag.as_str())
                    .unwrap_or(STANDARD_TAG_ORDER.len())
            })
            .collect()
    }

    /// The first value of a tag, or `None` if it is absent, artwork or undecodable.
    #[must_use]
    pub fn flatten(&self, tag: &str) -> Option<String> {
        if tag == ARTWORK_TAG {
            return None;
        }
        match self.get(tag) {
            Ok(values) => values.into_iter().next(),
            Err(TagError::NoSuchTag { .. }) => None,
            Err(err) => {
                log::warn!("Skipping tag: {err}");
                None
            }
        }
    }

    /// `(tag, value)` pairs of all text tags, in [`TagParser::keys`] order.
    #[must_use]
    pub fn items(&self) -> Vec<(String, String)> {
        self.keys()
            .into_iter()
            .filter_map(|tag| self.flatten(&tag).map(|value| (tag, value)))
            .collect()
    }

    /// Values of all text tags, in [`TagParser::keys`] order.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        self.items().into_iter().map(|(_, value)| value).collect()
    }

    /// Set a tag.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the value cannot be coerced to what the tag requires,
    /// or if the artwork cannot be imported.
    pub fn set(&mut self, tag: &str, value: impl Into<TagValue>) -> Result<(), TagError> {
        match value.into() {
            TagValue::Artwork(artwork) => self.import_artwork(artwork),
            TagValue::Numbering { value, total } => match NumberingKind::from_tag(tag) {
                Some((kind, NumberingPart::Value)) => {
                    self.set_numbering(NumberingTag::with(kind, value, total));
                    Ok(())
                }
                _ => Err(self.coercion_error(tag, CoercionError::NotNumbering(tag.to_string()))),
            },
            TagValue::Text(values) => self.set_text(tag, values),
        }
    }

    /// Set a tag from text, parsing it if the tag is not a plain text tag.
    fn set_text(&mut self, tag: &str, values: Vec<String>) -> Result<(), TagError> {
        let Some(first) = values.first() else {
            return Err(self.coercion_error(tag, CoercionError::Empty));
        };

        if let Some((kind, part)) = NumberingKind::from_tag(tag) {
            let numbering = match part {
                NumberingPart::Value => {
                    let parsed = NumberingTag::parse(kind, first)
                        .map_err(|source| self.coercion_error(tag, source))?;
                    let total = match parsed.total() {
                        Some(total) => Some(total),
                        None => self.numbering_parts(kind).1?,
                    };
                    NumberingTag::with(kind, parsed.value(), total)
                }
                NumberingPart::Total => {
                    let total = NumberingTag::coerce(&values)
                        .map_err(|source| self.coercion_error(tag, source))?;
                    NumberingTag::with(kind, self.numbering_parts(kind).0?, Some(total))
                }
            };
            let _ = self.numbering.insert(kind, numbering);
            return Ok(());
        }

        if tag == ARTWORK_TAG {
            let data = base64::engine::general_purpose::STANDARD
                .decode(first.trim())
                .map_err(|err| {
                    self.coercion_error(tag, CoercionError::InvalidBase64(err.to_string()))
                })?;
            let artwork = Artwork::from_bytes(data).map_err(|source| TagError::Artwork {
                path: self.path.clone(),
                source,
            })?;
            return self.import_artwork(artwork);
        }

        self.native.write_tag(tag, &values);
        self.modified = true;
        Ok(())
    }

    /// Replace the artwork. It is embedded on the next save.
    fn import_artwork(&mut self, artwork: Artwork) -> Result<(), TagError> {
        self.artwork
            .import(artwork)
            .map_err(|source| TagError::Artwork {
                path: self.path.clone(),
                source,
            })
    }

    /// Remove a tag. Returns `true` if anything was removed.
    pub fn remove(&mut self, tag: &str) -> bool {
        let mut removed = false;
        match NumberingKind::from_tag(tag) {
            Some((kind, NumberingPart::Value)) => {
                let _ = self.cleared_totals.remove(&kind);
                removed |= self.numbering.remove(&kind).is_some();
                for field in self.native.numbering_layout(kind).fields() {
                    removed |= self.native.remove(field);
                }
                self.modified |= removed;
                return removed;
            }
            Some((kind, NumberingPart::Total)) => return self.remove_total(kind),
            None => (),
        }

        if tag == ARTWORK_TAG {
            removed |= self.artwork.remove();
        }

        let mut native_removed = false;
        for field in self.tag_map().resolve_read(tag) {
            native_removed |= self.native.remove(field);
        }
        self.modified |= native_removed;
        removed || native_removed
    }

    /// Remove the total of a numbering, keeping its position.
    fn remove_total(&mut self, kind: NumberingKind) -> bool {
        if let Some(numbering) = self.numbering.get_mut(&kind) {
            let removed = numbering.total().is_some();
            numbering.set_total(None);
            let _ = self.cleared_totals.insert(kind);
            return removed;
        }
        match self.native.numbering_layout(kind) {
            NumberingLayout::Split { total, .. } => {
                let mut removed = false;
                for field in total {
                    removed |= self.native.remove(field);
                }
                self.modified |= removed;
                removed
            }
            NumberingLayout::Combined(_) => match self.numbering_parts(kind) {
                (Ok(value), Ok(Some(_))) => {
                    let _ = self
                        .numbering
                        .insert(kind, NumberingTag::with(kind, value, None));
                    let _ = self.cleared_totals.insert(kind);
                    true
                }
                (Ok(_), Ok(None)) => false,
                (Err(err), _) | (_, Err(err)) => {
                    log::warn!("Not removing {}: {err}", kind.total_tag());
                    false
                }
            },
        }
    }

    /// Set several tags at once. Returns whether there are unsaved changes afterwards.
    ///
    /// # Errors
    ///
    /// Stops at the first tag that cannot be set.
    pub fn update<I, K, V>(&mut self, tags: I) -> Result<bool, TagError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<TagValue>,
    {
        for (tag, value) in tags {
            self.set(tag.as_ref(), value)?;
        }
        Ok(self.is_modified())
    }

    /// Native fields that do not map back to any canonical tag.
    #[must_use]
    pub fn unknown_tags(&self) -> Vec<String> {
        let map = self.tag_map();
        self.native
            .fields()
            .into_iter()
            .filter(|field| !map.is_known_field(field))
            .collect()
    }

    /// Remove all native fields that do not map back to a canonical tag.
    pub fn remove_unknown_tags(&mut self) -> bool {
        let mut removed = false;
        for field in self.unknown_tags() {
            log::debug!("Removing unknown tag {field} from {}", self.path.display());
            removed |= self.native.remove(&field);
        }
        self.modified |= removed;
        removed
    }

    /// The artwork of the track.
    #[must_use]
    pub fn artwork(&self) -> &TrackArtwork {
        &self.artwork
    }

    /// Returns `true` if text tags or numbering changed since the last save.
    #[must_use]
    pub fn tags_modified(&self) -> bool {
        self.modified || !self.numbering.is_empty()
    }

    /// Returns `true` if anything changed since the last save.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.tags_modified() || self.artwork.is_modified()
    }

    /// Write changes back to the file. Returns `false` (without touching the file) if there was
    /// nothing to write.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written, in which case all changes are kept for a retry.
    pub fn save(&mut self) -> Result<bool, TagError> {
        if !self.is_modified() {
            log::debug!("Tags of {} not modified", self.path.display());
            return Ok(false);
        }

        for numbering in self.numbering.values() {
            let kind = numbering.kind();
            let layout = self.native.numbering_layout(kind);
            numbering.write_to(
                layout,
                self.native.as_mut(),
                !self.cleared_totals.contains(&kind),
            );
        }

        if self.artwork.is_modified() {
            match self.artwork.get() {
                Some(artwork) => {
                    self.native
                        .embed_artwork(artwork)
                        .map_err(|source| TagError::Save {
                            path: self.path.clone(),
                            source,
                        })?;
                }
                None => {
                    let _ = self.native.remove_artwork();
                }
            }
        }

        self.native.save().map_err(|source| TagError::Save {
            path: self.path.clone(),
            source,
        })?;
        log::debug!("Saved tags of {}", self.path.display());

        self.numbering.clear();
        self.cleared_totals.clear();
        self.modified = false;
        self.artwork.mark_saved();
        Ok(true)
    }
}
