// Copyright (c) 2022 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Support for FLAC tags.

#![cfg(feature = "flac")]

use crate::format::Codec;
use crate::tag::{Artwork, NativeTag, NativeTagError, NativeValue, TagMap, VORBIS_TAG_MAP};
use metaflac::block::PictureType;
use std::path::{Path, PathBuf};

/// FLAC tag.
#[derive(Debug)]
pub struct FlacTag {
    /// Path of the FLAC file.
    path: PathBuf,
    /// The underlying tag data.
    data: metaflac::Tag,
}

impl FlacTag {
    /// Read the FLAC tag from the path
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a FLAC file.
    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self, NativeTagError> {
        let path = path.as_ref();
        let data = metaflac::Tag::read_from_path(path)?;
        Ok(FlacTag {
            path: path.to_path_buf(),
            data,
        })
    }

    /// Stored keys that match the field, ignoring case.
    fn matching_keys(&self, field: &str) -> Vec<String> {
        self.data
            .vorbis_comments()
            .map(|vorbis_comments| {
                vorbis_comments
                    .comments
                    .keys()
                    .filter(|key| key.eq_ignore_ascii_case(field))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl NativeTag for FlacTag {
    fn codec(&self) -> Codec {
        Codec::Flac
    }

    fn tag_map(&self) -> &'static TagMap {
        &VORBIS_TAG_MAP
    }

    fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self
            .data
            .vorbis_comments()
            .map(|vorbis_comments| {
                vorbis_comments
                    .comments
                    .iter()
                    .filter(|(_, values)| !values.is_empty())
                    .map(|(key, _)| key.to_ascii_uppercase())
                    .collect()
            })
            .unwrap_or_default();
        fields.sort_unstable();
        fields.dedup();
        fields
    }

    fn get(&self, field: &str) -> Option<Vec<NativeValue>> {
        let vorbis_comments = self.data.vorbis_comments()?;
        let values: Vec<NativeValue> = vorbis_comments
            .comments
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(field))
            .flat_map(|(_, values)| values.iter().map(|value| NativeValue::from(value.as_str())))
            .collect();
        (!values.is_empty()).then_some(values)
    }

    fn set(&mut self, field: &str, values: Vec<NativeValue>) {
        let _ = self.remove(field);
        let values: Vec<String> = values
            .iter()
            .map(|value| match value.to_text() {
                Ok(text) => text.into_owned(),
                Err(_) => {
                    log::warn!("Storing binary value as lossy text in Vorbis comment {field}");
                    match value {
                        NativeValue::Binary(data) => String::from_utf8_lossy(data).into_owned(),
                        NativeValue::Text(_) | NativeValue::Integer(_) => String::new(),
                    }
                }
            })
            .collect();
        self.data.set_vorbis(field.to_ascii_uppercase(), values);
    }

    fn remove(&mut self, field: &str) -> bool {
        let keys = self.matching_keys(field);
        if keys.is_empty() {
            return false;
        }
        let comments = &mut self.data.vorbis_comments_mut().comments;
        for key in &keys {
            let _ = comments.remove(key);
        }
        true
    }

    fn save(&mut self) -> Result<(), NativeTagError> {
        log::debug!("Writing FLAC tag to {}", self.path.display());
        self.data.write_to_path(&self.path)?;
        Ok(())
    }

    fn artwork(&self) -> Option<Artwork> {
        let cover = self
            .data
            .pictures()
            .find(|picture| matches!(picture.picture_type, PictureType::CoverFront))?;
        Some(Artwork::new(cover.mime_type.clone(), cover.data.clone()))
    }

    fn embed_artwork(&mut self, artwork: &Artwork) -> Result<(), NativeTagError> {
        let (Some(mime_type), Some(data)) = (artwork.mime_type(), artwork.data()) else {
            return Err(NativeTagError::Unsupported("artwork without image data"));
        };
        self.data.remove_picture_type(PictureType::CoverFront);
        self.data
            .add_picture(mime_type, PictureType::CoverFront, data.to_vec());
        Ok(())
    }

    fn remove_artwork(&mut self) -> bool {
        let present = self
            .data
            .pictures()
            .any(|picture| matches!(picture.picture_type, PictureType::CoverFront));
        self.data.remove_picture_type(PictureType::CoverFront);
        present
    }
}
