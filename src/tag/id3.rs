// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Support for ID3 tags.

use crate::config::Id3Version;
use crate::format::Codec;
use crate::tag::{Artwork, NativeTag, NativeTagError, NativeValue, TagMap, ID3_TAG_MAP};
use id3::frame::{Comment, Content, ExtendedText, Lyrics, Picture, PictureType};
use id3::{Frame, TagLike};
use itertools::Itertools;
use std::path::{Path, PathBuf};

/// Prefix of user-defined text frames (`TXXX:<description>`).
const EXTENDED_TEXT_PREFIX: &str = "TXXX:";

/// Language of comment and lyrics frames written by this crate.
const DEFAULT_LANGUAGE: &str = "eng";

/// ID3 frame ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameId<'a> {
    /// Text frame.
    Text(&'a str),
    /// Extended Text frame (`TXXX`).
    ExtendedText(&'a str),
    /// URL link frame.
    Link(&'a str),
    /// Comment frame (`COMM`).
    Comment,
    /// Unsynchronized lyrics frame (`USLT`).
    Lyrics,
    /// Attached picture frame (`APIC`).
    Picture,
    /// Any other frame, only readable as binary data.
    Other(&'a str),
}

impl<'a> FrameId<'a> {
    /// Parse a native field name.
    ///
    /// Names that are not valid frame IDs are stored in a user-defined text frame.
    fn parse(field: &'a str) -> Self {
        if let Some(description) = field.strip_prefix(EXTENDED_TEXT_PREFIX) {
            return Self::ExtendedText(description);
        }
        if !is_frame_id(field) {
            return Self::ExtendedText(field);
        }
        match field {
            "COMM" => Self::Comment,
            "USLT" => Self::Lyrics,
            "APIC" => Self::Picture,
            "TXXX" | "WXXX" => Self::Other(field),
            id if id.starts_with('T') => Self::Text(id),
            id if id.starts_with('W') => Self::Link(id),
            id => Self::Other(id),
        }
    }
}

/// Returns `true` for four-character frame IDs (`A-Z`, `0-9`, starting with a letter).
fn is_frame_id(field: &str) -> bool {
    field.len() == 4
        && field.starts_with(|c: char| c.is_ascii_uppercase())
        && field
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Render native values as text for frames that can only store text.
fn values_to_text(values: &[NativeValue]) -> Vec<String> {
    values
        .iter()
        .map(|value| match value.to_text() {
            Ok(text) => text.into_owned(),
            Err(_) => {
                log::warn!("Storing binary value as lossy text in ID3 frame");
                match value {
                    NativeValue::Binary(data) => String::from_utf8_lossy(data).into_owned(),
                    NativeValue::Text(_) | NativeValue::Integer(_) => String::new(),
                }
            }
        })
        .collect()
}

impl From<Id3Version> for id3::Version {
    fn from(version: Id3Version) -> Self {
        match version {
            Id3Version::Id3v23 => id3::Version::Id3v23,
            Id3Version::Id3v24 => id3::Version::Id3v24,
        }
    }
}

/// ID3 tag (version 2).
#[derive(Debug)]
pub struct ID3v2Tag {
    /// Path of the MP3 file.
    path: PathBuf,
    /// The underlying tag data.
    data: id3::Tag,
    /// Version that the tag is written with.
    version: id3::Version,
}

impl ID3v2Tag {
    /// Read the ID3 tag from the path. Files without a tag get a new, empty one.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or contains a malformed tag.
    pub fn read_from_path(
        path: impl AsRef<Path>,
        version: Id3Version,
    ) -> Result<Self, NativeTagError> {
        let path = path.as_ref();
        let data = match id3::Tag::read_from_path(path) {
            Ok(data) => data,
            Err(err) if matches!(err.kind, id3::ErrorKind::NoTag) => {
                log::debug!("No ID3 tag in {}, starting with an empty one", path.display());
                id3::Tag::with_version(version.into())
            }
            Err(err) => return Err(err.into()),
        };
        Ok(ID3v2Tag {
            path: path.to_path_buf(),
            data,
            version: version.into(),
        })
    }

    /// Values of all frames with the given ID.
    fn frame_values(&self, id: &str) -> Vec<NativeValue> {
        self.data
            .frames()
            .filter(|frame| frame.id() == id)
            .flat_map(|frame| match frame.content() {
                Content::Text(text) => text.split('\0').map(NativeValue::from).collect::<Vec<_>>(),
                Content::Link(link) => vec![NativeValue::from(link.as_str())],
                Content::Unknown(unknown) => vec![NativeValue::Binary(unknown.data.clone())],
                _ => Vec::new(),
            })
            .collect()
    }
}

impl NativeTag for ID3v2Tag {
    fn codec(&self) -> Codec {
        Codec::Mp3
    }

    fn tag_map(&self) -> &'static TagMap {
        &ID3_TAG_MAP
    }

    fn fields(&self) -> Vec<String> {
        self.data
            .frames()
            .map(|frame| match frame.content() {
                Content::ExtendedText(extended_text) => {
                    format!("{EXTENDED_TEXT_PREFIX}{}", extended_text.description)
                }
                _ => frame.id().to_string(),
            })
            .unique()
            .collect()
    }

    fn get(&self, field: &str) -> Option<Vec<NativeValue>> {
        let values: Vec<NativeValue> = match FrameId::parse(field) {
            FrameId::ExtendedText(description) => self
                .data
                .extended_texts()
                .filter(|extended_text| extended_text.description == description)
                .flat_map(|extended_text| extended_text.value.split('\0'))
                .map(NativeValue::from)
                .collect(),
            FrameId::Comment => self
                .data
                .comments()
                .map(|comment| NativeValue::from(comment.text.as_str()))
                .collect(),
            FrameId::Lyrics => self
                .data
                .lyrics()
                .map(|lyrics| NativeValue::from(lyrics.text.as_str()))
                .collect(),
            FrameId::Picture => self
                .data
                .pictures()
                .map(|picture| NativeValue::Binary(picture.data.clone()))
                .collect(),
            FrameId::Text(id) | FrameId::Link(id) | FrameId::Other(id) => self.frame_values(id),
        };
        (!values.is_empty()).then_some(values)
    }

    fn set(&mut self, field: &str, values: Vec<NativeValue>) {
        let _ = self.remove(field);
        match FrameId::parse(field) {
            FrameId::ExtendedText(description) => {
                let _ = self.data.add_frame(ExtendedText {
                    description: description.to_string(),
                    value: values_to_text(&values).join("\0"),
                });
            }
            FrameId::Text(id) => {
                self.data.set_text(id, values_to_text(&values).join("\0"));
            }
            FrameId::Link(id) => {
                if let Some(link) = values_to_text(&values).into_iter().next() {
                    let _ = self.data.add_frame(Frame::link(id, link));
                }
            }
            FrameId::Comment => {
                for text in values_to_text(&values) {
                    let _ = self.data.add_frame(Comment {
                        lang: DEFAULT_LANGUAGE.to_string(),
                        description: String::new(),
                        text,
                    });
                }
            }
            FrameId::Lyrics => {
                for text in values_to_text(&values) {
                    let _ = self.data.add_frame(Lyrics {
                        lang: DEFAULT_LANGUAGE.to_string(),
                        description: String::new(),
                        text,
                    });
                }
            }
            FrameId::Picture => {
                for value in values {
                    if let NativeValue::Binary(data) = value {
                        if let Ok(artwork) = Artwork::from_bytes(data) {
                            let _ = self.embed_artwork(&artwork);
                        }
                    }
                }
            }
            FrameId::Other(id) => {
                log::warn!("Cannot write values to ID3 frame {id}");
            }
        }
    }

    fn remove(&mut self, field: &str) -> bool {
        match FrameId::parse(field) {
            FrameId::ExtendedText(description) => {
                let present = self
                    .data
                    .extended_texts()
                    .any(|extended_text| extended_text.description == description);
                self.data.remove_extended_text(Some(description), None);
                present
            }
            FrameId::Comment => !self.data.remove("COMM").is_empty(),
            FrameId::Lyrics => !self.data.remove("USLT").is_empty(),
            FrameId::Picture => !self.data.remove("APIC").is_empty(),
            FrameId::Text(id) | FrameId::Link(id) | FrameId::Other(id) => {
                !self.data.remove(id).is_empty()
            }
        }
    }

    fn save(&mut self) -> Result<(), NativeTagError> {
        log::debug!("Writing {:?} tag to {}", self.version, self.path.display());
        self.data.write_to_path(&self.path, self.version)?;
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
        self.data.remove_picture_by_type(PictureType::CoverFront);
        let _ = self.data.add_frame(Picture {
            mime_type: mime_type.to_string(),
            picture_type: PictureType::CoverFront,
            description: String::new(),
            data: data.to_vec(),
        });
        Ok(())
    }

    fn remove_artwork(&mut self) -> bool {
        let present = self
            .data
            .pictures()
            .any(|picture| matches!(picture.picture_type, PictureType::CoverFront));
        self.data.remove_picture_by_type(PictureType::CoverFront);
        present
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{TagParser, TagValue};
    use paste::paste;
    use tempfile::NamedTempFile;

    const PNG_DATA: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn mp3_file() -> NamedTempFile {
        tempfile::Builder::new().suffix(".mp3").tempfile().unwrap()
    }

    fn open(file: &NamedTempFile) -> ID3v2Tag {
        ID3v2Tag::read_from_path(file.path(), Id3Version::Id3v24).unwrap()
    }

    macro_rules! add_test_set_and_reload {
        ($tag:ident, $field:expr) => {
            paste! {
                #[test]
                fn [<test_set_and_reload_ $tag>]() {
                    let file = mp3_file();
                    let mut parser = TagParser::new(file.path(), Box::new(open(&file)));
                    assert!(!parser.has(stringify!($tag)));

                    parser.set(stringify!($tag), "Example Value").unwrap();
                    assert!(parser.save().unwrap());

                    let tag = open(&file);
                    assert_eq!(tag.get($field), Some(vec![NativeValue::from("Example Value")]));
                    let parser = TagParser::new(file.path(), Box::new(tag));
                    assert_eq!(parser.get_tag(stringify!($tag)).unwrap(), "Example Value");
                }
            }
        };
    }

    add_test_set_and_reload!(title, "TIT2");
    add_test_set_and_reload!(artist, "TPE1");
    add_test_set_and_reload!(album_artist, "TPE2");
    add_test_set_and_reload!(album, "TALB");
    add_test_set_and_reload!(composer, "TCOM");
    add_test_set_and_reload!(conductor, "TPE3");
    add_test_set_and_reload!(genre, "TCON");
    add_test_set_and_reload!(grouping, "TIT1");
    add_test_set_and_reload!(subtitle, "TIT3");
    add_test_set_and_reload!(label, "TPUB");
    add_test_set_and_reload!(isrc, "TSRC");
    add_test_set_and_reload!(copyright, "TCOP");
    add_test_set_and_reload!(comment, "COMM");
    add_test_set_and_reload!(lyrics, "USLT");
    add_test_set_and_reload!(musicbrainz_album_id, "TXXX:MusicBrainz Album Id");

    #[test]
    fn test_file_without_tag_is_empty() {
        let file = mp3_file();
        let tag = open(&file);
        assert!(tag.fields().is_empty());
        assert!(tag.artwork().is_none());
    }

    #[test]
    fn test_invalid_frame_id_is_stored_as_extended_text() {
        let file = mp3_file();
        let mut tag = open(&file);
        tag.set("my tag", vec![NativeValue::from("value")]);
        assert_eq!(tag.fields(), vec!["TXXX:my tag"]);
        assert_eq!(tag.get("my tag"), Some(vec![NativeValue::from("value")]));
        assert_eq!(
            tag.get("TXXX:my tag"),
            Some(vec![NativeValue::from("value")])
        );
        assert!(tag.remove("TXXX:my tag"));
        assert!(!tag.remove("my tag"));
    }

    #[test]
    fn test_multiple_text_values() {
        let file = mp3_file();
        let mut tag = open(&file);
        tag.set(
            "TPE1",
            vec![NativeValue::from("Miles Davis"), NativeValue::from("Bill Evans")],
        );
        tag.save().unwrap();

        let tag = open(&file);
        assert_eq!(
            tag.get("TPE1"),
            Some(vec![
                NativeValue::from("Miles Davis"),
                NativeValue::from("Bill Evans")
            ])
        );
    }

    #[test]
    fn test_track_number_is_combined() {
        let file = mp3_file();
        let mut parser = TagParser::new(file.path(), Box::new(open(&file)));
        parser
            .set(
                "track_number",
                TagValue::Numbering {
                    value: Some(5),
                    total: Some(12),
                },
            )
            .unwrap();
        parser.save().unwrap();

        let tag = open(&file);
        assert_eq!(tag.get("TRCK"), Some(vec![NativeValue::from("5/12")]));
        let parser = TagParser::new(file.path(), Box::new(tag));
        assert_eq!(parser.get_tag("total_tracks").unwrap(), "12");
        assert_eq!(parser.keys(), vec!["track_number", "total_tracks"]);
    }

    #[test]
    fn test_artwork_roundtrip() {
        let file = mp3_file();
        let mut parser = TagParser::new(file.path(), Box::new(open(&file)));
        parser
            .set("artwork", Artwork::from_bytes(PNG_DATA.to_vec()).unwrap())
            .unwrap();
        parser.save().unwrap();

        let tag = open(&file);
        let artwork = tag.artwork().unwrap();
        assert_eq!(artwork.mime_type(), Some("image/png"));
        assert_eq!(artwork.data(), Some(PNG_DATA));
        assert_eq!(tag.fields(), vec!["APIC"]);

        let mut parser = TagParser::new(file.path(), Box::new(tag));
        assert!(parser.has("artwork"));
        assert!(parser.remove("artwork"));
        parser.save().unwrap();
        assert!(open(&file).artwork().is_none());
    }

    #[test]
    fn test_artwork_is_front_cover_only() {
        let file = mp3_file();
        let mut tag = open(&file);
        let _ = tag.data.add_frame(Picture {
            mime_type: "image/png".to_string(),
            picture_type: PictureType::Other,
            description: String::new(),
            data: PNG_DATA.to_vec(),
        });
        assert!(tag.artwork().is_none());
        assert!(!tag.remove_artwork());

        let parser = TagParser::new(file.path(), Box::new(tag));
        assert!(!parser.has("artwork"));
    }

    #[test]
    fn test_write_id3v23() {
        let file = mp3_file();
        let mut tag = ID3v2Tag::read_from_path(file.path(), Id3Version::Id3v23).unwrap();
        tag.set("TIT2", vec![NativeValue::from("Blue in Green")]);
        tag.save().unwrap();

        let data = id3::Tag::read_from_path(file.path()).unwrap();
        assert_eq!(data.version(), id3::Version::Id3v23);
        assert_eq!(data.title(), Some("Blue in Green"));
    }
}
