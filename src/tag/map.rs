// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Mapping between canonical tag names and native fields.

/// Canonical tags that are always listed first (in this order) by [`TagParser::keys`].
///
/// [`TagParser::keys`]: crate::tag::TagParser::keys
pub const STANDARD_TAG_ORDER: &[&str] = &[
    "artist",
    "album_artist",
    "composer",
    "conductor",
    "album",
    "title",
    "subtitle",
    "track_number",
    "total_tracks",
    "disk_number",
    "total_disks",
    "year",
    "genre",
    "grouping",
    "comment",
    "lyrics",
    "bpm",
    "label",
    "isrc",
    "compilation",
    "copyright",
];

/// Static, ordered mapping of canonical tag names to the native fields of a single codec.
///
/// A canonical name may be backed by several native fields (e.g. a current and a legacy field).
/// The first field is the one that is written, all of them are probed when reading.
#[derive(Debug, Clone, Copy)]
pub struct TagMap {
    /// Ordered `(canonical name, native fields)` pairs.
    entries: &'static [(&'static str, &'static [&'static str])],
}

impl TagMap {
    /// Create a map from a static list of entries.
    #[must_use]
    pub const fn new(entries: &'static [(&'static str, &'static [&'static str])]) -> Self {
        Self { entries }
    }

    /// Look up the native fields of a canonical name, if it is mapped at all.
    #[must_use]
    pub fn native_fields(&self, tag: &str) -> Option<&'static [&'static str]> {
        self.entries
            .iter()
            .find(|(name, fields)| *name == tag && !fields.is_empty())
            .map(|(_, fields)| *fields)
    }

    /// Native fields to probe (in order) when reading the canonical tag.
    ///
    /// Unmapped names are passed through unchanged, which allows access to format-specific fields.
    #[must_use]
    pub fn resolve_read<'a>(&self, tag: &'a str) -> Vec<&'a str> {
        self.native_fields(tag)
            .map_or_else(|| vec![tag], |fields| fields.iter().copied().collect())
    }

    /// Native field that is written for the canonical tag.
    #[must_use]
    pub fn resolve_write<'a>(&self, tag: &'a str) -> &'a str {
        self.native_fields(tag)
            .and_then(|fields| fields.first().copied())
            .unwrap_or(tag)
    }

    /// Canonical name for a native field, or the field itself if no canonical name claims it.
    ///
    /// If several canonical names list the field, the first one wins.
    #[must_use]
    pub fn reverse<'a>(&self, field: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(_, fields)| fields.iter().any(|candidate| *candidate == field))
            .map_or(field, |(name, _)| *name)
    }

    /// Returns `true` if the canonical name is part of this map.
    #[must_use]
    pub fn is_canonical(&self, tag: &str) -> bool {
        self.native_fields(tag).is_some()
    }

    /// Returns `true` if a canonical name claims the native field.
    #[must_use]
    pub fn is_known_field(&self, field: &str) -> bool {
        self.entries
            .iter()
            .any(|(_, fields)| fields.iter().any(|candidate| *candidate == field))
    }

    /// Iterate over all canonical names, in map order.
    pub fn canonical_names(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|(name, _)| *name)
    }
}

/// Canonical names for ID3v2 frames.
///
/// User-defined text frames are addressed as `TXXX:<description>`.
pub static ID3_TAG_MAP: TagMap = TagMap::new(&[
    ("title", &["TIT2"]),
    ("artist", &["TPE1"]),
    ("album_artist", &["TPE2"]),
    ("album", &["TALB"]),
    ("composer", &["TCOM"]),
    ("conductor", &["TPE3"]),
    ("remixer", &["TPE4"]),
    ("lyricist", &["TEXT"]),
    ("genre", &["TCON"]),
    ("year", &["TDRC", "TYER"]),
    ("track_number", &["TRCK"]),
    ("disk_number", &["TPOS"]),
    ("comment", &["COMM"]),
    ("lyrics", &["USLT"]),
    ("bpm", &["TBPM"]),
    ("grouping", &["TIT1"]),
    ("subtitle", &["TIT3"]),
    ("label", &["TPUB"]),
    ("isrc", &["TSRC"]),
    ("compilation", &["TCMP"]),
    ("copyright", &["TCOP"]),
    ("encoded_by", &["TENC"]),
    ("encoder_settings", &["TSSE"]),
    ("sort_artist", &["TSOP"]),
    ("sort_album_artist", &["TSO2"]),
    ("sort_album", &["TSOA"]),
    ("sort_title", &["TSOT"]),
    ("sort_composer", &["TSOC"]),
    ("original_year", &["TDOR", "TORY"]),
    ("media", &["TMED"]),
    ("key", &["TKEY"]),
    ("language", &["TLAN"]),
    ("musicbrainz_artist_id", &["TXXX:MusicBrainz Artist Id"]),
    ("musicbrainz_album_id", &["TXXX:MusicBrainz Album Id"]),
    (
        "musicbrainz_album_artist_id",
        &["TXXX:MusicBrainz Album Artist Id"],
    ),
    (
        "musicbrainz_release_group_id",
        &["TXXX:MusicBrainz Release Group Id"],
    ),
    (
        "musicbrainz_release_track_id",
        &["TXXX:MusicBrainz Release Track Id"],
    ),
    ("musicbrainz_work_id", &["TXXX:MusicBrainz Work Id"]),
    ("artwork", &["APIC"]),
]);

/// Canonical names for Vorbis comments (as used by FLAC).
pub static VORBIS_TAG_MAP: TagMap = TagMap::new(&[
    ("title", &["TITLE"]),
    ("artist", &["ARTIST"]),
    ("album_artist", &["ALBUMARTIST", "ALBUM ARTIST"]),
    ("album", &["ALBUM"]),
    ("composer", &["COMPOSER"]),
    ("conductor", &["CONDUCTOR"]),
    ("remixer", &["REMIXER"]),
    ("lyricist", &["LYRICIST"]),
    ("genre", &["GENRE"]),
    ("year", &["DATE", "YEAR"]),
    ("track_number", &["TRACKNUMBER"]),
    ("total_tracks", &["TRACKTOTAL", "TOTALTRACKS"]),
    ("disk_number", &["DISCNUMBER"]),
    ("total_disks", &["DISCTOTAL", "TOTALDISCS"]),
    ("comment", &["COMMENT", "DESCRIPTION"]),
    ("lyrics", &["LYRICS", "UNSYNCEDLYRICS"]),
    ("bpm", &["BPM"]),
    ("grouping", &["GROUPING"]),
    ("subtitle", &["SUBTITLE"]),
    ("label", &["LABEL", "ORGANIZATION"]),
    ("isrc", &["ISRC"]),
    ("compilation", &["COMPILATION"]),
    ("copyright", &["COPYRIGHT"]),
    ("encoded_by", &["ENCODEDBY", "ENCODED-BY"]),
    ("encoder_settings", &["ENCODERSETTINGS"]),
    ("sort_artist", &["ARTISTSORT"]),
    ("sort_album_artist", &["ALBUMARTISTSORT"]),
    ("sort_album", &["ALBUMSORT"]),
    ("sort_title", &["TITLESORT"]),
    ("sort_composer", &["COMPOSERSORT"]),
    ("original_year", &["ORIGINALDATE", "ORIGINALYEAR"]),
    ("media", &["MEDIA"]),
    ("key", &["KEY"]),
    ("language", &["LANGUAGE"]),
    ("musicbrainz_artist_id", &["MUSICBRAINZ_ARTISTID"]),
    ("musicbrainz_album_id", &["MUSICBRAINZ_ALBUMID"]),
    ("musicbrainz_album_artist_id", &["MUSICBRAINZ_ALBUMARTISTID"]),
    (
        "musicbrainz_release_group_id",
        &["MUSICBRAINZ_RELEASEGROUPID"],
    ),
    (
        "musicbrainz_release_track_id",
        &["MUSICBRAINZ_RELEASETRACKID"],
    ),
    ("musicbrainz_work_id", &["MUSICBRAINZ_WORKID"]),
]);

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_MAP: TagMap = TagMap::new(&[
        ("artist", &["ARTIST", "PERFORMER"]),
        ("album_artist", &["ALBUMARTIST"]),
        ("performer", &["PERFORMER"]),
        ("internal", &[]),
    ]);

    #[test]
    fn test_resolve_read_mapped() {
        assert_eq!(TEST_MAP.resolve_read("artist"), vec!["ARTIST", "PERFORMER"]);
    }

    #[test]
    fn test_resolve_read_passthrough() {
        assert_eq!(TEST_MAP.resolve_read("CUSTOM"), vec!["CUSTOM"]);
        assert_eq!(TEST_MAP.resolve_read("internal"), vec!["internal"]);
    }

    #[test]
    fn test_resolve_write_uses_first_field() {
        assert_eq!(TEST_MAP.resolve_write("artist"), "ARTIST");
        assert_eq!(TEST_MAP.resolve_write("CUSTOM"), "CUSTOM");
    }

    #[test]
    fn test_reverse_first_match_wins() {
        assert_eq!(TEST_MAP.reverse("PERFORMER"), "artist");
        assert_eq!(TEST_MAP.reverse("ALBUMARTIST"), "album_artist");
        assert_eq!(TEST_MAP.reverse("UNMAPPED"), "UNMAPPED");
    }

    #[test]
    fn test_known_fields() {
        assert!(TEST_MAP.is_known_field("PERFORMER"));
        assert!(!TEST_MAP.is_known_field("UNMAPPED"));
        assert!(TEST_MAP.is_canonical("album_artist"));
        assert!(!TEST_MAP.is_canonical("internal"));
    }

    #[test]
    fn test_canonical_names_are_unique() {
        for map in [&ID3_TAG_MAP, &VORBIS_TAG_MAP] {
            let names: Vec<_> = map.canonical_names().collect();
            let mut deduped = names.clone();
            deduped.sort_unstable();
            deduped.dedup();
            assert_eq!(names.len(), deduped.len());
        }
    }

    #[test]
    fn test_album_artist_maps_to_tpe2() {
        assert_eq!(ID3_TAG_MAP.resolve_write("album_artist"), "TPE2");
        assert_eq!(ID3_TAG_MAP.reverse("TPE2"), "album_artist");
        assert_eq!(VORBIS_TAG_MAP.reverse("ALBUM ARTIST"), "album_artist");
    }
}
