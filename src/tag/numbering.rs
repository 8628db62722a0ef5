// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Track and disk numbering (position and optional total).

use crate::tag::{NativeTag, NativeValue, NumberingLayout};
use std::fmt;
use thiserror::Error;

/// A value could not be coerced into the type required by the tag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// The value is not an integer.
    #[error("{0:?} is not an integer")]
    NotAnInteger(String),
    /// No value was given.
    #[error("value is empty")]
    Empty,
    /// The numbering has a total but no value, so it cannot be rendered.
    #[error("numbering value is not set")]
    MissingValue,
    /// A numbering value was assigned to a tag that is not a numbering tag.
    #[error("{0} is not a numbering tag")]
    NotNumbering(String),
    /// Text that was expected to be base64 could not be decoded.
    #[error("invalid base64 data ({0})")]
    InvalidBase64(String),
}

/// The kind of numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumberingKind {
    /// Track number on a disk.
    Track,
    /// Disk number in a release.
    Disk,
}

/// The part of a numbering that a canonical tag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingPart {
    /// The position (e.g. track 3).
    Value,
    /// The total count (e.g. of 12).
    Total,
}

impl NumberingKind {
    /// All numbering kinds.
    pub const ALL: [NumberingKind; 2] = [NumberingKind::Track, NumberingKind::Disk];

    /// Canonical tag name of the position.
    #[must_use]
    pub const fn value_tag(self) -> &'static str {
        match self {
            Self::Track => "track_number",
            Self::Disk => "disk_number",
        }
    }

    /// Canonical tag name of the total count.
    #[must_use]
    pub const fn total_tag(self) -> &'static str {
        match self {
            Self::Track => "total_tracks",
            Self::Disk => "total_disks",
        }
    }

    /// Returns the numbering kind and part for a canonical tag name, if it is a numbering tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<(Self, NumberingPart)> {
        Self::ALL.into_iter().find_map(|kind| {
            if tag == kind.value_tag() {
                Some((kind, NumberingPart::Value))
            } else if tag == kind.total_tag() {
                Some((kind, NumberingPart::Total))
            } else {
                None
            }
        })
    }
}

/// A numbering tag, i.e. a position with an optional total count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingTag {
    /// What is being numbered.
    kind: NumberingKind,
    /// The position.
    value: Option<u32>,
    /// The total count.
    total: Option<u32>,
}

impl NumberingTag {
    /// Create an empty numbering.
    #[must_use]
    pub const fn new(kind: NumberingKind) -> Self {
        Self {
            kind,
            value: None,
            total: None,
        }
    }

    /// Create a numbering with the given position and total.
    #[must_use]
    pub const fn with(kind: NumberingKind, value: Option<u32>, total: Option<u32>) -> Self {
        Self { kind, value, total }
    }

    /// What is being numbered.
    #[must_use]
    pub const fn kind(&self) -> NumberingKind {
        self.kind
    }

    /// The position.
    #[must_use]
    pub const fn value(&self) -> Option<u32> {
        self.value
    }

    /// The total count.
    #[must_use]
    pub const fn total(&self) -> Option<u32> {
        self.total
    }

    /// Set (or clear) the position.
    pub fn set_value(&mut self, value: Option<u32>) {
        self.value = value;
    }

    /// Set (or clear) the total count.
    pub fn set_total(&mut self, total: Option<u32>) {
        self.total = total;
    }

    /// Set the position from text input. Only the first element is used.
    ///
    /// # Errors
    ///
    /// Fails without modifying the numbering if the input is empty or not an integer.
    pub fn set_value_from<S: AsRef<str>>(&mut self, values: &[S]) -> Result<(), CoercionError> {
        self.value = Some(Self::coerce(values)?);
        Ok(())
    }

    /// Set the total count from text input. Only the first element is used.
    ///
    /// # Errors
    ///
    /// Fails without modifying the numbering if the input is empty or not an integer.
    pub fn set_total_from<S: AsRef<str>>(&mut self, values: &[S]) -> Result<(), CoercionError> {
        self.total = Some(Self::coerce(values)?);
        Ok(())
    }

    /// Coerce the first element of a list of strings to an integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or its first element is not an integer.
    pub fn coerce<S: AsRef<str>>(values: &[S]) -> Result<u32, CoercionError> {
        let value = values.first().ok_or(CoercionError::Empty)?;
        parse_integer(value.as_ref())
    }

    /// Parse numbering text of the form `value` or `value/total`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is empty or either part is not an integer.
    pub fn parse(kind: NumberingKind, text: &str) -> Result<Self, CoercionError> {
        let (value, total) = split_numbering(text);
        let value = parse_integer(value)?;
        let total = total.map(parse_integer).transpose()?;
        Ok(Self::with(kind, Some(value), total))
    }

    /// Render the numbering as `value/total` or `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is not set.
    pub fn render(&self) -> Result<String, CoercionError> {
        match (self.value, self.total) {
            (Some(value), Some(total)) => Ok(format!("{value}/{total}")),
            (Some(value), None) => Ok(value.to_string()),
            (None, _) => Err(CoercionError::MissingValue),
        }
    }

    /// Read the numbering from the native fields described by `layout`.
    pub(crate) fn read_from(
        kind: NumberingKind,
        layout: NumberingLayout,
        native: &dyn NativeTag,
    ) -> Result<Self, CoercionError> {
        let (value, total) = Self::read_parts(layout, native);
        Ok(Self::with(kind, value?, total?))
    }

    /// Read position and total from the native fields, each on its own.
    ///
    /// An unreadable position does not prevent reading the total and vice versa.
    pub(crate) fn read_parts(
        layout: NumberingLayout,
        native: &dyn NativeTag,
    ) -> (
        Result<Option<u32>, CoercionError>,
        Result<Option<u32>, CoercionError>,
    ) {
        match layout {
            NumberingLayout::Combined(field) => match first_text(native, &[field]) {
                Some(text) => {
                    let (value, total) = split_numbering(&text);
                    (
                        parse_integer(value).map(Some),
                        total.map(parse_integer).transpose(),
                    )
                }
                None => (Ok(None), Ok(None)),
            },
            NumberingLayout::Split { value, total } => (
                first_text(native, &[value])
                    .map(|text| parse_integer(&text))
                    .transpose(),
                first_text(native, total)
                    .map(|text| parse_integer(&text))
                    .transpose(),
            ),
        }
    }

    /// Write the numbering to the native fields described by `layout`.
    ///
    /// Without a position, the numbering is removed entirely. Without a total, the total is
    /// written equal to the position if `default_total` is set, and omitted otherwise.
    pub(crate) fn write_to(
        &self,
        layout: NumberingLayout,
        native: &mut dyn NativeTag,
        default_total: bool,
    ) {
        let Some(value) = self.value else {
            log::debug!("Removing {:?} numbering without value", self.kind);
            for field in layout.fields() {
                let _ = native.remove(field);
            }
            return;
        };
        let total = self.total.or(default_total.then_some(value));
        match layout {
            NumberingLayout::Combined(field) => {
                let text = match total {
                    Some(total) => format!("{value}/{total}"),
                    None => value.to_string(),
                };
                native.set(field, vec![NativeValue::Text(text)]);
            }
            NumberingLayout::Split {
                value: value_field,
                total: total_fields,
            } => {
                native.set(value_field, vec![NativeValue::Text(value.to_string())]);
                let mut aliases = total_fields;
                if let (Some(total), Some((primary, rest))) = (total, total_fields.split_first()) {
                    native.set(primary, vec![NativeValue::Text(total.to_string())]);
                    aliases = rest;
                }
                for alias in aliases {
                    let _ = native.remove(alias);
                }
            }
        }
    }
}

impl fmt::Display for NumberingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str("-"),
        }
    }
}

/// Split numbering text into position and optional total at the first slash.
fn split_numbering(text: &str) -> (&str, Option<&str>) {
    match text.split_once('/') {
        Some((value, total)) => (value, Some(total)),
        None => (text, None),
    }
}

/// Parse an integer, ignoring surrounding whitespace.
fn parse_integer(text: &str) -> Result<u32, CoercionError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CoercionError::Empty);
    }
    text.parse()
        .map_err(|_| CoercionError::NotAnInteger(text.to_string()))
}

/// First textual value of the first present field.
fn first_text(native: &dyn NativeTag, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|field| native.get(field))
        .and_then(|values| values.into_iter().next())
        .map(|value| match value {
            NativeValue::Text(text) => text,
            NativeValue::Integer(number) => number.to_string(),
            NativeValue::Binary(data) => String::from_utf8_lossy(&data).into_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Codec;
    use crate::util::testing::FakeTag;
    use std::path::Path;

    #[test]
    fn test_from_tag() {
        assert_eq!(
            NumberingKind::from_tag("track_number"),
            Some((NumberingKind::Track, NumberingPart::Value))
        );
        assert_eq!(
            NumberingKind::from_tag("total_disks"),
            Some((NumberingKind::Disk, NumberingPart::Total))
        );
        assert_eq!(NumberingKind::from_tag("title"), None);
    }

    #[test]
    fn test_parse() {
        let numbering = NumberingTag::parse(NumberingKind::Track, "3/12").unwrap();
        assert_eq!(numbering.value(), Some(3));
        assert_eq!(numbering.total(), Some(12));

        let numbering = NumberingTag::parse(NumberingKind::Track, " 07 ").unwrap();
        assert_eq!(numbering.value(), Some(7));
        assert_eq!(numbering.total(), None);
    }

    #[test]
    fn test_parse_rejects_non_integers() {
        assert_eq!(
            NumberingTag::parse(NumberingKind::Track, "A1"),
            Err(CoercionError::NotAnInteger("A1".to_string()))
        );
        assert_eq!(
            NumberingTag::parse(NumberingKind::Track, "1/x"),
            Err(CoercionError::NotAnInteger("x".to_string()))
        );
        assert_eq!(
            NumberingTag::parse(NumberingKind::Disk, ""),
            Err(CoercionError::Empty)
        );
    }

    #[test]
    fn test_render() {
        let mut numbering = NumberingTag::new(NumberingKind::Track);
        assert_eq!(numbering.render(), Err(CoercionError::MissingValue));

        numbering.set_value(Some(3));
        assert_eq!(numbering.render().unwrap(), "3");

        numbering.set_total(Some(12));
        assert_eq!(numbering.render().unwrap(), "3/12");
        assert_eq!(numbering.to_string(), "3/12");
    }

    #[test]
    fn test_list_input_uses_first_element() {
        let mut numbering = NumberingTag::new(NumberingKind::Disk);
        numbering.set_value_from(&["2", "5"]).unwrap();
        numbering.set_total_from(&["4"]).unwrap();
        assert_eq!(numbering.value(), Some(2));
        assert_eq!(numbering.total(), Some(4));
    }

    #[test]
    fn test_coercion_failure_leaves_value_untouched() {
        let mut numbering = NumberingTag::with(NumberingKind::Track, Some(1), Some(9));
        assert!(numbering.set_value_from(&["one"]).is_err());
        assert!(numbering.set_total_from::<&str>(&[]).is_err());
        assert_eq!(numbering.value(), Some(1));
        assert_eq!(numbering.total(), Some(9));
    }

    #[test]
    fn test_read_parts_independently() {
        let path = Path::new("/nonexistent/read-parts.fake");
        let mut native = FakeTag::load(Codec::Flac, path);
        native.set("TRACKNUMBER", vec![NativeValue::from("A1")]);
        native.set("TOTALTRACKS", vec![NativeValue::from("12")]);
        let layout = native.numbering_layout(NumberingKind::Track);
        let (value, total) = NumberingTag::read_parts(layout, &native);
        assert_eq!(value, Err(CoercionError::NotAnInteger("A1".to_string())));
        assert_eq!(total, Ok(Some(12)));

        let mut native = FakeTag::load(Codec::Mp3, path);
        native.set("TRCK", vec![NativeValue::from("3/x")]);
        let layout = native.numbering_layout(NumberingKind::Track);
        let (value, total) = NumberingTag::read_parts(layout, &native);
        assert_eq!(value, Ok(Some(3)));
        assert!(total.is_err());
        assert!(NumberingTag::read_from(NumberingKind::Track, layout, &native).is_err());
    }

    #[test]
    fn test_write_without_default_total() {
        let path = Path::new("/nonexistent/write-total.fake");
        let numbering = NumberingTag::with(NumberingKind::Track, Some(3), None);

        let mut native = FakeTag::load(Codec::Flac, path);
        native.set("TRACKTOTAL", vec![NativeValue::from("12")]);
        native.set("TOTALTRACKS", vec![NativeValue::from("12")]);
        let layout = native.numbering_layout(NumberingKind::Track);
        numbering.write_to(layout, &mut native, false);
        assert_eq!(native.get("TRACKNUMBER"), Some(vec![NativeValue::from("3")]));
        assert_eq!(native.get("TRACKTOTAL"), None);
        assert_eq!(native.get("TOTALTRACKS"), None);

        numbering.write_to(layout, &mut native, true);
        assert_eq!(native.get("TRACKTOTAL"), Some(vec![NativeValue::from("3")]));

        let mut native = FakeTag::load(Codec::Mp3, path);
        let layout = native.numbering_layout(NumberingKind::Track);
        numbering.write_to(layout, &mut native, false);
        assert_eq!(native.get("TRCK"), Some(vec![NativeValue::from("3")]));
    }
}
