// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

#![cfg(test)]
//! Testing utils.
//!
//! [`FakeTag`] keeps its "files" in a process-wide in-memory store, keyed by the canonical path
//! of the file. Tests only need an (empty) file on disk for path resolution.

use crate::format::{Codec, FormatRegistry, Resolution};
use crate::tag::{
    Artwork, NativeTag, NativeTagError, NativeValue, TagError, TagMap, ID3_TAG_MAP,
    VORBIS_TAG_MAP,
};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

/// Contents of a fake tag.
#[derive(Debug, Clone, Default)]
struct FakeFile {
    /// Fields in insertion order.
    fields: Vec<(String, Vec<NativeValue>)>,
    /// Front cover.
    picture: Option<Artwork>,
}

/// Saved fake tags.
#[derive(Debug, Default)]
struct FakeStore {
    /// Saved contents per file.
    files: HashMap<PathBuf, FakeFile>,
    /// Number of saves per file.
    saves: HashMap<PathBuf, usize>,
    /// Files for which saving fails.
    failing: HashSet<PathBuf>,
}

/// The store shared by all tests.
static STORE: LazyLock<Mutex<FakeStore>> = LazyLock::new(Mutex::default);

/// Lock the store, ignoring poisoning by failed tests.
fn store() -> MutexGuard<'static, FakeStore> {
    STORE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Key of a file in the store.
fn store_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Number of times the fake tag of a file was saved.
pub fn fake_save_count(path: &Path) -> usize {
    store().saves.get(&store_key(path)).copied().unwrap_or(0)
}

/// Make saving the fake tag of a file fail (or succeed again).
pub fn fail_saves_for(path: &Path, fail: bool) {
    let key = store_key(path);
    let mut store = store();
    if fail {
        let _ = store.failing.insert(key);
    } else {
        let _ = store.failing.remove(&key);
    }
}

/// Saved values of a native field.
pub fn stored_field(path: &Path, field: &str) -> Option<Vec<NativeValue>> {
    store()
        .files
        .get(&store_key(path))
        .and_then(|file| {
            file.fields
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, values)| values.clone())
        })
}

/// In-memory native tag.
///
/// Uses ID3 field names for [`Codec::Mp3`] and Vorbis comment names for every other codec.
#[derive(Debug)]
pub struct FakeTag {
    /// Path of the file.
    path: PathBuf,
    /// Codec of the file.
    codec: Codec,
    /// Current (unsaved) contents.
    file: FakeFile,
}

impl FakeTag {
    /// Load the saved contents of the file (empty if it was never saved).
    pub fn load(codec: Codec, path: &Path) -> Self {
        let file = store()
            .files
            .get(&store_key(path))
            .cloned()
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            codec,
            file,
        }
    }
}

impl NativeTag for FakeTag {
    fn codec(&self) -> Codec {
        self.codec
    }

    fn tag_map(&self) -> &'static TagMap {
        match self.codec {
            Codec::Mp3 => &ID3_TAG_MAP,
            _ => &VORBIS_TAG_MAP,
        }
    }

    fn fields(&self) -> Vec<String> {
        self.file
            .fields
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn get(&self, field: &str) -> Option<Vec<NativeValue>> {
        self.file
            .fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, values)| values.clone())
    }

    fn set(&mut self, field: &str, values: Vec<NativeValue>) {
        match self.file.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = values,
            None => self.file.fields.push((field.to_string(), values)),
        }
    }

    fn remove(&mut self, field: &str) -> bool {
        let len = self.file.fields.len();
        self.file.fields.retain(|(name, _)| name != field);
        self.file.fields.len() != len
    }

    fn save(&mut self) -> Result<(), NativeTagError> {
        let key = store_key(&self.path);
        let mut store = store();
        if store.failing.contains(&key) {
            return Err(NativeTagError::Io(io::Error::other("simulated write failure")));
        }
        *store.saves.entry(key.clone()).or_default() += 1;
        let _ = store.files.insert(key, self.file.clone());
        Ok(())
    }

    fn artwork(&self) -> Option<Artwork> {
        self.file.picture.clone()
    }

    fn embed_artwork(&mut self, artwork: &Artwork) -> Result<(), NativeTagError> {
        self.file.picture = Some(artwork.clone());
        Ok(())
    }

    fn remove_artwork(&mut self) -> bool {
        self.file.picture.take().is_some()
    }
}

/// Registry that loads [`FakeTag`]s.
///
/// | Extension | Resolution |
/// |---|---|
/// | `fake` | FLAC (Vorbis comments) |
/// | `id3fake` | MP3 (ID3 frames) |
/// | `nop` | AAC, without tag implementation |
/// | `jpg` | metadata |
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeRegistry;

impl FormatRegistry for FakeRegistry {
    fn resolve(&self, path: &Path) -> Resolution {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("fake") => Resolution::Audio(Codec::Flac),
            Some("id3fake") => Resolution::Audio(Codec::Mp3),
            Some("nop") => Resolution::Audio(Codec::Aac),
            Some("jpg") => Resolution::Metadata,
            _ => Resolution::Unknown,
        }
    }

    fn load_native(&self, codec: Codec, path: &Path) -> Result<Box<dyn NativeTag>, TagError> {
        match codec {
            Codec::Mp3 | Codec::Flac => Ok(Box::new(FakeTag::load(codec, path))),
            _ => Err(TagError::NoTagParser {
                codec,
                path: path.to_path_buf(),
            }),
        }
    }
}
