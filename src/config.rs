// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Configuration utils.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Encountered when the configuration cannot be loaded.
#[derive(Error, Debug)]
#[error("Configuration Error: {0}")]
pub struct ConfigError(#[from] toml::de::Error);

/// Default configuration TOML string.
const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// Represents a piece of configuration that can be merged with another one.
trait MergeableConfig {
    /// Merge this configuration object with another one, taking values not set in this object from
    /// the other one (if present).
    fn merge(&self, other: &Self) -> Self;
}

/// Configuration of the tag instance cache.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum number of cached files that are not in use.
    ///
    /// Use `0` to keep every file that was loaded.
    pub capacity: Option<usize>,
}

impl CacheConfig {
    /// The configured capacity (`0` means unbounded).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.unwrap_or(0)
    }
}

impl MergeableConfig for CacheConfig {
    fn merge(&self, other: &Self) -> Self {
        CacheConfig {
            capacity: self.capacity.or(other.capacity),
        }
    }
}

/// ID3v2 version that tags are written with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Id3Version {
    /// ID3v2.3
    #[serde(rename = "2.3")]
    Id3v23,
    /// ID3v2.4
    #[default]
    #[serde(rename = "2.4")]
    Id3v24,
}

/// Configuration of ID3 tags.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize)]
pub struct Id3Config {
    /// Version to write.
    pub version: Option<Id3Version>,
}

impl Id3Config {
    /// The configured version.
    #[must_use]
    pub fn version(&self) -> Id3Version {
        self.version.unwrap_or_default()
    }
}

impl MergeableConfig for Id3Config {
    fn merge(&self, other: &Self) -> Self {
        Id3Config {
            version: self.version.or(other.version),
        }
    }
}

/// Configuration of file format resolution.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FormatsConfig {
    /// Extensions of additional non-audio files (e.g. `sfv`, `md5`).
    pub metadata_extensions: Option<Vec<String>>,
}

impl FormatsConfig {
    /// The configured extensions.
    #[must_use]
    pub fn metadata_extensions(&self) -> &[String] {
        self.metadata_extensions.as_deref().unwrap_or_default()
    }
}

impl MergeableConfig for FormatsConfig {
    fn merge(&self, other: &Self) -> Self {
        FormatsConfig {
            metadata_extensions: self
                .metadata_extensions
                .clone()
                .or_else(|| other.metadata_extensions.clone()),
        }
    }
}

/// The main configuration struct.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Tag instance cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// ID3 configuration.
    #[serde(default)]
    pub id3: Id3Config,
    /// Format resolution configuration.
    #[serde(default)]
    pub formats: FormatsConfig,
}

impl MergeableConfig for Config {
    /// Merge this configuration object with another one, taking values not set in this object from
    /// the other one (if present).
    fn merge(&self, other: &Self) -> Self {
        Config {
            cache: self.cache.merge(&other.cache),
            id3: self.id3.merge(&other.id3),
            formats: self.formats.merge(&other.formats),
        }
    }
}

impl Config {
    /// Load the configuration from a string slice.
    fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str(text)?;
        Ok(config)
    }

    /// Load the default configuration.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in defaults are malformed.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_str(DEFAULT_CONFIG)
    }

    /// Load the configuration from a file located at the given path.
    ///
    /// # Errors
    ///
    /// This method can fail if the file cannot be accessed or if it contains malformed
    /// configuration markup.
    pub fn load_from_path<T: AsRef<Path>>(path: T) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::load_from_str(&text)?;
        Ok(config)
    }

    /// Merge this configuration struct with the default values.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in defaults are malformed.
    pub fn with_defaults(&self) -> Result<Self, ConfigError> {
        let default = Self::load_default()?;
        Ok(self.merge(&default))
    }

    /// Path of the user configuration file, if it exists.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        xdg::BaseDirectories::with_prefix(env!("CARGO_PKG_NAME")).find_config_file("config.toml")
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be serialized.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
