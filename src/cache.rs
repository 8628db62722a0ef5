// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Process-wide cache of loaded tags, with at most one instance per file.

use crate::config::Config;
use crate::format::{ExtensionRegistry, FormatRegistry};
use crate::tag::{TagError, TagParser};
use crate::tags::Tags;
use crate::util::normalize_path;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Shared slot holding the parser of one file. `None` until the file is loaded.
pub(crate) type ParserSlot = Arc<Mutex<Option<TagParser>>>;

/// Lock a mutex, even if another thread panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The global cache instance.
static GLOBAL: OnceLock<TagCache> = OnceLock::new();

/// A cached file.
#[derive(Debug)]
struct CacheEntry {
    /// The parser slot, shared with all [`Tags`] handles of the file.
    slot: ParserSlot,
    /// Logical time of the last access.
    last_used: u64,
}

/// Cache of loaded tags, keyed by the canonical path of the file.
///
/// The map itself is only locked to find or create an entry. Loading, editing and saving a file
/// happen under the lock of that file's entry, so unrelated files never wait for each other.
#[derive(Debug)]
pub struct TagCache {
    /// Resolves files to codecs and native tags.
    registry: Box<dyn FormatRegistry>,
    /// Maximum number of idle entries, `0` for no limit.
    capacity: usize,
    /// Cached entries.
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
    /// Logical clock for least-recently-used eviction.
    clock: AtomicU64,
}

impl TagCache {
    /// Create a cache that keeps every file it loads.
    #[must_use]
    pub fn new(registry: Box<dyn FormatRegistry>) -> Self {
        Self::with_capacity(registry, 0)
    }

    /// Create a cache that drops the least recently used idle files once it holds more than
    /// `capacity` files.
    ///
    /// Files that are still referenced by a [`Tags`] handle, are being edited or have unsaved
    /// changes are never dropped. A `capacity` of `0` disables the limit.
    #[must_use]
    pub fn with_capacity(registry: Box<dyn FormatRegistry>, capacity: usize) -> Self {
        Self {
            registry,
            capacity,
            entries: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    /// Create a cache from the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::with_capacity(
            Box::new(ExtensionRegistry::from_config(config)),
            config.cache.capacity(),
        )
    }

    /// The process-wide cache. Unless [`TagCache::install_global`] was called before, it uses the
    /// default configuration.
    #[must_use]
    pub fn global() -> &'static TagCache {
        GLOBAL.get_or_init(|| TagCache::new(Box::new(ExtensionRegistry::default())))
    }

    /// Install the process-wide cache.
    ///
    /// # Errors
    ///
    /// Returns the cache back if the global cache was already initialized.
    pub fn install_global(cache: TagCache) -> Result<(), TagCache> {
        GLOBAL.set(cache)
    }

    /// Get the tags of a file, loading them if necessary.
    ///
    /// Relative paths, absolute paths and symlinks to the same file all yield handles to the same
    /// instance.
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist, is not a supported audio file or its tags cannot be
    /// loaded. Nothing is cached in that case.
    pub fn get(&self, path: impl AsRef<Path>) -> Result<Tags, TagError> {
        let path = path.as_ref();
        let key =
            normalize_path(path).map_err(|_| TagError::NoSuchFile(path.to_path_buf()))?;
        let slot = self.slot(&key);

        let mut parser = lock(&slot);
        if parser.is_none() {
            match TagParser::open(&key, self.registry.as_ref()) {
                Ok(loaded) => *parser = Some(loaded),
                Err(err) => {
                    drop(parser);
                    self.discard(&key, &slot);
                    return Err(err);
                }
            }
        } else {
            log::trace!("Cache hit for {}", key.display());
        }
        drop(parser);

        Ok(Tags::new(key, slot))
    }

    /// Find or create the entry for a normalized path.
    fn slot(&self, key: &Path) -> ParserSlot {
        let mut entries = lock(&self.entries);
        let now = self.clock.fetch_add(1, Ordering::Relaxed);
        if let Some(entry) = entries.get_mut(key) {
            entry.last_used = now;
            return Arc::clone(&entry.slot);
        }

        log::debug!("Cache miss for {}", key.display());
        let slot = ParserSlot::default();
        let _ = entries.insert(
            key.to_path_buf(),
            CacheEntry {
                slot: Arc::clone(&slot),
                last_used: now,
            },
        );
        self.evict(&mut entries, key);
        slot
    }

    /// Drop idle entries until the cache is within its capacity.
    fn evict(&self, entries: &mut HashMap<PathBuf, CacheEntry>, keep: &Path) {
        if self.capacity == 0 || entries.len() <= self.capacity {
            return;
        }

        let mut candidates: Vec<(u64, PathBuf)> = entries
            .iter()
            .filter(|(key, _)| key.as_path() != keep)
            .map(|(key, entry)| (entry.last_used, key.clone()))
            .collect();
        candidates.sort_unstable();

        for (_, key) in candidates {
            if entries.len() <= self.capacity {
                break;
            }
            let idle = entries.get(&key).is_some_and(|entry| is_idle(&entry.slot));
            if idle {
                log::debug!("Evicting {} from cache", key.display());
                let _ = entries.remove(&key);
            }
        }
    }

    /// Remove an entry whose file failed to load.
    fn discard(&self, key: &Path, slot: &ParserSlot) {
        let mut entries = lock(&self.entries);
        let unloaded = entries.get(key).is_some_and(|entry| {
            Arc::ptr_eq(&entry.slot, slot)
                && entry
                    .slot
                    .try_lock()
                    .is_ok_and(|parser| parser.is_none())
        });
        if unloaded {
            let _ = entries.remove(key);
        }
    }

    /// Drop the cached instance of a file, so that it is loaded from disk on next access.
    ///
    /// Returns `false` (and keeps the instance) if the file is not cached, is still referenced by
    /// a [`Tags`] handle or has unsaved changes.
    pub fn release(&self, path: impl AsRef<Path>) -> bool {
        let Ok(key) = normalize_path(path) else {
            return false;
        };
        let mut entries = lock(&self.entries);
        let idle = entries.get(&key).is_some_and(|entry| is_idle(&entry.slot));
        if idle {
            log::debug!("Releasing {} from cache", key.display());
            let _ = entries.remove(&key);
        }
        idle
    }

    /// Returns `true` if the file is cached.
    #[must_use]
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        normalize_path(path).is_ok_and(|key| lock(&self.entries).contains_key(&key))
    }

    /// Number of cached files.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns `true` if no file is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns `true` if nobody but the cache holds the slot, nobody is using it and it has no
/// unsaved changes.
fn is_idle(slot: &ParserSlot) -> bool {
    Arc::strong_count(slot) == 1
        && slot.try_lock().is_ok_and(|parser| {
            parser
                .as_ref()
                .is_none_or(|parser| !parser.is_modified())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::{fake_save_count, FakeRegistry};
    use std::fs;
    use std::sync::{mpsc, Barrier};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn cache() -> TagCache {
        TagCache::new(Box::new(FakeRegistry))
    }

    fn create(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_same_instance_for_equivalent_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = create(&dir, "track.fake");
        fs::create_dir(dir.path().join("sub")).unwrap();
        let cache = cache();

        let tags = cache.get(&path).unwrap();
        let indirect = cache
            .get(dir.path().join("sub").join("..").join("track.fake"))
            .unwrap();
        assert!(tags.ptr_eq(&indirect));
        assert_eq!(cache.len(), 1);

        tags.set_tag("title", "Shared").unwrap();
        assert_eq!(indirect.get_tag("title").unwrap(), "Shared");
    }

    #[test]
    fn test_same_instance_for_relative_path() {
        let dir = tempfile::tempdir_in(".").unwrap();
        let path = create(&dir, "track.fake");
        let relative = PathBuf::from(dir.path().file_name().unwrap()).join("track.fake");
        assert!(relative.is_relative());

        let cache = cache();
        let tags = cache.get(&path).unwrap();
        assert!(tags.ptr_eq(&cache.get(&relative).unwrap()));
    }

    #[cfg(unix)]
    #[test]
    fn test_same_instance_for_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let path = create(&dir, "track.fake");
        let link = dir.path().join("link.fake");
        std::os::unix::fs::symlink(&path, &link).unwrap();

        let cache = cache();
        let tags = cache.get(&path).unwrap();
        assert!(tags.ptr_eq(&cache.get(&link).unwrap()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache();

        assert!(matches!(
            cache.get(dir.path().join("missing.fake")),
            Err(TagError::NoSuchFile(_))
        ));
        assert!(matches!(
            cache.get(create(&dir, "cover.jpg")),
            Err(TagError::MetadataFile(_))
        ));
        assert!(matches!(
            cache.get(create(&dir, "notes.doc")),
            Err(TagError::UnsupportedFile(_))
        ));
        assert!(matches!(
            cache.get(create(&dir, "track.nop")),
            Err(TagError::NoTagParser { .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = create(&dir, "track.fake");
        let cache = cache();

        let tags = cache.get(&path).unwrap();
        tags.set_tag("title", "Unsaved").unwrap();
        drop(tags);
        assert!(!cache.release(&path));

        let tags = cache.get(&path).unwrap();
        assert!(!cache.release(&path));
        assert!(tags.save().unwrap());
        drop(tags);
        assert!(cache.release(&path));
        assert!(!cache.contains(&path));

        let tags = cache.get(&path).unwrap();
        assert_eq!(tags.get_tag("title").unwrap(), "Unsaved");
    }

    #[test]
    fn test_eviction_keeps_files_in_use() {
        let dir = tempfile::tempdir().unwrap();
        let first = create(&dir, "1.fake");
        let second = create(&dir, "2.fake");
        let third = create(&dir, "3.fake");
        let cache = TagCache::with_capacity(Box::new(FakeRegistry), 1);

        let first_tags = cache.get(&first).unwrap();
        let second_tags = cache.get(&second).unwrap();
        assert_eq!(cache.len(), 2);

        drop(second_tags);
        let _third_tags = cache.get(&third).unwrap();
        assert!(cache.contains(&first));
        assert!(!cache.contains(&second));
        assert!(cache.contains(&third));
        assert!(first_tags.ptr_eq(&cache.get(&first).unwrap()));
    }

    #[test]
    fn test_eviction_keeps_unsaved_changes() {
        let dir = tempfile::tempdir().unwrap();
        let first = create(&dir, "1.fake");
        let second = create(&dir, "2.fake");
        let cache = TagCache::with_capacity(Box::new(FakeRegistry), 1);

        cache.get(&first).unwrap().set_tag("title", "Dirty").unwrap();
        let _second_tags = cache.get(&second).unwrap();
        assert!(cache.contains(&first));
        assert_eq!(cache.get(&first).unwrap().get_tag("title").unwrap(), "Dirty");
    }

    #[test]
    fn test_concurrent_writes_to_same_file() {
        const THREADS: usize = 8;
        let dir = tempfile::tempdir().unwrap();
        let path = create(&dir, "track.fake");
        let cache = cache();
        let barrier = Barrier::new(THREADS);

        thread::scope(|scope| {
            for i in 0..THREADS {
                let (cache, barrier, path) = (&cache, &barrier, &path);
                let _ = scope.spawn(move || {
                    let tags = cache.get(path).unwrap();
                    let _ = barrier.wait();
                    tags.set_tag(&format!("TAG{i}"), i.to_string()).unwrap();
                    tags.edit(|parser| {
                        let count = parser
                            .get_tag("COUNTER")
                            .map_or(0, |value| value.parse::<usize>().unwrap());
                        parser.set("COUNTER", (count + 1).to_string())?;
                        parser.save()
                    })
                    .unwrap();
                });
            }
        });

        let tags = cache.get(&path).unwrap();
        assert_eq!(tags.get_tag("COUNTER").unwrap(), THREADS.to_string());
        for i in 0..THREADS {
            assert_eq!(tags.get_tag(&format!("TAG{i}")).unwrap(), i.to_string());
        }
        assert!(!tags.is_modified());
        assert!(fake_save_count(&path) <= THREADS);
    }

    #[test]
    fn test_distinct_files_do_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let first = create(&dir, "1.fake");
        let second = create(&dir, "2.fake");
        let cache = cache();
        let (locked_tx, locked_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        thread::scope(|scope| {
            let (cache, first) = (&cache, &first);
            let handle = scope.spawn(move || {
                let tags = cache.get(first).unwrap();
                tags.edit(|_| {
                    locked_tx.send(()).unwrap();
                    Ok(done_rx.recv_timeout(Duration::from_secs(10)).is_ok())
                })
                .unwrap()
            });

            locked_rx.recv().unwrap();
            let tags = cache.get(&second).unwrap();
            tags.set_tag("title", "Independent").unwrap();
            assert!(tags.save().unwrap());
            done_tx.send(()).unwrap();

            assert!(handle.join().unwrap());
        });
    }
}
