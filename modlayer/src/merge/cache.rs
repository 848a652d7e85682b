//! On-disk merge cache with a JSON index.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use super::entry::{FileStamp, MergeCacheEntry, MergeView};
use super::error::{MergeError, MergeResult};
use super::strategy::MergeKind;
use crate::catalog::{ResourceEntry, ResourceKey};

/// Index file name inside the cache directory.
pub const INDEX_FILE_NAME: &str = "merge_cache.json";

/// Directory holding merged outputs inside the cache directory.
pub const OUTPUT_DIR_NAME: &str = "merged";

/// Serialized form of the index file.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    /// Library version that wrote the file.
    version: String,

    /// Entries keyed by `view:type/id`.
    entries: BTreeMap<String, MergeCacheEntry>,
}

/// Outcome of [`MergeCache::finish_cycle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Entries used during the cycle.
    pub kept: usize,

    /// Entries removed because nothing asked for them.
    pub pruned: usize,

    /// Whether the index file was rewritten.
    pub saved: bool,
}

/// Summary of the cache contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of indexed entries.
    pub entries: usize,

    /// Indexed entries whose output file is missing.
    pub missing_outputs: usize,

    /// Total size of existing outputs in bytes.
    pub total_bytes: u64,

    /// Location of the index file.
    pub index_path: PathBuf,
}

/// Persisted, timestamp-keyed cache of merged resources.
///
/// Lookups mark entries as touched; [`finish_cycle`](Self::finish_cycle)
/// prunes whatever was not touched and saves the index.
///
/// A merge whose output cannot be written to the cache directory is written
/// to a scratch directory instead and served for the current cycle only.
/// The scratch directory lives as long as the cache, or as long as whoever
/// [takes it](Self::take_scratch).
#[derive(Debug)]
pub struct MergeCache {
    cache_dir: PathBuf,
    content_root: Option<PathBuf>,
    entries: BTreeMap<String, MergeCacheEntry>,
    changed: bool,
    scratch: Option<TempDir>,
    persist_failures: Vec<MergeError>,
}

impl MergeCache {
    /// Open the cache stored in `cache_dir`.
    ///
    /// A missing index starts an empty cache. An unreadable, corrupt or
    /// foreign-version index is discarded together with its outputs.
    pub fn open(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        let index_path = cache_dir.join(INDEX_FILE_NAME);

        let entries = if index_path.exists() {
            match load_index(&index_path) {
                Ok(index) if index.version == crate::VERSION => {
                    tracing::debug!(
                        path = %index_path.display(),
                        entries = index.entries.len(),
                        "Loaded merge cache index"
                    );
                    Some(index.entries)
                }
                Ok(index) => {
                    tracing::info!(
                        found = %index.version,
                        expected = crate::VERSION,
                        "Merge cache written by another version, rebuilding"
                    );
                    None
                }
                Err(e) => {
                    tracing::warn!(
                        path = %index_path.display(),
                        error = %e,
                        "Merge cache index unreadable, rebuilding"
                    );
                    None
                }
            }
        } else {
            Some(BTreeMap::new())
        };

        let (entries, changed) = match entries {
            Some(entries) => (entries, false),
            None => {
                let output_dir = cache_dir.join(OUTPUT_DIR_NAME);
                if let Err(e) = remove_dir_if_exists(&output_dir) {
                    tracing::warn!(
                        path = %output_dir.display(),
                        error = %e,
                        "Failed to clear stale merge outputs"
                    );
                }
                (BTreeMap::new(), true)
            }
        };

        Self {
            cache_dir,
            content_root: None,
            entries,
            changed,
            scratch: None,
            persist_failures: Vec::new(),
        }
    }

    /// Mirror output paths relative to `root` (builder pattern).
    ///
    /// Base files outside `root`, or without a root, are stored under
    /// `other/` by view, type and id.
    pub fn with_content_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.content_root = Some(root.into());
        self
    }

    /// The cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.cache_dir.join(INDEX_FILE_NAME)
    }

    /// Directory receiving merged outputs.
    pub fn output_dir(&self) -> PathBuf {
        self.cache_dir.join(OUTPUT_DIR_NAME)
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the indexed entry for `type/id` in one view.
    pub fn entry(&self, view: MergeView, resource_type: &str, id: &str) -> Option<&MergeCacheEntry> {
        self.entries
            .get(&cache_key(view, &ResourceKey::new(resource_type, id)))
    }

    /// Return the merged output for `base` plus `contributions`.
    ///
    /// Failures are logged and yield `None`; the caller keeps the unmerged
    /// base entry. An empty contribution list needs no merge and also
    /// yields `None`.
    pub fn get_or_create_merged_output(
        &mut self,
        base: &ResourceEntry,
        contributions: &[PathBuf],
    ) -> Option<PathBuf> {
        match self.try_get_or_create_merged_output(base, contributions) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(
                    resource = %base.key(),
                    error = %e,
                    "Merge failed, keeping unmerged resource"
                );
                None
            }
        }
    }

    /// Like [`get_or_create_merged_output`](Self::get_or_create_merged_output)
    /// but reports the failure.
    pub fn try_get_or_create_merged_output(
        &mut self,
        base: &ResourceEntry,
        contributions: &[PathBuf],
    ) -> MergeResult<Option<PathBuf>> {
        self.try_get_or_create_merged_output_for(MergeView::All, base, contributions)
    }

    /// Merge for one catalog view. Each view of a key has its own entry and
    /// output file.
    pub fn try_get_or_create_merged_output_for(
        &mut self,
        view: MergeView,
        base: &ResourceEntry,
        contributions: &[PathBuf],
    ) -> MergeResult<Option<PathBuf>> {
        if contributions.is_empty() {
            return Ok(None);
        }

        let key = cache_key(view, &base.key());
        let original =
            FileStamp::read(&base.source_path).map_err(|e| MergeError::io(&base.source_path, e))?;
        let stamps = contributions
            .iter()
            .map(|path| FileStamp::read(path).map_err(|e| MergeError::io(path, e)))
            .collect::<MergeResult<Vec<_>>>()?;

        let output_dir = self.output_dir();
        if let Some(cached) = self.entries.get_mut(&key) {
            let output = output_dir.join(&cached.output_path);
            if cached.matches(&original, &stamps) && output.is_file() {
                cached.touched = true;
                tracing::trace!(resource = %key, "Merge cache hit");
                return Ok(Some(output));
            }
            tracing::debug!(resource = %key, "Merge cache entry stale");
        }

        let merged = Self::merge_in_memory(&base.source_path, contributions)?;
        let relative = self.output_relative_path(view, base);
        let output = output_dir.join(&relative);
        if let Err(e) = write_atomic(&output, &merged) {
            return self.keep_unpersisted(&key, &relative, &merged, e).map(Some);
        }

        tracing::debug!(
            resource = %key,
            contributions = contributions.len(),
            output = %output.display(),
            "Merged resource"
        );

        self.entries.insert(
            key,
            MergeCacheEntry {
                original,
                contributions: stamps,
                output_path: relative,
                touched: true,
            },
        );
        self.changed = true;
        Ok(Some(output))
    }

    /// Serve `data` from the scratch directory after the cache write failed.
    ///
    /// The stale index entry is dropped so the next cycle recomputes. When
    /// the scratch copy cannot be written either, `error` is returned.
    fn keep_unpersisted(
        &mut self,
        key: &str,
        relative: &Path,
        data: &[u8],
        error: MergeError,
    ) -> MergeResult<PathBuf> {
        let scratch = match self.scratch_dir() {
            Ok(dir) => dir.join(relative),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to create scratch directory");
                return Err(error);
            }
        };
        if let Err(e) = write_atomic(&scratch, data) {
            tracing::debug!(error = %e, "Failed to write scratch output");
            return Err(error);
        }

        tracing::warn!(
            resource = %key,
            error = %error,
            scratch = %scratch.display(),
            "Merged resource not persisted, serving scratch copy"
        );
        if self.entries.remove(key).is_some() {
            self.changed = true;
        }
        self.persist_failures.push(error);
        Ok(scratch)
    }

    fn scratch_dir(&mut self) -> io::Result<PathBuf> {
        if let Some(dir) = &self.scratch {
            return Ok(dir.path().to_path_buf());
        }
        let dir = tempfile::Builder::new().prefix("modlayer-merge-").tempdir()?;
        let path = dir.path().to_path_buf();
        self.scratch = Some(dir);
        Ok(path)
    }

    /// Drain the write failures that were served from scratch copies.
    pub fn take_persist_failures(&mut self) -> Vec<MergeError> {
        std::mem::take(&mut self.persist_failures)
    }

    /// Hand over the scratch directory. Scratch outputs are deleted when the
    /// returned value is dropped.
    pub fn take_scratch(&mut self) -> Option<TempDir> {
        self.scratch.take()
    }

    /// Merge without touching the cache.
    pub fn merge_in_memory(base: &Path, contributions: &[PathBuf]) -> MergeResult<Vec<u8>> {
        MergeKind::from_path(base).merge(base, contributions)
    }

    /// End a load cycle: prune untouched entries and save the index if
    /// anything changed.
    ///
    /// Pruning always happens in memory; a failed save is returned but the
    /// in-memory state stays consistent and will be saved next cycle.
    pub fn finish_cycle(&mut self) -> MergeResult<CycleReport> {
        let pruned = self.prune_untouched();
        let kept = self.entries.len();

        for entry in self.entries.values_mut() {
            entry.touched = false;
        }

        let saved = if self.changed {
            self.save()?;
            true
        } else {
            false
        };

        tracing::info!(kept, pruned, saved, "Merge cache cycle finished");
        Ok(CycleReport {
            kept,
            pruned,
            saved,
        })
    }

    /// Remove entries that were not used since the last cycle.
    fn prune_untouched(&mut self) -> usize {
        let output_dir = self.output_dir();
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.touched)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            if let Some(entry) = self.entries.remove(key) {
                let output = output_dir.join(&entry.output_path);
                match std::fs::remove_file(&output) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!(
                        path = %output.display(),
                        error = %e,
                        "Failed to delete pruned merge output"
                    ),
                }
                tracing::debug!(resource = %key, "Pruned merge cache entry");
            }
        }

        if !stale.is_empty() {
            self.changed = true;
        }
        stale.len()
    }

    /// Write the index atomically.
    pub fn save(&mut self) -> MergeResult<()> {
        let index = IndexFile {
            version: crate::VERSION.to_string(),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_vec_pretty(&index)
            .map_err(|e| MergeError::io(self.index_path(), io::Error::new(io::ErrorKind::Other, e)))?;
        write_atomic(&self.index_path(), &json)?;
        self.changed = false;
        Ok(())
    }

    /// Collect statistics about the cache contents.
    pub fn stats(&self) -> CacheStats {
        let output_dir = self.output_dir();
        let mut stats = CacheStats {
            entries: self.entries.len(),
            index_path: self.index_path(),
            ..Default::default()
        };

        for entry in self.entries.values() {
            match output_dir.join(&entry.output_path).metadata() {
                Ok(meta) => stats.total_bytes += meta.len(),
                Err(_) => stats.missing_outputs += 1,
            }
        }
        stats
    }

    /// Delete every output and the index. Returns the number of entries
    /// removed.
    pub fn clear(&mut self) -> MergeResult<usize> {
        let removed = self.entries.len();
        self.entries.clear();
        self.changed = false;

        let output_dir = self.output_dir();
        remove_dir_if_exists(&output_dir).map_err(|e| MergeError::io(&output_dir, e))?;

        let index_path = self.index_path();
        match std::fs::remove_file(&index_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(MergeError::io(index_path, e)),
        }

        tracing::info!(removed, "Merge cache cleared");
        Ok(removed)
    }

    /// `content/<relative base path>/<view>/<type>/<id>.ext`, or
    /// `other/<view>/<type>/<id>.ext` for bases outside the content root.
    fn output_relative_path(&self, view: MergeView, base: &ResourceEntry) -> PathBuf {
        let mut file_name = encode_component(&base.id);
        if let Some(ext) = base.source_path.extension().and_then(|e| e.to_str()) {
            if !ext.is_empty() {
                file_name.push('.');
                file_name.push_str(&encode_component(ext));
            }
        }
        let leaf = Path::new(view.as_str())
            .join(encode_component(&base.resource_type))
            .join(file_name);

        if let Some(root) = &self.content_root {
            if let Ok(relative) = base.source_path.strip_prefix(root) {
                if is_plain_relative(relative) {
                    return Path::new("content").join(relative).join(leaf);
                }
            }
        }
        Path::new("other").join(leaf)
    }
}

fn cache_key(view: MergeView, key: &ResourceKey) -> String {
    format!(
        "{}:{}/{}",
        view.as_str(),
        encode_component(&key.resource_type),
        encode_component(&key.id)
    )
}

/// Percent-encode `value` into one normal path component.
///
/// Separators, `%`, characters some filesystems reject and a leading `.` are
/// escaped, so distinct values never share a component and `.`/`..` cannot
/// appear. The empty string becomes a lone `%`.
fn encode_component(value: &str) -> String {
    if value.is_empty() {
        return "%".to_string();
    }

    let mut encoded = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        let escape = matches!(c, '/' | '\\' | '%' | ':' | '<' | '>' | '"' | '|' | '?' | '*')
            || c.is_control()
            || (i == 0 && c == '.');
        if escape {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        } else {
            encoded.push(c);
        }
    }
    encoded
}

fn load_index(path: &Path) -> io::Result<IndexFile> {
    let data = std::fs::read(path)?;
    serde_json::from_slice(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write to a temp file next to `path`, then rename over it.
fn write_atomic(path: &Path, data: &[u8]) -> MergeResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MergeError::io(parent, e))?;
    }

    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    std::fs::write(&temp_path, data).map_err(|e| MergeError::io(&temp_path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        MergeError::io(path, e)
    })
}

fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn is_plain_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}
