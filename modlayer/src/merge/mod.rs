//! Persisted merge cache.
//!
//! When several mods contribute to the same resource, the contributions are
//! merged into one artifact. Merging is comparatively expensive, so results
//! are cached on disk and reused until any input changes.
//!
//! # Layout
//!
//! ```text
//! <cache_dir>/
//! ├── merge_cache.json          # index: view:type/id -> stamps + output path
//! └── merged/
//!     ├── content/weapons/laser.json/
//!     │   ├── all/WeaponDef/laser.json     # base inside the content root
//!     │   └── owned/WeaponDef/laser.json
//!     └── other/all/WeaponDef/laser.json   # base anywhere else
//! ```
//!
//! Type and id are percent-encoded into single path components, so every
//! key owns exactly one output and no key can point outside `merged/`.
//!
//! # Validity
//!
//! A cached output is served unchanged only when:
//!
//! 1. the base file's modification time equals the recorded one,
//! 2. the ordered list of `(path, mtime)` contributions is identical
//!    (reordering counts as a change), and
//! 3. the output file still exists.
//!
//! Anything else triggers a recompute. JSON inputs are deep-merged or, for
//! contributors holding [`INSTRUCTIONS_KEY`], edited instruction by
//! instruction. All other inputs are concatenated (see [`MergeKind`]).
//!
//! # Load cycles
//!
//! Every lookup marks its entry as touched. [`MergeCache::finish_cycle`]
//! deletes untouched outputs, drops them from the index, and rewrites the
//! index atomically, so stale artifacts never accumulate.

mod cache;
mod entry;
mod error;
mod instructions;
mod strategy;

pub use cache::{CacheStats, CycleReport, MergeCache, INDEX_FILE_NAME, OUTPUT_DIR_NAME};
pub use entry::{FileStamp, MergeCacheEntry, MergeView};
pub use error::{MergeError, MergeResult};
pub use instructions::{apply_contribution, Instruction, InstructionAction, INSTRUCTIONS_KEY};
pub use strategy::{merge_json_values, MergeKind};
