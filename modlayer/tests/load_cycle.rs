//! Integration tests for the full load cycle.
//!
//! These tests drive `ModLoader::run` against a real directory tree:
//! - base content plus mods that replace and merge resources
//! - conflict exclusion and dependency ordering
//! - ownership filtering of the effective catalog, merges included
//! - merge cache reuse, invalidation and pruning across runs
//! - merging when the cache directory cannot be written
//! - the persisted load-order hint
//!
//! Run with: `cargo test --test load_cycle`

use std::path::{Path, PathBuf};

use filetime::FileTime;
use serde_json::{json, Value};
use tempfile::TempDir;

use modlayer::catalog::OwnershipState;
use modlayer::loader::{MergeFailureReason, ModLoader, MERGE_LAYER_NAME, OWNED_MERGE_LAYER_NAME};
use modlayer::merge::MergeError;
use modlayer::resolver::ExclusionReason;

// ============================================================================
// Helper Functions
// ============================================================================

struct Install {
    temp: TempDir,
}

impl Install {
    /// Base content with two weapons, a mech that needs the "heavy" pack,
    /// and four mods.
    fn new() -> Self {
        let install = Self {
            temp: TempDir::new().unwrap(),
        };

        install.write(
            "content/manifest.json",
            r#"[
                {"type": "WeaponDef", "path": "weapons"},
                {"type": "MechDef", "path": "mechs/atlas.json", "content_pack": "heavy"}
            ]"#,
        );
        install.write("content/weapons/laser.json", r#"{"damage": 10, "heat": 5}"#);
        install.write("content/weapons/ppc.json", r#"{"damage": 20}"#);
        install.write("content/mechs/atlas.json", r#"{"tonnage": 100}"#);

        install.write(
            "mods/a_lasers/mod.json",
            r#"{
                "name": "BetterLasers",
                "manifest": [{"type": "WeaponDef", "path": "laser.json", "merge": true}]
            }"#,
        );
        install.write("mods/a_lasers/laser.json", r#"{"damage": 15}"#);

        install.write(
            "mods/b_ppc/mod.json",
            r#"{
                "name": "PpcRework",
                "depends_on": ["BetterLasers"],
                "manifest": [
                    {"type": "WeaponDef", "path": "ppc.json"},
                    {"type": "WeaponDef", "path": "laser_heat.json", "id": "laser", "merge": true}
                ]
            }"#,
        );
        install.write("mods/b_ppc/ppc.json", r#"{"damage": 25}"#);
        install.write("mods/b_ppc/laser_heat.json", r#"{"heat": 7}"#);

        install.write(
            "mods/c_rival/mod.json",
            r#"{"name": "Rival", "conflicts_with": ["BetterLasers"]}"#,
        );

        install.write(
            "mods/d_urban/mod.json",
            r#"{
                "name": "UrbanNames",
                "required_content_packs": ["urban"],
                "manifest": [{"type": "Names", "path": "names.txt"}]
            }"#,
        );
        install.write("mods/d_urban/names.txt", "Solaris\n");

        install
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.temp.path().join(rel)
    }

    fn write(&self, rel: &str, body: &str) {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn loader(&self) -> ModLoader {
        ModLoader::new(self.path("mods"), self.path("content"), self.path("cache"))
    }

    fn merged_laser(&self) -> PathBuf {
        self.path("cache/merged/content/weapons/laser.json/all/WeaponDef/laser.json")
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn mtime(path: &Path) -> i64 {
    FileTime::from_last_modification_time(&path.metadata().unwrap()).unix_seconds()
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_full_cycle_builds_effective_catalog() {
    let install = Install::new();
    let report = install.loader().run(OwnershipState::Unknown).unwrap();

    assert_eq!(
        report.resolution.order,
        vec!["BetterLasers", "PpcRework", "UrbanNames"]
    );
    assert_eq!(
        report.resolution.excluded.get("Rival"),
        Some(&ExclusionReason::Conflict {
            with: vec!["BetterLasers".to_string()]
        })
    );
    assert_eq!(report.loaded, report.resolution.order);
    assert!(report.failures.is_empty());
    assert!(report.merge_failures.is_empty());

    // The replacement from PpcRework wins over the base file.
    let ppc = report.catalog.entry("WeaponDef", "ppc", false).unwrap();
    assert_eq!(ppc.source_path, install.path("mods/b_ppc/ppc.json"));

    // Both merge contributions land in one cached artifact, in load order.
    let laser = report.catalog.entry("WeaponDef", "laser", false).unwrap();
    assert_eq!(laser.source_path, install.merged_laser());
    assert_eq!(read_json(&laser.source_path), json!({"damage": 15, "heat": 7}));
    assert_eq!(report.merged.len(), 1);
    assert_eq!(
        report.catalog.layer_names(),
        vec!["base", "BetterLasers", "PpcRework", "UrbanNames", MERGE_LAYER_NAME]
    );
}

#[test]
fn test_ownership_filters_owned_view() {
    let install = Install::new();
    let report = install
        .loader()
        .run(OwnershipState::owned(["heavy"]))
        .unwrap();
    let catalog = &report.catalog;

    assert!(catalog.entry("MechDef", "atlas", true).is_some());
    assert!(catalog.entry("Names", "names", true).is_none());
    assert!(catalog.entry("Names", "names", false).is_some());
    assert_eq!(catalog.all_entries(false).len(), 4);
    assert_eq!(catalog.all_entries(true).len(), 3);

    let report = install
        .loader()
        .run(OwnershipState::owned(["urban"]))
        .unwrap();
    assert!(report.catalog.entry("MechDef", "atlas", true).is_none());
    assert!(report.catalog.entry("Names", "names", true).is_some());
}

#[test]
fn test_unowned_merge_contribution_stays_out_of_owned_view() {
    let install = Install::new();
    install.write(
        "mods/e_urban_lasers/mod.json",
        r#"{
            "name": "UrbanLasers",
            "required_content_packs": ["urbanwarfare"],
            "manifest": [{"type": "WeaponDef", "path": "laser.json", "merge": true}]
        }"#,
    );
    install.write("mods/e_urban_lasers/laser.json", r#"{"damage": 999}"#);

    let mut report = install
        .loader()
        .run(OwnershipState::owned(Vec::<String>::new()))
        .unwrap();

    let owned = report.catalog.entry("WeaponDef", "laser", true).unwrap().clone();
    let all = report.catalog.entry("WeaponDef", "laser", false).unwrap().clone();
    assert_eq!(read_json(&owned.source_path), json!({"damage": 15, "heat": 7}));
    assert_eq!(read_json(&all.source_path), json!({"damage": 999, "heat": 7}));
    assert_ne!(owned.source_path, all.source_path);
    assert!(all.required_content_packs.contains(&"urbanwarfare".to_string()));
    assert!(report.merge_failures.is_empty());
    assert!(report
        .catalog
        .layer_names()
        .ends_with(&[OWNED_MERGE_LAYER_NAME, MERGE_LAYER_NAME]));

    // Owning the pack later lets the full merge through on replay.
    report
        .catalog
        .set_ownership(OwnershipState::owned(["urbanwarfare"]));
    assert!(report.catalog.rebuild());
    let owned = report.catalog.entry("WeaponDef", "laser", true).unwrap();
    assert_eq!(owned.source_path, all.source_path);
}

#[test]
fn test_fully_owned_merge_serves_both_views() {
    let install = Install::new();
    let report = install
        .loader()
        .run(OwnershipState::owned(["heavy"]))
        .unwrap();

    let owned = report.catalog.entry("WeaponDef", "laser", true).unwrap();
    let all = report.catalog.entry("WeaponDef", "laser", false).unwrap();
    assert_eq!(owned, all);
    assert_eq!(owned.source_path, install.merged_laser());
    assert!(!report
        .catalog
        .layer_names()
        .contains(&OWNED_MERGE_LAYER_NAME));
}

#[test]
fn test_unowned_override_does_not_hide_owned_merge() {
    let install = Install::new();
    install.write(
        "mods/e_dlc_laser/mod.json",
        r#"{
            "name": "DlcLaser",
            "manifest": [{"type": "WeaponDef", "path": "laser.json", "content_pack": "heavymetal"}]
        }"#,
    );
    install.write("mods/e_dlc_laser/laser.json", r#"{"damage": 50, "heat": 1, "dlc": true}"#);

    let report = install
        .loader()
        .run(OwnershipState::owned(Vec::<String>::new()))
        .unwrap();

    // Owners of the pack see the merge on the override; everyone else sees
    // the same contributions merged into the base file.
    let all = report.catalog.entry("WeaponDef", "laser", false).unwrap();
    assert_eq!(read_json(&all.source_path), json!({"damage": 15, "heat": 7, "dlc": true}));
    assert_eq!(all.content_pack.as_deref(), Some("heavymetal"));

    let owned = report.catalog.entry("WeaponDef", "laser", true).unwrap();
    assert_eq!(read_json(&owned.source_path), json!({"damage": 15, "heat": 7}));
    assert_eq!(owned.content_pack, None);
}

#[test]
fn test_unwritable_cache_still_merges_for_this_run() {
    let install = Install::new();
    // A plain file where the output directory belongs.
    install.write("cache/merged", "not a directory");

    let report = install.loader().run(OwnershipState::Unknown).unwrap();

    assert!(report.merge_failures.is_empty());
    assert_eq!(report.unpersisted.len(), 1);
    assert!(matches!(report.unpersisted[0], MergeError::CacheIo { .. }));
    assert!(report.uses_scratch());

    let laser = report.catalog.entry("WeaponDef", "laser", false).unwrap();
    assert!(!laser.source_path.starts_with(install.path("cache")));
    assert_eq!(read_json(&laser.source_path), json!({"damage": 15, "heat": 7}));
    assert_eq!(report.merged.len(), 1);
}

#[test]
fn test_second_run_reuses_merged_output() {
    let install = Install::new();
    let loader = install.loader();

    let first = loader.run(OwnershipState::Unknown).unwrap();
    assert!(first.cache_cycle.unwrap().saved);

    filetime::set_file_mtime(install.merged_laser(), FileTime::from_unix_time(42, 0)).unwrap();

    let second = loader.run(OwnershipState::Unknown).unwrap();
    let cycle = second.cache_cycle.unwrap();
    assert!(!cycle.saved);
    assert_eq!(cycle.kept, 1);
    assert_eq!(mtime(&install.merged_laser()), 42);
}

#[test]
fn test_changed_contributor_recomputes() {
    let install = Install::new();
    let loader = install.loader();
    loader.run(OwnershipState::Unknown).unwrap();

    install.write("mods/a_lasers/laser.json", r#"{"damage": 30}"#);
    filetime::set_file_mtime(
        install.path("mods/a_lasers/laser.json"),
        FileTime::from_unix_time(2_000_000_000, 0),
    )
    .unwrap();

    loader.run(OwnershipState::Unknown).unwrap();
    assert_eq!(read_json(&install.merged_laser()), json!({"damage": 30, "heat": 7}));
}

#[test]
fn test_unused_merge_outputs_are_pruned() {
    let install = Install::new();
    let loader = install.loader();
    loader.run(OwnershipState::Unknown).unwrap();
    assert!(install.merged_laser().exists());

    // Without BetterLasers, PpcRework is excluded and nothing merges.
    std::fs::remove_dir_all(install.path("mods/a_lasers")).unwrap();
    let report = loader.run(OwnershipState::Unknown).unwrap();

    assert!(report
        .resolution
        .excluded
        .get("PpcRework")
        .is_some_and(ExclusionReason::is_missing_dependency));
    assert_eq!(report.cache_cycle.unwrap().pruned, 1);
    assert!(!install.merged_laser().exists());
    assert_eq!(loader.merge_cache().stats().entries, 0);

    let laser = report.catalog.entry("WeaponDef", "laser", false).unwrap();
    assert_eq!(laser.source_path, install.path("content/weapons/laser.json"));
}

#[test]
fn test_malformed_contributor_fails_only_its_target() {
    let install = Install::new();
    install.write("mods/a_lasers/laser.json", "{ broken");

    let report = install.loader().run(OwnershipState::Unknown).unwrap();

    assert_eq!(report.merge_failures.len(), 1);
    let failure = &report.merge_failures[0];
    assert_eq!(failure.path, install.path("mods/a_lasers/laser.json"));
    assert!(matches!(
        failure.reason,
        MergeFailureReason::Merge(MergeError::Parse { .. })
    ));

    // The unmerged base stays in place, the rest of the mod set is intact.
    let laser = report.catalog.entry("WeaponDef", "laser", false).unwrap();
    assert_eq!(laser.source_path, install.path("content/weapons/laser.json"));
    let ppc = report.catalog.entry("WeaponDef", "ppc", false).unwrap();
    assert_eq!(ppc.source_path, install.path("mods/b_ppc/ppc.json"));
}

#[test]
fn test_load_order_hint_keeps_existing_mods_first() {
    let install = Install::new();
    let loader = install.loader();
    loader.run(OwnershipState::Unknown).unwrap();

    // Sorts first on disk, but is new, so it goes last.
    install.write("mods/0_new/mod.json", r#"{"name": "Newcomer"}"#);
    let report = loader.run(OwnershipState::Unknown).unwrap();

    assert_eq!(
        report.resolution.order,
        vec!["BetterLasers", "PpcRework", "UrbanNames", "Newcomer"]
    );
}
