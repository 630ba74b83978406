use std::sync::Arc;

use bucketview_core::{Customization, Directory, File, SortAlgorithm};
use bucketview_listing::{DEFAULT_FOLDER_ICON, Sorter, decorate, decorate_with};
use chrono::Utc;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_case_insensitive_sort() {
    let sorter = Sorter::from_name("case-insensitive", false).unwrap();
    assert_eq!(
        sorter.sorted(names(&["Banana", "apple", "Cherry"])),
        names(&["apple", "Banana", "Cherry"])
    );
}

#[test]
fn test_semver_sort_with_mixed_content() {
    let sorter = Sorter::from_name("semver", false).unwrap();
    assert_eq!(
        sorter.sorted(names(&["1.2", "1.2.0", "v2.0.0", "latest", "1.0"])),
        names(&["v2.0.0", "1.2", "1.2.0", "1.0", "latest"])
    );
}

#[test]
fn test_semver_non_versions_never_reversed() {
    let sorter = Sorter::from_name("semver", true).unwrap();
    assert_eq!(
        sorter.sorted(names(&["nightly", "3.0", "Beta", "1.0"])),
        names(&["1.0", "3.0", "Beta", "nightly"])
    );
}

#[test]
fn test_semver_prerelease_after_release() {
    let sorter = Sorter::from_name("semver", false).unwrap();
    assert_eq!(
        sorter.sorted(names(&["1.12.0-rc1", "1.11", "1.12"])),
        names(&["1.12", "1.12.0-rc1", "1.11"])
    );
}

#[test]
fn test_sorting_is_idempotent() {
    let inputs = names(&[
        "v1.0", "1.0", "1.0.0", "Zeta", "alpha", "ALPHA", "2.0.0-beta", "2.0.0", "10", "9.9.9",
    ]);

    for algorithm in ["plain", "case-insensitive", "semver"] {
        for reverse in [false, true] {
            let sorter = Sorter::from_name(algorithm, reverse).unwrap();
            let once = sorter.sorted(inputs.clone());
            let twice = sorter.sorted(once.clone());
            assert_eq!(once, twice, "{algorithm} reverse={reverse}");

            let mut shuffled = once.clone();
            shuffled.reverse();
            assert_eq!(sorter.sorted(shuffled), once, "{algorithm} reverse={reverse}");
        }
    }
}

#[test]
fn test_sort_compact_strings_in_place() {
    let sorter = Sorter::new(SortAlgorithm::CaseInsensitive, false).unwrap();
    let mut folders: Vec<compact_str::CompactString> = vec!["b".into(), "A".into(), "c".into()];
    sorter.sort(&mut folders);
    assert_eq!(folders, vec!["A", "b", "c"]);
}

const RELEASES: &str = r#"{
    "folder": { "icon": "box", "description": "misc" },
    "^v?(\\d+)\\.(\\d+)": {
        "icon": "tag",
        "description": "Release $1.$2",
        "latest": { "icon": "star", "description": "Latest release $1.$2" }
    },
    "^nightly": { "icon": "moon", "description": "Nightly build" },
    "file": { "icon": "doc" }
}"#;

fn releases_dir() -> Directory {
    let mut dir = Directory::new("/releases");
    for name in ["1.0", "nightly-2", "2.1", "docs", "nightly-1", "1.5"] {
        dir.subfolders.push(name.into());
    }
    dir.files.insert("README".into(), File::new(42, Utc::now()));
    dir.customization = Some(Arc::new(Customization::from_json(RELEASES.as_bytes()).unwrap()));
    dir
}

#[test]
fn test_first_match_per_pattern_is_latest() {
    let dir = releases_dir();
    let listing = decorate(&dir, &Sorter::from_name("semver", false).unwrap());

    assert_eq!(
        listing.folder_names(),
        vec!["2.1", "1.5", "1.0", "docs", "nightly-1", "nightly-2"]
    );

    let by_name = |n: &str| listing.folders.iter().find(|f| f.name == n).unwrap();

    let newest = by_name("2.1");
    assert!(newest.latest);
    assert_eq!(newest.icon, "star");
    assert_eq!(newest.description, "Latest release 2.1");

    let older = by_name("1.5");
    assert!(!older.latest);
    assert_eq!(older.icon, "tag");
    assert_eq!(older.description, "Release 1.5");

    assert!(by_name("nightly-1").latest);
    assert_eq!(by_name("nightly-1").icon, "moon");
    assert!(!by_name("nightly-2").latest);

    let docs = by_name("docs");
    assert_eq!(docs.icon, "box");
    assert_eq!(docs.description, "misc");

    assert_eq!(listing.files[0].icon, "doc");
}

#[test]
fn test_latest_follows_sort_direction() {
    let dir = releases_dir();
    let listing = decorate(&dir, &Sorter::from_name("semver", true).unwrap());

    let latest: Vec<_> = listing
        .folders
        .iter()
        .filter(|f| f.latest)
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(latest, vec!["1.0", "nightly-1"]);
}

#[test]
fn test_latest_state_resets_between_calls() {
    let dir = releases_dir();
    let sorter = Sorter::from_name("semver", false).unwrap();

    let first = decorate(&dir, &sorter);
    let second = decorate(&dir, &sorter);
    assert_eq!(first.folders, second.folders);
}

#[test]
fn test_explicit_customization_overrides_attached() {
    let dir = releases_dir();
    let listing = decorate_with(&dir, &Sorter::default(), None);
    assert!(listing.folders.iter().all(|f| f.icon == DEFAULT_FOLDER_ICON));
    assert_eq!(listing.folder_names()[0], "1.0");
}

#[test]
fn test_listing_serializes_for_renderers() {
    let dir = releases_dir();
    let listing = decorate(&dir, &Sorter::from_name("semver", false).unwrap());
    let json = serde_json::to_value(&listing).unwrap();

    assert_eq!(json["path"], "/releases");
    assert_eq!(json["breadcrumbs"][0]["name"], "Home");
    assert_eq!(json["folders"][0]["name"], "2.1");
    assert_eq!(json["files"][0]["size"], 42);
}
