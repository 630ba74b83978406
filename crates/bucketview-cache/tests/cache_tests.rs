//! Integration tests for bucketview-cache.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use bucketview_cache::{FsCache, RefreshScheduler, RefreshTrigger, TreeBuilder};
use bucketview_core::{BrowseConfig, CUSTOMIZATION_FILE, ObjectRecord, WarningKind};
use bucketview_source::{LocalObjectSource, MemoryObjectSource};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

fn customizing() -> BrowseConfig {
    BrowseConfig::builder().customize(true).build().unwrap()
}

fn scenario_source() -> Arc<MemoryObjectSource> {
    let source = Arc::new(MemoryObjectSource::new("scenario"));
    let modified = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
    source.put_at("a/b/file1.txt", "one", modified);
    source.put_at("a/file2.txt", "two two", modified);
    source.put_at("c/file3.txt", "three", modified);
    source
}

#[test]
fn test_end_to_end_scenario() {
    let source = scenario_source();
    let cache = FsCache::new(source, &BrowseConfig::default());
    cache.refresh().unwrap();

    let root = cache.get_dir("/").unwrap();
    assert_eq!(root.subfolders, vec!["a", "c"]);
    assert!(root.files.is_empty());

    let a = cache.get_dir("/a").unwrap();
    assert_eq!(a.subfolders, vec!["b"]);
    assert_eq!(a.files.keys().map(|k| k.as_str()).collect::<Vec<_>>(), vec!["file2.txt"]);

    let b = cache.get_dir("/a/b").unwrap();
    assert!(b.file("file1.txt").is_some());
    assert!(b.subfolders.is_empty());

    let c = cache.get_dir("/c").unwrap();
    assert!(c.file("file3.txt").is_some());

    let file2 = cache.get_file("/a/file2.txt").unwrap();
    assert_eq!(file2.size, 7);
    assert_eq!(file2.modified, Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap());

    assert!(cache.get_file("/a/nope.txt").is_none());
    assert!(cache.get_dir("/a/nope").is_none());
}

#[test]
fn test_directory_marker() {
    let source = Arc::new(MemoryObjectSource::default());
    source.put("d/", "");
    let cache = FsCache::new(source, &BrowseConfig::default());
    cache.refresh().unwrap();

    let d = cache.get_dir("/d").unwrap();
    assert!(d.files.is_empty());
    assert_eq!(cache.get_dir("/").unwrap().subfolders, vec!["d"]);
    assert!(cache.get_file("/d/").is_none());
}

#[test]
fn test_tree_completeness_and_no_duplicate_children() {
    let keys = [
        "x/y/z/1.bin",
        "x/y/z/2.bin",
        "x/y/3.bin",
        "x/4.bin",
        "x/y/w/5.bin",
        "x/y/z/deeper/6.bin",
        "top.bin",
    ];
    let now = Utc::now();
    let records: Vec<_> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| Ok(ObjectRecord::new(*key, i as u64, now)))
        .collect();
    let tree = TreeBuilder::new().build_from_records(records);

    for (i, key) in keys.iter().enumerate() {
        let (dir, name) = bucketview_core::path::split(key);
        for (_, _, ancestor) in bucketview_core::path::ancestors(&dir) {
            assert!(tree.dir(&ancestor).is_some(), "missing {ancestor}");
        }
        let file = tree.dir(&dir).unwrap().file(name).unwrap();
        assert_eq!(file.size, i as u64);
        assert_eq!(file.modified, now);
    }

    for dir in tree.dirs.values() {
        let unique: HashSet<_> = dir.subfolders.iter().collect();
        assert_eq!(unique.len(), dir.subfolders.len(), "duplicates in {}", dir.path);
    }

    assert_eq!(tree.dir("/x/y").unwrap().subfolders, vec!["z", "w"]);
}

#[test]
fn test_root_exists_for_empty_bucket() {
    let cache = FsCache::new(Arc::new(MemoryObjectSource::default()), &BrowseConfig::default());
    cache.refresh().unwrap();
    assert_eq!(cache.snapshot().paths(), vec!["/"]);
    assert_eq!(cache.generation(), 1);
}

#[test]
fn test_failed_refresh_is_isolated() {
    let source = scenario_source();
    let cache = FsCache::new(source.clone(), &BrowseConfig::default());
    cache.refresh().unwrap();

    let dir_before = cache.get_dir("/a").unwrap();
    let file_before = cache.get_file("/a/file2.txt");

    source.put("a/new.txt", "new");
    source.set_listing_failure(Some("bucket not found"));
    assert!(cache.refresh().is_err());

    let dir_after = cache.get_dir("/a").unwrap();
    assert_eq!(dir_after.subfolders, dir_before.subfolders);
    assert_eq!(dir_after.files, dir_before.files);
    assert_eq!(cache.get_file("/a/file2.txt"), file_before);
    assert!(cache.get_file("/a/new.txt").is_none());
    assert_eq!(cache.generation(), 1);

    source.set_listing_failure(None);
    cache.refresh().unwrap();
    assert!(cache.get_file("/a/new.txt").is_some());
}

#[test]
fn test_per_object_errors_do_not_fail_refresh() {
    let source = scenario_source();
    source.add_broken("a/broken.txt");
    let cache = FsCache::new(source, &BrowseConfig::default());

    let summary = cache.refresh().unwrap();
    assert_eq!(summary.stats.skipped, 1);
    assert_eq!(summary.warnings, 1);
    assert_eq!(summary.stats.total_files, 3);
    assert_eq!(cache.snapshot().warnings[0].kind, WarningKind::InvalidObject);
}

#[test]
fn test_readers_never_see_partial_tree() {
    let source = Arc::new(MemoryObjectSource::default());
    for i in 0..20 {
        source.put(format!("dir/file{i:02}.txt"), "v1");
    }
    let cache = Arc::new(FsCache::new(source.clone(), &BrowseConfig::default()));
    cache.refresh().unwrap();

    // The next snapshot has 40 files; each listing step sleeps.
    for i in 20..40 {
        source.put(format!("dir/file{i:02}.txt"), "v2");
    }
    source.set_delay(Duration::from_millis(2));

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = HashSet::new();
                while !done.load(Ordering::Acquire) {
                    let dir = cache.get_dir("/dir").unwrap();
                    observed.insert(dir.files.len());
                }
                observed
            })
        })
        .collect();

    cache.refresh().unwrap();
    done.store(true, Ordering::Release);

    for reader in readers {
        let observed = reader.join().unwrap();
        assert!(observed.iter().all(|n| *n == 20 || *n == 40), "{observed:?}");
    }
    assert_eq!(cache.get_dir("/dir").unwrap().files.len(), 40);
}

#[test]
fn test_local_source_end_to_end() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("a/b")).unwrap();
    fs::create_dir(temp.path().join("empty")).unwrap();
    fs::write(temp.path().join("a/b/file1.txt"), "hello").unwrap();

    let cache = FsCache::new(
        Arc::new(LocalObjectSource::new(temp.path())),
        &BrowseConfig::default(),
    );
    cache.refresh().unwrap();

    assert_eq!(cache.get_file("/a/b/file1.txt").unwrap().size, 5);
    assert!(cache.get_dir("/empty").unwrap().files.is_empty());
    assert_eq!(cache.snapshot().stats.dir_markers, 1);
}

#[test]
fn test_customization_attached_before_publish() {
    let source = Arc::new(MemoryObjectSource::default());
    source.put("releases/v1/a.txt", "");
    source.put("releases/v2/a.txt", "");
    source.put(
        format!("releases/{CUSTOMIZATION_FILE}"),
        r#"{ "^v(\\d+)$": { "icon": "tag", "description": "Release $1" } }"#,
    );

    let cache = FsCache::new(source.clone(), &customizing());
    cache.refresh().unwrap();

    let releases = cache.get_dir("/releases").unwrap();
    assert!(releases.file(CUSTOMIZATION_FILE).is_none());
    let custom = releases.customization.expect("customization attached");
    assert_eq!(custom.rules.len(), 1);
    assert!(cache.get_dir("/").unwrap().customization.is_none());

    // Without customization the document is an ordinary file.
    let plain = FsCache::new(source, &BrowseConfig::default());
    plain.refresh().unwrap();
    let releases = plain.get_dir("/releases").unwrap();
    assert!(releases.file(CUSTOMIZATION_FILE).is_some());
    assert!(releases.customization.is_none());
}

#[test]
fn test_bad_customization_is_a_warning() {
    let source = Arc::new(MemoryObjectSource::default());
    source.put(format!("broken/{CUSTOMIZATION_FILE}"), "{ not json");
    source.put(format!("huge/{CUSTOMIZATION_FILE}"), vec![b' '; 70_000]);

    let cache = FsCache::new(source, &customizing());
    let summary = cache.refresh().unwrap();

    assert_eq!(summary.warnings, 2);
    let tree = cache.snapshot();
    assert!(tree.warnings.iter().all(|w| w.kind == WarningKind::Customization));
    assert!(tree.dir("/broken").unwrap().customization.is_none());
    assert!(tree.dir("/huge").unwrap().customization.is_none());
}

#[test]
fn test_oversized_customization_is_not_fetched() {
    let source = Arc::new(MemoryObjectSource::default());
    source.put("huge/v1/a.txt", "");
    source.put(format!("huge/{CUSTOMIZATION_FILE}"), vec![b' '; 70_000]);

    let cache = FsCache::new(source.clone(), &customizing());
    let summary = cache.refresh().unwrap();

    assert_eq!(source.fetch_count(), 0);
    assert_eq!(summary.warnings, 1);
    let warning = &cache.snapshot().warnings[0];
    assert_eq!(warning.kind, WarningKind::Customization);
    assert!(warning.message.contains("70000"));
}

#[tokio::test]
async fn test_scheduler_timer_refreshes() {
    let source = scenario_source();
    let cache = Arc::new(FsCache::new(source, &BrowseConfig::default()));

    let scheduler = RefreshScheduler::new(Arc::clone(&cache), Duration::from_millis(20));
    let mut events = scheduler.subscribe();
    let handle = scheduler.spawn();

    let event = events.recv().await.unwrap();
    assert_eq!(event.trigger, RefreshTrigger::Timer);
    assert!(event.is_success());
    assert!(cache.get_file("/c/file3.txt").is_some());

    handle.shutdown().await;
}

#[tokio::test]
async fn test_scheduler_reports_failures_and_keeps_tree() {
    let source = scenario_source();
    let cache = Arc::new(FsCache::new(source.clone(), &BrowseConfig::default()));
    cache.refresh().unwrap();

    source.set_listing_failure(Some("access denied"));
    let handle = RefreshScheduler::new(Arc::clone(&cache), Duration::from_secs(3600)).spawn();
    let mut events = handle.subscribe();
    handle.request_refresh();

    let event = events.recv().await.unwrap();
    assert_eq!(event.trigger, RefreshTrigger::Request);
    let message = event.outcome.unwrap_err();
    assert!(message.contains("access denied"));
    assert_eq!(cache.generation(), 1);
    assert!(cache.get_file("/a/file2.txt").is_some());

    handle.shutdown().await;
}

#[tokio::test]
async fn test_requests_coalesce_while_refreshing() {
    let source = scenario_source();
    source.set_delay(Duration::from_millis(20));
    let cache = Arc::new(FsCache::new(source.clone(), &BrowseConfig::default()));

    let handle = RefreshScheduler::new(Arc::clone(&cache), Duration::from_secs(3600)).spawn();
    let mut events = handle.subscribe();

    handle.request_refresh();
    tokio::time::sleep(Duration::from_millis(10)).await;
    for _ in 0..10 {
        handle.request_refresh();
    }

    events.recv().await.unwrap();
    events.recv().await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(source.listing_count(), 2);
    assert_eq!(cache.generation(), 2);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_driver() {
    let cache = Arc::new(FsCache::new(
        Arc::new(MemoryObjectSource::default()),
        &BrowseConfig::default(),
    ));
    let handle = RefreshScheduler::new(Arc::clone(&cache), Duration::from_secs(3600)).spawn();
    assert!(!handle.is_finished());
    handle.shutdown().await;
    assert_eq!(cache.generation(), 0);
}
