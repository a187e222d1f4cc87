use dupsift::cascade::Mode;
use dupsift::duplicates::{DuplicateFinder, FinderConfig};
use dupsift::scanner::{ExtensionFilter, WalkerConfig};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(dir: &Path, name: &str, content: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn finder_with(walker: WalkerConfig) -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_walker_config(walker))
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.size_buckets, 0);
    assert!(!summary.interrupted);
}

#[test]
fn test_same_size_different_content() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"content a");
    write(dir.path(), "b.txt", b"content b");
    write(dir.path(), "c.txt", b"content c");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.size_buckets, 1);
    assert_eq!(summary.stages[0].eliminated, 3);
}

#[test]
fn test_scan_multiple_groups_and_nesting() {
    let dir = tempdir().unwrap();
    write(dir.path(), "1a.txt", b"group1");
    write(dir.path(), "sub/1b.txt", b"group1");
    write(dir.path(), "sub/deeper/1c.txt", b"group1");
    write(dir.path(), "2a.txt", b"group two");
    write(dir.path(), "sub/2b.txt", b"group two");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].size, 9);
    assert_eq!(groups[1].len(), 3);
    assert_eq!(summary.duplicate_groups, 2);
    assert_eq!(summary.duplicate_files, 3);
}

#[test]
fn test_size_bounds_limit_candidates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "tiny1", b"ab");
    write(dir.path(), "tiny2", b"ab");
    write(dir.path(), "mid1", &[1u8; 100]);
    write(dir.path(), "mid2", &[1u8; 100]);
    write(dir.path(), "big1", &[2u8; 5000]);
    write(dir.path(), "big2", &[2u8; 5000]);

    let (groups, summary) = finder_with(WalkerConfig {
        min_size: Some(10),
        max_size: Some(1000),
        ..WalkerConfig::default()
    })
    .find_duplicates(dir.path())
    .unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 100);
}

#[test]
fn test_extension_filter() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.JPG", b"picture");
    write(dir.path(), "b.jpg", b"picture");
    write(dir.path(), "c.txt", b"picture");
    write(dir.path(), "d.tar.gz", b"archive");
    write(dir.path(), "e.tar.gz", b"archive");

    let (groups, summary) = finder_with(WalkerConfig {
        extensions: ExtensionFilter::parse_list("jpg, tar.gz"),
        ..WalkerConfig::default()
    })
    .find_duplicates(dir.path())
    .unwrap();

    assert_eq!(summary.total_files, 4);
    assert_eq!(groups.len(), 2);
    assert!(groups
        .iter()
        .flat_map(|g| &g.files)
        .all(|p| !p.to_string_lossy().ends_with("c.txt")));
}

#[test]
fn test_ignore_patterns_and_hidden_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "keep1.dat", b"payload");
    write(dir.path(), "keep2.dat", b"payload");
    write(dir.path(), "build/out.dat", b"payload");
    write(dir.path(), "scratch.tmp", b"payload");
    write(dir.path(), ".hidden/copy.dat", b"payload");

    let (groups, summary) = finder_with(WalkerConfig {
        ignore_patterns: vec!["*.tmp".to_string(), "build/".to_string()],
        skip_hidden: true,
        ..WalkerConfig::default()
    })
    .find_duplicates(dir.path())
    .unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_modes_agree_on_true_duplicates() {
    let dir = tempdir().unwrap();
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 97) as u8).collect();
    write(dir.path(), "x.bin", &content);
    write(dir.path(), "y.bin", &content);
    let mut other = content.clone();
    other[150_000] ^= 1;
    write(dir.path(), "z.bin", &other);

    for mode in Mode::ALL {
        let (groups, _) = DuplicateFinder::new(FinderConfig::default().with_mode(mode))
            .find_duplicates(dir.path())
            .unwrap();
        assert_eq!(groups.len(), 1, "mode {mode}");
        assert_eq!(groups[0].len(), 2, "mode {mode}");
    }
}
