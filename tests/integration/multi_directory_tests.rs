use dupsift::duplicates::{DuplicateFinder, FinderConfig};
use dupsift::scanner::WalkerConfig;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_scan_two_non_overlapping_directories() {
    let dir1 = tempdir().unwrap();
    let dir2 = tempdir().unwrap();
    fs::write(dir1.path().join("a.txt"), b"dup").unwrap();
    fs::write(dir2.path().join("b.txt"), b"dup").unwrap();

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates_in_paths(vec![dir1.path().to_path_buf(), dir2.path().to_path_buf()])
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files.len(), 2);
    assert_eq!(summary.total_files, 2);
}

#[test]
fn test_scan_overlapping_directories() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(dir.path().join("a.txt"), b"content").unwrap();
    fs::write(sub.join("b.txt"), b"content").unwrap();

    // The child is reached twice; its files are only compared once.
    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates_in_paths(vec![dir.path().to_path_buf(), sub])
        .unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files.len(), 2);
}

#[test]
fn test_file_roots_are_accepted() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    fs::write(&a, b"same").unwrap();
    fs::write(&b, b"same").unwrap();

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates_in_paths(vec![a.clone(), b.clone()])
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0].files,
        vec![a.canonicalize().unwrap(), b.canonicalize().unwrap()]
    );
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = tempdir().unwrap();
    let err = DuplicateFinder::with_defaults()
        .find_duplicates_in_paths(vec![dir.path().to_path_buf(), dir.path().join("nope")])
        .unwrap_err();
    assert!(err.to_string().contains("Path not found"));
}

#[test]
fn test_cross_directory_triple() {
    let dirs: Vec<_> = (0..3).map(|_| tempdir().unwrap()).collect();
    for (i, dir) in dirs.iter().enumerate() {
        fs::write(dir.path().join(format!("{i}.txt")), b"triple").unwrap();
    }

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates_in_paths(dirs.iter().map(|d| d.path().to_path_buf()).collect())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files.len(), 3);
    assert_eq!(summary.duplicate_files, 2);
}

#[test]
fn test_same_directory_spelled_twice_is_not_a_duplicate() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("only.bin"), b"one copy on disk").unwrap();

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates_in_paths(vec![sub.clone(), sub.join("..").join("sub")])
        .unwrap();

    assert!(groups.is_empty(), "file matched itself: {groups:?}");
    assert_eq!(summary.total_files, 1);
}

#[cfg(unix)]
#[test]
fn test_followed_symlink_is_not_a_duplicate_of_its_target() {
    let dir = tempdir().unwrap();
    let real = dir.path().join("real.bin");
    fs::write(&real, b"linked content").unwrap();
    std::os::unix::fs::symlink(&real, dir.path().join("link.bin")).unwrap();

    let config = FinderConfig::default().with_walker_config(WalkerConfig {
        follow_symlinks: true,
        ..WalkerConfig::default()
    });
    let (groups, summary) = DuplicateFinder::new(config)
        .find_duplicates_in_paths(vec![dir.path().to_path_buf()])
        .unwrap();

    assert!(groups.is_empty(), "link matched its target: {groups:?}");
    assert_eq!(summary.total_files, 1);
}

#[test]
fn test_reported_paths_are_absolute() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("a.txt"), b"twice").unwrap();
    fs::write(sub.join("b.txt"), b"twice").unwrap();

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates_in_paths(vec![sub.join(".")])
        .unwrap();

    assert_eq!(groups.len(), 1);
    for path in &groups[0].files {
        assert!(path.is_absolute());
        assert_eq!(path, &path.canonicalize().unwrap());
    }
}
