use csync_fs::{NormalizedPath, io};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("folders/a/b.xml"));

    io::write_atomic(&path, b"<folder/>").unwrap();

    let content = fs::read_to_string(path.to_native()).unwrap();
    assert_eq!(content, "<folder/>");
}

#[test]
fn test_write_atomic_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("test.xml");
    fs::write(&file_path, "original").unwrap();

    let path = NormalizedPath::new(&file_path);
    io::write_atomic(&path, b"updated").unwrap();

    assert_eq!(fs::read_to_string(&file_path).unwrap(), "updated");
}

#[test]
fn test_failed_write_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    // The target is an existing directory, so the final rename fails.
    let target = temp.path().join("occupied");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("keep"), "x").unwrap();

    let result = io::write_atomic(&NormalizedPath::new(&target), b"data");
    assert!(result.is_err());

    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
}

#[test]
fn test_write_if_changed_skips_identical_content() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("rule.xml"));

    assert!(io::write_if_changed(&path, b"<rule/>").unwrap());
    assert!(!io::write_if_changed(&path, b"<rule/>").unwrap());
    assert!(io::write_if_changed(&path, b"<rule name=\"x\"/>").unwrap());
}

#[test]
fn test_remove_missing_file_is_not_an_error() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("missing.xml"));
    assert!(!io::remove_file(&path).unwrap());
}

#[test]
fn test_read_text_nonexistent_file() {
    let path = NormalizedPath::new("/nonexistent/file.xml");
    assert!(io::read_text(&path).is_err());
}
