//! Custom test assertions

use std::path::{Path, PathBuf};
use stream_batch::Event;
use tokio::sync::broadcast;

/// Drain every event already buffered in `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Sorted file names in `dir`, empty if it does not exist
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Assert `dir` holds no files
pub fn assert_dir_empty(dir: &Path) {
    let names = file_names(dir);
    assert!(names.is_empty(), "expected {:?} to be empty, found {:?}", dir, names);
}

/// Assert `path` exists and its name has the given prefix and extension
pub fn assert_output_file(path: &PathBuf, prefix: &str, extension: &str) {
    assert!(path.exists(), "output {:?} does not exist", path);
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with(prefix), "{} should start with {}", name, prefix);
    assert_eq!(path.extension().unwrap(), extension);
}
