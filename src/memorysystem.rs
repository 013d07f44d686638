use crate::constants::SEGMENT_SIZE_LIMIT;
use log::*;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Synchronous key/value persistence for opaque text segments.
pub trait SegmentStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, data: String);

    fn remove(&mut self, key: &str);
}

fn check_size(key: &str, data: &str) {
    if data.len() > SEGMENT_SIZE_LIMIT {
        error!("Memory segment too large - Segment: {} - Size: {}", key, data.len());
    }
}

/// In-process segment store.
#[derive(Clone, Debug, Default)]
pub struct MemorySegments {
    segments: HashMap<String, String>,
}

impl MemorySegments {
    pub fn new() -> MemorySegments {
        MemorySegments::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl SegmentStore for MemorySegments {
    fn get(&self, key: &str) -> Option<String> {
        self.segments.get(key).cloned()
    }

    fn set(&mut self, key: &str, data: String) {
        check_size(key, &data);

        self.segments.insert(key.to_string(), data);
    }

    fn remove(&mut self, key: &str) {
        self.segments.remove(key);
    }
}

/// Segment store keeping one file per key inside a directory.
///
/// I/O failures are logged and otherwise ignored; a segment that cannot be
/// read behaves like a missing one.
#[derive(Clone, Debug)]
pub struct FileSegments {
    root: PathBuf,
}

impl FileSegments {
    pub fn open(root: impl AsRef<Path>) -> Result<FileSegments, String> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root).map_err(|e| format!("Failed to create segment directory {}: {}", root.display(), e))?;

        Ok(FileSegments { root })
    }

    fn path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
            .collect();

        self.root.join(file_name)
    }
}

impl SegmentStore for FileSegments {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path(key)) {
            Ok(data) => Some(data),
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read segment {}: {}", key, e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, data: String) {
        check_size(key, &data);

        if let Err(e) = fs::write(self.path(key), data) {
            error!("Failed to write segment {}: {}", key, e);
        }
    }

    fn remove(&mut self, key: &str) {
        match fs::remove_file(self.path(key)) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove segment {}: {}", key, e),
        }
    }
}
