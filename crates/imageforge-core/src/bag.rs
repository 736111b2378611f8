use crate::CoreError;
use std::collections::HashMap;

/// Well-known state bag keys. A step that consumes a key documents the
/// producer here rather than at the call site.
pub mod keys {
    /// Device path of the attached OS disk, e.g. `/dev/sdc`.
    pub const DEVICE: &str = "device";
    /// Resource id of the temporary OS disk once it exists.
    pub const OS_DISK_ID: &str = "os_disk_id";
    /// Resource id of the snapshot taken for gallery publishing.
    pub const SNAPSHOT_ID: &str = "snapshot_id";
    /// Rendered path the OS disk partition is mounted at.
    pub const MOUNT_PATH: &str = "mount_path";
    /// Concrete version pinned for a `latest` platform image source.
    pub const RESOLVED_VERSION: &str = "resolved_version";
    /// Resource id of the published gallery image version.
    pub const GALLERY_VERSION_ID: &str = "gallery_version_id";
    /// Chroot mount targets, in the order they were mounted.
    pub const EXTRA_MOUNTS: &str = "extra_mounts";
    /// Destination paths of files copied into the image.
    pub const COPIED_FILES: &str = "copied_files";
}

/// Shared mutable state flowing through the step sequence. Keys are
/// written by exactly one step and read by later ones; list keys track
/// partial progress so cleanup can undo exactly what was done.
#[derive(Debug, Default)]
pub struct StateBag {
    values: HashMap<&'static str, String>,
    lists: HashMap<&'static str, Vec<String>>,
}

impl StateBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &'static str, value: String) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &'static str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get), but a missing key is a bug in the step
    /// graph and surfaces as an error.
    pub fn require(&self, key: &'static str) -> Result<&str, CoreError> {
        self.get(key).ok_or(CoreError::MissingState(key))
    }

    /// Remove and return a value, so repeated cleanups become no-ops.
    pub fn take(&mut self, key: &'static str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn push_list(&mut self, key: &'static str, value: String) {
        self.lists.entry(key).or_default().push(value);
    }

    /// Remove and return a whole list; absent keys yield an empty list.
    pub fn take_list(&mut self, key: &'static str) -> Vec<String> {
        self.lists.remove(key).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_names_the_missing_key() {
        let bag = StateBag::new();
        match bag.require(keys::DEVICE) {
            Err(CoreError::MissingState(key)) => assert_eq!(key, keys::DEVICE),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn take_makes_later_reads_miss() {
        let mut bag = StateBag::new();
        bag.put(keys::MOUNT_PATH, "/mnt/x".to_owned());
        assert_eq!(bag.take(keys::MOUNT_PATH).as_deref(), Some("/mnt/x"));
        assert_eq!(bag.take(keys::MOUNT_PATH), None);
        assert!(bag.get(keys::MOUNT_PATH).is_none());
    }

    #[test]
    fn lists_preserve_push_order() {
        let mut bag = StateBag::new();
        bag.push_list(keys::EXTRA_MOUNTS, "/a".to_owned());
        bag.push_list(keys::EXTRA_MOUNTS, "/b".to_owned());
        assert_eq!(bag.take_list(keys::EXTRA_MOUNTS), vec!["/a", "/b"]);
        assert!(bag.take_list(keys::EXTRA_MOUNTS).is_empty());
    }
}
