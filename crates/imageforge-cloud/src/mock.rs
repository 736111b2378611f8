//! In-memory collaborators for tests and dry runs.
//!
//! Every call is recorded in an operation log so tests can assert on
//! ordering (notably reverse-order cleanup). A single operation name
//! can be armed to fail, driving the executor's unwind paths.

use crate::client::{
    CloudClient, CloudError, DiskParams, GalleryVersionParams, ImageParams, SnapshotParams,
};
use crate::metadata::MetadataProvider;
use crate::osops::{OsError, OsOps};
use imageforge_schema::{EnvironmentInfo, PlatformImage, SharedImageDestination};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct CloudState {
    disks: BTreeMap<String, String>,
    snapshots: BTreeSet<String>,
    images: BTreeSet<String>,
    gallery_versions: Vec<String>,
    log: Vec<String>,
}

pub struct MockCloud {
    state: Mutex<CloudState>,
    fail_on: Option<String>,
}

impl Default for MockCloud {
    fn default() -> Self {
        Self {
            state: Mutex::new(CloudState::default()),
            fail_on: None,
        }
    }
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that fails the named operation (e.g. `"create_image"`).
    pub fn failing(operation: &str) -> Self {
        Self {
            fail_on: Some(operation.to_owned()),
            ..Self::default()
        }
    }

    /// Pre-populate an existing disk, for source-disk verification.
    pub fn seed_disk(&self, resource_id: &str, location: &str) {
        self.state_mut()
            .disks
            .insert(resource_id.to_owned(), location.to_owned());
    }

    pub fn ops(&self) -> Vec<String> {
        self.state_mut().log.clone()
    }

    pub fn disk_exists(&self, resource_id: &str) -> bool {
        self.state_mut().disks.contains_key(resource_id)
    }

    pub fn snapshot_exists(&self, resource_id: &str) -> bool {
        self.state_mut().snapshots.contains(resource_id)
    }

    pub fn image_exists(&self, resource_id: &str) -> bool {
        self.state_mut().images.contains(resource_id)
    }

    pub fn gallery_versions(&self) -> Vec<String> {
        self.state_mut().gallery_versions.clone()
    }

    fn state_mut(&self) -> std::sync::MutexGuard<'_, CloudState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, operation: &str, detail: &str) -> Result<(), CloudError> {
        debug!("mock cloud: {operation} {detail}");
        let mut state = self.state_mut();
        state.log.push(format!("{operation} {detail}"));
        if self.fail_on.as_deref() == Some(operation) {
            return Err(CloudError::Request(format!(
                "injected failure in {operation}"
            )));
        }
        Ok(())
    }
}

impl CloudClient for MockCloud {
    fn create_disk(&self, params: &DiskParams) -> Result<(), CloudError> {
        self.record("create_disk", &params.resource_id)?;
        self.state_mut()
            .disks
            .insert(params.resource_id.clone(), params.location.clone());
        Ok(())
    }

    fn delete_disk(&self, resource_id: &str) -> Result<(), CloudError> {
        self.record("delete_disk", resource_id)?;
        self.state_mut().disks.remove(resource_id);
        Ok(())
    }

    fn disk_location(&self, resource_id: &str) -> Result<String, CloudError> {
        self.record("disk_location", resource_id)?;
        self.state_mut()
            .disks
            .get(resource_id)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(resource_id.to_owned()))
    }

    fn create_snapshot(&self, params: &SnapshotParams) -> Result<(), CloudError> {
        self.record("create_snapshot", &params.resource_id)?;
        if !self.state_mut().disks.contains_key(&params.source_disk_id) {
            return Err(CloudError::NotFound(params.source_disk_id.clone()));
        }
        self.state_mut().snapshots.insert(params.resource_id.clone());
        Ok(())
    }

    fn delete_snapshot(&self, resource_id: &str) -> Result<(), CloudError> {
        self.record("delete_snapshot", resource_id)?;
        self.state_mut().snapshots.remove(resource_id);
        Ok(())
    }

    fn create_image(&self, params: &ImageParams) -> Result<(), CloudError> {
        self.record("create_image", &params.resource_id)?;
        self.state_mut().images.insert(params.resource_id.clone());
        Ok(())
    }

    fn resolve_platform_image_version(
        &self,
        image: &PlatformImage,
        location: &str,
    ) -> Result<String, CloudError> {
        self.record(
            "resolve_platform_image_version",
            &format!("{image} {location}"),
        )?;
        // deterministic pin so graph/executor tests are stable
        Ok("1.2.3".to_owned())
    }

    fn verify_gallery_image(
        &self,
        destination: &SharedImageDestination,
        location: &str,
    ) -> Result<(), CloudError> {
        self.record(
            "verify_gallery_image",
            &format!("{}/{} {location}", destination.gallery_name, destination.image_name),
        )
    }

    fn create_gallery_image_version(
        &self,
        params: &GalleryVersionParams,
    ) -> Result<String, CloudError> {
        let id = params.destination.resource_id("mock-sub");
        self.record("create_gallery_image_version", &id)?;
        if !self
            .state_mut()
            .snapshots
            .contains(&params.source_snapshot_id)
        {
            return Err(CloudError::NotFound(params.source_snapshot_id.clone()));
        }
        self.state_mut().gallery_versions.push(id.clone());
        Ok(id)
    }
}

#[derive(Debug, Default)]
struct OsState {
    attached: Vec<String>,
    mounts: Vec<String>,
    log: Vec<String>,
    next_device: u8,
}

pub struct MockOs {
    state: Mutex<OsState>,
    fail_on: Option<String>,
}

impl Default for MockOs {
    fn default() -> Self {
        Self {
            state: Mutex::new(OsState::default()),
            fail_on: None,
        }
    }
}

impl MockOs {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that fails the named operation (e.g. `"provision"`).
    pub fn failing(operation: &str) -> Self {
        Self {
            fail_on: Some(operation.to_owned()),
            ..Self::default()
        }
    }

    pub fn ops(&self) -> Vec<String> {
        self.state_mut().log.clone()
    }

    /// Disks currently attached to the host.
    pub fn attached(&self) -> Vec<String> {
        self.state_mut().attached.clone()
    }

    /// Mount targets currently mounted.
    pub fn active_mounts(&self) -> Vec<String> {
        self.state_mut().mounts.clone()
    }

    fn state_mut(&self) -> std::sync::MutexGuard<'_, OsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, operation: &str, detail: &str) -> Result<(), OsError> {
        debug!("mock host: {operation} {detail}");
        let mut state = self.state_mut();
        state.log.push(format!("{operation} {detail}"));
        if self.fail_on.as_deref() == Some(operation) {
            return Err(OsError::Device(format!("injected failure in {operation}")));
        }
        Ok(())
    }
}

impl OsOps for MockOs {
    fn attach_disk(&self, disk_resource_id: &str) -> Result<String, OsError> {
        self.record("attach_disk", disk_resource_id)?;
        let mut state = self.state_mut();
        let device = format!("/dev/sd{}", (b'c' + state.next_device) as char);
        state.next_device += 1;
        state.attached.push(disk_resource_id.to_owned());
        Ok(device)
    }

    fn detach_disk(&self, disk_resource_id: &str) -> Result<(), OsError> {
        self.record("detach_disk", disk_resource_id)?;
        self.state_mut().attached.retain(|d| d != disk_resource_id);
        Ok(())
    }

    fn run_command(&self, command: &str) -> Result<(), OsError> {
        self.record("run_command", command)
    }

    fn mount(
        &self,
        source: &str,
        target: &str,
        fstype: Option<&str>,
        _options: &[String],
    ) -> Result<(), OsError> {
        self.record(
            "mount",
            &format!("{} {source} {target}", fstype.unwrap_or("-")),
        )?;
        self.state_mut().mounts.push(target.to_owned());
        Ok(())
    }

    fn unmount(&self, target: &str) -> Result<(), OsError> {
        self.record("unmount", target)?;
        let mut state = self.state_mut();
        match state.mounts.iter().rposition(|m| m == target) {
            Some(i) => {
                state.mounts.remove(i);
                Ok(())
            }
            None => Err(OsError::Device(format!("{target} is not mounted"))),
        }
    }

    fn create_dir(&self, path: &str) -> Result<(), OsError> {
        self.record("create_dir", path)
    }

    fn copy_file(&self, source: &str, destination: &str) -> Result<(), OsError> {
        self.record("copy_file", &format!("{source} {destination}"))
    }

    fn remove_file(&self, path: &str) -> Result<(), OsError> {
        self.record("remove_file", path)
    }

    fn provision(&self, mount_path: &str) -> Result<(), OsError> {
        self.record("provision", mount_path)
    }
}

/// Fixed environment facts for tests and mock builds.
#[derive(Debug, Default)]
pub struct MockMetadata;

impl MockMetadata {
    pub fn info() -> EnvironmentInfo {
        EnvironmentInfo {
            subscription_id: "mock-sub".to_owned(),
            resource_group: "mock-rg".to_owned(),
            location: "westus2".to_owned(),
            vm_resource_id: "/subscriptions/mock-sub/resourceGroups/mock-rg/providers/Microsoft.Compute/virtualMachines/builder".to_owned(),
        }
    }
}

impl MetadataProvider for MockMetadata {
    fn compute_info(&self) -> Result<EnvironmentInfo, CloudError> {
        Ok(Self::info())
    }
}
