//! Steps that acquire the temporary OS disk and attach it to the host.

use super::RunContext;
use crate::bag::keys;
use crate::CoreError;
use imageforge_cloud::{DiskParams, DiskSource};
use imageforge_schema::{PlatformImage, ResourceId};
use tracing::{info, warn};

pub(super) fn resolve_version(
    ctx: &mut RunContext<'_>,
    image: &PlatformImage,
    location: &str,
) -> Result<(), CoreError> {
    let version = ctx.cloud.resolve_platform_image_version(image, location)?;
    info!("resolved {image} to version {version}");
    ctx.bag.put(keys::RESOLVED_VERSION, version);
    Ok(())
}

pub(super) fn verify_source_disk(
    ctx: &mut RunContext<'_>,
    disk: &ResourceId,
    expected_location: &str,
) -> Result<(), CoreError> {
    let disk_id = disk.to_string();
    let actual = ctx.cloud.disk_location(&disk_id)?;
    if !actual.eq_ignore_ascii_case(expected_location) {
        return Err(CoreError::SourceDiskLocation {
            disk: disk_id,
            actual,
            expected: expected_location.to_owned(),
        });
    }
    Ok(())
}

pub(super) fn create_disk(ctx: &mut RunContext<'_>, params: &DiskParams) -> Result<(), CoreError> {
    let mut params = params.clone();
    // a `latest` source was pinned by the resolve-version step
    if let DiskSource::PlatformImage(image) = &params.source {
        if image.is_latest() {
            let version = ctx.bag.require(keys::RESOLVED_VERSION)?;
            params.source = DiskSource::PlatformImage(image.with_version(version));
        }
    }
    info!("creating OS disk {}", params.resource_id);
    ctx.cloud.create_disk(&params)?;
    ctx.bag.put(keys::OS_DISK_ID, params.resource_id);
    Ok(())
}

pub(super) fn attach_disk(ctx: &mut RunContext<'_>, disk_id: &str) -> Result<(), CoreError> {
    let device = ctx.os.attach_disk(disk_id)?;
    info!("disk {disk_id} attached as {device}");
    ctx.bag.put(keys::DEVICE, device);
    Ok(())
}

pub(super) fn cleanup_disk(
    ctx: &mut RunContext<'_>,
    disk_id: &str,
    skip_cleanup: bool,
) -> Vec<String> {
    if skip_cleanup {
        info!("retaining OS disk {disk_id}");
        return vec![disk_id.to_owned()];
    }
    if let Err(e) = ctx.cloud.delete_disk(disk_id) {
        warn!("failed to delete OS disk {disk_id}: {e}");
        return vec![disk_id.to_owned()];
    }
    Vec::new()
}

pub(super) fn cleanup_attach(ctx: &mut RunContext<'_>, disk_id: &str) -> Vec<String> {
    if let Err(e) = ctx.os.detach_disk(disk_id) {
        warn!("failed to detach disk {disk_id}: {e}");
    }
    ctx.bag.take(keys::DEVICE);
    Vec::new()
}
