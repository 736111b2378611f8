//! Steps that verify and produce the build outputs.

use super::RunContext;
use crate::bag::keys;
use crate::CoreError;
use imageforge_cloud::{GalleryVersionParams, ImageParams, SnapshotParams};
use imageforge_schema::SharedImageDestination;
use tracing::{info, warn};

pub(super) fn verify_destination(
    ctx: &mut RunContext<'_>,
    destination: &SharedImageDestination,
    location: &str,
) -> Result<(), CoreError> {
    ctx.cloud.verify_gallery_image(destination, location)?;
    Ok(())
}

pub(super) fn create_image(ctx: &mut RunContext<'_>, params: &ImageParams) -> Result<(), CoreError> {
    info!("creating managed image {}", params.resource_id);
    ctx.cloud.create_image(params)?;
    Ok(())
}

pub(super) fn create_snapshot(
    ctx: &mut RunContext<'_>,
    params: &SnapshotParams,
) -> Result<(), CoreError> {
    info!("snapshotting {} as {}", params.source_disk_id, params.resource_id);
    ctx.cloud.create_snapshot(params)?;
    ctx.bag.put(keys::SNAPSHOT_ID, params.resource_id.clone());
    Ok(())
}

pub(super) fn create_gallery_version(
    ctx: &mut RunContext<'_>,
    params: &GalleryVersionParams,
) -> Result<(), CoreError> {
    let id = ctx.cloud.create_gallery_image_version(params)?;
    info!("published gallery image version {id}");
    ctx.bag.put(keys::GALLERY_VERSION_ID, id);
    Ok(())
}

pub(super) fn cleanup_snapshot(
    ctx: &mut RunContext<'_>,
    snapshot_id: &str,
    skip_cleanup: bool,
) -> Vec<String> {
    // a snapshot never taken has nothing to clean up
    if ctx.bag.take(keys::SNAPSHOT_ID).is_none() {
        return Vec::new();
    }
    if skip_cleanup {
        info!("retaining snapshot {snapshot_id}");
        return vec![snapshot_id.to_owned()];
    }
    if let Err(e) = ctx.cloud.delete_snapshot(snapshot_id) {
        warn!("failed to delete snapshot {snapshot_id}: {e}");
        return vec![snapshot_id.to_owned()];
    }
    Vec::new()
}
