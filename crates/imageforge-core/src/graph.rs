//! Turns a resolved configuration into the linear step sequence.

use crate::steps::BuildStep;
use imageforge_cloud::{DiskParams, DiskSource, GalleryVersionParams, ImageParams, SnapshotParams};
use imageforge_schema::{BuildConfig, EnvironmentInfo, SourceMode};
use tracing::debug;

/// Build the ordered step sequence for a validated configuration.
///
/// The shape is fixed: destination verification first (fail before any
/// resource exists), then source acquisition, then the host-side mount
/// and provisioning phase, then output capture. Which steps appear is
/// decided here once; execution never branches on the configuration
/// again.
pub fn build_steps(config: &BuildConfig, env: &EnvironmentInfo) -> Vec<BuildStep> {
    let location = env.location.clone();
    let mut steps = Vec::new();

    if let Some(destination) = &config.shared_image_destination {
        steps.push(BuildStep::VerifyDestination {
            destination: destination.clone(),
            location: location.clone(),
        });
    }

    let disk_source = match &config.source {
        SourceMode::FromScratch => DiskSource::Blank,
        SourceMode::PlatformImage(image) => {
            if image.is_latest() {
                steps.push(BuildStep::ResolveVersion {
                    image: image.clone(),
                    location: location.clone(),
                });
            }
            DiskSource::PlatformImage(image.clone())
        }
        SourceMode::ExistingDisk(disk) => {
            steps.push(BuildStep::VerifySourceDisk {
                disk: disk.clone(),
                expected_location: location.clone(),
            });
            DiskSource::ExistingDisk(disk.to_string())
        }
    };

    steps.push(BuildStep::CreateDisk {
        params: DiskParams {
            resource_id: config.temporary_os_disk_id.clone(),
            location: location.clone(),
            size_gb: config.os_disk_size_gb,
            storage_account_type: config.os_disk_storage_account_type,
            hyperv_generation: config.image_hyperv_generation,
            source: disk_source,
        },
    });
    steps.push(BuildStep::AttachDisk {
        disk_id: config.temporary_os_disk_id.clone(),
    });
    steps.push(BuildStep::PreMount {
        commands: config.pre_mount_commands.clone(),
    });
    steps.push(BuildStep::Mount {
        path_template: config.mount_path.clone(),
        partition: config.mount_partition.clone(),
        options: config.mount_options.clone(),
    });
    steps.push(BuildStep::PostMount {
        commands: config.post_mount_commands.clone(),
    });
    steps.push(BuildStep::MountExtra {
        mounts: config.chroot_mounts.clone(),
    });
    steps.push(BuildStep::CopyFiles {
        files: config.copy_files.clone(),
    });
    steps.push(BuildStep::Provision);
    steps.push(BuildStep::EarlyCleanup);

    if let Some(image_id) = &config.image_resource_id {
        steps.push(BuildStep::CreateImage {
            params: ImageParams {
                resource_id: image_id.to_string(),
                location: location.clone(),
                source_disk_id: config.temporary_os_disk_id.clone(),
                cache_type: config.os_disk_cache_type,
                storage_account_type: config.os_disk_storage_account_type,
            },
        });
    }

    if let Some(destination) = &config.shared_image_destination {
        steps.push(BuildStep::CreateSnapshot {
            params: SnapshotParams {
                resource_id: config.temporary_os_disk_snapshot_id.clone(),
                location: location.clone(),
                source_disk_id: config.temporary_os_disk_id.clone(),
            },
        });
        steps.push(BuildStep::CreateSharedImageVersion {
            params: GalleryVersionParams {
                destination: destination.clone(),
                location,
                source_snapshot_id: config.temporary_os_disk_snapshot_id.clone(),
                cache_type: config.os_disk_cache_type,
            },
        });
    }

    debug!(
        "step sequence: {}",
        steps
            .iter()
            .map(BuildStep::name)
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    steps
}
