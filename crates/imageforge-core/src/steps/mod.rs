//! The build step vocabulary and per-step execution logic.
//!
//! Each step is a variant carrying everything knowable at graph-build
//! time; runtime-only facts (device path, mount path, resolved image
//! version) travel through the [`StateBag`]. `cleanup` undoes a step's
//! side effects and reports any resource it deliberately or
//! unavoidably leaves behind.

mod mount;
mod output;
mod source;

use crate::bag::StateBag;
use crate::CoreError;
use imageforge_cloud::{
    CloudClient, DiskParams, GalleryVersionParams, ImageParams, OsOps, SnapshotParams,
};
use imageforge_schema::{ChrootMount, PlatformImage, ResourceId, SharedImageDestination};

/// Collaborators and shared state handed to each step.
pub struct RunContext<'a> {
    pub bag: &'a mut StateBag,
    pub cloud: &'a dyn CloudClient,
    pub os: &'a dyn OsOps,
    pub command_wrapper: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildStep {
    /// Fail fast if the gallery image behind the destination is absent.
    VerifyDestination {
        destination: SharedImageDestination,
        location: String,
    },
    /// Pin a `latest` platform image source to a concrete version.
    ResolveVersion {
        image: PlatformImage,
        location: String,
    },
    /// Check that an existing source disk is co-located with this host.
    VerifySourceDisk {
        disk: ResourceId,
        expected_location: String,
    },
    CreateDisk {
        params: DiskParams,
    },
    AttachDisk {
        disk_id: String,
    },
    PreMount {
        commands: Vec<String>,
    },
    Mount {
        path_template: String,
        partition: String,
        options: Vec<String>,
    },
    PostMount {
        commands: Vec<String>,
    },
    MountExtra {
        mounts: Vec<ChrootMount>,
    },
    CopyFiles {
        files: Vec<String>,
    },
    Provision,
    /// Quiesce the filesystem before capture: undo the mount and copy
    /// steps while the build is still on its success path.
    EarlyCleanup,
    CreateImage {
        params: ImageParams,
    },
    CreateSnapshot {
        params: SnapshotParams,
    },
    CreateSharedImageVersion {
        params: GalleryVersionParams,
    },
}

impl BuildStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::VerifyDestination { .. } => "verify-destination",
            Self::ResolveVersion { .. } => "resolve-version",
            Self::VerifySourceDisk { .. } => "verify-source-disk",
            Self::CreateDisk { .. } => "create-disk",
            Self::AttachDisk { .. } => "attach-disk",
            Self::PreMount { .. } => "pre-mount",
            Self::Mount { .. } => "mount",
            Self::PostMount { .. } => "post-mount",
            Self::MountExtra { .. } => "mount-extra",
            Self::CopyFiles { .. } => "copy-files",
            Self::Provision => "provision",
            Self::EarlyCleanup => "early-cleanup",
            Self::CreateImage { .. } => "create-image",
            Self::CreateSnapshot { .. } => "create-snapshot",
            Self::CreateSharedImageVersion { .. } => "create-shared-image-version",
        }
    }

    pub fn run(&self, ctx: &mut RunContext<'_>) -> Result<(), CoreError> {
        match self {
            Self::VerifyDestination {
                destination,
                location,
            } => output::verify_destination(ctx, destination, location),
            Self::ResolveVersion { image, location } => {
                source::resolve_version(ctx, image, location)
            }
            Self::VerifySourceDisk {
                disk,
                expected_location,
            } => source::verify_source_disk(ctx, disk, expected_location),
            Self::CreateDisk { params } => source::create_disk(ctx, params),
            Self::AttachDisk { disk_id } => source::attach_disk(ctx, disk_id),
            Self::PreMount { commands } => mount::pre_mount(ctx, commands),
            Self::Mount {
                path_template,
                partition,
                options,
            } => mount::mount(ctx, path_template, partition, options),
            Self::PostMount { commands } => mount::post_mount(ctx, commands),
            Self::MountExtra { mounts } => mount::mount_extra(ctx, mounts),
            Self::CopyFiles { files } => mount::copy_files(ctx, files),
            Self::Provision => mount::provision(ctx),
            Self::EarlyCleanup => mount::early_cleanup(ctx),
            Self::CreateImage { params } => output::create_image(ctx, params),
            Self::CreateSnapshot { params } => output::create_snapshot(ctx, params),
            Self::CreateSharedImageVersion { params } => {
                output::create_gallery_version(ctx, params)
            }
        }
    }

    /// Undo this step's side effects. Host-state cleanup (unmounting,
    /// detaching) always runs; cloud resource deletion is suppressed by
    /// `skip_cleanup`. Returns the resource ids left behind, whether
    /// retained on purpose or leaked by a failed deletion.
    pub fn cleanup(&self, ctx: &mut RunContext<'_>, skip_cleanup: bool) -> Vec<String> {
        match self {
            Self::CreateDisk { params } => {
                source::cleanup_disk(ctx, &params.resource_id, skip_cleanup)
            }
            Self::AttachDisk { disk_id } => source::cleanup_attach(ctx, disk_id),
            Self::Mount { .. } => mount::cleanup_mount(ctx),
            Self::MountExtra { .. } => mount::cleanup_mount_extra(ctx),
            Self::CopyFiles { .. } => mount::cleanup_copy_files(ctx),
            Self::CreateSnapshot { params } => {
                output::cleanup_snapshot(ctx, &params.resource_id, skip_cleanup)
            }
            _ => Vec::new(),
        }
    }
}
