//! Collaborator interfaces for the Imageforge build pipeline.
//!
//! This crate defines the seams the step executor works against: the
//! `CloudClient` trait (disk/snapshot/image CRUD and platform-image
//! version resolution), the `OsOps` trait (attach, mount, chroot
//! provisioning and friends on the build host), the `MetadataProvider`
//! trait supplying [`EnvironmentInfo`], host prerequisite checks, and
//! mock implementations of all three for tests and dry runs.

pub mod client;
pub mod metadata;
pub mod mock;
pub mod osops;
pub mod prereq;

pub use client::{
    CloudClient, CloudError, DiskParams, DiskSource, GalleryVersionParams, ImageParams,
    SnapshotParams,
};
pub use imageforge_schema::EnvironmentInfo;
pub use metadata::{EnvMetadataProvider, MetadataProvider};
pub use mock::{MockCloud, MockMetadata, MockOs};
pub use osops::{OsError, OsOps};
pub use prereq::{check_host_prereqs, format_missing, MissingPrereq};
