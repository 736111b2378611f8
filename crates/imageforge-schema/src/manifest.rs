use crate::destination::SharedImageDestination;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Raw build manifest as written by the user. All defaulting and
/// validation happens in [`crate::resolve`]; fields left unset stay
/// `None`/empty here so the resolver can tell "absent" from
/// "explicitly empty".
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BuildManifest {
    /// Start from an empty, unpartitioned disk instead of a source.
    #[serde(default)]
    pub from_scratch: bool,
    /// Platform image specifier (`publisher:offer:sku:version`) or a
    /// managed disk resource id. Mutually exclusive with `from_scratch`.
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub os_disk_size_gb: i32,
    pub os_disk_storage_account_type: Option<String>,
    pub os_disk_cache_type: Option<String>,
    pub image_hyperv_generation: Option<String>,

    /// Commands run after attaching the disk and before mounting.
    /// With `from_scratch` these must create the partition table and
    /// filesystem; `{{ device }}` expands to the attached device.
    #[serde(default)]
    pub pre_mount_commands: Vec<String>,
    /// Commands run after mounting the root partition.
    /// `{{ device }}` and `{{ mount_path }}` are available.
    #[serde(default)]
    pub post_mount_commands: Vec<String>,
    pub mount_path: Option<String>,
    pub mount_partition: Option<String>,
    #[serde(default)]
    pub mount_options: Vec<String>,
    /// `[fstype, source, target]` triples mounted into the chroot.
    pub chroot_mounts: Option<Vec<Vec<String>>>,
    /// Host files copied into the chroot before provisioning. An
    /// explicitly empty list suppresses the `/etc/resolv.conf` default.
    pub copy_files: Option<Vec<String>>,
    /// Template wrapping every shell command; the command itself is
    /// available as `{{ command }}`.
    pub command_wrapper: Option<String>,

    pub temporary_os_disk_id: Option<String>,
    pub temporary_os_disk_snapshot_id: Option<String>,
    /// Leave temporary cloud resources behind after the build.
    #[serde(default)]
    pub skip_cleanup: bool,

    pub image_resource_id: Option<String>,
    pub shared_image_destination: Option<SharedImageDestination>,

    pub credentials: Option<CredentialsSection>,
}

/// Credential material for the cloud API client. Secret-bearing
/// fields are registered with the redaction filter on successful
/// resolution so they never reach logs.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CredentialsSection {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub client_jwt: String,
}

pub fn parse_manifest_str(input: &str) -> Result<BuildManifest, ManifestError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<BuildManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}
