use imageforge_schema::{
    CacheType, HyperVGeneration, PlatformImage, SharedImageDestination, StorageAccountType,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("resource already exists: {0}")]
    AlreadyExists(String),
    #[error("cloud request failed: {0}")]
    Request(String),
    #[error("metadata unavailable: {0}")]
    Metadata(String),
}

/// Parameters for creating the temporary OS disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskParams {
    pub resource_id: String,
    pub location: String,
    /// Zero means "keep the source size".
    pub size_gb: i32,
    pub storage_account_type: StorageAccountType,
    pub hyperv_generation: HyperVGeneration,
    pub source: DiskSource,
}

/// Where the new disk's initial content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskSource {
    /// Empty, unpartitioned disk.
    Blank,
    /// Concrete (never `latest`) platform image version.
    PlatformImage(PlatformImage),
    /// Copy of an existing managed disk, by resource id.
    ExistingDisk(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotParams {
    pub resource_id: String,
    pub location: String,
    pub source_disk_id: String,
}

/// Parameters for creating a managed image. The image records the
/// source disk as generalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageParams {
    pub resource_id: String,
    pub location: String,
    pub source_disk_id: String,
    pub cache_type: CacheType,
    pub storage_account_type: StorageAccountType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryVersionParams {
    pub destination: SharedImageDestination,
    pub location: String,
    pub source_snapshot_id: String,
    pub cache_type: CacheType,
}

/// The cloud API surface the pipeline depends on. Implementations own
/// authentication, retries, and the wire format; the pipeline only
/// sees resource identifiers and typed parameters.
pub trait CloudClient: Send + Sync {
    fn create_disk(&self, params: &DiskParams) -> Result<(), CloudError>;
    fn delete_disk(&self, resource_id: &str) -> Result<(), CloudError>;
    /// Location of an existing disk, for source-locality verification.
    fn disk_location(&self, resource_id: &str) -> Result<String, CloudError>;

    fn create_snapshot(&self, params: &SnapshotParams) -> Result<(), CloudError>;
    fn delete_snapshot(&self, resource_id: &str) -> Result<(), CloudError>;

    fn create_image(&self, params: &ImageParams) -> Result<(), CloudError>;

    /// Resolve the newest concrete version of a platform image in the
    /// given location.
    fn resolve_platform_image_version(
        &self,
        image: &PlatformImage,
        location: &str,
    ) -> Result<String, CloudError>;

    /// Check that the gallery image definition behind a shared-image
    /// destination exists and is usable from the given location.
    fn verify_gallery_image(
        &self,
        destination: &SharedImageDestination,
        location: &str,
    ) -> Result<(), CloudError>;

    /// Publish a gallery image version from a snapshot; returns the
    /// created version's resource id.
    fn create_gallery_image_version(
        &self,
        params: &GalleryVersionParams,
    ) -> Result<String, CloudError>;
}
