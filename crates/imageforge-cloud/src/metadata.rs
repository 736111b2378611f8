use crate::client::CloudError;
use imageforge_schema::EnvironmentInfo;

/// Supplies the read-only facts about the host the build runs on.
pub trait MetadataProvider {
    fn compute_info(&self) -> Result<EnvironmentInfo, CloudError>;
}

/// Metadata provider backed by `IMAGEFORGE_*` environment variables,
/// used by the CLI where a real instance-metadata endpoint is not
/// wired in.
#[derive(Debug, Default)]
pub struct EnvMetadataProvider;

impl EnvMetadataProvider {
    fn var(name: &str) -> Result<String, CloudError> {
        match std::env::var(name) {
            Ok(v) if !v.is_empty() => Ok(v),
            _ => Err(CloudError::Metadata(format!(
                "environment variable {name} is not set"
            ))),
        }
    }
}

impl MetadataProvider for EnvMetadataProvider {
    fn compute_info(&self) -> Result<EnvironmentInfo, CloudError> {
        Ok(EnvironmentInfo {
            subscription_id: Self::var("IMAGEFORGE_SUBSCRIPTION_ID")?,
            resource_group: Self::var("IMAGEFORGE_RESOURCE_GROUP")?,
            location: Self::var("IMAGEFORGE_LOCATION")?,
            vm_resource_id: Self::var("IMAGEFORGE_VM_RESOURCE_ID")?,
        })
    }
}
