pub mod build;
pub mod doctor;
pub mod plan;
pub mod validate;

use imageforge_cloud::{EnvMetadataProvider, MetadataProvider, MockMetadata};
use imageforge_schema::{parse_manifest_file, resolve, EnvironmentInfo, Resolution};
use std::path::Path;
use tracing::debug;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_CONFIG_ERROR: u8 = 3;
pub const EXIT_BUILD_ERROR: u8 = 4;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Environment facts for this run. An agent on a real build VM exports
/// them as `IMAGEFORGE_*` variables; without those, the fixed mock
/// environment keeps validation and mock builds deterministic.
pub fn environment() -> Result<EnvironmentInfo, String> {
    if std::env::var("IMAGEFORGE_SUBSCRIPTION_ID").is_ok() {
        EnvMetadataProvider.compute_info().map_err(|e| e.to_string())
    } else {
        debug!("IMAGEFORGE_SUBSCRIPTION_ID unset, using the mock environment");
        Ok(MockMetadata::info())
    }
}

pub fn load_and_resolve(manifest: &Path) -> Result<(Resolution, EnvironmentInfo), String> {
    let manifest = parse_manifest_file(manifest).map_err(|e| e.to_string())?;
    let env = environment()?;
    let resolution = resolve(&manifest, &env).map_err(|e| e.to_string())?;
    Ok((resolution, env))
}
