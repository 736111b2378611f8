use super::{json_pretty, load_and_resolve, EXIT_BUILD_ERROR, EXIT_SUCCESS};
use imageforge_cloud::{MockCloud, MockOs};
use imageforge_core::run_build;
use imageforge_schema::redact;
use std::path::Path;

/// Run a build against the in-memory collaborators. Nothing is
/// created in any cloud and the host is untouched; useful for
/// exercising a manifest end to end.
pub fn run_mock(manifest: &Path, json: bool) -> Result<u8, String> {
    let (resolution, env) = load_and_resolve(manifest)?;
    for warning in &resolution.warnings {
        eprintln!("warning: {warning}");
    }

    let cloud = MockCloud::new();
    let os = MockOs::new();

    match run_build(&resolution.config, &env, &cloud, &os) {
        Ok(artifact) => {
            if json {
                let payload = serde_json::json!({
                    "status": "built",
                    "image_resource_id": artifact.image_resource_id,
                    "gallery_image_version_id": artifact.gallery_image_version_id,
                    "retained_resources": artifact.retained_resources,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!("build complete");
                if let Some(id) = &artifact.image_resource_id {
                    println!("managed image: {id}");
                }
                if let Some(id) = &artifact.gallery_image_version_id {
                    println!("gallery image version: {id}");
                }
                for resource in &artifact.retained_resources {
                    println!("retained: {resource}");
                }
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            for resource in &e.leftover_resources {
                eprintln!("leftover resource: {resource}");
            }
            eprintln!("error: {}", redact(&e.to_string()));
            Ok(EXIT_BUILD_ERROR)
        }
    }
}
